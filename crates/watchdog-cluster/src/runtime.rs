//! Event Loop (C3, §4.3): the single-threaded readiness multiplexer that
//! owns every socket, the kernel, the command tracker, and the
//! escalation supervisor.
//!
//! One `poll()` call per iteration with a 1-second bound, followed by
//! accept / complete-connect / read / timers / cluster-command
//! maintenance / liveness sweep, exactly as §4.3 orders them. No
//! background threads; the only suspension point is the readiness wait.
//! IPC sockets are serviced by this same loop (§5 "IPC sockets feed C9
//! → same state machine via C3"), not a second one.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream, UnixListener};
use mio::{Events, Interest, Poll, Token};
use signal_hook::consts::{SIGCHLD, SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook_mio::v1_0::Signals;
use tracing::{info, warn};

use watchdog_ipc::{IpcAuth, IpcCommandType, IpcHandler, IpcOutcome};
use watchdog_kernel::{
    Cluster, Effect, IncomingPacket, IssueCommand, Notification, Target, Timing, WatchdogEvent,
};
use watchdog_types::{CommandSource, CommandStatus, NodeIdentity, NodeState, PrivateId};
use watchdog_wire::{IpcRequestFrame, IpcResponseFrame, PeerFrame, ResultTag};

use crate::connection::{OutboundState, PeerConnection};
use crate::error::{ClusterError, Result};
use crate::escalation::EscalationSupervisor;
use crate::ipc_conn::IpcClientConn;
use crate::tracker::{CommandTracker, TrackedCommand};

const LISTENER_TOKEN: Token = Token(0);
const SIGNAL_TOKEN: Token = Token(1);
const IPC_LISTENER_TOKEN: Token = Token(2);
const FIRST_DYNAMIC_TOKEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketRole {
    Client,
    Server,
}

/// Effects the runtime could not fully discharge itself and hands back
/// to the binary crate that owns the host callbacks (§6.4).
pub struct PendingEffects {
    pub notifications: Vec<Notification>,
    pub callbacks: Vec<Effect>,
}

pub struct Runtime {
    poll: Poll,
    listener: TcpListener,
    signals: Signals,
    cluster: Cluster,
    self_id: PrivateId,
    connections: HashMap<PrivateId, PeerConnection>,
    addrs: HashMap<PrivateId, SocketAddr>,
    /// Configured peer IPs, used to identify an inbound connection
    /// without relying on handshake payload content (§4.2, §7 "Protocol
    /// ... unexpected ... close the connection").
    ip_index: HashMap<IpAddr, PrivateId>,
    tokens: HashMap<Token, (PrivateId, SocketRole)>,
    next_token: usize,
    tracker: CommandTracker,
    escalation: EscalationSupervisor,
    reconnect_cooldown: Duration,
    node_lost: Duration,
    started_at: Instant,
    shutdown_requested: bool,
    exit_ready: bool,
    queue_pending: Vec<PendingEffects>,
    /// Set when an `EscalateVip`/`DeEscalateVip` effect arrived while the
    /// opposite program was still running and within its grace window
    /// (§4.10 "wait up to 5s for it to exit"); `true` means escalate is
    /// owed, `false` means de-escalate is owed. Retried from `maintain`.
    pending_vip: Option<bool>,

    ipc_listener: UnixListener,
    ipc_socket_path: PathBuf,
    ipc_handler: IpcHandler,
    ipc_clients: HashMap<Token, IpcClientConn>,
    /// Cluster command id → the IPC client socket awaiting its reply
    /// (§3 "IPC Command Record ... deferred").
    ipc_awaiting: HashMap<u32, Token>,
}

pub struct RuntimeConfig {
    pub listen_addr: SocketAddr,
    pub self_identity: NodeIdentity,
    pub remotes: Vec<(NodeIdentity, SocketAddr)>,
    pub auth_key: String,
    pub escalation_command: Vec<String>,
    pub de_escalation_command: Vec<String>,
    pub timing: Timing,
    pub reconnect_cooldown: Duration,
    pub node_lost: Duration,
    pub ipc_socket_path: PathBuf,
    pub ipc_shared_key: Option<String>,
    pub ipc_auth_key: Option<String>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let RuntimeConfig {
            listen_addr,
            self_identity,
            remotes,
            auth_key,
            escalation_command,
            de_escalation_command,
            timing,
            reconnect_cooldown,
            node_lost,
            ipc_socket_path,
            ipc_shared_key,
            ipc_auth_key,
        } = config;

        let mut listener = TcpListener::bind(listen_addr)?;
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGCHLD, SIGHUP])?;
        poll.registry()
            .register(&mut signals, SIGNAL_TOKEN, Interest::READABLE)?;

        if ipc_socket_path.exists() {
            std::fs::remove_file(&ipc_socket_path)?;
        }
        let std_ipc_listener = std::os::unix::net::UnixListener::bind(&ipc_socket_path)?;
        std_ipc_listener.set_nonblocking(true)?;
        let mut ipc_listener = UnixListener::from_std(std_ipc_listener);
        poll.registry()
            .register(&mut ipc_listener, IPC_LISTENER_TOKEN, Interest::READABLE)?;

        let mut addrs = HashMap::new();
        let mut ip_index = HashMap::new();
        let mut connections = HashMap::new();
        let mut identities = Vec::with_capacity(remotes.len());
        for (identity, addr) in remotes {
            addrs.insert(identity.private_id, addr);
            ip_index.insert(addr.ip(), identity.private_id);
            connections.insert(identity.private_id, PeerConnection::default());
            identities.push(identity);
        }

        let self_id = self_identity.private_id;
        let now = unix_now();
        let (cluster, initial_output) = Cluster::new(self_identity, identities, auth_key, timing, now);

        let mut runtime = Self {
            poll,
            listener,
            signals,
            cluster,
            self_id,
            connections,
            addrs,
            ip_index,
            tokens: HashMap::new(),
            next_token: FIRST_DYNAMIC_TOKEN,
            tracker: CommandTracker::new(),
            escalation: EscalationSupervisor::new(escalation_command, de_escalation_command),
            reconnect_cooldown,
            node_lost,
            started_at: Instant::now(),
            shutdown_requested: false,
            exit_ready: false,
            queue_pending: Vec::new(),
            pending_vip: None,
            ipc_listener,
            ipc_socket_path,
            ipc_handler: IpcHandler::new(IpcAuth::new(ipc_shared_key, ipc_auth_key)),
            ipc_clients: HashMap::new(),
            ipc_awaiting: HashMap::new(),
        };
        let pending = runtime.apply_output(initial_output, Instant::now());
        runtime.queue_pending.push(pending);
        Ok(runtime)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Drains effects the runtime could not discharge itself (host
    /// callbacks) for the binary crate to forward.
    pub fn take_pending_effects(&mut self) -> Vec<PendingEffects> {
        std::mem::take(&mut self.queue_pending)
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    /// Runs until a graceful shutdown is requested (signal, or the
    /// kernel's own `Effect::Exit`, e.g. `IN_NETWORK_TROUBLE`).
    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(128);
        loop {
            self.poll.poll(&mut events, Some(Duration::from_secs(1)))?;

            for event in events.iter() {
                match event.token() {
                    SIGNAL_TOKEN => self.drain_signals(),
                    LISTENER_TOKEN => self.accept_loop()?,
                    IPC_LISTENER_TOKEN => self.accept_ipc_loop()?,
                    token if self.tokens.contains_key(&token) => self.service_peer_token(token),
                    token if self.ipc_clients.contains_key(&token) => self.service_ipc_token(token),
                    _ => {}
                }
            }

            self.maintain();

            if self.exit_ready {
                info!("watchdog runtime exiting");
                let _ = std::fs::remove_file(&self.ipc_socket_path);
                return Ok(());
            }
        }
    }

    // ---- signal handling (§4.3, §4.10) --------------------------------------

    fn drain_signals(&mut self) {
        for signal in self.signals.pending() {
            match signal {
                SIGTERM | SIGINT | SIGQUIT => {
                    info!(%signal, "shutdown signal received");
                    self.begin_shutdown();
                }
                SIGCHLD => self.escalation.poll(),
                SIGHUP => warn!("SIGHUP received; config reload is applied at next loop top"),
                _ => {}
            }
        }
    }

    fn begin_shutdown(&mut self) {
        let payload_targets: Vec<PrivateId> = self.addrs.keys().copied().collect();
        let frame = PeerFrame::new(watchdog_types::PacketType::InformIAmGoingDown, 0, Vec::new());
        for peer in payload_targets {
            self.send_frame_best_effort(peer, &frame);
        }
        if self.cluster.is_escalated() {
            self.escalation.de_escalate(Instant::now());
        }
        self.shutdown_requested = true;
    }

    // ---- peer accept / connect -----------------------------------------------

    fn accept_loop(&mut self) -> Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    info!(%addr, "accepted inbound peer connection");
                    self.register_inbound(stream, addr)?;
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Identifies an accepted socket by the configured peer whose address
    /// matches the remote IP (§4.2). An inbound connection from an
    /// unrecognized address is a protocol error and is dropped (§7).
    fn register_inbound(&mut self, mut stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let Some(&peer) = self.ip_index.get(&addr.ip()) else {
            warn!(%addr, "inbound connection from unconfigured address, dropping");
            return Ok(());
        };
        stream.set_nodelay(true).ok();
        let token = self.allocate_token();
        self.poll
            .registry()
            .register(&mut stream, token, Interest::READABLE)?;
        let socket = crate::connection::Socket::new(stream, token);
        self.connections.entry(peer).or_default().server = Some(socket);
        self.tokens.insert(token, (peer, SocketRole::Server));

        let now = unix_now();
        let output = self
            .cluster
            .handle_event(WatchdogEvent::NodeConnectionFound { peer }, now);
        let pending = self.apply_output(output, Instant::now());
        self.queue_pending.push(pending);
        Ok(())
    }

    fn connect_outbound(&mut self, peer: PrivateId) -> Result<()> {
        let Some(addr) = self.addrs.get(&peer).copied() else {
            return Ok(());
        };
        let mut stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true).ok();
        let token = self.allocate_token();
        self.poll
            .registry()
            .register(&mut stream, token, Interest::READABLE | Interest::WRITABLE)?;
        let socket = crate::connection::Socket::new(stream, token);
        let conn = self.connections.entry(peer).or_default();
        conn.client = Some(socket);
        conn.outbound_state = OutboundState::WaitingForConnect;
        conn.last_connect_attempt = Some(Instant::now());
        self.tokens.insert(token, (peer, SocketRole::Client));
        Ok(())
    }

    fn allocate_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    // ---- per-token peer I/O ---------------------------------------------------

    fn service_peer_token(&mut self, token: Token) {
        let Some(&(peer, role)) = self.tokens.get(&token) else {
            return;
        };

        if role == SocketRole::Client {
            if let Some(conn) = self.connections.get_mut(&peer) {
                if conn.outbound_state == OutboundState::WaitingForConnect {
                    if let Some(socket) = &conn.client {
                        if socket.stream.take_error().ok().flatten().is_none() {
                            conn.outbound_state = OutboundState::Connected;
                            let event = WatchdogEvent::NewOutboundConnection { peer };
                            let now = unix_now();
                            let output = self.cluster.handle_event(event, now);
                            let pending = self.apply_output(output, Instant::now());
                            self.queue_pending.push(pending);
                        }
                    }
                }
            }
        }

        self.read_peer(peer, role);
    }

    fn read_peer(&mut self, peer: PrivateId, role: SocketRole) {
        let Some(conn) = self.connections.get_mut(&peer) else {
            return;
        };
        let socket = match role {
            SocketRole::Client => conn.client.as_mut(),
            SocketRole::Server => conn.server.as_mut(),
        };
        let Some(socket) = socket else { return };

        match socket.fill_read_buf() {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                self.tear_down_socket(peer, role);
                return;
            }
        }

        let mut frames = Vec::new();
        loop {
            let socket = match role {
                SocketRole::Client => conn.client.as_mut(),
                SocketRole::Server => conn.server.as_mut(),
            };
            let Some(socket) = socket else { break };
            match PeerFrame::decode(&mut socket.read_buf) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(e) => {
                    warn!(%peer, error = %e, "protocol error from peer, closing");
                    self.tear_down_socket(peer, role);
                    break;
                }
            }
        }

        for frame in frames {
            let now = unix_now();
            let event = WatchdogEvent::PacketReceived(IncomingPacket { from: peer, frame });
            let output = self.cluster.handle_event(event, now);
            let pending = self.apply_output(output, Instant::now());
            self.queue_pending.push(pending);
        }
    }

    fn tear_down_socket(&mut self, peer: PrivateId, role: SocketRole) {
        if let Some(conn) = self.connections.get_mut(&peer) {
            match role {
                SocketRole::Client => {
                    conn.client = None;
                    conn.outbound_state = OutboundState::Disconnected;
                }
                SocketRole::Server => conn.server = None,
            }
            if !conn.is_reachable() {
                let now = unix_now();
                let output = self
                    .cluster
                    .handle_event(WatchdogEvent::NodeConnectionLost { peer }, now);
                let pending = self.apply_output(output, Instant::now());
                self.queue_pending.push(pending);
            }
        }
    }

    fn send_frame_best_effort(&mut self, peer: PrivateId, frame: &PeerFrame) {
        if let Some(conn) = self.connections.get_mut(&peer) {
            if let Some(socket) = conn.preferred_write_socket_mut() {
                socket.enqueue(frame);
                let _ = socket.flush_write_buf();
            }
        }
    }

    // ---- IPC accept / read / respond (C9, §4.9, §6.3) -------------------------

    fn accept_ipc_loop(&mut self) -> Result<()> {
        loop {
            match self.ipc_listener.accept() {
                Ok((mut stream, _addr)) => {
                    let token = self.allocate_token();
                    self.poll
                        .registry()
                        .register(&mut stream, token, Interest::READABLE)?;
                    self.ipc_clients.insert(token, IpcClientConn::new(stream, token));
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn service_ipc_token(&mut self, token: Token) {
        let Some(conn) = self.ipc_clients.get_mut(&token) else {
            return;
        };

        match conn.fill_read_buf() {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                self.close_ipc_client(token);
                return;
            }
        }

        let mut requests = Vec::new();
        loop {
            let Some(conn) = self.ipc_clients.get_mut(&token) else { break };
            match IpcRequestFrame::decode(&mut conn.read_buf) {
                Ok(Some(frame)) => requests.push(frame),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "protocol error from ipc client, closing");
                    self.close_ipc_client(token);
                    break;
                }
            }
        }

        for request in requests {
            self.handle_ipc_request(token, request);
        }
    }

    fn handle_ipc_request(&mut self, token: Token, request: IpcRequestFrame) {
        let Some(cmd) = IpcCommandType::from_byte(request.type_byte) else {
            self.respond_ipc(token, IpcResponseFrame::new(ResultTag::Bad, b"unknown ipc command".to_vec()));
            return;
        };

        let now = unix_now();
        let result = self
            .ipc_handler
            .handle(cmd, &request.payload, &mut self.cluster, self.self_id, now);

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                let tag = if matches!(e, watchdog_ipc::IpcError::AuthFailed) {
                    ResultTag::Bad
                } else {
                    ResultTag::Bad
                };
                self.respond_ipc(token, IpcResponseFrame::new(tag, e.to_string().into_bytes()));
                return;
            }
        };

        let pending = self.apply_output(result.kernel_output, Instant::now());
        self.queue_pending.push(pending);

        match result.outcome {
            IpcOutcome::Respond(frame) => self.respond_ipc(token, frame),
            IpcOutcome::AwaitCommand(command_id) => {
                self.ipc_awaiting.insert(command_id, token);
            }
            IpcOutcome::Subscribe => {
                if let Some(conn) = self.ipc_clients.get_mut(&token) {
                    conn.subscribed = true;
                }
                self.respond_ipc(token, IpcResponseFrame::new(ResultTag::Ok, Vec::new()));
            }
        }
    }

    fn respond_ipc(&mut self, token: Token, frame: IpcResponseFrame) {
        let Some(conn) = self.ipc_clients.get_mut(&token) else {
            return;
        };
        conn.enqueue(&frame);
        if conn.flush_write_buf().is_err() {
            self.close_ipc_client(token);
            return;
        }
        if !conn.subscribed {
            self.close_ipc_client(token);
        }
    }

    fn close_ipc_client(&mut self, token: Token) {
        if let Some(mut conn) = self.ipc_clients.remove(&token) {
            self.poll.registry().deregister(&mut conn.stream).ok();
        }
    }

    /// Pushes a notification frame to every subscribed IPC client (§6.3).
    fn broadcast_ipc_notification(&mut self, notification: &Notification) {
        let Ok(body) = serde_json::to_vec(notification) else {
            return;
        };
        let frame = IpcResponseFrame::new(ResultTag::Ok, body);
        let subscribers: Vec<Token> = self
            .ipc_clients
            .iter()
            .filter(|(_, c)| c.subscribed)
            .map(|(t, _)| *t)
            .collect();
        for token in subscribers {
            if let Some(conn) = self.ipc_clients.get_mut(&token) {
                conn.enqueue(&frame);
                if conn.flush_write_buf().is_err() {
                    self.close_ipc_client(token);
                }
            }
        }
    }

    /// Answers any IPC client awaiting a deferred cluster command that
    /// just finalized (§3 "IPC Command Record").
    fn resolve_deferred_ipc(&mut self, command_id: u32, status: CommandStatus) {
        let Some(token) = self.ipc_awaiting.remove(&command_id) else {
            return;
        };
        let (tag, message): (ResultTag, &[u8]) = match status {
            CommandStatus::AllReplied => (ResultTag::Ok, b""),
            CommandStatus::Rejected => (ResultTag::Bad, b"rejected by peer"),
            CommandStatus::Timeout => (ResultTag::Timeout, b""),
            CommandStatus::SendFailed => (ResultTag::Bad, b"send failed"),
            CommandStatus::InProgress => return,
        };
        self.respond_ipc(token, IpcResponseFrame::new(tag, message.to_vec()));
    }

    // ---- per-tick maintenance (§4.3) --------------------------------------------

    fn maintain(&mut self) {
        let now_instant = Instant::now();
        let now = unix_now();

        self.escalation.poll();

        if let Some(escalate) = self.pending_vip {
            self.apply_vip_effect(escalate, now_instant);
        }

        // Reconnect disconnected outbound sockets past their cooldown,
        // skipping peers we've observed in SHUTDOWN (§4.2).
        let candidates: Vec<PrivateId> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.outbound_state == OutboundState::Disconnected)
            .filter(|(id, conn)| {
                conn.may_reconnect(now_instant, self.reconnect_cooldown)
                    && self
                        .cluster
                        .node_record(**id)
                        .map(|r| r.state != NodeState::Shutdown)
                        .unwrap_or(true)
            })
            .map(|(id, _)| *id)
            .collect();
        for peer in candidates {
            let _ = self.connect_outbound(peer);
        }

        // Cluster-command deadlines.
        for finished in self.tracker.drain_finalized(now_instant) {
            if finished.source == CommandSource::Ipc || self.ipc_awaiting.contains_key(&finished.command_id.0) {
                self.resolve_deferred_ipc(finished.command_id.0, finished.status);
            }
            let event = WatchdogEvent::CommandFinished {
                command_id: finished.command_id,
                status: finished.status,
            };
            let output = self.cluster.handle_event(event, now);
            let pending = self.apply_output(output, now_instant);
            self.queue_pending.push(pending);
        }

        // Liveness sweep: mark peers LOST if silent past the node-lost
        // bound (§4.3 "mark LOST if no reply within 5 s").
        let lost: Vec<PrivateId> = self
            .connections
            .keys()
            .copied()
            .filter(|id| {
                self.cluster
                    .node_record(*id)
                    .map(|r| {
                        r.state.is_active()
                            && now.saturating_sub(r.last_received) >= self.node_lost.as_secs()
                    })
                    .unwrap_or(false)
            })
            .collect();
        for peer in lost {
            let output = self
                .cluster
                .handle_event(WatchdogEvent::RemoteNodeLost { peer }, now);
            let pending = self.apply_output(output, now_instant);
            self.queue_pending.push(pending);
        }

        // Exit is only safe once shutdown was requested and the
        // escalation child, if any, has either exited or overstayed its
        // 5s grace window (§4.3, §4.10).
        if self.shutdown_requested
            && (!self.escalation.is_running() || self.escalation.wait_expired(now_instant))
        {
            self.exit_ready = true;
        }
    }

    // ---- output application ------------------------------------------------------

    fn apply_output(&mut self, output: watchdog_kernel::KernelOutput, now: Instant) -> PendingEffects {
        let mut pending = PendingEffects {
            notifications: Vec::new(),
            callbacks: Vec::new(),
        };

        for command in output.commands {
            self.dispatch_command(command, now);
        }

        for effect in output.effects {
            match effect {
                Effect::EscalateVip => self.apply_vip_effect(true, now),
                Effect::DeEscalateVip => self.apply_vip_effect(false, now),
                Effect::Exit => {
                    if self.cluster.is_escalated() {
                        self.escalation.de_escalate(now);
                    }
                    self.shutdown_requested = true;
                }
                Effect::NotifyIpc(notification) => {
                    self.broadcast_ipc_notification(&notification);
                    pending.notifications.push(notification);
                }
                callback => pending.callbacks.push(callback),
            }
        }

        pending
    }

    /// Forks the escalation/de-escalation program, but only once the
    /// opposite one isn't still running within its 5s grace window
    /// (§4.10, symmetric for both transitions). Otherwise records the
    /// fork as owed and `maintain` retries it once the window clears.
    fn apply_vip_effect(&mut self, escalate: bool, now: Instant) {
        if !self.escalation.is_running() || self.escalation.wait_expired(now) {
            if escalate {
                self.escalation.escalate(now);
            } else {
                self.escalation.de_escalate(now);
            }
            self.pending_vip = None;
        } else {
            self.pending_vip = Some(escalate);
        }
    }

    fn dispatch_command(&mut self, command: IssueCommand, now: Instant) {
        let targets: Vec<PrivateId> = match command.target {
            Target::One(peer) => vec![peer],
            Target::All => self.addrs.keys().copied().collect(),
            Target::AllExceptSource(source) => self
                .addrs
                .keys()
                .copied()
                .filter(|id| *id != source)
                .collect(),
        };

        let frame = PeerFrame::new(command.packet_type, command.command_id.0, command.payload);

        let mut tracked = TrackedCommand::new(
            command.command_id,
            command.source,
            &targets,
            Duration::from_secs(command.timeout_secs.max(1)),
            now,
        );

        for peer in &targets {
            let active = self
                .cluster
                .node_record(*peer)
                .map(watchdog_types::NodeRecord::is_active)
                .unwrap_or(false);
            if !active {
                tracked.mark_do_not_send(*peer);
                continue;
            }
            if let Some(conn) = self.connections.get_mut(peer) {
                if let Some(socket) = conn.preferred_write_socket_mut() {
                    socket.enqueue(&frame);
                    if socket.flush_write_buf().is_ok() {
                        tracked.mark_sent(*peer);
                        continue;
                    }
                }
            }
            tracked.mark_send_error(*peer);
        }

        if command.packet_type.expects_reply() {
            self.tracker.insert(tracked);
        }
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
