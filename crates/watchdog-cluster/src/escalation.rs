//! Escalation Supervisor (C10, §4.10).
//!
//! Forks the configured VIP-up / VIP-down programs and reconciles their
//! lifecycle with state transitions. No async runtime: the child is a
//! plain [`std::process::Child`], polled with `try_wait()` from the
//! event loop and reaped on `SIGCHLD` (§9 "the only external concurrency
//! is the forked escalation/de-escalation program").

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

pub struct EscalationSupervisor {
    escalation_command: Vec<String>,
    de_escalation_command: Vec<String>,
    child: Option<Child>,
    wait_deadline: Option<Instant>,
}

impl EscalationSupervisor {
    pub fn new(escalation_command: Vec<String>, de_escalation_command: Vec<String>) -> Self {
        Self {
            escalation_command,
            de_escalation_command,
            child: None,
            wait_deadline: None,
        }
    }

    /// Runs on `SIGCHLD` or at the top of every loop tick: reaps the
    /// child if it has exited and logs its status (§4.10 "no automatic
    /// restart").
    pub fn poll(&mut self) {
        if let Some(child) = &mut self.child {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!(?status, "escalation child exited");
                    self.child = None;
                    self.wait_deadline = None;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "failed to poll escalation child");
                }
            }
        }
    }

    /// True once the up-to-5s grace window for a still-running child has
    /// elapsed (§4.3, §4.10).
    pub fn wait_expired(&self, now: Instant) -> bool {
        match self.wait_deadline {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Starts the escalation (VIP-up) program (§4.10 "on entering
    /// COORDINATOR with quorum ≥ 0"). No-op if unconfigured.
    pub fn escalate(&mut self, now: Instant) {
        self.spawn(self.escalation_command.clone(), now, "escalation");
    }

    /// Starts the de-escalation (VIP-down) program.
    pub fn de_escalate(&mut self, now: Instant) {
        self.spawn(self.de_escalation_command.clone(), now, "de-escalation");
    }

    fn spawn(&mut self, argv: Vec<String>, now: Instant, kind: &'static str) {
        let Some((program, args)) = argv.split_first() else {
            return;
        };
        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                info!(%kind, pid = child.id(), "spawned {kind} program");
                self.child = Some(child);
                self.wait_deadline = Some(now + Duration::from_secs(5));
            }
            Err(e) => {
                warn!(%kind, error = %e, "failed to spawn {kind} program");
            }
        }
    }
}
