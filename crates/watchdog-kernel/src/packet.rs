//! Inbound/outbound packet shapes the kernel trades with its runtime.
//!
//! The kernel never touches a socket; it only ever sees a decoded
//! [`watchdog_wire::PeerFrame`] that the runtime has already pulled off the
//! wire (§4.1), tagged with who sent it.

use watchdog_types::PrivateId;
use watchdog_wire::PeerFrame;

#[derive(Debug, Clone)]
pub struct IncomingPacket {
    pub from: PrivateId,
    pub frame: PeerFrame,
}
