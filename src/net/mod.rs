//! Network side of the counter - wire format, transport seam and the
//! broadcast state machine.
//!
//! The core never owns a socket. Everything it needs from the network
//! stack goes through [`Transport`], implemented by the embassy-net
//! adapter on target, a host UDP socket in the simulator and a recording
//! mock in the tests.

pub mod broadcast;
pub mod protocol;

use core::net::Ipv4Addr;

use crate::error::TransportError;

pub use broadcast::{BroadcastStateMachine, LinkState, TickOutcome};
pub use protocol::{Message, MessageBuf, MessageKind};

/// What the broadcaster needs from the network stack.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Link up and an IPv4 configuration present.
    fn is_connected(&self) -> bool;

    /// Broadcast address of the local subnet. Only asked for while
    /// connected, once per reconnect.
    fn local_broadcast_address(&self) -> Ipv4Addr;

    /// Fire one datagram at `to` on the broadcast port.
    async fn send_broadcast(&mut self, to: Ipv4Addr, payload: &[u8]) -> Result<(), TransportError>;
}

/// Directed broadcast address for `addr` with the given prefix length.
///
/// A prefix of 32 (or more) leaves no host bits and yields `addr` itself;
/// a prefix of 0 is the limited broadcast address.
pub fn subnet_broadcast(addr: Ipv4Addr, prefix_len: u8) -> Ipv4Addr {
    let host_mask = match prefix_len {
        0 => u32::MAX,
        1..=31 => u32::MAX >> prefix_len,
        _ => 0,
    };
    Ipv4Addr::from(u32::from(addr) | host_mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_c_broadcast_sets_last_octet() {
        let ip = Ipv4Addr::new(10, 1, 50, 17);
        assert_eq!(subnet_broadcast(ip, 24), Ipv4Addr::new(10, 1, 50, 255));
    }

    #[test]
    fn wider_and_narrower_prefixes() {
        let ip = Ipv4Addr::new(192, 168, 5, 130);
        assert_eq!(subnet_broadcast(ip, 16), Ipv4Addr::new(192, 168, 255, 255));
        assert_eq!(subnet_broadcast(ip, 25), Ipv4Addr::new(192, 168, 5, 255));
        assert_eq!(subnet_broadcast(ip, 26), Ipv4Addr::new(192, 168, 5, 191));
    }

    #[test]
    fn degenerate_prefixes() {
        let ip = Ipv4Addr::new(172, 16, 0, 1);
        assert_eq!(subnet_broadcast(ip, 0), Ipv4Addr::BROADCAST);
        assert_eq!(subnet_broadcast(ip, 32), ip);
        assert_eq!(subnet_broadcast(ip, 40), ip);
    }
}
