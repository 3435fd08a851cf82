//! Broadcast state machine.
//!
//! Runs once per main-loop tick and decides whether a datagram goes out:
//!
//! 1. On the reconnect edge (link was down last tick, is up now) a single
//!    `Reset` is sent and nothing else happens this tick.
//! 2. Otherwise, if more than one heartbeat interval has passed since the
//!    last send, an `Update` goes out even if nothing changed.
//! 3. Otherwise, if the count is dirty, an `Update` goes out.
//!
//! Sends are fire-and-forget. Bookkeeping (sequence, dirty flag,
//! timestamp) advances whether or not the datagram made it; a lost packet
//! is corrected by the next heartbeat.

use core::net::Ipv4Addr;

use super::protocol::Message;
use super::Transport;
use crate::config::HEARTBEAT_INTERVAL_MS;
use crate::counting::CycleCounter;
use crate::error::TransportError;

/// Link state as seen by the broadcaster (previous tick's sample).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// What a tick did. Returned so the caller can log it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Nothing to send (or no link).
    Idle,
    /// Datagram handed to the transport.
    Sent(Message),
    /// Link dropped between the tick's sample and the send; nothing went
    /// out but the message was accounted for.
    Skipped(Message),
    /// Transport refused the datagram; accounted for anyway.
    Failed(Message, TransportError),
}

impl TickOutcome {
    /// The message this tick accounted for, if any.
    pub fn message(&self) -> Option<&Message> {
        match self {
            TickOutcome::Idle => None,
            TickOutcome::Sent(m) | TickOutcome::Skipped(m) | TickOutcome::Failed(m, _) => Some(m),
        }
    }
}

pub struct BroadcastStateMachine {
    link: LinkState,
    heartbeat_ms: u64,
    /// Packets attempted since boot; the first one carries 1.
    sequence: u32,
    last_broadcast_ms: u64,
    /// Sampled on every reconnect edge.
    target: Option<Ipv4Addr>,
}

impl BroadcastStateMachine {
    pub const fn new(heartbeat_ms: u64) -> Self {
        Self {
            link: LinkState::Disconnected,
            heartbeat_ms,
            sequence: 0,
            last_broadcast_ms: 0,
            target: None,
        }
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn is_connected(&self) -> bool {
        self.link == LinkState::Connected
    }

    /// Sequence number of the most recent send attempt (0 before the first).
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn last_broadcast_ms(&self) -> u64 {
        self.last_broadcast_ms
    }

    /// Broadcast address sampled at the last reconnect.
    pub fn target(&self) -> Option<Ipv4Addr> {
        self.target
    }

    /// One scheduling step.
    pub async fn tick<T: Transport>(
        &mut self,
        now_ms: u64,
        counter: &mut CycleCounter,
        transport: &mut T,
    ) -> TickOutcome {
        if !transport.is_connected() {
            self.link = LinkState::Disconnected;
            return TickOutcome::Idle;
        }

        if self.link == LinkState::Disconnected {
            self.link = LinkState::Connected;
            self.target = Some(transport.local_broadcast_address());
            let message = Message::reset(self.next_sequence(), counter.current());
            return self.send(message, now_ms, counter, transport).await;
        }

        let heartbeat_due = now_ms > self.last_broadcast_ms.saturating_add(self.heartbeat_ms);
        if heartbeat_due || counter.is_dirty() {
            let message = Message::update(self.next_sequence(), counter.current());
            return self.send(message, now_ms, counter, transport).await;
        }

        TickOutcome::Idle
    }

    fn next_sequence(&mut self) -> u32 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    async fn send<T: Transport>(
        &mut self,
        message: Message,
        now_ms: u64,
        counter: &mut CycleCounter,
        transport: &mut T,
    ) -> TickOutcome {
        counter.clear_dirty();
        self.last_broadcast_ms = now_ms;

        let Some(to) = self.target else {
            return TickOutcome::Skipped(message);
        };
        if !transport.is_connected() {
            return TickOutcome::Skipped(message);
        }

        match transport.send_broadcast(to, &message.encode()).await {
            Ok(()) => TickOutcome::Sent(message),
            Err(TransportError::Disconnected) => TickOutcome::Skipped(message),
            Err(e) => TickOutcome::Failed(message, e),
        }
    }
}

impl Default for BroadcastStateMachine {
    fn default() -> Self {
        Self::new(HEARTBEAT_INTERVAL_MS)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════
