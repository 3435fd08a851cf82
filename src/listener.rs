//! Receive side of the broadcast - turns a stream of counter messages
//! into "new cycles since last time".
//!
//! Listeners join at any point, and the device may reboot or reconnect
//! at any point, so the absolute count is never trusted on its own. The
//! tracker re-baselines on every `Reset`, on the first packet it sees,
//! and after a long silence; after that only count deltas matter.

use crate::config::PACKET_RESET_MS;
use crate::net::{Message, MessageKind};

/// How one received message was treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Received {
    /// Tracker re-baselined on this message; no cycles credited.
    Baseline,
    /// In-order message. `missed` is the number of sequence numbers
    /// skipped since the previous one (lost datagrams).
    Accepted { missed: u32 },
    /// Older than the last accepted sequence; ignored.
    Stale,
}

#[derive(Debug, Clone)]
pub struct PacketTracker {
    reset_after_ms: u64,
    /// `None` until the first message arrives.
    last_received_ms: Option<u64>,
    last_seq: u32,
    last_count: u32,
    processed_count: u32,
}

impl PacketTracker {
    pub const fn new(reset_after_ms: u64) -> Self {
        Self {
            reset_after_ms,
            last_received_ms: None,
            last_seq: 0,
            last_count: 0,
            processed_count: 0,
        }
    }

    pub fn last_seq(&self) -> u32 {
        self.last_seq
    }

    pub fn last_count(&self) -> u32 {
        self.last_count
    }

    /// Account for one message received at `now_ms`.
    pub fn receive(&mut self, message: &Message, now_ms: u64) -> Received {
        let silent_too_long = match self.last_received_ms {
            None => true,
            Some(t) => now_ms.saturating_sub(t) > self.reset_after_ms,
        };

        if silent_too_long || message.kind == MessageKind::Reset {
            self.last_received_ms = Some(now_ms);
            self.last_seq = message.seq;
            self.last_count = message.count;
            self.processed_count = message.count;
            return Received::Baseline;
        }

        if message.seq < self.last_seq {
            return Received::Stale;
        }

        let missed = message.seq.saturating_sub(self.last_seq).saturating_sub(1);
        self.last_received_ms = Some(now_ms);
        self.last_seq = message.seq;
        self.last_count = message.count;
        Received::Accepted { missed }
    }

    /// Cycles received but not yet handed out. Marks them handed out.
    ///
    /// A count that went backwards without a reset (device rebooted and
    /// our reset was lost) yields nothing and re-baselines.
    pub fn take_new_cycles(&mut self) -> u32 {
        let new = self.last_count.saturating_sub(self.processed_count);
        self.processed_count = self.last_count;
        new
    }
}

impl Default for PacketTracker {
    fn default() -> Self {
        Self::new(PACKET_RESET_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_packet_is_a_baseline() {
        let mut tracker = PacketTracker::new(5_000);
        assert_eq!(tracker.receive(&Message::update(200, 57), 0), Received::Baseline);
        assert_eq!(tracker.take_new_cycles(), 0);
    }

    #[test]
    fn deltas_are_credited_once() {
        let mut tracker = PacketTracker::new(5_000);
        tracker.receive(&Message::reset(1, 10), 0);
        tracker.receive(&Message::update(2, 11), 500);
        tracker.receive(&Message::update(3, 13), 900);
        assert_eq!(tracker.take_new_cycles(), 3);
        assert_eq!(tracker.take_new_cycles(), 0);

        // Heartbeat with unchanged count.
        tracker.receive(&Message::update(4, 13), 1_900);
        assert_eq!(tracker.take_new_cycles(), 0);
    }

    #[test]
    fn reset_rebaselines_without_crediting() {
        let mut tracker = PacketTracker::new(5_000);
        tracker.receive(&Message::reset(1, 0), 0);
        tracker.receive(&Message::update(2, 4), 100);

        // Device rebooted: sequence and count start over.
        assert_eq!(tracker.receive(&Message::reset(1, 0), 200), Received::Baseline);
        assert_eq!(tracker.take_new_cycles(), 0);
        tracker.receive(&Message::update(2, 1), 300);
        assert_eq!(tracker.take_new_cycles(), 1);
    }

    #[test]
    fn long_silence_rebaselines() {
        let mut tracker = PacketTracker::new(5_000);
        tracker.receive(&Message::reset(1, 0), 0);
        assert_eq!(tracker.receive(&Message::update(9, 40), 5_001), Received::Baseline);
        assert_eq!(tracker.take_new_cycles(), 0);
    }

    #[test]
    fn stale_packets_are_ignored() {
        let mut tracker = PacketTracker::new(5_000);
        tracker.receive(&Message::reset(1, 0), 0);
        tracker.receive(&Message::update(5, 3), 100);
        assert_eq!(tracker.receive(&Message::update(4, 2), 150), Received::Stale);
        assert_eq!(tracker.last_seq(), 5);
        assert_eq!(tracker.take_new_cycles(), 3);
    }

    #[test]
    fn sequence_gaps_are_reported() {
        let mut tracker = PacketTracker::new(5_000);
        tracker.receive(&Message::reset(1, 0), 0);
        assert_eq!(
            tracker.receive(&Message::update(2, 1), 10),
            Received::Accepted { missed: 0 }
        );
        assert_eq!(
            tracker.receive(&Message::update(5, 4), 20),
            Received::Accepted { missed: 2 }
        );
        // Duplicate sequence is accepted but misses nothing.
        assert_eq!(
            tracker.receive(&Message::update(5, 4), 30),
            Received::Accepted { missed: 0 }
        );
    }

    #[test]
    fn backwards_count_credits_nothing() {
        let mut tracker = PacketTracker::new(5_000);
        tracker.receive(&Message::reset(1, 50), 0);
        tracker.receive(&Message::update(2, 3), 100);
        assert_eq!(tracker.take_new_cycles(), 0);
        tracker.receive(&Message::update(3, 5), 200);
        assert_eq!(tracker.take_new_cycles(), 2);
    }
}
