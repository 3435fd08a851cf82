//! Reed-switch debouncing.
//!
//! The magnet passes the switch once per revolution but the contacts
//! chatter for a few milliseconds. An edge is accepted only if it comes
//! strictly later than `window_ms` after the previously accepted one.

use super::counter::CycleCounter;
use crate::config::DEBOUNCE_WINDOW_MS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceFilter {
    window_ms: u64,
    /// Boot time counts as the first "accepted" edge, so the switch is
    /// ignored for one window after power-up.
    last_accepted_ms: u64,
}

impl DebounceFilter {
    pub const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_accepted_ms: 0,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn last_accepted_ms(&self) -> u64 {
        self.last_accepted_ms
    }

    /// Feed one raw edge seen at `now_ms`.
    ///
    /// Returns the new count if the edge was accepted, `None` if it was
    /// swallowed as bounce. Rejection is silent by design of the sensor.
    pub fn on_raw_event(&mut self, now_ms: u64, counter: &mut CycleCounter) -> Option<u32> {
        if now_ms > self.last_accepted_ms.saturating_add(self.window_ms) {
            self.last_accepted_ms = now_ms;
            Some(counter.increment())
        } else {
            None
        }
    }
}

impl Default for DebounceFilter {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW_MS)
    }
}
