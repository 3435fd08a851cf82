//! Running cycle count with a "changed since last report" flag.

/// Pedal-revolution counter.
///
/// Only the debounced event path increments it; the broadcaster reads it
/// and clears the dirty flag once the new value has gone out.
///
/// The count is a `u32` and wraps on overflow. At one revolution every
/// 300 ms that is roughly 40 years of continuous pedalling, so wrap is a
/// documented limitation rather than something we handle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleCounter {
    count: u32,
    dirty: bool,
}

impl CycleCounter {
    pub const fn new() -> Self {
        Self {
            count: 0,
            dirty: false,
        }
    }

    /// Count one cycle, mark the counter dirty, return the new count.
    pub fn increment(&mut self) -> u32 {
        self.count = self.count.wrapping_add(1);
        self.dirty = true;
        self.count
    }

    pub fn current(&self) -> u32 {
        self.count
    }

    /// True when the count changed since the last broadcast attempt.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
