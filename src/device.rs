//! The counter device as one value.
//!
//! `Device` owns every piece of mutable state - count, dirty flag,
//! debounce timestamp, packet sequence, link edge tracking. It is built
//! once at startup and driven from the main loop: drain edges, then tick.

use crate::counting::{CycleCounter, DebounceFilter, EdgeConsumer};
use crate::net::{BroadcastStateMachine, TickOutcome, Transport};

pub struct Device {
    counter: CycleCounter,
    debounce: DebounceFilter,
    broadcaster: BroadcastStateMachine,
}

impl Device {
    pub const fn new(debounce_ms: u64, heartbeat_ms: u64) -> Self {
        Self {
            counter: CycleCounter::new(),
            debounce: DebounceFilter::new(debounce_ms),
            broadcaster: BroadcastStateMachine::new(heartbeat_ms),
        }
    }

    /// Feed one raw switch edge. Returns the new count if it was accepted.
    pub fn on_raw_event(&mut self, now_ms: u64) -> Option<u32> {
        self.debounce.on_raw_event(now_ms, &mut self.counter)
    }

    /// Debounce every queued edge. Returns how many were accepted.
    pub fn drain(&mut self, edges: &mut EdgeConsumer<'_>) -> u32 {
        let mut accepted = 0;
        while let Some(edge) = edges.pop() {
            if self.on_raw_event(edge.at_ms).is_some() {
                accepted += 1;
            }
        }
        accepted
    }

    /// One broadcast decision.
    pub async fn tick<T: Transport>(&mut self, now_ms: u64, transport: &mut T) -> TickOutcome {
        self.broadcaster
            .tick(now_ms, &mut self.counter, transport)
            .await
    }

    pub fn count(&self) -> u32 {
        self.counter.current()
    }

    pub fn is_dirty(&self) -> bool {
        self.counter.is_dirty()
    }

    pub fn is_connected(&self) -> bool {
        self.broadcaster.is_connected()
    }

    pub fn broadcaster(&self) -> &BroadcastStateMachine {
        &self.broadcaster
    }
}

impl Default for Device {
    fn default() -> Self {
        Self {
            counter: CycleCounter::new(),
            debounce: DebounceFilter::default(),
            broadcaster: BroadcastStateMachine::default(),
        }
    }
}
