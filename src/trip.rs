//! Trips - runs of pedalling separated by quiet periods.
//!
//! A trip starts with the first credited cycle and closes once no new
//! cycles have arrived for `quiet_ms`. Trips without a single cycle are
//! never reported.

use crate::config::TRIP_QUIET_MS;

/// A finished (or in-progress) trip. Times are caller-defined
/// milliseconds; the trip logger uses wall-clock Unix time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Trip {
    pub start_ms: u64,
    pub end_ms: u64,
    pub cycles: u64,
}

impl Trip {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

#[derive(Debug, Clone)]
pub struct TripRecorder {
    quiet_ms: u64,
    current: Option<Trip>,
}

impl TripRecorder {
    pub const fn new(quiet_ms: u64) -> Self {
        Self {
            quiet_ms,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Trip> {
        self.current.as_ref()
    }

    /// Credit `cycles` seen at `now_ms`.
    pub fn record(&mut self, cycles: u32, now_ms: u64) {
        if cycles == 0 {
            return;
        }
        let trip = self.current.get_or_insert(Trip {
            start_ms: now_ms,
            end_ms: now_ms,
            cycles: 0,
        });
        trip.cycles += u64::from(cycles);
        trip.end_ms = now_ms;
    }

    /// Close and return the trip if it has been quiet for too long.
    pub fn poll(&mut self, now_ms: u64) -> Option<Trip> {
        let trip = self.current.as_ref()?;
        if now_ms.saturating_sub(trip.end_ms) > self.quiet_ms {
            self.current.take()
        } else {
            None
        }
    }

    /// Close whatever is in progress (shutdown). The end time is the
    /// last credited cycle, not `now_ms`, unless that is earlier.
    pub fn finish(&mut self, now_ms: u64) -> Option<Trip> {
        self.current.take().map(|mut trip| {
            trip.end_ms = trip.end_ms.min(now_ms);
            trip
        })
    }
}

impl Default for TripRecorder {
    fn default() -> Self {
        Self::new(TRIP_QUIET_MS)
    }
}
