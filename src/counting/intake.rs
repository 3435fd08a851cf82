//! Edge intake - the boundary between the sensor task and the main loop.
//!
//! The sensor side only ever pushes a timestamp into a lock-free
//! single-producer/single-consumer queue. It never touches the counter,
//! never logs and never allocates. The main loop drains the queue and
//! runs each edge through the debounce filter.

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::spsc::{Consumer, Producer, Queue};

use crate::config::EDGE_QUEUE_DEPTH;

/// One falling edge on the reed-switch input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeEvent {
    /// Milliseconds since boot at which the edge was observed.
    pub at_ms: u64,
}

/// Backing storage for the edge queue.
///
/// `heapless` keeps one slot free, so the queue holds
/// `EDGE_QUEUE_DEPTH - 1` unconsumed edges.
pub struct EdgeQueue {
    queue: Queue<EdgeEvent, EDGE_QUEUE_DEPTH>,
    dropped: AtomicU32,
}

impl EdgeQueue {
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Split into the sensor-side producer and main-loop consumer.
    pub fn split(&mut self) -> (EdgeProducer<'_>, EdgeConsumer<'_>) {
        let (producer, consumer) = self.queue.split();
        (
            EdgeProducer {
                inner: producer,
                dropped: &self.dropped,
            },
            EdgeConsumer {
                inner: consumer,
                dropped: &self.dropped,
            },
        )
    }
}

impl Default for EdgeQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Sensor-task handle.
pub struct EdgeProducer<'a> {
    inner: Producer<'a, EdgeEvent, EDGE_QUEUE_DEPTH>,
    dropped: &'a AtomicU32,
}

impl EdgeProducer<'_> {
    /// Queue an edge seen at `at_ms`. Never blocks.
    ///
    /// Returns `false` if the queue was full; the edge is dropped and
    /// counted.
    pub fn push(&mut self, at_ms: u64) -> bool {
        match self.inner.enqueue(EdgeEvent { at_ms }) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Main-loop handle.
pub struct EdgeConsumer<'a> {
    inner: Consumer<'a, EdgeEvent, EDGE_QUEUE_DEPTH>,
    dropped: &'a AtomicU32,
}

impl EdgeConsumer<'_> {
    pub fn pop(&mut self) -> Option<EdgeEvent> {
        self.inner.dequeue()
    }

    /// Edges lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Iterator for EdgeConsumer<'_> {
    type Item = EdgeEvent;

    fn next(&mut self) -> Option<EdgeEvent> {
        self.pop()
    }
}
