//! Inter-stage queues and shared shutdown state.
//!
//! Four MPMC FIFOs couple the pipeline stages: raw SAM lines awaiting parse,
//! finalized positions awaiting write, and the two free pools that recycle
//! line buffers and [`Position`] records so the hot path stays off the
//! allocator. A cooperative `working` flag plus a first-failure slot handle
//! shutdown; producers poll queue sizes for backpressure.

use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::errors::FgmethError;
use crate::position::Position;

/// Soft cap on `output_position_pool` enforced when materializing new
/// positions.
pub const OUTPUT_POOL_SOFT_CAP: usize = 10_000;

/// Gate on `output_position_pool` the dispatcher waits under before a
/// chromosome or block flush.
pub const OUTPUT_POOL_FLUSH_GATE: usize = 100_000;

/// Per-worker soft cap factor on `line_pool`.
pub const LINE_POOL_CAP_PER_WORKER: usize = 1000;

/// Sleep applied while spinning on a soft cap.
pub const BACKPRESSURE_SLEEP: Duration = Duration::from_micros(1);

/// Shared queues and run state for one pileup.
pub struct Channels {
    /// Raw SAM record lines awaiting a worker.
    pub line_pool: SegQueue<Vec<u8>>,
    /// Recycled line buffers.
    pub free_line_pool: SegQueue<Vec<u8>>,
    /// Recycled position records.
    pub free_position_pool: SegQueue<Position>,
    /// Finalized positions awaiting the writer, in retirement order.
    pub output_position_pool: SegQueue<Position>,
    working: AtomicBool,
    failure: Mutex<Option<FgmethError>>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    #[must_use]
    pub fn new() -> Self {
        Self {
            line_pool: SegQueue::new(),
            free_line_pool: SegQueue::new(),
            free_position_pool: SegQueue::new(),
            output_position_pool: SegQueue::new(),
            working: AtomicBool::new(true),
            failure: Mutex::new(None),
        }
    }

    /// True while the pipeline should keep running.
    pub fn working(&self) -> bool {
        self.working.load(Ordering::Acquire)
    }

    /// Begins cooperative shutdown; workers and the writer exit on their
    /// next loop iteration.
    pub fn shut_down(&self) {
        self.working.store(false, Ordering::Release);
    }

    /// Records the first failure and begins shutdown.
    pub fn fail(&self, error: FgmethError) {
        let mut slot = self.failure.lock();
        if slot.is_none() {
            *slot = Some(error);
        }
        drop(slot);
        self.shut_down();
    }

    /// True if any stage recorded a failure.
    pub fn failed(&self) -> bool {
        self.failure.lock().is_some()
    }

    /// Takes the recorded failure, if any.
    pub fn take_failure(&self) -> Option<FgmethError> {
        self.failure.lock().take()
    }

    /// Pops a recycled line buffer or allocates a fresh one.
    pub fn fetch_line_buffer(&self) -> Vec<u8> {
        self.free_line_pool.pop().unwrap_or_default()
    }

    /// Clears and returns a line buffer to the free pool.
    pub fn recycle_line(&self, mut line: Vec<u8>) {
        line.clear();
        self.free_line_pool.push(line);
    }

    /// Pops a recycled position or allocates a fresh one, first waiting out
    /// the output-pool soft cap so the writer keeps up with materialization.
    pub fn fetch_position(&self) -> Position {
        while self.output_position_pool.len() >= OUTPUT_POOL_SOFT_CAP && self.working() {
            std::thread::sleep(BACKPRESSURE_SLEEP);
        }
        self.free_position_pool.pop().unwrap_or_default()
    }

    /// Resets and returns a position to the free pool.
    pub fn recycle_position(&self, mut position: Position) {
        position.reset();
        self.free_position_pool.push(position);
    }
}
