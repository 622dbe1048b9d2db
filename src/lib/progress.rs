//! Progress tracking utilities
//!
//! A thread-safe progress tracker for logging throughput at regular
//! intervals while the dispatcher scans alignment records.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::logging::format_count;

/// Thread-safe progress tracker for logging progress at regular intervals.
///
/// Maintains an internal count and logs a message each time the count
/// crosses an interval boundary. Safe to use from multiple threads.
///
/// # Example
/// ```
/// use fgmeth_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Dispatched records").with_interval(100);
///
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // Logs at 100, 200
/// }
/// tracker.log_final(); // Logs "Dispatched records 250 (complete)"
/// ```
pub struct ProgressTracker {
    /// The logging interval - progress is logged when count crosses multiples of this.
    interval: u64,
    /// Message prefix for log output.
    message: String,
    /// Internal count of items processed.
    count: AtomicU64,
}

impl ProgressTracker {
    /// Create a new progress tracker with the specified message.
    ///
    /// The tracker starts at 0 with a default interval of 1,000,000 records.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 1_000_000, message: message.into(), count: AtomicU64::new(0) }
    }

    /// Set the logging interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Add to the count and log if an interval boundary was crossed.
    ///
    /// Returns `true` if the final count landed exactly on an interval
    /// boundary (used by [`Self::log_final`] to avoid a duplicate line).
    pub fn log_if_needed(&self, additional: u64) -> bool {
        let previous = self.count.fetch_add(additional, Ordering::Relaxed);
        let current = previous + additional;

        let crossed = current / self.interval - previous / self.interval;
        if crossed > 0 {
            let boundary = (current / self.interval) * self.interval;
            info!("{} {}", self.message, format_count(boundary));
        }
        current % self.interval == 0
    }

    /// Current count.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Log the final count unless it landed exactly on an interval boundary.
    pub fn log_final(&self) {
        let current = self.count();
        if current % self.interval != 0 || current == 0 {
            info!("{} {} (complete)", self.message, format_count(current));
        }
    }
}
