//! Logger metrics for observability
//!
//! Counters for monitoring transport health: how many records were
//! dispatched, how many sink writes failed and how many transports could
//! not be resolved or constructed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use transport_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dispatched();
/// metrics.record_write_failure();
///
/// assert_eq!(metrics.records_dispatched(), 1);
/// assert_eq!(metrics.write_failures(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records handed to the fan-out dispatcher
    records_dispatched: AtomicU64,

    /// Individual sink writes that returned an error or panicked
    write_failures: AtomicU64,

    /// Transport names that resolved to nothing
    resolution_failures: AtomicU64,

    /// Transports whose constructor failed
    construction_failures: AtomicU64,

    /// Records written through the exception sink
    exceptions_reported: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_dispatched: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            resolution_failures: AtomicU64::new(0),
            construction_failures: AtomicU64::new(0),
            exceptions_reported: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_dispatched(&self) -> u64 {
        self.records_dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn resolution_failures(&self) -> u64 {
        self.resolution_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn construction_failures(&self) -> u64 {
        self.construction_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn exceptions_reported(&self) -> u64 {
        self.exceptions_reported.load(Ordering::Relaxed)
    }

    /// Record a dispatched record
    ///
    /// Returns the previous count.
    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.records_dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_write_failure(&self) -> u64 {
        self.write_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_resolution_failure(&self) -> u64 {
        self.resolution_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_construction_failure(&self) -> u64 {
        self.construction_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_exception(&self) -> u64 {
        self.exceptions_reported.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of dispatched records that hit at least one failing write, in percent
    ///
    /// Only meaningful with a single sink; with several sinks one record can
    /// contribute several failures, so the value may exceed 100.
    pub fn failure_rate(&self) -> f64 {
        let dispatched = self.records_dispatched();
        if dispatched == 0 {
            return 0.0;
        }
        (self.write_failures() as f64 / dispatched as f64) * 100.0
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
