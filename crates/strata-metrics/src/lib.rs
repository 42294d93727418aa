//! Latency tracking with HdrHistogram.
//!
//! Provides nanosecond-precision latency measurement per book operation.
//! Recorders are single-threaded; each worker keeps its own and the
//! results are merged once the workers are joined.

use hdrhistogram::Histogram;

pub mod op;

pub use op::{BookOp, LatencySummary, OpLatency};

/// Significant figures kept by every histogram.
const SIGFIG: u8 = 3;

/// Metrics errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("histogram merge failed: {0}")]
    Merge(#[from] hdrhistogram::AdditionError),
}

/// High-precision latency histogram.
#[derive(Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create a new auto-resizing histogram with 3 significant digits.
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new(SIGFIG).expect("SIGFIG is within 0..=5"),
        }
    }

    /// Record a latency value in nanoseconds.
    #[inline(always)]
    pub fn record(&mut self, nanos: u64) {
        // Auto-resizing histograms only reject values above u64 range.
        let _ = self.histogram.record(nanos);
    }

    /// Fold `other` into this histogram.
    pub fn merge(&mut self, other: &LatencyHistogram) -> Result<(), MetricsError> {
        self.histogram.add(&other.histogram)?;
        Ok(())
    }

    /// Get value at percentile (0.0 - 100.0).
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        self.histogram.value_at_quantile(percentile / 100.0)
    }

    pub fn p50(&self) -> u64 {
        self.value_at_percentile(50.0)
    }

    pub fn p99(&self) -> u64 {
        self.value_at_percentile(99.0)
    }

    pub fn p999(&self) -> u64 {
        self.value_at_percentile(99.9)
    }

    pub fn max(&self) -> u64 {
        self.histogram.max()
    }

    pub fn min(&self) -> u64 {
        self.histogram.min()
    }

    pub fn mean(&self) -> f64 {
        self.histogram.mean()
    }

    /// Get total count of recorded values.
    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    pub fn reset(&mut self) {
        self.histogram.reset();
    }

    /// Format latency with appropriate units.
    pub fn format_latency(nanos: u64) -> String {
        if nanos < 1_000 {
            format!("{} ns", nanos)
        } else if nanos < 1_000_000 {
            format!("{:.2} μs", nanos as f64 / 1_000.0)
        } else if nanos < 1_000_000_000 {
            format!("{:.2} ms", nanos as f64 / 1_000_000.0)
        } else {
            format!("{:.2} s", nanos as f64 / 1_000_000_000.0)
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}
