//! Per-operation latency recorder.

use core::fmt;

use quanta::Clock;

use crate::{LatencyHistogram, MetricsError};

/// Book operation being timed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BookOp {
    Add = 0,
    Cancel = 1,
    Modify = 2,
    Query = 3,
}

impl BookOp {
    pub const ALL: [BookOp; 4] = [BookOp::Add, BookOp::Cancel, BookOp::Modify, BookOp::Query];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            BookOp::Add => "add",
            BookOp::Cancel => "cancel",
            BookOp::Modify => "modify",
            BookOp::Query => "query",
        }
    }
}

impl fmt::Display for BookOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Percentiles of one operation, in nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub count: u64,
    pub p50: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={:<9} p50={:>10} p99={:>10} p99.9={:>10} max={:>10}",
            self.count,
            LatencyHistogram::format_latency(self.p50),
            LatencyHistogram::format_latency(self.p99),
            LatencyHistogram::format_latency(self.p999),
            LatencyHistogram::format_latency(self.max),
        )
    }
}

/// One histogram per [`BookOp`], timed against a quanta clock.
///
/// ```
/// use strata_metrics::{BookOp, OpLatency};
///
/// let mut latency = OpLatency::new();
/// let value = latency.time(BookOp::Query, || 2 + 2);
/// assert_eq!(value, 4);
/// assert_eq!(latency.summary(BookOp::Query).count, 1);
/// ```
#[derive(Clone)]
pub struct OpLatency {
    clock: Clock,
    histograms: [LatencyHistogram; 4],
}

impl OpLatency {
    /// New recorder with its own calibrated clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::new())
    }

    /// New recorder sharing `clock`. Calibration is per clock, so worker
    /// recorders should be built from one clone.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            histograms: Default::default(),
        }
    }

    /// Raw timestamp to pass to [`record_since`](Self::record_since).
    #[inline(always)]
    pub fn start(&self) -> u64 {
        self.clock.raw()
    }

    /// Record the time elapsed since `start` under `op`.
    #[inline(always)]
    pub fn record_since(&mut self, op: BookOp, start: u64) {
        let nanos = self.clock.delta_as_nanos(start, self.clock.raw());
        self.histograms[op.index()].record(nanos);
    }

    /// Run `f` and record how long it took.
    #[inline(always)]
    pub fn time<R>(&mut self, op: BookOp, f: impl FnOnce() -> R) -> R {
        let start = self.start();
        let out = f();
        self.record_since(op, start);
        out
    }

    #[inline]
    pub fn histogram(&self, op: BookOp) -> &LatencyHistogram {
        &self.histograms[op.index()]
    }

    /// Fold another recorder into this one.
    pub fn merge(&mut self, other: &OpLatency) -> Result<(), MetricsError> {
        for (mine, theirs) in self.histograms.iter_mut().zip(&other.histograms) {
            mine.merge(theirs)?;
        }
        Ok(())
    }

    pub fn summary(&self, op: BookOp) -> LatencySummary {
        let h = self.histogram(op);
        if h.is_empty() {
            return LatencySummary::default();
        }
        LatencySummary {
            count: h.count(),
            p50: h.p50(),
            p99: h.p99(),
            p999: h.p999(),
            max: h.max(),
        }
    }

    /// Total samples across all operations.
    pub fn total(&self) -> u64 {
        self.histograms.iter().map(LatencyHistogram::count).sum()
    }

    /// Print one line per operation that has samples.
    pub fn print_summary(&self, prefix: &str) {
        for op in BookOp::ALL {
            let summary = self.summary(op);
            if summary.count > 0 {
                println!("{prefix}{:<7} {summary}", op.name());
            }
        }
    }

    pub fn reset(&mut self) {
        self.histograms.iter_mut().for_each(LatencyHistogram::reset);
    }
}

impl Default for OpLatency {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ops_are_separate() {
        let mut latency = OpLatency::new();
        for _ in 0..10 {
            latency.time(BookOp::Add, || ());
        }
        latency.time(BookOp::Cancel, || ());

        assert_eq!(latency.summary(BookOp::Add).count, 10);
        assert_eq!(latency.summary(BookOp::Cancel).count, 1);
        assert_eq!(latency.summary(BookOp::Modify), LatencySummary::default());
        assert_eq!(latency.total(), 11);
    }

    #[test]
    fn test_mocked_clock_durations() {
        let (clock, mock) = Clock::mock();
        let mut latency = OpLatency::with_clock(clock);

        let start = latency.start();
        mock.increment(250);
        latency.record_since(BookOp::Modify, start);

        let summary = latency.summary(BookOp::Modify);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.max, 250);
        assert_eq!(summary.p50, 250);
    }

    #[test]
    fn test_merge_per_thread_recorders() {
        let clock = Clock::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = clock.clone();
                std::thread::spawn(move || {
                    let mut local = OpLatency::with_clock(clock);
                    for _ in 0..100 {
                        local.time(BookOp::Query, || ());
                    }
                    local
                })
            })
            .collect();

        let mut total = OpLatency::with_clock(clock);
        for h in handles {
            total.merge(&h.join().unwrap()).unwrap();
        }
        assert_eq!(total.summary(BookOp::Query).count, 400);

        total.reset();
        assert_eq!(total.total(), 0);
    }
}
