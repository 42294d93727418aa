//! Multi-threaded add/modify/cancel/query workload against one book.

use std::collections::BTreeMap;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use quanta::Clock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use strata_core::{BookConfig, BookStats, ConcurrentOrderBook, OrderId, Price, Quantity, Side};
use strata_metrics::{BookOp, OpLatency};

pub struct StressConfig {
    pub min_price: i64,
    pub max_price: i64,
    pub threads: usize,
    pub ops_per_thread: u64,
    pub seed: u64,
}

pub struct StressReport {
    pub threads: usize,
    pub total_ops: u64,
    pub elapsed: Duration,
    pub latency: OpLatency,
    pub stats: BookStats,
    pub resting: usize,
    /// Cancels or modifies of a worker's own live id that failed, plus
    /// panicked workers. Any of these is a book defect.
    pub failures: u64,
    pub invariants_hold: bool,
}

impl StressReport {
    pub fn passed(&self) -> bool {
        self.failures == 0 && self.invariants_hold
    }

    pub fn print(&self) {
        let rate = self.total_ops as f64 / self.elapsed.as_secs_f64();
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║                       STRESS SUMMARY                         ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║  Threads:         {:>12}                               ║", self.threads);
        println!("║  Operations:      {:>12}                               ║", self.total_ops);
        println!("║  Elapsed:         {:>12.2?}                               ║", self.elapsed);
        println!("║  Rate:            {:>12.0} ops/sec                       ║", rate);
        println!("║  Resting orders:  {:>12}                               ║", self.resting);
        println!("║  Best recomputes: {:>12}                               ║", self.stats.recomputes);
        println!("║  Failures:        {:>12}                               ║", self.failures);
        println!("╚══════════════════════════════════════════════════════════════╝");
        self.latency.print_summary("   ");
        println!();
        if self.passed() {
            println!("✅ PASS: aggregates and best prices match resting orders");
        } else if self.failures > 0 {
            println!("❌ FAIL: {} operations on live orders failed", self.failures);
        } else {
            println!("❌ FAIL: book state diverged from resting orders");
        }
    }
}

/// Run the workload and check the quiescent invariants afterwards.
pub fn run(config: &StressConfig) -> Result<StressReport, strata_core::BookError> {
    let book = Arc::new(ConcurrentOrderBook::new(BookConfig::new(
        Price(config.min_price),
        Price(config.max_price),
    ))?);
    let barrier = Arc::new(Barrier::new(config.threads));
    let clock = Clock::new();

    println!(
        "Stress: {} threads x {} ops over [{}, {}]...",
        config.threads, config.ops_per_thread, config.min_price, config.max_price
    );

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let book = Arc::clone(&book);
            let barrier = Arc::clone(&barrier);
            let latency = OpLatency::with_clock(clock.clone());
            let (min, max) = (config.min_price, config.max_price);
            let ops = config.ops_per_thread;
            let seed = config.seed.wrapping_add(t as u64);
            thread::spawn(move || {
                barrier.wait();
                worker(&book, t as u64, seed, ops, (min, max), latency)
            })
        })
        .collect();

    let mut latency = OpLatency::with_clock(clock);
    let mut failures = 0;
    for h in handles {
        match h.join() {
            Ok((local, failed)) => {
                failures += failed;
                if let Err(e) = latency.merge(&local) {
                    warn!(error = %e, "latency merge failed");
                }
            }
            Err(_) => {
                warn!("stress worker panicked");
                failures += 1;
            }
        }
    }
    let elapsed = start.elapsed();

    Ok(StressReport {
        threads: config.threads,
        total_ops: latency.total(),
        elapsed,
        latency,
        stats: book.stats(),
        resting: book.order_count(),
        failures,
        invariants_hold: check_invariants(&book),
    })
}

fn worker(
    book: &ConcurrentOrderBook,
    thread_id: u64,
    seed: u64,
    ops: u64,
    (min, max): (i64, i64),
    mut latency: OpLatency,
) -> (OpLatency, u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = thread_id << 32;
    let span = max.saturating_sub(min);
    let mid = min.saturating_add(span / 2);
    let band = (span / 8).max(1);
    let mut live: Vec<OrderId> = Vec::new();
    let mut next = 0u64;
    let mut failures = 0u64;

    for _ in 0..ops {
        match rng.gen_range(0..20) {
            0..=9 => {
                let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                // Bids below the middle, asks above, overlapping by one band.
                let price = match side {
                    Side::Buy => rng.gen_range(
                        mid.saturating_sub(2 * band).max(min)..=mid.saturating_add(band).min(max),
                    ),
                    Side::Sell => rng.gen_range(
                        mid.saturating_sub(band).max(min)..=mid.saturating_add(2 * band).min(max),
                    ),
                };
                let id = OrderId(base | next);
                next += 1;
                let qty = Quantity(rng.gen_range(1..=100));
                let result = latency.time(BookOp::Add, || book.add_order(id, Price(price), qty, side));
                match result {
                    Ok(()) => live.push(id),
                    Err(e) => debug!(%id, error = %e, "add rejected"),
                }
            }
            10..=14 if !live.is_empty() => {
                let id = live.swap_remove(rng.gen_range(0..live.len()));
                if let Err(e) = latency.time(BookOp::Cancel, || book.cancel_order(id)) {
                    warn!(%id, error = %e, "cancel of live order failed");
                    failures += 1;
                }
            }
            15..=16 if !live.is_empty() => {
                let id = live[rng.gen_range(0..live.len())];
                let qty = Quantity(rng.gen_range(1..=100));
                if let Err(e) = latency.time(BookOp::Modify, || book.modify_order(id, qty)) {
                    warn!(%id, error = %e, "modify of live order failed");
                    failures += 1;
                }
            }
            _ => {
                let _ = latency.time(BookOp::Query, || {
                    let bid = book.best_bid().map(|p| book.quantity_at(p, Side::Buy));
                    let ask = book.best_ask().map(|p| book.quantity_at(p, Side::Sell));
                    (bid, ask)
                });
            }
        }
    }

    (latency, failures)
}

/// Compare bucket aggregates and best prices with the resting orders.
pub fn check_invariants(book: &ConcurrentOrderBook) -> bool {
    let mut expected: BTreeMap<(usize, i64), i64> = BTreeMap::new();
    for order in book.orders() {
        if !order.quantity.is_positive() {
            warn!(id = %order.id, "resting order with non-positive quantity");
            return false;
        }
        *expected.entry((order.side.index(), order.price.ticks())).or_default() +=
            order.quantity.as_raw();
    }

    let config = *book.config();
    let mut ok = true;
    for side in [Side::Buy, Side::Sell] {
        for p in config.min_price.ticks()..=config.max_price.ticks() {
            let want = expected.get(&(side.index(), p)).copied().unwrap_or(0);
            let got = book.quantity_at(Price(p), side);
            if got.as_raw() != want {
                warn!(%side, price = p, got = %got, want, "aggregate mismatch");
                ok = false;
            }
        }

        let prices = expected
            .keys()
            .filter(|(s, _)| *s == side.index())
            .map(|(_, p)| Price(*p));
        let want = match side {
            Side::Buy => prices.max(),
            Side::Sell => prices.min(),
        };
        let got = match side {
            Side::Buy => book.best_bid(),
            Side::Sell => book.best_ask(),
        };
        if got != want {
            warn!(%side, ?got, ?want, "best price mismatch");
            ok = false;
        }
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_stress_run_holds_invariants() {
        let report = run(&StressConfig {
            min_price: -50,
            max_price: 49,
            threads: 4,
            ops_per_thread: 2_000,
            seed: 7,
        })
        .unwrap();

        assert!(report.invariants_hold);
        assert_eq!(report.failures, 0);
        assert!(report.passed());
        assert_eq!(report.total_ops, 4 * 2_000);
        assert!(report.stats.adds > 0);
    }

    #[test]
    fn test_failed_operations_fail_the_report() {
        let mut report = StressReport {
            threads: 1,
            total_ops: 1,
            elapsed: Duration::from_millis(1),
            latency: OpLatency::new(),
            stats: BookStats::default(),
            resting: 0,
            failures: 0,
            invariants_hold: true,
        };
        assert!(report.passed());

        report.failures = 1;
        assert!(!report.passed());

        report.failures = 0;
        report.invariants_hold = false;
        assert!(!report.passed());
    }
}
