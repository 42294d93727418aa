//! Multi-threaded stress tests for the order book.
//!
//! Every test drives one shared book from several threads, joins them, and
//! then checks the quiescent invariants against the registry's view.
//!
//! ```bash
//! cargo test --release -p strata-core --test concurrency -- --nocapture
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use strata_core::{BookConfig, BookError, ConcurrentOrderBook, OrderId, Price, Quantity, Side};

const THREADS: usize = 8;

fn shared_book(min: i64, max: i64) -> Arc<ConcurrentOrderBook> {
    Arc::new(ConcurrentOrderBook::new(BookConfig::new(Price(min), Price(max))).unwrap())
}

/// Check aggregates and best prices against the live orders.
fn assert_quiescent_invariants(book: &ConcurrentOrderBook) {
    let mut expected: BTreeMap<(u8, i64), i64> = BTreeMap::new();
    for order in book.orders() {
        assert!(order.quantity.is_positive(), "order {} has non-positive quantity", order.id);
        *expected.entry((order.side as u8, order.price.0)).or_default() += order.quantity.0;
    }

    let config = *book.config();
    for p in config.min_price.0..=config.max_price.0 {
        for side in [Side::Buy, Side::Sell] {
            let want = expected.get(&(side as u8, p)).copied().unwrap_or(0);
            assert_eq!(
                book.quantity_at(Price(p), side),
                Quantity(want),
                "aggregate mismatch at {side} {p}"
            );
        }
    }

    let best_bid = expected
        .keys()
        .filter(|(s, _)| *s == Side::Buy as u8)
        .map(|(_, p)| Price(*p))
        .max();
    let best_ask = expected
        .keys()
        .filter(|(s, _)| *s == Side::Sell as u8)
        .map(|(_, p)| Price(*p))
        .min();
    assert_eq!(book.best_bid(), best_bid, "best bid mismatch");
    assert_eq!(book.best_ask(), best_ask, "best ask mismatch");
}

#[test]
fn concurrent_modifies_lose_no_updates() {
    let book = shared_book(0, 999);
    let shared = OrderId(1_000_000);
    book.add_order(shared, Price(500), Quantity(1), Side::Buy).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let book = Arc::clone(&book);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let own = OrderId(t as u64);
                book.add_order(own, Price(500), Quantity(10), Side::Buy).unwrap();
                barrier.wait();
                for i in 1..=2_000i64 {
                    book.modify_order(own, Quantity(i % 97 + 1)).unwrap();
                    book.modify_order(shared, Quantity((i * (t as i64 + 3)) % 50 + 1)).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let total: i64 = book.orders().iter().map(|o| o.quantity.0).sum();
    assert_eq!(book.quantity_at(Price(500), Side::Buy), Quantity(total));
    assert_eq!(book.stats().modifies, (THREADS * 2 * 2_000) as u64);
    assert_quiescent_invariants(&book);
}

#[test]
fn concurrent_modify_against_cancel_and_readd_same_ids() {
    // Modifiers hammer ids that one thread keeps cancelling and re-adding
    // into the same bucket. Whatever interleaving wins, the bucket must end
    // with each id linked once and the aggregate equal to the live sum.
    const IDS: u64 = 200;
    const ROUNDS: usize = 20;
    let price = Price(50);
    let book = shared_book(0, 99);
    for id in 0..IDS {
        book.add_order(OrderId(id), price, Quantity(10), Side::Buy).unwrap();
    }

    for round in 0..ROUNDS {
        let stop = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Barrier::new(THREADS));

        let modifiers: Vec<_> = (0..THREADS - 1)
            .map(|t| {
                let (book, stop, barrier) = (Arc::clone(&book), Arc::clone(&stop), Arc::clone(&barrier));
                thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64((round * THREADS + t) as u64);
                    barrier.wait();
                    while !stop.load(Ordering::Acquire) {
                        let id = OrderId(rng.gen_range(0..IDS));
                        match book.modify_order(id, Quantity(rng.gen_range(1..=50))) {
                            Ok(()) | Err(BookError::NotFound(_)) => {}
                            Err(e) => panic!("unexpected error {e}"),
                        }
                    }
                })
            })
            .collect();

        let churner = {
            let (book, stop, barrier) = (Arc::clone(&book), Arc::clone(&stop), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                for id in 0..IDS {
                    let info = book.cancel_order(OrderId(id)).unwrap();
                    assert_eq!(info.price, price);
                    book.add_order(OrderId(id), price, Quantity(10), Side::Buy).unwrap();
                }
                stop.store(true, Ordering::Release);
            })
        };

        churner.join().unwrap();
        for h in modifiers {
            h.join().unwrap();
        }

        let live: i64 = book.orders().iter().map(|o| o.quantity.0).sum();
        assert_eq!(book.quantity_at(price, Side::Buy), Quantity(live), "round {round}");
        assert_eq!(book.orders_at(price, Side::Buy).len(), IDS as usize, "round {round}");
        assert_eq!(book.order_count(), IDS as usize);
        assert_eq!(book.best_bid(), Some(price));
    }
    assert_quiescent_invariants(&book);
}

#[test]
fn concurrent_double_cancel_succeeds_once() {
    let book = shared_book(0, 99);
    let orders = 5_000u64;
    for id in 0..orders {
        let side = if id % 2 == 0 { Side::Buy } else { Side::Sell };
        book.add_order(OrderId(id), Price((id % 100) as i64), Quantity(3), side).unwrap();
    }

    let ok = Arc::new(AtomicUsize::new(0));
    let not_found = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let (book, ok, not_found) = (Arc::clone(&book), Arc::clone(&ok), Arc::clone(&not_found));
            thread::spawn(move || {
                for id in 0..orders {
                    match book.cancel_order(OrderId(id)) {
                        Ok(_) => ok.fetch_add(1, Ordering::Relaxed),
                        Err(BookError::NotFound(_)) => not_found.fetch_add(1, Ordering::Relaxed),
                        Err(e) => panic!("unexpected error {e}"),
                    };
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(ok.load(Ordering::Relaxed), orders as usize);
    assert_eq!(not_found.load(Ordering::Relaxed), 3 * orders as usize);
    assert!(book.is_empty());
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.best_ask(), None);
    assert_quiescent_invariants(&book);
}

#[test]
fn concurrent_churn_preserves_invariants() {
    let book = shared_book(-100, 99);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let book = Arc::clone(&book);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(0x5eed + t as u64);
                let base = (t as u64) << 32;
                let mut live: Vec<OrderId> = Vec::new();
                let mut next = 0u64;
                barrier.wait();

                for _ in 0..20_000 {
                    match rng.gen_range(0..10) {
                        0..=4 => {
                            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                            // Bids cluster low, asks high, with overlap near zero.
                            let price = match side {
                                Side::Buy => rng.gen_range(-100..=20),
                                Side::Sell => rng.gen_range(-20..=99),
                            };
                            let id = OrderId(base | next);
                            next += 1;
                            book.add_order(id, Price(price), Quantity(rng.gen_range(1..=100)), side)
                                .unwrap();
                            live.push(id);
                        }
                        5..=7 if !live.is_empty() => {
                            let id = live.swap_remove(rng.gen_range(0..live.len()));
                            book.cancel_order(id).unwrap();
                        }
                        8 if !live.is_empty() => {
                            let id = live[rng.gen_range(0..live.len())];
                            book.modify_order(id, Quantity(rng.gen_range(1..=100))).unwrap();
                        }
                        _ => {
                            // Readers must never see a torn or negative aggregate.
                            if let Some(bid) = book.best_bid() {
                                assert!(book.quantity_at(bid, Side::Buy).0 >= 0);
                            }
                            let _ = book.depth(Side::Sell, 5);
                        }
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_quiescent_invariants(&book);

    // Drain everything and make sure both sides end empty.
    for order in book.orders() {
        book.cancel_order(order.id).unwrap();
    }
    assert!(book.is_empty());
    assert_quiescent_invariants(&book);
}

#[test]
fn concurrent_top_of_book_exhaustion() {
    // Every thread repeatedly adds and cancels at the top of the same side,
    // forcing overlapping best-price repairs.
    let book = shared_book(0, 199);
    book.add_order(OrderId(u64::MAX), Price(10), Quantity(1), Side::Buy).unwrap();
    book.add_order(OrderId(u64::MAX - 1), Price(190), Quantity(1), Side::Sell).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let book = Arc::clone(&book);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..5_000u64 {
                    let id = OrderId(((t as u64) << 32) | i);
                    let offset = (i % 40) as i64;
                    let (side, price) = if t % 2 == 0 {
                        (Side::Buy, Price(100 + offset))
                    } else {
                        (Side::Sell, Price(101 + offset))
                    };
                    book.add_order(id, price, Quantity(5), side).unwrap();
                    book.cancel_order(id).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(book.best_bid(), Some(Price(10)));
    assert_eq!(book.best_ask(), Some(Price(190)));
    assert_quiescent_invariants(&book);
}
