//! Property tests: random single-threaded operation sequences checked
//! against a plain sequential model after every step.

use std::collections::HashMap;

use proptest::prelude::*;

use strata_core::{BookConfig, BookError, ConcurrentOrderBook, OrderId, Price, Quantity, Side};

const MIN: i64 = -20;
const MAX: i64 = 20;

#[derive(Clone, Debug)]
enum Op {
    Add { id: u64, price: i64, qty: i64, buy: bool },
    Cancel { id: u64 },
    Modify { id: u64, qty: i64 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u64..40, MIN - 3..=MAX + 3, -2i64..50, any::<bool>())
            .prop_map(|(id, price, qty, buy)| Op::Add { id, price, qty, buy }),
        2 => (0u64..40).prop_map(|id| Op::Cancel { id }),
        2 => (0u64..40, -2i64..50).prop_map(|(id, qty)| Op::Modify { id, qty }),
    ]
}

#[derive(Default)]
struct Model {
    orders: HashMap<u64, (Side, i64, i64)>,
}

impl Model {
    fn apply(&mut self, op: &Op) -> Result<(), BookError> {
        match *op {
            Op::Add { id, price, qty, buy } => {
                if qty <= 0 {
                    return Err(BookError::InvalidQuantity { quantity: Quantity(qty) });
                }
                if !(MIN..=MAX).contains(&price) {
                    return Err(BookError::OutOfRange {
                        price: Price(price),
                        min: Price(MIN),
                        max: Price(MAX),
                    });
                }
                if self.orders.contains_key(&id) {
                    return Err(BookError::DuplicateId(OrderId(id)));
                }
                let side = if buy { Side::Buy } else { Side::Sell };
                self.orders.insert(id, (side, price, qty));
                Ok(())
            }
            Op::Cancel { id } => self
                .orders
                .remove(&id)
                .map(|_| ())
                .ok_or(BookError::NotFound(OrderId(id))),
            Op::Modify { id, qty } => {
                if qty <= 0 {
                    return Err(BookError::InvalidQuantity { quantity: Quantity(qty) });
                }
                match self.orders.get_mut(&id) {
                    Some(entry) => {
                        entry.2 = qty;
                        Ok(())
                    }
                    None => Err(BookError::NotFound(OrderId(id))),
                }
            }
        }
    }

    fn quantity_at(&self, price: i64, side: Side) -> i64 {
        self.orders
            .values()
            .filter(|(s, p, _)| *s == side && *p == price)
            .map(|(_, _, q)| q)
            .sum()
    }

    fn best(&self, side: Side) -> Option<Price> {
        let prices = self.orders.values().filter(|(s, _, _)| *s == side).map(|(_, p, _)| *p);
        match side {
            Side::Buy => prices.max(),
            Side::Sell => prices.min(),
        }
        .map(Price)
    }
}

proptest! {
    #[test]
    fn book_matches_sequential_model(ops in proptest::collection::vec(op(), 1..200)) {
        let book = ConcurrentOrderBook::new(BookConfig::new(Price(MIN), Price(MAX))).unwrap();
        let mut model = Model::default();

        for op in &ops {
            let expected = model.apply(op);
            let actual = match *op {
                Op::Add { id, price, qty, buy } => {
                    let side = if buy { Side::Buy } else { Side::Sell };
                    book.add_order(OrderId(id), Price(price), Quantity(qty), side)
                }
                Op::Cancel { id } => book.cancel_order(OrderId(id)).map(|_| ()),
                Op::Modify { id, qty } => book.modify_order(OrderId(id), Quantity(qty)),
            };
            prop_assert_eq!(actual, expected, "op {:?}", op);

            for side in [Side::Buy, Side::Sell] {
                prop_assert_eq!(book.best(side), model.best(side));
                for p in MIN..=MAX {
                    prop_assert_eq!(book.quantity_at(Price(p), side).0, model.quantity_at(p, side));
                }
            }
            prop_assert_eq!(book.order_count(), model.orders.len());
        }
    }
}

/// Side-generic best accessor for the property above.
trait BestOf {
    fn best(&self, side: Side) -> Option<Price>;
}

impl BestOf for ConcurrentOrderBook {
    fn best(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.best_bid(),
            Side::Sell => self.best_ask(),
        }
    }
}
