//! # Strata Core
//!
//! Concurrent limit order book.
//!
//! ## Design Principles
//! - Fixed-point arithmetic (no floats)
//! - One bucket per tick: collision-free, range-checked price indexing
//! - Lock-free inserts and queries; removal unlinks under a per-bucket lock
//! - Epoch-based reclamation for unlinked nodes
//! - O(1) cancel/modify through an id-keyed registry

pub mod fixed;
pub mod order;
pub mod error;
pub mod config;
pub mod index;
pub mod level;
pub mod registry;
pub mod best;
pub mod book;

pub use fixed::{Price, Quantity};
pub use order::{Order, OrderId, OrderInfo, Side};
pub use error::BookError;
pub use config::{BookConfig, MAX_LEVELS};
pub use index::PriceLevelIndexer;
pub use level::PriceLevelBucket;
pub use registry::{OrderLocation, OrderRegistry};
pub use best::BestPriceTracker;
pub use book::{BookStats, ConcurrentOrderBook, LevelSummary, MAX_DEPTH};
