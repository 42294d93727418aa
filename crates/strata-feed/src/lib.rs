//! Market data feed publisher.
//!
//! Publishes top-of-book snapshots of a [`ConcurrentOrderBook`] as UDP
//! datagrams, in text or binary form.
//!
//! [`ConcurrentOrderBook`]: strata_core::ConcurrentOrderBook

pub mod publisher;

pub use publisher::{
    snapshot, FeedError, Publisher, PublisherConfig, PublisherStats, SnapshotFormat,
};
