//! Snapshot publisher.
//!
//! Reads the book only through its public queries, so publishing never
//! takes part in the book's synchronisation. Under concurrent mutation a
//! snapshot may pair a best price with the quantity of a slightly later
//! moment; each field is individually a value the book held.

use core::fmt::Write as _;

use strata_core::{ConcurrentOrderBook, Side};
use strata_net::{DatagramSink, NetError};
use strata_proto::{MarketUpdate, MessageBuilder, ParseError, Quote};
use tracing::{trace, warn};

const BUFFER_SIZE: usize = 512;

/// Feed errors.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Net(#[from] NetError),

    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] ParseError),
}

/// Wire form of published snapshots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// `MARKET_UPDATE|BID=..|ASK=..` line.
    #[default]
    Text,
    /// 48-byte `SnapshotMessage`.
    Binary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublisherConfig {
    pub format: SnapshotFormat,
    /// Skip an update identical to the last one sent.
    pub conflate: bool,
    /// Symbol written into binary snapshots.
    pub symbol_id: u32,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            format: SnapshotFormat::Text,
            conflate: false,
            symbol_id: 1,
        }
    }
}

/// Publisher counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublisherStats {
    pub published: u64,
    pub conflated: u64,
    /// Sends refused because the socket would block.
    pub dropped: u64,
}

/// Top-of-book snapshot read through the book's public queries.
pub fn snapshot(book: &ConcurrentOrderBook) -> MarketUpdate {
    let quote = |price: Option<strata_core::Price>, side: Side| {
        price.map(|p| Quote {
            price: p.ticks(),
            quantity: book.quantity_at(p, side).as_raw(),
        })
    };
    MarketUpdate {
        bid: quote(book.best_bid(), Side::Buy),
        ask: quote(book.best_ask(), Side::Sell),
    }
}

/// Market data publisher.
pub struct Publisher<S> {
    sink: S,
    config: PublisherConfig,
    builder: MessageBuilder,
    buffer: [u8; BUFFER_SIZE],
    text: String,
    last: Option<MarketUpdate>,
    stats: PublisherStats,
}

impl<S: DatagramSink> Publisher<S> {
    pub fn new(sink: S, config: PublisherConfig) -> Self {
        Self {
            sink,
            config,
            builder: MessageBuilder::new(),
            buffer: [0; BUFFER_SIZE],
            text: String::with_capacity(64),
            last: None,
            stats: PublisherStats::default(),
        }
    }

    /// Snapshot `book` and send it.
    ///
    /// Returns the update that went out, or `None` if it was conflated or
    /// dropped because the sink would block.
    pub fn publish(&mut self, book: &ConcurrentOrderBook) -> Result<Option<MarketUpdate>, FeedError> {
        self.publish_update(snapshot(book))
    }

    /// Send an already-built update.
    pub fn publish_update(&mut self, update: MarketUpdate) -> Result<Option<MarketUpdate>, FeedError> {
        if self.config.conflate && self.last == Some(update) {
            self.stats.conflated += 1;
            return Ok(None);
        }

        let result = match self.config.format {
            SnapshotFormat::Text => {
                self.text.clear();
                // Writing into a String cannot fail.
                let _ = write!(self.text, "{update}");
                self.sink.send_datagram(self.text.as_bytes())
            }
            SnapshotFormat::Binary => {
                let size = self
                    .builder
                    .build_snapshot(&mut self.buffer, self.config.symbol_id, &update)?;
                self.sink.send_datagram(&self.buffer[..size])
            }
        };

        match result {
            Ok(bytes) => {
                trace!(%update, bytes, "snapshot published");
                self.stats.published += 1;
                self.last = Some(update);
                Ok(Some(update))
            }
            Err(NetError::WouldBlock) => {
                self.stats.dropped += 1;
                warn!(%update, dropped = self.stats.dropped, "snapshot dropped: send would block");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Last update actually sent.
    pub fn last(&self) -> Option<MarketUpdate> {
        self.last
    }

    pub fn stats(&self) -> PublisherStats {
        self.stats
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
