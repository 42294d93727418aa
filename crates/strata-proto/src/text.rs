//! Delimited text form of a snapshot.
//!
//! `MARKET_UPDATE|BID=<price>,QTY=<qty>|ASK=<price>,QTY=<qty>`, with
//! `BID=NONE` / `ASK=NONE` for an empty side.

use core::fmt;
use core::str::FromStr;

use crate::parser::ParseError;

const TAG: &str = "MARKET_UPDATE";
const NONE: &str = "NONE";

/// Price and aggregate quantity at one side's best level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quote {
    pub price: i64,
    pub quantity: i64,
}

/// Top-of-book snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarketUpdate {
    pub bid: Option<Quote>,
    pub ask: Option<Quote>,
}

impl MarketUpdate {
    pub const fn new(bid: Option<Quote>, ask: Option<Quote>) -> Self {
        Self { bid, ask }
    }

    /// Encode as the text line.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

fn write_side(f: &mut fmt::Formatter<'_>, label: &str, quote: Option<Quote>) -> fmt::Result {
    match quote {
        Some(q) => write!(f, "{label}={},QTY={}", q.price, q.quantity),
        None => write!(f, "{label}={NONE}"),
    }
}

impl fmt::Display for MarketUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(TAG)?;
        f.write_str("|")?;
        write_side(f, "BID", self.bid)?;
        f.write_str("|")?;
        write_side(f, "ASK", self.ask)
    }
}

fn parse_side(field: &str, label: &str) -> Result<Option<Quote>, ParseError> {
    let malformed = || ParseError::MalformedText(field.to_owned());

    let body = field
        .strip_prefix(label)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or_else(malformed)?;
    if body == NONE {
        return Ok(None);
    }

    let (price, qty) = body.split_once(",QTY=").ok_or_else(malformed)?;
    Ok(Some(Quote {
        price: price.parse().map_err(|_| malformed())?,
        quantity: qty.parse().map_err(|_| malformed())?,
    }))
}

impl FromStr for MarketUpdate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.trim_end().split('|');
        if fields.next() != Some(TAG) {
            return Err(ParseError::MalformedText(s.to_owned()));
        }
        let (bid, ask) = match (fields.next(), fields.next(), fields.next()) {
            (Some(bid), Some(ask), None) => (bid, ask),
            _ => return Err(ParseError::MalformedText(s.to_owned())),
        };
        Ok(Self {
            bid: parse_side(bid, "BID")?,
            ask: parse_side(ask, "ASK")?,
        })
    }
}
