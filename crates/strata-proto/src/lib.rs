//! Market-data snapshot protocol.
//!
//! Two encodings of the same top-of-book snapshot:
//! - a delimited text line, human readable, for loggers and simple consumers
//! - a fixed-size little-endian binary layout that parses without copying

pub mod messages;
pub mod parser;
pub mod text;

pub use messages::*;
pub use parser::*;
pub use text::{MarketUpdate, Quote};
