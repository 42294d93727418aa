//! Binary message definitions.
//!
//! All messages use fixed-size layouts for zero-copy parsing.
//! Little-endian byte order is used throughout.

use bytemuck::{Pod, Zeroable};
use core::mem::size_of;

use crate::parser::ParseError;
use crate::text::{MarketUpdate, Quote};

/// Message type discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Top-of-book snapshot.
    BookSnapshot = 0x22,
    /// Liveness ping with no payload.
    Heartbeat = 0xFE,
}

impl TryFrom<u8> for MessageType {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, ParseError> {
        match value {
            0x22 => Ok(MessageType::BookSnapshot),
            0xFE => Ok(MessageType::Heartbeat),
            other => Err(ParseError::InvalidMessageType(other)),
        }
    }
}

/// Header flag: bid fields are populated.
pub const FLAG_HAS_BID: u8 = 0x01;
/// Header flag: ask fields are populated.
pub const FLAG_HAS_ASK: u8 = 0x02;

/// Fixed-size message header (8 bytes).
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct MessageHeader {
    /// Message type.
    pub msg_type: u8,
    /// Message flags.
    pub flags: u8,
    /// Payload length (excluding header).
    pub length: u16,
    /// Sequence number.
    pub sequence: u32,
}

const _: () = assert!(size_of::<MessageHeader>() == 8);

// SAFETY: MessageHeader is plain-old-data with no padding issues
unsafe impl Pod for MessageHeader {}
unsafe impl Zeroable for MessageHeader {}

impl MessageHeader {
    /// Create a new header.
    pub const fn new(msg_type: u8, flags: u8, length: u16, sequence: u32) -> Self {
        Self {
            msg_type,
            flags,
            length,
            sequence,
        }
    }

    /// Heartbeat header (no payload).
    pub const fn heartbeat(sequence: u32) -> Self {
        Self::new(MessageType::Heartbeat as u8, 0, 0, sequence)
    }

    /// Get total message size (header + payload).
    pub const fn total_size(&self) -> usize {
        size_of::<Self>() + self.length as usize
    }
}

/// Book snapshot message (48 bytes).
///
/// Price and quantity fields of an absent side are zero; the header flags
/// say which sides are present.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C, packed)]
pub struct SnapshotMessage {
    pub header: MessageHeader,      // 8 bytes
    pub symbol_id: u32,             // 4 bytes
    pub _padding: u32,              // 4 bytes
    pub bid_price: i64,             // 8 bytes (fixed-point ticks)
    pub bid_qty: i64,               // 8 bytes
    pub ask_price: i64,             // 8 bytes
    pub ask_qty: i64,               // 8 bytes
}

const _: () = assert!(size_of::<SnapshotMessage>() == 48);

unsafe impl Pod for SnapshotMessage {}
unsafe impl Zeroable for SnapshotMessage {}

impl SnapshotMessage {
    /// Payload length written into the header.
    pub const PAYLOAD_LEN: u16 = (size_of::<Self>() - size_of::<MessageHeader>()) as u16;

    /// Build from a snapshot.
    pub fn new(sequence: u32, symbol_id: u32, update: &MarketUpdate) -> Self {
        let mut flags = 0;
        let (bid_price, bid_qty) = match update.bid {
            Some(q) => {
                flags |= FLAG_HAS_BID;
                (q.price, q.quantity)
            }
            None => (0, 0),
        };
        let (ask_price, ask_qty) = match update.ask {
            Some(q) => {
                flags |= FLAG_HAS_ASK;
                (q.price, q.quantity)
            }
            None => (0, 0),
        };

        Self {
            header: MessageHeader::new(
                MessageType::BookSnapshot as u8,
                flags,
                Self::PAYLOAD_LEN,
                sequence,
            ),
            symbol_id,
            _padding: 0,
            bid_price,
            bid_qty,
            ask_price,
            ask_qty,
        }
    }

    /// Decode back into a snapshot.
    pub fn to_update(&self) -> MarketUpdate {
        // Copy out of the packed struct before use.
        let flags = self.header.flags;
        let (bid_price, bid_qty) = (self.bid_price, self.bid_qty);
        let (ask_price, ask_qty) = (self.ask_price, self.ask_qty);

        MarketUpdate {
            bid: (flags & FLAG_HAS_BID != 0).then_some(Quote { price: bid_price, quantity: bid_qty }),
            ask: (flags & FLAG_HAS_ASK != 0).then_some(Quote { price: ask_price, quantity: ask_qty }),
        }
    }
}
