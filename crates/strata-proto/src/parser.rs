//! Zero-copy message parser.
//!
//! Uses bytemuck for safe transmutation from raw bytes.

use bytemuck::try_from_bytes;
use core::mem::size_of;
use thiserror::Error;

use crate::messages::*;
use crate::text::MarketUpdate;

/// Parse error types.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Buffer doesn't have enough bytes.
    #[error("buffer too small")]
    BufferTooSmall,
    /// Invalid message type in header.
    #[error("invalid message type 0x{0:02x}")]
    InvalidMessageType(u8),
    /// Buffer is not properly aligned.
    #[error("misaligned buffer")]
    MisalignedBuffer,
    /// Text line does not follow the market update format.
    #[error("malformed market update: {0:?}")]
    MalformedText(String),
}

/// Zero-copy message parser.
pub struct MessageParser;

impl MessageParser {
    /// Parse a message header from raw bytes.
    #[inline(always)]
    pub fn parse_header(buffer: &[u8]) -> Result<&MessageHeader, ParseError> {
        if buffer.len() < size_of::<MessageHeader>() {
            return Err(ParseError::BufferTooSmall);
        }

        try_from_bytes(&buffer[..size_of::<MessageHeader>()])
            .map_err(|_| ParseError::MisalignedBuffer)
    }

    /// Parse a snapshot message (zero-copy). Does not check the type byte.
    #[inline(always)]
    pub fn parse_snapshot(buffer: &[u8]) -> Result<&SnapshotMessage, ParseError> {
        if buffer.len() < size_of::<SnapshotMessage>() {
            return Err(ParseError::BufferTooSmall);
        }

        try_from_bytes(&buffer[..size_of::<SnapshotMessage>()])
            .map_err(|_| ParseError::MisalignedBuffer)
    }

    /// Determine message type and validate length.
    #[inline]
    pub fn validate_message(buffer: &[u8]) -> Result<(MessageType, usize), ParseError> {
        let header = Self::parse_header(buffer)?;

        // Copy fields out to avoid references into the packed struct
        let msg_type = MessageType::try_from(header.msg_type)?;
        let header_length = header.length;

        let expected_len = match msg_type {
            MessageType::BookSnapshot => size_of::<SnapshotMessage>(),
            MessageType::Heartbeat => size_of::<MessageHeader>() + header_length as usize,
        };

        if buffer.len() < expected_len {
            return Err(ParseError::BufferTooSmall);
        }

        Ok((msg_type, expected_len))
    }

    /// Validate and decode a snapshot datagram.
    pub fn decode_snapshot(buffer: &[u8]) -> Result<(u32, MarketUpdate), ParseError> {
        match Self::validate_message(buffer)? {
            (MessageType::BookSnapshot, _) => {
                let msg = Self::parse_snapshot(buffer)?;
                let sequence = msg.header.sequence;
                Ok((sequence, msg.to_update()))
            }
            (MessageType::Heartbeat, _) => Err(ParseError::InvalidMessageType(
                MessageType::Heartbeat as u8,
            )),
        }
    }
}

/// Message builder for outbound messages.
pub struct MessageBuilder {
    sequence: u32,
}

impl MessageBuilder {
    /// Create a new message builder.
    pub const fn new() -> Self {
        Self { sequence: 0 }
    }

    /// Get next sequence number.
    #[inline(always)]
    pub fn next_sequence(&mut self) -> u32 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    /// Build a snapshot message into a buffer.
    #[inline]
    pub fn build_snapshot(
        &mut self,
        buffer: &mut [u8],
        symbol_id: u32,
        update: &MarketUpdate,
    ) -> Result<usize, ParseError> {
        let size = size_of::<SnapshotMessage>();
        if buffer.len() < size {
            return Err(ParseError::BufferTooSmall);
        }

        let msg = SnapshotMessage::new(self.next_sequence(), symbol_id, update);
        buffer[..size].copy_from_slice(bytemuck::bytes_of(&msg));
        Ok(size)
    }

    /// Build a heartbeat into a buffer.
    #[inline]
    pub fn build_heartbeat(&mut self, buffer: &mut [u8]) -> Result<usize, ParseError> {
        let size = size_of::<MessageHeader>();
        if buffer.len() < size {
            return Err(ParseError::BufferTooSmall);
        }

        let header = MessageHeader::heartbeat(self.next_sequence());
        buffer[..size].copy_from_slice(bytemuck::bytes_of(&header));
        Ok(size)
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}
