//! Send capability used by publishers.

use std::sync::Arc;

use crate::error::NetError;

/// Something that accepts whole datagrams.
///
/// Implementations must not block indefinitely; a full send queue is
/// reported as [`NetError::WouldBlock`].
pub trait DatagramSink {
    /// Send one datagram, returning the number of bytes written.
    fn send_datagram(&self, payload: &[u8]) -> Result<usize, NetError>;
}

impl<T: DatagramSink + ?Sized> DatagramSink for &T {
    #[inline]
    fn send_datagram(&self, payload: &[u8]) -> Result<usize, NetError> {
        (**self).send_datagram(payload)
    }
}

impl<T: DatagramSink + ?Sized> DatagramSink for Arc<T> {
    #[inline]
    fn send_datagram(&self, payload: &[u8]) -> Result<usize, NetError> {
        (**self).send_datagram(payload)
    }
}
