use std::io;

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("socket i/o: {0}")]
    Io(#[from] io::Error),

    #[error("invalid socket address {0:?}")]
    InvalidAddress(String),

    /// Socket was shut down.
    #[error("socket is inactive")]
    Inactive,

    /// Receive saw no datagram before its timeout.
    #[error("receive timed out")]
    Timeout,

    /// Send queue full.
    #[error("operation would block")]
    WouldBlock,

    #[error("receive timeout must be non-zero")]
    InvalidTimeout,
}

impl NetError {
    /// Whether the caller may simply retry later.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, NetError::Timeout | NetError::WouldBlock)
    }
}
