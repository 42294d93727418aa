//! Datagram transport for market data.
//!
//! Thin wrapper over a UDP socket built with socket2, plus the
//! [`DatagramSink`] capability publishers send through.

pub mod error;
pub mod sink;
pub mod socket;

pub use error::NetError;
pub use sink::DatagramSink;
pub use socket::{DatagramSocket, SocketOptions, DEFAULT_RECV_TIMEOUT};
