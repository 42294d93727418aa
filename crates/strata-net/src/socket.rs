//! UDP socket with explicit lifecycle.
//!
//! The socket is created through socket2 so buffer sizes can be applied
//! before the first datagram, then handed to mio. The descriptor is always
//! non-blocking at the OS level:
//! - sends never wait; a full send queue is reported as `WouldBlock`
//! - receives wait for readiness up to the caller's timeout
//!
//! All I/O methods take `&self`; one socket can be shared between a
//! publishing thread and any number of receiving threads.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use mio::net::UdpSocket;
use mio::{Events, Interest, Poll, Token};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use crate::error::NetError;
use crate::sink::DatagramSink;

/// Receive timeout used by [`DatagramSocket::receive_default`].
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(100);

const READABLE: Token = Token(0);

/// Options applied at bind time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SocketOptions {
    /// Initial value of [`DatagramSocket::is_nonblocking`].
    pub nonblocking: bool,
    /// `SO_RCVBUF` request in bytes; the kernel may round it.
    pub recv_buffer_size: Option<usize>,
    /// `SO_SNDBUF` request in bytes.
    pub send_buffer_size: Option<usize>,
}

/// Readiness wait state; one receiver polls at a time.
struct Waiter {
    poll: Poll,
    events: Events,
}

/// Bound UDP socket with a default destination.
pub struct DatagramSocket {
    socket: UdpSocket,
    /// Second handle on the same descriptor for socket-level options.
    options: Socket,
    waiter: Mutex<Waiter>,
    destination: SocketAddr,
    active: AtomicBool,
    nonblocking: AtomicBool,
}

fn resolve(addr: &str) -> Result<SocketAddr, NetError> {
    addr.to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| NetError::InvalidAddress(addr.to_owned()))
}

impl DatagramSocket {
    /// Bind with default options.
    pub fn bind(addr: &str) -> Result<Self, NetError> {
        Self::bind_with(addr, SocketOptions::default())
    }

    /// Bind and apply `options` before any I/O.
    ///
    /// The destination starts as the bound address, so a socket that is
    /// never given a peer sends to itself.
    pub fn bind_with(addr: &str, options: SocketOptions) -> Result<Self, NetError> {
        let addr = resolve(addr)?;

        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        if let Some(size) = options.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }
        if let Some(size) = options.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;

        let handle = socket.try_clone()?;
        let mut socket = UdpSocket::from_std(socket.into());
        let poll = Poll::new()?;
        poll.registry().register(&mut socket, READABLE, Interest::READABLE)?;

        let local = socket.local_addr()?;
        debug!(%local, ?options, "datagram socket bound");

        Ok(Self {
            socket,
            options: handle,
            waiter: Mutex::new(Waiter {
                poll,
                events: Events::with_capacity(4),
            }),
            destination: local,
            active: AtomicBool::new(true),
            nonblocking: AtomicBool::new(options.nonblocking),
        })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.socket.local_addr()?)
    }

    #[inline]
    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Set where [`send`](Self::send) delivers.
    pub fn set_destination(&mut self, addr: &str) -> Result<(), NetError> {
        self.destination = resolve(addr)?;
        debug!(destination = %self.destination, "datagram destination set");
        Ok(())
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    #[inline]
    fn ensure_active(&self) -> Result<(), NetError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(NetError::Inactive)
        }
    }

    /// Send one datagram to the configured destination.
    #[inline]
    pub fn send(&self, payload: &[u8]) -> Result<usize, NetError> {
        self.send_to(payload, self.destination)
    }

    /// Send one datagram to `dest` without waiting.
    ///
    /// A full send queue returns [`NetError::WouldBlock`] in either mode.
    pub fn send_to(&self, payload: &[u8], dest: SocketAddr) -> Result<usize, NetError> {
        self.ensure_active()?;
        loop {
            match self.socket.send_to(payload, dest) {
                Ok(n) => return Ok(n),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(NetError::WouldBlock)
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Read one queued datagram, `None` if nothing is queued.
    fn try_recv(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, NetError> {
        loop {
            match self.socket.recv_from(buf) {
                Ok(received) => return Ok(Some(received)),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Receive one datagram, waiting at most `timeout` for one to arrive.
    ///
    /// The wait is bounded by `timeout` in both blocking and non-blocking
    /// mode; no datagram in time is [`NetError::Timeout`]. Datagrams longer
    /// than `buf` are truncated.
    pub fn receive(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(usize, SocketAddr), NetError> {
        self.ensure_active()?;
        if timeout.is_zero() {
            return Err(NetError::InvalidTimeout);
        }
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(received) = self.try_recv(buf)? {
                return Ok(received);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let mut waiter = match self.waiter.try_lock_for(remaining) {
                Some(waiter) if !remaining.is_zero() => waiter,
                _ => return Err(NetError::Timeout),
            };

            // Another receiver may have consumed the readiness event for a
            // datagram that is still queued.
            if let Some(received) = self.try_recv(buf)? {
                return Ok(received);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(NetError::Timeout);
            }
            let Waiter { poll, events } = &mut *waiter;
            match poll.poll(events, Some(remaining)) {
                Ok(()) => {}
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// [`receive`](Self::receive) with [`DEFAULT_RECV_TIMEOUT`].
    #[inline]
    pub fn receive_default(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), NetError> {
        self.receive(buf, DEFAULT_RECV_TIMEOUT)
    }

    /// Record the caller's blocking preference.
    ///
    /// I/O behaves the same in both modes: sends never wait and receives
    /// wait up to their timeout.
    pub fn set_nonblocking(&self, enabled: bool) {
        self.nonblocking.store(enabled, Ordering::Release);
        debug!(enabled, "datagram socket non-blocking mode");
    }

    #[inline]
    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking.load(Ordering::Acquire)
    }

    pub fn set_recv_buffer_size(&self, size: usize) -> Result<(), NetError> {
        self.options.set_recv_buffer_size(size)?;
        Ok(())
    }

    pub fn recv_buffer_size(&self) -> Result<usize, NetError> {
        Ok(self.options.recv_buffer_size()?)
    }

    pub fn set_send_buffer_size(&self, size: usize) -> Result<(), NetError> {
        self.options.set_send_buffer_size(size)?;
        Ok(())
    }

    pub fn send_buffer_size(&self) -> Result<usize, NetError> {
        Ok(self.options.send_buffer_size()?)
    }

    /// Mark the socket inactive. Later sends and receives fail with
    /// [`NetError::Inactive`]; the descriptor closes on drop.
    pub fn shutdown(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            debug!(local = ?self.socket.local_addr().ok(), "datagram socket shut down");
        }
    }
}

impl DatagramSink for DatagramSocket {
    #[inline]
    fn send_datagram(&self, payload: &[u8]) -> Result<usize, NetError> {
        self.send(payload)
    }
}

impl std::fmt::Debug for DatagramSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramSocket")
            .field("local", &self.socket.local_addr().ok())
            .field("destination", &self.destination)
            .field("active", &self.is_active())
            .finish()
    }
}
