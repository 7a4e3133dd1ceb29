//! # Driven Ports (Outbound SPI)
//!
//! Capabilities the pub/sub core requires from its host: a datagram
//! transport, a link predicate, a monotonic clock with sleep, and a
//! configuration source.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use crate::domain::{NodeConfig, Timestamp};

pub use crate::domain::NetworkError;

/// One datagram endpoint, owned by a single publisher or subscriber.
///
/// All operations return immediately. Implementations deliver whole
/// datagrams: `poll_incoming` reports the length of the next pending
/// datagram and `read_datagram` consumes it.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct RadioTransport { radio: Radio }
///
/// impl DatagramTransport for RadioTransport {
///     fn bind(&mut self, local_port: u16) -> Result<(), NetworkError> {
///         self.radio.listen(local_port).map_err(|_| NetworkError::BindFailed { port: local_port })
///     }
///     // ...
/// }
/// ```
pub trait DatagramTransport: Send {
    /// Bind `local_port` for sending and receiving (0 = ephemeral).
    fn bind(&mut self, local_port: u16) -> Result<(), NetworkError>;

    /// Bind `local_port` with membership in `group` as one operation.
    ///
    /// Optional capability; callers fall back to `bind` plus
    /// `join_multicast_group` on `Unsupported`.
    fn bind_multicast(&mut self, _group: Ipv4Addr, _local_port: u16) -> Result<(), NetworkError> {
        Err(NetworkError::Unsupported)
    }

    /// Request membership in `group` on an already bound endpoint.
    fn join_multicast_group(&mut self, _group: Ipv4Addr) -> Result<(), NetworkError> {
        Err(NetworkError::Unsupported)
    }

    /// Send one datagram.
    fn send_datagram(&mut self, destination: SocketAddrV4, payload: &[u8]) -> Result<(), NetworkError>;

    /// Length of the next pending datagram, if any.
    fn poll_incoming(&mut self) -> Option<usize>;

    /// Consume the next pending datagram, copying at most `buf.len()` bytes.
    ///
    /// Bytes beyond `buf.len()` are discarded. Returns the number of bytes
    /// copied, 0 when nothing is pending.
    fn read_datagram(&mut self, buf: &mut [u8]) -> usize;

    /// Bound local port, if bound.
    fn local_port(&self) -> Option<u16>;

    /// Release the endpoint. Idempotent.
    fn close(&mut self);
}

/// Factory for transports plus the link-up predicate.
pub trait TransportProvider: Send + Sync {
    /// Fresh, unbound transport.
    fn open(&self) -> Box<dyn DatagramTransport>;

    /// Whether the network link is up.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Monotonic clock with a blocking sleep.
///
/// Only `Rate` calls `sleep`.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    fn sleep(&self, duration: Duration);
}

/// Source of node configuration.
pub trait ConfigProvider: Send + Sync {
    fn node_config(&self) -> NodeConfig;
}
