use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

use tracing::debug;

use crate::ports::{DatagramTransport, NetworkError, TransportProvider};

/// Largest datagram read from the socket; anything past the caller's
/// buffer is discarded on read.
const RECV_BUFFER_SIZE: usize = 65_536;

// ============================================================================
// UdpTransport - Production UDP Socket
// ============================================================================

/// Non-blocking IPv4 UDP endpoint.
///
/// `poll_incoming` receives the next datagram into an internal buffer and
/// reports its length; `read_datagram` hands it out and clears it.
/// Broadcast sends are enabled on bind.
///
/// Sockets bind `0.0.0.0:<port>` without `SO_REUSEADDR`, so only one
/// endpoint per host can hold a given port. Two processes subscribing to the
/// same multicast topic on one host collide: the second bind fails with
/// `BindFailed` and the attach is rejected. Give co-located nodes distinct
/// ports.
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    recv_buf: Vec<u8>,
    pending: Option<usize>,
}

impl UdpTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            socket: None,
            recv_buf: vec![0; RECV_BUFFER_SIZE],
            pending: None,
        }
    }

    fn open_socket(local_port: u16) -> std::io::Result<UdpSocket> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, local_port))?;
        socket.set_nonblocking(true)?;
        socket.set_broadcast(true)?;
        Ok(socket)
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_port", &self.local_port())
            .field("pending", &self.pending)
            .finish()
    }
}

impl DatagramTransport for UdpTransport {
    fn bind(&mut self, local_port: u16) -> Result<(), NetworkError> {
        if self.socket.is_some() {
            return Err(NetworkError::BindFailed { port: local_port });
        }
        let socket = Self::open_socket(local_port).map_err(|e| {
            debug!(port = local_port, error = %e, "udp bind failed");
            NetworkError::BindFailed { port: local_port }
        })?;
        self.socket = Some(socket);
        Ok(())
    }

    fn bind_multicast(&mut self, group: Ipv4Addr, local_port: u16) -> Result<(), NetworkError> {
        if !group.is_multicast() {
            return Err(NetworkError::InvalidAddress);
        }
        self.bind(local_port)?;
        if let Err(e) = self.join_multicast_group(group) {
            self.close();
            return Err(e);
        }
        Ok(())
    }

    fn join_multicast_group(&mut self, group: Ipv4Addr) -> Result<(), NetworkError> {
        if !group.is_multicast() {
            return Err(NetworkError::InvalidAddress);
        }
        let socket = self.socket.as_ref().ok_or(NetworkError::NotBound)?;
        socket
            .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
            .map_err(|e| {
                debug!(%group, error = %e, "multicast join failed");
                NetworkError::Unsupported
            })
    }

    fn send_datagram(&mut self, destination: SocketAddrV4, payload: &[u8]) -> Result<(), NetworkError> {
        let socket = self.socket.as_ref().ok_or(NetworkError::NotBound)?;
        match socket.send_to(payload, destination) {
            Ok(sent) if sent == payload.len() => Ok(()),
            Ok(_) => Err(NetworkError::SendFailed),
            Err(e) => {
                debug!(%destination, error = %e, "udp send failed");
                Err(NetworkError::SendFailed)
            }
        }
    }

    fn poll_incoming(&mut self) -> Option<usize> {
        if self.pending.is_some() {
            return self.pending;
        }
        let socket = self.socket.as_ref()?;
        match socket.recv_from(&mut self.recv_buf) {
            Ok((len, _from)) => {
                self.pending = Some(len);
                self.pending
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                debug!(error = %e, "udp receive failed");
                None
            }
        }
    }

    fn read_datagram(&mut self, buf: &mut [u8]) -> usize {
        if self.pending.is_none() {
            self.poll_incoming();
        }
        let Some(len) = self.pending.take() else {
            return 0;
        };
        let copied = len.min(buf.len());
        buf[..copied].copy_from_slice(&self.recv_buf[..copied]);
        copied
    }

    fn local_port(&self) -> Option<u16> {
        self.socket
            .as_ref()
            .and_then(|socket| socket.local_addr().ok())
            .map(|addr| addr.port())
    }

    fn close(&mut self) {
        self.socket = None;
        self.pending = None;
    }
}

/// Opens a fresh [`UdpTransport`] per endpoint. The link is assumed up.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransportProvider;

impl UdpTransportProvider {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TransportProvider for UdpTransportProvider {
    fn open(&self) -> Box<dyn DatagramTransport> {
        Box::new(UdpTransport::new())
    }
}
