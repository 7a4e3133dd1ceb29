//! Test utilities for the pub/sub core.
//!
//! Deterministic stand-ins for the driven ports. Enable with the
//! `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use udp_pubsub::test_utils::ManualClock;
//! use udp_pubsub::{Clock, Timestamp};
//!
//! let clock = ManualClock::new(Timestamp::ZERO);
//! clock.advance(Duration::from_millis(5));
//! assert_eq!(clock.now().as_micros(), 5_000);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::domain::Timestamp;
use crate::ports::{Clock, DatagramTransport, NetworkError, TransportProvider};

/// First port handed out for ephemeral binds.
pub const EPHEMERAL_PORT_START: u16 = 49152;

// ============================================================================
// ManualClock
// ============================================================================

/// Clock that only moves when told to.
///
/// `sleep` advances the clock by the requested duration and records it.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now = now.saturating_add(duration);
    }

    /// Every duration passed to `sleep`, oldest first.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.advance(duration);
    }
}

// ============================================================================
// LoopbackNetwork - in-memory datagram fabric
// ============================================================================

/// A datagram handed to the fabric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub from_port: u16,
    pub destination: SocketAddrV4,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct Fabric {
    queues: HashMap<u16, VecDeque<Vec<u8>>>,
    groups: HashMap<u16, HashSet<Ipv4Addr>>,
    sent: Vec<SentDatagram>,
    next_ephemeral: u16,
    fail_sends: bool,
    fail_binds: bool,
    group_bind_supported: bool,
    join_supported: bool,
    link_up: bool,
}

impl Default for Fabric {
    fn default() -> Self {
        Self {
            queues: HashMap::new(),
            groups: HashMap::new(),
            sent: Vec::new(),
            next_ephemeral: EPHEMERAL_PORT_START,
            fail_sends: false,
            fail_binds: false,
            group_bind_supported: true,
            join_supported: true,
            link_up: true,
        }
    }
}

impl Fabric {
    fn allocate_ephemeral(&mut self) -> Option<u16> {
        let span = u16::MAX - EPHEMERAL_PORT_START;
        for _ in 0..=span {
            let candidate = self.next_ephemeral;
            self.next_ephemeral = if candidate == u16::MAX {
                EPHEMERAL_PORT_START
            } else {
                candidate + 1
            };
            if !self.queues.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn deliver(&mut self, destination: SocketAddrV4, payload: &[u8]) {
        let ip = *destination.ip();
        let port = destination.port();
        let joined = self.groups.get(&port).is_some_and(|groups| groups.contains(&ip));
        if ip.is_multicast() && !joined {
            return;
        }
        if let Some(queue) = self.queues.get_mut(&port) {
            queue.push_back(payload.to_vec());
        }
    }
}

/// In-memory network shared by every transport it opens.
///
/// Ports are process-wide: one bind per port. Unicast and broadcast
/// datagrams reach whoever bound the destination port; multicast datagrams
/// only reach a port that joined the group.
#[derive(Debug, Clone, Default)]
pub struct LoopbackNetwork {
    fabric: Arc<Mutex<Fabric>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unbound transport attached to this network.
    pub fn transport(&self) -> LoopbackTransport {
        LoopbackTransport {
            fabric: Arc::clone(&self.fabric),
            port: None,
        }
    }

    /// Queue a raw datagram on `port`. Returns false if nothing is bound there.
    pub fn inject(&self, port: u16, payload: &[u8]) -> bool {
        let mut fabric = self.fabric.lock();
        match fabric.queues.get_mut(&port) {
            Some(queue) => {
                queue.push_back(payload.to_vec());
                true
            }
            None => false,
        }
    }

    /// Every datagram accepted for sending, oldest first.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.fabric.lock().sent.clone()
    }

    /// Datagrams waiting on `port`.
    pub fn pending(&self, port: u16) -> usize {
        self.fabric.lock().queues.get(&port).map_or(0, VecDeque::len)
    }

    pub fn is_bound(&self, port: u16) -> bool {
        self.fabric.lock().queues.contains_key(&port)
    }

    pub fn bound_ports(&self) -> usize {
        self.fabric.lock().queues.len()
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fabric.lock().fail_sends = fail;
    }

    pub fn set_fail_binds(&self, fail: bool) {
        self.fabric.lock().fail_binds = fail;
    }

    /// Whether transports offer the combined group bind.
    pub fn set_group_bind_supported(&self, supported: bool) {
        self.fabric.lock().group_bind_supported = supported;
    }

    /// Whether transports accept a group join after a plain bind.
    pub fn set_join_supported(&self, supported: bool) {
        self.fabric.lock().join_supported = supported;
    }

    pub fn set_link_up(&self, up: bool) {
        self.fabric.lock().link_up = up;
    }
}

impl TransportProvider for LoopbackNetwork {
    fn open(&self) -> Box<dyn DatagramTransport> {
        Box::new(self.transport())
    }

    fn is_connected(&self) -> bool {
        self.fabric.lock().link_up
    }
}

/// One endpoint on a [`LoopbackNetwork`]. Unbinds on close or drop.
#[derive(Debug)]
pub struct LoopbackTransport {
    fabric: Arc<Mutex<Fabric>>,
    port: Option<u16>,
}

impl DatagramTransport for LoopbackTransport {
    fn bind(&mut self, local_port: u16) -> Result<(), NetworkError> {
        let mut fabric = self.fabric.lock();
        if fabric.fail_binds || self.port.is_some() {
            return Err(NetworkError::BindFailed { port: local_port });
        }

        let port = if local_port == 0 {
            fabric
                .allocate_ephemeral()
                .ok_or(NetworkError::BindFailed { port: 0 })?
        } else if fabric.queues.contains_key(&local_port) {
            return Err(NetworkError::BindFailed { port: local_port });
        } else {
            local_port
        };

        fabric.queues.insert(port, VecDeque::new());
        self.port = Some(port);
        Ok(())
    }

    fn bind_multicast(&mut self, group: Ipv4Addr, local_port: u16) -> Result<(), NetworkError> {
        if !self.fabric.lock().group_bind_supported {
            return Err(NetworkError::Unsupported);
        }
        if !group.is_multicast() {
            return Err(NetworkError::InvalidAddress);
        }
        self.bind(local_port)?;
        if let Some(port) = self.port {
            self.fabric.lock().groups.entry(port).or_default().insert(group);
        }
        Ok(())
    }

    fn join_multicast_group(&mut self, group: Ipv4Addr) -> Result<(), NetworkError> {
        let port = self.port.ok_or(NetworkError::NotBound)?;
        let mut fabric = self.fabric.lock();
        if !fabric.join_supported {
            return Err(NetworkError::Unsupported);
        }
        if !group.is_multicast() {
            return Err(NetworkError::InvalidAddress);
        }
        fabric.groups.entry(port).or_default().insert(group);
        Ok(())
    }

    fn send_datagram(&mut self, destination: SocketAddrV4, payload: &[u8]) -> Result<(), NetworkError> {
        let from_port = self.port.ok_or(NetworkError::NotBound)?;
        let mut fabric = self.fabric.lock();
        if fabric.fail_sends {
            return Err(NetworkError::SendFailed);
        }
        fabric.sent.push(SentDatagram {
            from_port,
            destination,
            payload: payload.to_vec(),
        });
        fabric.deliver(destination, payload);
        Ok(())
    }

    fn poll_incoming(&mut self) -> Option<usize> {
        let port = self.port?;
        self.fabric.lock().queues.get(&port)?.front().map(Vec::len)
    }

    fn read_datagram(&mut self, buf: &mut [u8]) -> usize {
        let Some(port) = self.port else {
            return 0;
        };
        let mut fabric = self.fabric.lock();
        let Some(datagram) = fabric.queues.get_mut(&port).and_then(VecDeque::pop_front) else {
            return 0;
        };
        let copied = datagram.len().min(buf.len());
        buf[..copied].copy_from_slice(&datagram[..copied]);
        copied
    }

    fn local_port(&self) -> Option<u16> {
        self.port
    }

    fn close(&mut self) {
        if let Some(port) = self.port.take() {
            let mut fabric = self.fabric.lock();
            fabric.queues.remove(&port);
            fabric.groups.remove(&port);
        }
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        self.close();
    }
}
