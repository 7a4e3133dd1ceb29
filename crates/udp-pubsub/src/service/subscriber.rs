//! Subscriber: one message type, one local port, push or pull delivery.

use std::marker::PhantomData;
use std::net::Ipv4Addr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::endpoint::{EndpointContext, EndpointState};
use crate::domain::{
    Direction, Message, NetworkError, PubSubError, QoSProfile, Result, Timestamp,
    MAX_MESSAGE_SIZE,
};
use crate::ports::{Clock, DatagramTransport};

/// Callback invoked with every accepted message.
pub type SubscriptionCallback<M> = Box<dyn FnMut(&M)>;

/// Receives `M` records on a local port.
///
/// A datagram shorter than `M::SIZE` is drained and counted as dropped.
/// A longer one is accepted on its first `M::SIZE` bytes.
pub struct Subscriber<M> {
    topic: String,
    local_port: u16,
    qos: QoSProfile,
    callback: Option<SubscriptionCallback<M>>,
    transport: Box<dyn DatagramTransport>,
    clock: Arc<dyn Clock>,
    state: EndpointState,
    multicast_group: Option<Ipv4Addr>,
    received_count: u64,
    dropped_count: u64,
    last_receive_time: Option<Timestamp>,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message> Subscriber<M> {
    /// Create a subscriber and register its topic.
    ///
    /// Without a callback the subscriber is pull-only: `spin_once` still
    /// consumes and counts messages.
    ///
    /// # Errors
    ///
    /// - `MessageTooLarge` if `M::SIZE` exceeds one datagram
    /// - registry errors (`TopicNameTooLong`, `RegistryFull`)
    pub fn new(
        topic: impl Into<String>,
        local_port: u16,
        qos: QoSProfile,
        callback: Option<SubscriptionCallback<M>>,
        ctx: EndpointContext,
    ) -> Result<Self> {
        let topic = topic.into();
        if M::SIZE > MAX_MESSAGE_SIZE {
            return Err(PubSubError::MessageTooLarge {
                size: M::SIZE,
                max: MAX_MESSAGE_SIZE,
            });
        }

        ctx.registry
            .lock()
            .register(&topic, local_port, M::SIZE as u32, Direction::Subscribe)?;

        Ok(Self {
            topic,
            local_port,
            qos,
            callback,
            transport: ctx.transport,
            clock: ctx.clock,
            state: EndpointState::Unbound,
            multicast_group: None,
            received_count: 0,
            dropped_count: 0,
            last_receive_time: None,
            _message: PhantomData,
        })
    }

    /// Bind the local port.
    ///
    /// # Errors
    ///
    /// `Network` if the bind fails; the subscriber stays unusable.
    pub fn init(&mut self) -> Result<()> {
        self.check_bindable()?;
        if self.state == EndpointState::Ready {
            return Ok(());
        }

        match self.transport.bind(self.local_port) {
            Ok(()) => {
                self.mark_ready();
                Ok(())
            }
            Err(e) => Err(self.mark_failed(e)),
        }
    }

    /// Bind the local port as a member of `group`.
    ///
    /// Tries the transport's combined group bind first. If that fails, binds
    /// the port plainly and asks to join the group; a refused join is logged
    /// and the subscriber still counts as initialised.
    ///
    /// # Errors
    ///
    /// `Network` if neither path manages to bind the port.
    pub fn init_multicast(&mut self, group: Ipv4Addr) -> Result<()> {
        self.check_bindable()?;
        if self.state == EndpointState::Ready {
            return Ok(());
        }

        match self.transport.bind_multicast(group, self.local_port) {
            Ok(()) => {
                self.multicast_group = Some(group);
                self.mark_ready();
                return Ok(());
            }
            Err(e) => {
                debug!(topic = %self.topic, %group, error = %e, "group bind unavailable, falling back");
            }
        }

        if let Err(e) = self.transport.bind(self.local_port) {
            return Err(self.mark_failed(e));
        }
        if let Err(e) = self.transport.join_multicast_group(group) {
            warn!(topic = %self.topic, %group, error = %e, "multicast join refused");
        }
        self.multicast_group = Some(group);
        self.mark_ready();
        Ok(())
    }

    /// Pull one message if one is pending. Never blocks.
    pub fn take(&mut self) -> Option<M> {
        self.intake()
    }

    /// Take one message and hand it to the callback.
    ///
    /// Returns whether a message was accepted.
    pub fn spin_once(&mut self) -> bool {
        match self.intake() {
            Some(message) => {
                if let Some(callback) = self.callback.as_mut() {
                    callback(&message);
                }
                true
            }
            None => false,
        }
    }

    /// Run `spin_once` until it returns false or the QoS depth is reached.
    ///
    /// Returns the number of messages processed.
    pub fn spin_all(&mut self) -> usize {
        let depth = self.qos.depth();
        let mut processed = 0;
        while processed < depth && self.spin_once() {
            processed += 1;
        }
        processed
    }

    /// Close the transport. Idempotent.
    pub fn release(&mut self) {
        if self.state != EndpointState::Released {
            self.transport.close();
            self.state = EndpointState::Released;
            info!(
                topic = %self.topic,
                received = self.received_count,
                dropped = self.dropped_count,
                "subscriber released"
            );
        }
    }

    fn intake(&mut self) -> Option<M> {
        if self.state != EndpointState::Ready {
            return None;
        }
        let pending = self.transport.poll_incoming()?;

        let mut buf = [0u8; MAX_MESSAGE_SIZE];
        if pending < M::SIZE {
            self.transport.read_datagram(&mut buf);
            self.record_drop(pending);
            return None;
        }

        let read = self.transport.read_datagram(&mut buf[..M::SIZE]);
        if read < M::SIZE {
            self.record_drop(read);
            return None;
        }

        let message = M::decode(&buf[..M::SIZE]);
        self.received_count += 1;
        self.last_receive_time = Some(self.clock.now());
        Some(message)
    }

    fn record_drop(&mut self, len: usize) {
        self.dropped_count += 1;
        debug!(
            topic = %self.topic,
            len,
            expected = M::SIZE,
            dropped = self.dropped_count,
            "dropped undersized datagram"
        );
    }

    fn check_bindable(&self) -> Result<()> {
        if self.state == EndpointState::Released {
            Err(PubSubError::NotInitialized {
                topic: self.topic.clone(),
            })
        } else {
            Ok(())
        }
    }

    fn mark_ready(&mut self) {
        self.state = EndpointState::Ready;
        match self.multicast_group {
            Some(group) => info!(topic = %self.topic, port = self.local_port, %group, "subscriber ready"),
            None => info!(topic = %self.topic, port = self.local_port, "subscriber ready"),
        }
    }

    fn mark_failed(&mut self, error: NetworkError) -> PubSubError {
        self.state = EndpointState::Failed;
        warn!(topic = %self.topic, port = self.local_port, error = %error, "subscriber init failed");
        error.into()
    }

    pub fn topic_name(&self) -> &str {
        &self.topic
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn multicast_group(&self) -> Option<Ipv4Addr> {
        self.multicast_group
    }

    pub fn qos(&self) -> QoSProfile {
        self.qos
    }

    pub fn received_count(&self) -> u64 {
        self.received_count
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    pub fn last_receive_time(&self) -> Option<Timestamp> {
        self.last_receive_time
    }

    pub fn is_initialized(&self) -> bool {
        self.state == EndpointState::Ready
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    pub fn message_size(&self) -> usize {
        M::SIZE
    }
}

impl<M> Drop for Subscriber<M> {
    fn drop(&mut self) {
        if self.state != EndpointState::Released {
            self.transport.close();
            self.state = EndpointState::Released;
        }
    }
}
