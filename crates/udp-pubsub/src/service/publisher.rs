//! Publisher: one message type, one destination, fire-and-forget sends.

use std::marker::PhantomData;
use std::net::SocketAddrV4;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::endpoint::{EndpointContext, EndpointState};
use crate::domain::{
    AddressMode, Direction, Message, PubSubError, QoSProfile, Result, Timestamp, MAX_MESSAGE_SIZE,
};
use crate::ports::{Clock, DatagramTransport};

/// Sends `M` records to a unicast host, the subnet broadcast address or a
/// multicast group.
///
/// `publish` fails without side effects until `init` has succeeded.
pub struct Publisher<M> {
    topic: String,
    mode: AddressMode,
    destination_port: u16,
    local_port: u16,
    qos: QoSProfile,
    transport: Box<dyn DatagramTransport>,
    clock: Arc<dyn Clock>,
    state: EndpointState,
    sent_count: u64,
    last_send_time: Option<Timestamp>,
    _message: PhantomData<fn(&M)>,
}

impl<M: Message> Publisher<M> {
    /// Create a publisher and register its topic.
    ///
    /// # Errors
    ///
    /// - `MessageTooLarge` if `M::SIZE` exceeds one datagram
    /// - registry errors (`TopicNameTooLong`, `RegistryFull`)
    pub fn new(
        topic: impl Into<String>,
        mode: AddressMode,
        destination_port: u16,
        qos: QoSProfile,
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
            .register(&topic, destination_port, M::SIZE as u32, Direction::Publish)?;

        Ok(Self {
            topic,
            mode,
            destination_port,
            local_port: 0,
            qos,
            transport: ctx.transport,
            clock: ctx.clock,
            state: EndpointState::Unbound,
            sent_count: 0,
            last_send_time: None,
            _message: PhantomData,
        })
    }

    /// Local port bound by `init` (0 = ephemeral, the default).
    #[must_use]
    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    /// Bind the transport. Calling again after success is a no-op.
    ///
    /// # Errors
    ///
    /// `Network` if the bind fails; the publisher stays unusable.
    pub fn init(&mut self) -> Result<()> {
        match self.state {
            EndpointState::Ready => return Ok(()),
            EndpointState::Released => {
                return Err(PubSubError::NotInitialized {
                    topic: self.topic.clone(),
                })
            }
            EndpointState::Unbound | EndpointState::Failed => {}
        }

        match self.transport.bind(self.local_port) {
            Ok(()) => {
                self.state = EndpointState::Ready;
                info!(
                    topic = %self.topic,
                    mode = %self.mode,
                    port = self.destination_port,
                    "publisher ready"
                );
                Ok(())
            }
            Err(e) => {
                self.state = EndpointState::Failed;
                warn!(topic = %self.topic, port = self.local_port, error = %e, "publisher init failed");
                Err(e.into())
            }
        }
    }

    /// Encode and send one message as exactly `M::SIZE` bytes.
    ///
    /// Counters move only when the transport accepts the datagram. No retry.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` before a successful `init`
    /// - `Network(SendFailed)` if the transport rejects the datagram
    pub fn publish(&mut self, message: &M) -> Result<()> {
        self.ensure_ready()?;

        let mut buf = [0u8; MAX_MESSAGE_SIZE];
        let payload = &mut buf[..M::SIZE];
        message.encode(payload);

        self.send(payload)?;
        self.sent_count += 1;
        self.last_send_time = Some(self.clock.now());
        Ok(())
    }

    /// Send arbitrary bytes to the bound destination. Counters are untouched.
    ///
    /// # Errors
    ///
    /// As [`publish`](Self::publish), plus `MessageTooLarge` for payloads
    /// beyond one datagram.
    pub fn publish_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_ready()?;
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(PubSubError::MessageTooLarge {
                size: bytes.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        self.send(bytes)
    }

    /// Close the transport. Idempotent.
    pub fn release(&mut self) {
        if self.state != EndpointState::Released {
            self.transport.close();
            self.state = EndpointState::Released;
            info!(topic = %self.topic, sent = self.sent_count, "publisher released");
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state == EndpointState::Ready {
            Ok(())
        } else {
            Err(PubSubError::NotInitialized {
                topic: self.topic.clone(),
            })
        }
    }

    fn send(&mut self, payload: &[u8]) -> Result<()> {
        let destination = SocketAddrV4::new(self.mode.destination_ip(), self.destination_port);
        self.transport
            .send_datagram(destination, payload)
            .map_err(|e| {
                debug!(topic = %self.topic, %destination, error = %e, "send failed");
                PubSubError::from(e)
            })
    }

    pub fn topic_name(&self) -> &str {
        &self.topic
    }

    pub fn address_mode(&self) -> AddressMode {
        self.mode
    }

    pub fn destination_port(&self) -> u16 {
        self.destination_port
    }

    /// Port actually bound, once initialised.
    pub fn local_port(&self) -> Option<u16> {
        self.transport.local_port()
    }

    pub fn qos(&self) -> QoSProfile {
        self.qos
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }

    pub fn last_send_time(&self) -> Option<Timestamp> {
        self.last_send_time
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

impl<M> Drop for Publisher<M> {
    fn drop(&mut self) {
        if self.state != EndpointState::Released {
            self.transport.close();
            self.state = EndpointState::Released;
        }
    }
}
