//! Node: owns publishers, subscribers and timers and services timers in one
//! cooperative dispatch call.
//!
//! Publishers and subscribers of different message types share one table
//! each. They are stored type-erased behind [`Attachment`] and reached again
//! through typed handles returned at attach time.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, info_span, warn, Span};

use super::endpoint::EndpointContext;
use super::publisher::Publisher;
use super::subscriber::{Subscriber, SubscriptionCallback};
use crate::domain::{
    auto_port, resolve_topic_name, AddressMode, Message, PubSubError, QoSProfile, Result,
    SharedRegistry, TableKind, Timer, DEFAULT_BASE_PORT, MAX_PUBLISHERS, MAX_SUBSCRIPTIONS, MAX_TIMERS,
};
use crate::ports::{Clock, TransportProvider};

/// Lifetime management for a stored publisher or subscriber.
trait Attachment: Any {
    fn topic_name(&self) -> &str;
    fn release(&mut self);
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M: Message + 'static> Attachment for Publisher<M> {
    fn topic_name(&self) -> &str {
        Publisher::topic_name(self)
    }

    fn release(&mut self) {
        Publisher::release(self);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<M: Message + 'static> Attachment for Subscriber<M> {
    fn topic_name(&self) -> &str {
        Subscriber::topic_name(self)
    }

    fn release(&mut self) {
        Subscriber::release(self);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed reference to a publisher owned by a [`Node`].
pub struct PublisherHandle<M> {
    index: usize,
    _message: PhantomData<fn() -> M>,
}

/// Typed reference to a subscriber owned by a [`Node`].
pub struct SubscriberHandle<M> {
    index: usize,
    _message: PhantomData<fn() -> M>,
}

/// Reference to a timer owned by a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    index: usize,
}

macro_rules! typed_handle_impls {
    ($handle:ident) => {
        impl<M> $handle<M> {
            fn new(index: usize) -> Self {
                Self {
                    index,
                    _message: PhantomData,
                }
            }

            /// Slot index inside the owning node.
            pub fn index(&self) -> usize {
                self.index
            }
        }

        impl<M> Clone for $handle<M> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<M> Copy for $handle<M> {}

        impl<M> fmt::Debug for $handle<M> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($handle)).field(&self.index).finish()
            }
        }
    };
}

typed_handle_impls!(PublisherHandle);
typed_handle_impls!(SubscriberHandle);

impl TimerHandle {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Named owner of a bounded set of publishers, subscribers and timers.
///
/// Dropping the node releases everything attached to it.
pub struct Node {
    name: String,
    namespace: Option<String>,
    full_name: String,
    registry: SharedRegistry,
    transports: Arc<dyn TransportProvider>,
    clock: Arc<dyn Clock>,
    span: Span,
    publishers: heapless::Vec<Box<dyn Attachment>, MAX_PUBLISHERS>,
    subscribers: heapless::Vec<Box<dyn Attachment>, MAX_SUBSCRIPTIONS>,
    timers: heapless::Vec<Timer, MAX_TIMERS>,
}

impl Node {
    /// Node without a namespace, using the process-wide registry.
    pub fn new(
        name: impl Into<String>,
        transports: Arc<dyn TransportProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::build(name.into(), None, transports, clock)
    }

    /// Node inside `namespace`; relative topics resolve under it.
    pub fn with_namespace(
        name: impl Into<String>,
        namespace: impl Into<String>,
        transports: Arc<dyn TransportProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let namespace = namespace.into().trim_matches('/').to_string();
        let namespace = (!namespace.is_empty()).then_some(namespace);
        Self::build(name.into(), namespace, transports, clock)
    }

    fn build(
        name: String,
        namespace: Option<String>,
        transports: Arc<dyn TransportProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let full_name = match &namespace {
            Some(ns) => format!("{ns}/{name}"),
            None => name.clone(),
        };
        let span = info_span!("node", node = %full_name);
        span.in_scope(|| info!("node created"));

        Self {
            name,
            namespace,
            full_name,
            registry: crate::domain::global(),
            transports,
            clock,
            span,
            publishers: heapless::Vec::new(),
            subscribers: heapless::Vec::new(),
            timers: heapless::Vec::new(),
        }
    }

    /// Register topics in `registry` instead of the process-wide one.
    #[must_use]
    pub fn with_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Absolute topic names are kept; relative ones become `/<ns>/<topic>`
    /// or `/<topic>`.
    pub fn resolve_topic_name(&self, topic: &str) -> String {
        resolve_topic_name(self.namespace.as_deref(), topic)
    }

    // =========================================================================
    // ATTACHMENT
    // =========================================================================

    /// Create, register and initialise a publisher.
    ///
    /// `port` is the destination port; derived from the resolved topic name
    /// when `None`. A publisher whose `init` fails is still stored (unusable
    /// but released with the node).
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` when the publisher table is full, or any
    /// construction error from [`Publisher::new`]. The node is unchanged.
    pub fn attach_publisher<M: Message + 'static>(
        &mut self,
        topic: &str,
        mode: AddressMode,
        port: Option<u16>,
        qos: QoSProfile,
    ) -> Result<PublisherHandle<M>> {
        let span = self.span.clone();
        let _guard = span.enter();

        if self.publishers.is_full() {
            return Err(capacity_exceeded(TableKind::Publishers, MAX_PUBLISHERS));
        }

        let topic = self.resolve_topic_name(topic);
        let port = port.unwrap_or_else(|| auto_port(&topic, DEFAULT_BASE_PORT));
        let mut publisher = Publisher::<M>::new(topic, mode, port, qos, self.endpoint_context())?;
        // Failure is logged by the publisher and visible via is_initialized.
        let _ = publisher.init();

        let index = self.publishers.len();
        self.publishers
            .push(Box::new(publisher))
            .map_err(|_| capacity_exceeded(TableKind::Publishers, MAX_PUBLISHERS))?;
        Ok(PublisherHandle::new(index))
    }

    /// Create, register and bind a subscriber on `port` (derived when `None`).
    ///
    /// A subscriber whose `init` fails is still stored.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` when the subscription table is full, or any
    /// construction error from [`Subscriber::new`]. The node is unchanged.
    pub fn attach_subscriber<M: Message + 'static>(
        &mut self,
        topic: &str,
        port: Option<u16>,
        qos: QoSProfile,
        callback: Option<SubscriptionCallback<M>>,
    ) -> Result<SubscriberHandle<M>> {
        let span = self.span.clone();
        let _guard = span.enter();

        let mut subscriber = self.new_subscriber(topic, port, qos, callback)?;
        // Failure is logged by the subscriber and visible via is_initialized.
        let _ = subscriber.init();
        self.store_subscriber(subscriber)
    }

    /// Create, register and bind a subscriber joined to `group`.
    ///
    /// # Errors
    ///
    /// As [`attach_subscriber`](Self::attach_subscriber), plus the init
    /// error when the subscriber cannot bind; it is then discarded and the
    /// node is unchanged.
    pub fn attach_multicast_subscriber<M: Message + 'static>(
        &mut self,
        topic: &str,
        group: Ipv4Addr,
        port: Option<u16>,
        qos: QoSProfile,
        callback: Option<SubscriptionCallback<M>>,
    ) -> Result<SubscriberHandle<M>> {
        let span = self.span.clone();
        let _guard = span.enter();

        let mut subscriber = self.new_subscriber(topic, port, qos, callback)?;
        subscriber.init_multicast(group)?;
        self.store_subscriber(subscriber)
    }

    /// Add a timer armed now.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` when the timer table is full, `Config` for a zero
    /// period.
    pub fn attach_timer(
        &mut self,
        period: Duration,
        callback: impl FnMut() + 'static,
    ) -> Result<TimerHandle> {
        let span = self.span.clone();
        let _guard = span.enter();

        if self.timers.is_full() {
            return Err(capacity_exceeded(TableKind::Timers, MAX_TIMERS));
        }
        let timer = Timer::new(period, callback, self.clock.now())?;

        let index = self.timers.len();
        self.timers
            .push(timer)
            .map_err(|_| capacity_exceeded(TableKind::Timers, MAX_TIMERS))?;
        info!(?period, "timer attached");
        Ok(TimerHandle { index })
    }

    fn new_subscriber<M: Message + 'static>(
        &self,
        topic: &str,
        port: Option<u16>,
        qos: QoSProfile,
        callback: Option<SubscriptionCallback<M>>,
    ) -> Result<Subscriber<M>> {
        if self.subscribers.is_full() {
            return Err(capacity_exceeded(TableKind::Subscriptions, MAX_SUBSCRIPTIONS));
        }
        let topic = self.resolve_topic_name(topic);
        let port = port.unwrap_or_else(|| auto_port(&topic, DEFAULT_BASE_PORT));
        Subscriber::new(topic, port, qos, callback, self.endpoint_context())
    }

    fn store_subscriber<M: Message + 'static>(
        &mut self,
        subscriber: Subscriber<M>,
    ) -> Result<SubscriberHandle<M>> {
        let index = self.subscribers.len();
        self.subscribers
            .push(Box::new(subscriber))
            .map_err(|_| capacity_exceeded(TableKind::Subscriptions, MAX_SUBSCRIPTIONS))?;
        Ok(SubscriberHandle::new(index))
    }

    fn endpoint_context(&self) -> EndpointContext {
        EndpointContext::new(
            self.transports.open(),
            Arc::clone(&self.clock),
            Arc::clone(&self.registry),
        )
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Service every timer once. Returns how many fired.
    ///
    /// Subscribers are not drained here; spin them with
    /// [`spin_subscriber`](Self::spin_subscriber) or through
    /// [`subscriber_mut`](Self::subscriber_mut).
    pub fn dispatch_once(&mut self) -> usize {
        let now = self.clock.now();
        self.timers
            .iter_mut()
            .map(|timer| timer.spin_once(now))
            .filter(|fired| *fired)
            .count()
    }

    /// Run `spin_all` on one subscriber. Returns the number processed.
    pub fn spin_subscriber<M: Message + 'static>(&mut self, handle: SubscriberHandle<M>) -> usize {
        self.subscriber_mut(handle).map_or(0, |s| s.spin_all())
    }

    pub fn publisher_mut<M: Message + 'static>(
        &mut self,
        handle: PublisherHandle<M>,
    ) -> Option<&mut Publisher<M>> {
        self.publishers
            .get_mut(handle.index)?
            .as_any_mut()
            .downcast_mut::<Publisher<M>>()
    }

    pub fn subscriber_mut<M: Message + 'static>(
        &mut self,
        handle: SubscriberHandle<M>,
    ) -> Option<&mut Subscriber<M>> {
        self.subscribers
            .get_mut(handle.index)?
            .as_any_mut()
            .downcast_mut::<Subscriber<M>>()
    }

    pub fn timer_mut(&mut self, handle: TimerHandle) -> Option<&mut Timer> {
        self.timers.get_mut(handle.index)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Whether the network link is up.
    pub fn ok(&self) -> bool {
        self.transports.is_connected()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// `namespace/name`, or `name` without a namespace.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn publisher_count(&self) -> usize {
        self.publishers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Topic names of every attached publisher and subscriber.
    pub fn topic_names(&self) -> impl Iterator<Item = &str> {
        self.publishers
            .iter()
            .chain(self.subscribers.iter())
            .map(|attachment| attachment.topic_name())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("full_name", &self.full_name)
            .field("publishers", &self.publishers.len())
            .field("subscribers", &self.subscribers.len())
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let _guard = self.span.enter();
        for attachment in self.publishers.iter_mut().chain(self.subscribers.iter_mut()) {
            attachment.release();
        }
        self.timers.clear();
        info!("node shut down");
    }
}

fn capacity_exceeded(kind: TableKind, capacity: usize) -> PubSubError {
    warn!(%kind, capacity, "attachment rejected: table full");
    PubSubError::CapacityExceeded { kind, capacity }
}
