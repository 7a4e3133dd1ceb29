//! Node runtime: attaches the configured endpoints and drives the
//! cooperative loop.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info, warn};
use udp_pubsub::{
    Clock, Node, NodeConfig, PublisherHandle, QoSProfile, Rate, Result, SharedRegistry,
    SubscriberHandle, SubscriptionCallback, Timestamp, TransportProvider,
};

use crate::heartbeat::Heartbeat;

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub timers_fired: usize,
    pub heartbeats_sent: usize,
    pub messages_received: usize,
}

/// A configured node plus its loop state.
pub struct NodeRuntime {
    node: Node,
    publishers: Vec<PublisherHandle<Heartbeat>>,
    subscribers: Vec<SubscriberHandle<Heartbeat>>,
    rate: Rate,
    heartbeat_due: Rc<Cell<bool>>,
    heartbeats_sent: u64,
    heartbeats_received: Rc<Cell<u64>>,
    next_seq: u32,
    started: Timestamp,
    max_iterations: Option<u64>,
}

impl NodeRuntime {
    /// Build a runtime registering topics in the process-wide registry.
    ///
    /// # Errors
    ///
    /// Invalid configuration, a full node table or registry, or a multicast
    /// subscriber that cannot bind.
    pub fn new(
        config: &NodeConfig,
        transports: Arc<dyn TransportProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::with_registry(config, transports, clock, udp_pubsub::global_registry())
    }

    /// Build a runtime registering topics in `registry`.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new).
    pub fn with_registry(
        config: &NodeConfig,
        transports: Arc<dyn TransportProvider>,
        clock: Arc<dyn Clock>,
        registry: SharedRegistry,
    ) -> Result<Self> {
        config.validate()?;

        let mut node = match &config.namespace {
            Some(ns) => Node::with_namespace(&config.name, ns, transports, Arc::clone(&clock)),
            None => Node::new(&config.name, transports, Arc::clone(&clock)),
        }
        .with_registry(registry);

        let mut publishers = Vec::with_capacity(config.publishers.len());
        for publisher in &config.publishers {
            let handle = node.attach_publisher::<Heartbeat>(
                &publisher.topic,
                publisher.mode,
                publisher.port,
                QoSProfile::default(),
            )?;
            publishers.push(handle);
        }

        let heartbeats_received = Rc::new(Cell::new(0u64));
        let mut subscribers = Vec::with_capacity(config.subscribers.len());
        for subscriber in &config.subscribers {
            let received = Rc::clone(&heartbeats_received);
            let callback: SubscriptionCallback<Heartbeat> = Box::new(move |hb| {
                received.set(received.get() + 1);
                info!(seq = hb.seq, uptime_us = hb.uptime_us, "heartbeat received");
            });
            let handle = match subscriber.multicast_group {
                Some(group) => node.attach_multicast_subscriber::<Heartbeat>(
                    &subscriber.topic,
                    group,
                    subscriber.port,
                    QoSProfile::sensor_data(),
                    Some(callback),
                )?,
                None => node.attach_subscriber::<Heartbeat>(
                    &subscriber.topic,
                    subscriber.port,
                    QoSProfile::sensor_data(),
                    Some(callback),
                )?,
            };
            subscribers.push(handle);
        }

        let heartbeat_due = Rc::new(Cell::new(false));
        let due = Rc::clone(&heartbeat_due);
        node.attach_timer(config.heartbeat_period, move || due.set(true))?;

        let rate = Rate::new(config.rate_hz, Arc::clone(&clock))?;
        let started = clock.now();

        Ok(Self {
            node,
            publishers,
            subscribers,
            rate,
            heartbeat_due,
            heartbeats_sent: 0,
            heartbeats_received,
            next_seq: 0,
            started,
            max_iterations: config.max_iterations,
        })
    }

    /// One cooperative slice: timers, pending heartbeat sends, then every
    /// subscriber.
    pub fn step(&mut self) -> StepReport {
        let mut report = StepReport {
            timers_fired: self.node.dispatch_once(),
            ..StepReport::default()
        };

        if self.heartbeat_due.replace(false) {
            report.heartbeats_sent = self.publish_heartbeat();
            self.heartbeats_sent += report.heartbeats_sent as u64;
        }

        for &handle in &self.subscribers {
            report.messages_received += self.node.spin_subscriber(handle);
        }
        report
    }

    /// Run `step` at the configured rate until `max_iterations` is reached or
    /// the link goes down. Returns the number of iterations run.
    pub fn run(&mut self) -> u64 {
        info!(
            node = self.node.full_name(),
            rate_hz = self.rate.frequency_hz(),
            max_iterations = ?self.max_iterations,
            "node running"
        );

        let mut iterations = 0u64;
        while self.max_iterations.map_or(true, |max| iterations < max) {
            if !self.node.ok() {
                warn!("network link down, stopping");
                break;
            }
            let report = self.step();
            if report != StepReport::default() {
                debug!(?report, "step");
            }
            self.rate.sleep();
            iterations += 1;
        }
        iterations
    }

    fn publish_heartbeat(&mut self) -> usize {
        let heartbeat = Heartbeat {
            seq: self.next_seq,
            uptime_us: self
                .node
                .clock()
                .now()
                .saturating_duration_since(self.started)
                .as_micros()
                .try_into()
                .unwrap_or(u64::MAX),
        };
        self.next_seq = self.next_seq.wrapping_add(1);

        let mut sent = 0;
        for &handle in &self.publishers {
            let Some(publisher) = self.node.publisher_mut(handle) else {
                continue;
            };
            match publisher.publish(&heartbeat) {
                Ok(()) => sent += 1,
                Err(e) => debug!(topic = publisher.topic_name(), error = %e, "heartbeat not sent"),
            }
        }
        sent
    }

    /// Log every topic in the node's registry.
    pub fn log_topics(&self) {
        self.node.registry().lock().log_topics();
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Datagrams accepted by a publisher's transport, over all publishers.
    pub fn heartbeats_sent(&self) -> u64 {
        self.heartbeats_sent
    }

    /// Heartbeat sequence numbers handed out, whether or not any send
    /// succeeded.
    pub fn heartbeats_attempted(&self) -> u32 {
        self.next_seq
    }

    pub fn heartbeats_received(&self) -> u64 {
        self.heartbeats_received.get()
    }
}
