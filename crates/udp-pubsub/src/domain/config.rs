//! Node configuration values

use std::net::Ipv4Addr;
use std::time::Duration;

use super::errors::{PubSubError, Result};
use super::topic_registry::MAX_TOPIC_NAME_LEN;
use super::value_objects::AddressMode;

/// Publisher slots per node.
pub const MAX_PUBLISHERS: usize = 8;
/// Subscriber slots per node.
pub const MAX_SUBSCRIPTIONS: usize = 8;
/// Timer slots per node.
pub const MAX_TIMERS: usize = 8;

/// Absolute topic names are kept; relative ones become `/<ns>/<topic>`
/// or `/<topic>`. Slashes around `namespace` are ignored.
pub fn resolve_topic_name(namespace: Option<&str>, topic: &str) -> String {
    if topic.starts_with('/') {
        return topic.to_string();
    }
    match namespace.map(|ns| ns.trim_matches('/')).filter(|ns| !ns.is_empty()) {
        Some(ns) => format!("/{ns}/{topic}"),
        None => format!("/{topic}"),
    }
}

/// A publisher to attach at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherConfig {
    pub topic: String,
    pub mode: AddressMode,
    /// Destination port; derived from the topic name when `None`.
    pub port: Option<u16>,
}

/// A subscriber to attach at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberConfig {
    pub topic: String,
    /// Local listening port; derived from the topic name when `None`.
    pub port: Option<u16>,
    /// Join this group instead of a plain bind.
    pub multicast_group: Option<Ipv4Addr>,
}

/// Everything a runnable node needs.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub name: String,
    pub namespace: Option<String>,
    /// Loop frequency.
    pub rate_hz: f64,
    pub heartbeat_period: Duration,
    /// Stop after this many loop iterations; run forever when `None`.
    pub max_iterations: Option<u64>,
    pub publishers: Vec<PublisherConfig>,
    pub subscribers: Vec<SubscriberConfig>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "pubsub_node".to_string(),
            namespace: None,
            rate_hz: 100.0,
            heartbeat_period: Duration::from_secs(1),
            max_iterations: None,
            publishers: Vec::new(),
            subscribers: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Check values that would otherwise fail later at attach time.
    ///
    /// # Errors
    ///
    /// `Config` describing the first offending value.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PubSubError::Config("node name is empty".into()));
        }
        if !self.rate_hz.is_finite() || self.rate_hz <= 0.0 {
            return Err(PubSubError::Config(format!(
                "rate_hz must be positive, got {}",
                self.rate_hz
            )));
        }
        if self.heartbeat_period.is_zero() {
            return Err(PubSubError::Config("heartbeat period must be non-zero".into()));
        }
        if self.publishers.len() > MAX_PUBLISHERS {
            return Err(PubSubError::Config(format!(
                "{} publishers configured, at most {MAX_PUBLISHERS} allowed",
                self.publishers.len()
            )));
        }
        if self.subscribers.len() > MAX_SUBSCRIPTIONS {
            return Err(PubSubError::Config(format!(
                "{} subscribers configured, at most {MAX_SUBSCRIPTIONS} allowed",
                self.subscribers.len()
            )));
        }

        let topics = self
            .publishers
            .iter()
            .map(|p| p.topic.as_str())
            .chain(self.subscribers.iter().map(|s| s.topic.as_str()));
        for topic in topics {
            if topic.is_empty() {
                return Err(PubSubError::Config("empty topic name".into()));
            }
            let resolved = resolve_topic_name(self.namespace.as_deref(), topic);
            if resolved.len() > MAX_TOPIC_NAME_LEN {
                return Err(PubSubError::Config(format!(
                    "topic {resolved:?} is longer than {MAX_TOPIC_NAME_LEN} bytes"
                )));
            }
        }
        Ok(())
    }
}
