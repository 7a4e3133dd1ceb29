//! # UDP Publish/Subscribe Core
//!
//! Lightweight topic-based messaging for resource-constrained nodes over
//! best-effort datagram transport. A node declares topics, attaches typed
//! publishers and subscribers to them and runs periodic callbacks, with
//! fixed memory budgets and no blocking I/O.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** topic registry, message records, timer, QoS, errors
//! - **Ports Layer:** datagram transport, transport provider, clock, config
//! - **Service Layer:** publisher, subscriber, rate limiter, node
//! - **Adapters Layer:** UDP transport, system clock, config providers
//!
//! ## Execution model
//!
//! Single-threaded and cooperative. The embedding loop calls
//! [`Node::dispatch_once`] for timers and drains each subscriber itself;
//! only [`Rate::sleep`] blocks.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use udp_pubsub::bytemuck::{Pod, Zeroable};
//! use udp_pubsub::test_utils::{LoopbackNetwork, ManualClock};
//! use udp_pubsub::{raw_message, AddressMode, Clock, Node, QoSProfile, Timestamp};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
//! #[repr(C)]
//! struct MotorCommand {
//!     target: f32,
//!     kp: f32,
//! }
//! raw_message!(MotorCommand);
//!
//! let network = LoopbackNetwork::new();
//! let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
//! let mut node = Node::new("leg", Arc::new(network.clone()), clock.clone());
//!
//! let sub = node
//!     .attach_subscriber::<MotorCommand>("motor_cmd", Some(7001), QoSProfile::default(), None)
//!     .unwrap();
//! let publisher = node
//!     .attach_publisher::<MotorCommand>(
//!         "motor_cmd",
//!         AddressMode::Unicast(std::net::Ipv4Addr::LOCALHOST),
//!         Some(7001),
//!         QoSProfile::default(),
//!     )
//!     .unwrap();
//!
//! let cmd = MotorCommand { target: 1.0, kp: 5.0 };
//! node.publisher_mut(publisher).unwrap().publish(&cmd).unwrap();
//! assert_eq!(node.subscriber_mut(sub).unwrap().take(), Some(cmd));
//!
//! node.attach_timer(Duration::from_millis(10), || {}).unwrap();
//! clock.advance(Duration::from_millis(10));
//! assert_eq!(node.dispatch_once(), 1);
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// ADAPTERS AND TEST SUPPORT
// =============================================================================

/// Concrete port implementations. UDP and TOML require feature `network`.
pub mod adapters;

/// Deterministic test doubles (ManualClock, LoopbackNetwork).
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Re-exported for [`raw_message!`].
pub use bytemuck;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Domain
pub use domain::{
    auto_port, resolve_topic_name, AddressMode, Direction, Message, NetworkError, NodeConfig, PubSubError,
    PublisherConfig, QoSHistory, QoSProfile, QoSReliability, Result, SharedRegistry,
    SubscriberConfig, TableKind, Timer, TimerState, Timestamp, TopicEntry, TopicRegistry,
    AUTO_PORT_SPAN, DEFAULT_BASE_PORT, DEFAULT_MULTICAST_GROUP, MAX_MESSAGE_SIZE, MAX_PUBLISHERS,
    MAX_SUBSCRIPTIONS, MAX_TIMERS, MAX_TOPIC_NAME_LEN,
};

// Port traits
pub use ports::{Clock, ConfigProvider, DatagramTransport, TransportProvider};

// Service
pub use service::{
    EndpointContext, EndpointState, Node, Publisher, PublisherHandle, Rate, Subscriber,
    SubscriberHandle, SubscriptionCallback, TimerHandle,
};

/// The process-wide topic registry.
pub fn global_registry() -> SharedRegistry {
    domain::global()
}
