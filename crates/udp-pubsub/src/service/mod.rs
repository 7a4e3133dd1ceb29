//! Service Layer - wires the domain to the driven ports
//!
//! - `Publisher` / `Subscriber`: typed endpoints over a `DatagramTransport`
//! - `Rate`: loop pacing over a `Clock`
//! - `Node`: bounded ownership and timer dispatch

mod endpoint;
pub mod node;
pub mod publisher;
pub mod rate;
pub mod subscriber;


pub use endpoint::{EndpointContext, EndpointState};
pub use node::{Node, PublisherHandle, SubscriberHandle, TimerHandle};
pub use publisher::Publisher;
pub use rate::Rate;
pub use subscriber::{Subscriber, SubscriptionCallback};
