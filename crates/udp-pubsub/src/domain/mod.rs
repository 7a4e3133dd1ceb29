//! Domain Layer - Pure pub/sub logic with no I/O
//!
//! - Topic registry and derived port assignment
//! - Fixed-size message records
//! - Addressing modes and QoS profiles
//! - Periodic timer state machine
//! - Node configuration values

pub mod config;
pub mod errors;
pub mod message;
pub mod timer;
pub mod topic_registry;
pub mod value_objects;

pub use config::*;
pub use errors::*;
pub use message::*;
pub use timer::*;
pub use topic_registry::{
    auto_port, global, SharedRegistry, TopicEntry, TopicRegistry, AUTO_PORT_SPAN,
    DEFAULT_BASE_PORT, MAX_TOPIC_NAME_LEN,
};
pub use value_objects::*;
