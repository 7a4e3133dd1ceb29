//! Domain Errors for the pub/sub core
//!
//! Every failure in this crate is either one of these values or a counter
//! increment. Nothing here is fatal to the process.

use thiserror::Error;

/// Errors reported by the datagram transport collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Local port could not be bound
    #[error("failed to bind local port {port}")]
    BindFailed {
        /// Port that was requested (0 = ephemeral)
        port: u16,
    },
    /// Datagram could not be handed to the network
    #[error("failed to send datagram")]
    SendFailed,
    /// Capability is not provided by this transport
    #[error("operation not supported by transport")]
    Unsupported,
    /// Operation requires a bound socket
    #[error("transport is not bound")]
    NotBound,
    /// Address cannot be used for this operation
    #[error("invalid address")]
    InvalidAddress,
}

/// Kind of fixed-capacity table that ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Publishers,
    Subscriptions,
    Timers,
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Publishers => write!(f, "publishers"),
            Self::Subscriptions => write!(f, "subscriptions"),
            Self::Timers => write!(f, "timers"),
        }
    }
}

/// Errors that can occur in registry, endpoint and node operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PubSubError {
    /// Topic registry has no free slot; nothing was registered
    #[error("topic registry full: capacity {capacity}")]
    RegistryFull { capacity: usize },

    /// Topic name does not fit the fixed-size name slot
    #[error("topic name too long: {actual} > {max}")]
    TopicNameTooLong { max: usize, actual: usize },

    /// Node table is at capacity; the node is unchanged
    #[error("node {kind} table full: capacity {capacity}")]
    CapacityExceeded { kind: TableKind, capacity: usize },

    /// Message record does not fit one datagram
    #[error("message size {size} exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// Endpoint used before a successful `init`
    #[error("endpoint for topic {topic} is not initialized")]
    NotInitialized { topic: String },

    /// Transport failure (bind, group join or send)
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias for pub/sub operations.
pub type Result<T> = std::result::Result<T, PubSubError>;
