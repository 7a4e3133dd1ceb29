use std::sync::Arc;

use crate::domain::SharedRegistry;
use crate::ports::{Clock, DatagramTransport};

/// Collaborators handed to a publisher or subscriber at construction.
pub struct EndpointContext {
    pub transport: Box<dyn DatagramTransport>,
    pub clock: Arc<dyn Clock>,
    pub registry: SharedRegistry,
}

impl EndpointContext {
    pub fn new(
        transport: Box<dyn DatagramTransport>,
        clock: Arc<dyn Clock>,
        registry: SharedRegistry,
    ) -> Self {
        Self {
            transport,
            clock,
            registry,
        }
    }
}

/// Transport lifecycle of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Constructed, `init` not yet called
    Unbound,
    Ready,
    /// Last `init` attempt failed; safe to drop, unusable
    Failed,
    /// Transport closed
    Released,
}
