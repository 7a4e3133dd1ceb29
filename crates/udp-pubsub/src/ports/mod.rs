//! Ports Layer - Hexagonal Architecture interfaces
//!
//! Driven ports the core consumes. Adapters and test doubles implement them.

pub mod outbound;

pub use outbound::*;
