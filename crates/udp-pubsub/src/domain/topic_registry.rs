//! Topic Registry
//!
//! Process-wide table mapping topic names to transport ports, message sizes
//! and direction. Storage is fixed at [`TopicRegistry::DEFAULT_CAPACITY`]
//! entries and never grows.

use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use tracing::{info, warn};

use super::errors::{PubSubError, Result};
use super::value_objects::Direction;

/// Longest topic name a registry slot can hold, in bytes.
pub const MAX_TOPIC_NAME_LEN: usize = 64;

/// Base of the derived port range.
pub const DEFAULT_BASE_PORT: u16 = 7000;

/// Width of the derived port range `[base, base + AUTO_PORT_SPAN)`.
pub const AUTO_PORT_SPAN: u16 = 1000;

const REGISTRY_CAPACITY: usize = 32;

/// Registry shared between nodes, publishers and subscribers.
pub type SharedRegistry = Arc<Mutex<TopicRegistry>>;

lazy_static! {
    static ref GLOBAL_REGISTRY: SharedRegistry = TopicRegistry::shared();
}

/// The process-wide registry.
pub fn global() -> SharedRegistry {
    Arc::clone(&GLOBAL_REGISTRY)
}

/// Derive a port from a topic name.
///
/// `hash = hash * 31 + byte` over the UTF-8 bytes with 32-bit wrapping,
/// folded into `[base, base + 1000)`. Distinct names may collide.
pub fn auto_port(name: &str, base: u16) -> u16 {
    let hash = name
        .bytes()
        .fold(0u32, |hash, byte| hash.wrapping_mul(31).wrapping_add(u32::from(byte)));
    // hash % 1000 < 1000 always fits u16
    base.wrapping_add((hash % u32::from(AUTO_PORT_SPAN)) as u16)
}

/// One registered topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    name: heapless::String<MAX_TOPIC_NAME_LEN>,
    pub port: u16,
    pub message_size: u32,
    pub direction: Direction,
}

impl TopicEntry {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// Fixed-capacity topic table.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    entries: heapless::Vec<TopicEntry, REGISTRY_CAPACITY>,
}

impl TopicRegistry {
    /// Number of topics a registry can hold.
    pub const DEFAULT_CAPACITY: usize = REGISTRY_CAPACITY;

    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry independent of [`global`].
    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Register a topic.
    ///
    /// Re-registering a known name succeeds without touching the table, even
    /// when the table is full. A port already used by a different name is
    /// logged and accepted.
    ///
    /// # Errors
    ///
    /// - `TopicNameTooLong` if `name` exceeds [`MAX_TOPIC_NAME_LEN`]
    /// - `RegistryFull` if a new name does not fit; nothing is stored
    pub fn register(
        &mut self,
        name: &str,
        port: u16,
        message_size: u32,
        direction: Direction,
    ) -> Result<()> {
        if self.find(name).is_some() {
            return Ok(());
        }

        let name_slot = heapless::String::try_from(name).map_err(|_| PubSubError::TopicNameTooLong {
            max: MAX_TOPIC_NAME_LEN,
            actual: name.len(),
        })?;

        if let Some(other) = self.entries.iter().find(|e| e.port == port) {
            warn!(
                topic = name,
                port,
                existing = other.name(),
                "port already used by another topic"
            );
        }

        self.entries
            .push(TopicEntry {
                name: name_slot,
                port,
                message_size,
                direction,
            })
            .map_err(|_| PubSubError::RegistryFull {
                capacity: Self::DEFAULT_CAPACITY,
            })
    }

    /// Port registered for `name`.
    pub fn lookup_port(&self, name: &str) -> Option<u16> {
        self.find(name).map(|e| e.port)
    }

    pub fn find(&self, name: &str) -> Option<&TopicEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TopicEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        Self::DEFAULT_CAPACITY
    }

    /// Forget every topic.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Emit one info record per registered topic.
    pub fn log_topics(&self) {
        info!(count = self.entries.len(), "registered topics");
        for entry in &self.entries {
            info!(
                topic = entry.name(),
                port = entry.port,
                size = entry.message_size,
                direction = %entry.direction,
                "topic"
            );
        }
    }
}
