//! # UDP Pub/Sub Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (registry, publish/take)
//! └── src/integration/
//!     ├── properties.rs # Core invariants over the in-memory network
//!     ├── udp_loopback.rs # Publisher/subscriber over 127.0.0.1
//!     └── node_flows.rs # pubsub-node runtime end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pubsub-tests
//! cargo test -p pubsub-tests integration::properties::
//! cargo bench -p pubsub-tests
//! ```

pub mod integration;
