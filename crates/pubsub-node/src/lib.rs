//! # Pub/Sub Node
//!
//! A runnable node on top of `udp-pubsub`: loads its configuration, attaches
//! heartbeat publishers and subscribers, and drives the cooperative loop at
//! a fixed rate.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`PUBSUB_CONFIG` file or built-in defaults)
//! 2. Apply `PUBSUB_*` environment overrides and validate
//! 3. Attach endpoints and the heartbeat timer
//! 4. Run until `max_iterations` or the link goes down

pub mod config;
pub mod heartbeat;
pub mod runtime;

pub use config::{apply_env_overrides, default_config, load_config};
pub use heartbeat::Heartbeat;
pub use runtime::{NodeRuntime, StepReport};
