//! # Adapters
//!
//! Concrete std implementations of the driven ports.
//!
//! - `SystemClock` - monotonic clock over `std::time::Instant`
//! - `StaticConfigProvider` - in-code configuration
//! - `UdpTransport` / `UdpTransportProvider` - non-blocking UDP (requires "network")
//! - `TomlConfigProvider` - configuration files (requires "network")

pub mod config;
pub mod time;
#[cfg(feature = "network")]
pub mod transport;

pub use config::*;
pub use time::*;
#[cfg(feature = "network")]
pub use transport::*;
