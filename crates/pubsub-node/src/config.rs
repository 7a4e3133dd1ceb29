//! Configuration loading: file or defaults, then environment overrides.

use std::env;

use anyhow::{Context, Result};
use tracing::{info, warn};
use udp_pubsub::adapters::TomlConfigProvider;
use udp_pubsub::{
    AddressMode, ConfigProvider, NodeConfig, PublisherConfig, SubscriberConfig,
    DEFAULT_MULTICAST_GROUP,
};

/// Path of a TOML configuration file.
pub const ENV_CONFIG_PATH: &str = "PUBSUB_CONFIG";
/// Overrides `node.name`.
pub const ENV_NODE_NAME: &str = "PUBSUB_NODE_NAME";
/// Overrides `node.rate_hz`.
pub const ENV_RATE_HZ: &str = "PUBSUB_RATE_HZ";
/// Overrides `node.max_iterations`.
pub const ENV_MAX_ITERATIONS: &str = "PUBSUB_MAX_ITERATIONS";

/// Topic carrying heartbeats in the built-in configuration.
pub const HEARTBEAT_TOPIC: &str = "heartbeat";

/// Built-in configuration: heartbeats out and in on the default multicast
/// group, on the port derived from the topic name.
pub fn default_config() -> NodeConfig {
    NodeConfig {
        publishers: vec![PublisherConfig {
            topic: HEARTBEAT_TOPIC.to_string(),
            mode: AddressMode::Multicast(DEFAULT_MULTICAST_GROUP),
            port: None,
        }],
        subscribers: vec![SubscriberConfig {
            topic: HEARTBEAT_TOPIC.to_string(),
            port: None,
            multicast_group: Some(DEFAULT_MULTICAST_GROUP),
        }],
        ..NodeConfig::default()
    }
}

/// Load configuration from environment and files.
///
/// # Errors
///
/// Fails if the file named by `PUBSUB_CONFIG` cannot be loaded or the
/// final configuration does not validate.
pub fn load_config() -> Result<NodeConfig> {
    let mut config = match env::var(ENV_CONFIG_PATH) {
        Ok(path) => {
            let provider = TomlConfigProvider::load(&path)
                .with_context(|| format!("loading config file {path}"))?;
            info!(%path, "loaded configuration file");
            provider.node_config()
        }
        Err(_) => default_config(),
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok());
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Apply `PUBSUB_*` overrides read through `lookup`. Unparsable values are
/// logged and ignored.
pub fn apply_env_overrides(config: &mut NodeConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(name) = lookup(ENV_NODE_NAME) {
        config.name = name;
    }

    if let Some(raw) = lookup(ENV_RATE_HZ) {
        match raw.parse() {
            Ok(rate_hz) => config.rate_hz = rate_hz,
            Err(_) => warn!(value = %raw, "{ENV_RATE_HZ} is not a number"),
        }
    }

    if let Some(raw) = lookup(ENV_MAX_ITERATIONS) {
        match raw.parse() {
            Ok(n) => config.max_iterations = Some(n),
            Err(_) => warn!(value = %raw, "{ENV_MAX_ITERATIONS} is not a count"),
        }
    }
}
