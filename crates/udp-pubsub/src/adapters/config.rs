use crate::domain::{NodeConfig, PublisherConfig, SubscriberConfig};
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - In-code configuration
// ============================================================================

/// Configuration assembled in code.
///
/// For file-based configuration, use `TomlConfigProvider`.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: NodeConfig,
}

impl StaticConfigProvider {
    /// Start from `NodeConfig::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher: PublisherConfig) -> Self {
        self.config.publishers.push(publisher);
        self
    }

    #[must_use]
    pub fn with_subscriber(mut self, subscriber: SubscriberConfig) -> Self {
        self.config.subscribers.push(subscriber);
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn node_config(&self) -> NodeConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider - File configuration (requires "network" feature)
// ============================================================================

#[cfg(feature = "network")]
mod toml_config {
    use super::*;
    use crate::domain::AddressMode;
    use serde::Deserialize;
    use std::fs;
    use std::net::Ipv4Addr;
    use std::path::Path;
    use std::time::Duration;
    use thiserror::Error;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct ConfigFile {
        #[serde(default)]
        node: NodeSection,
        #[serde(default)]
        publishers: Vec<PublisherEntry>,
        #[serde(default)]
        subscribers: Vec<SubscriberEntry>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct NodeSection {
        name: Option<String>,
        namespace: Option<String>,
        rate_hz: Option<f64>,
        heartbeat_period_ms: Option<u64>,
        max_iterations: Option<u64>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct PublisherEntry {
        topic: String,
        mode: String,
        address: Option<String>,
        port: Option<u16>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct SubscriberEntry {
        topic: String,
        port: Option<u16>,
        multicast_group: Option<String>,
    }

    /// TOML-based configuration provider.
    ///
    /// # Config File Format
    ///
    /// ```toml
    /// [node]
    /// name = "leg_controller"
    /// namespace = "robot1"
    /// rate_hz = 50.0
    /// heartbeat_period_ms = 500
    /// max_iterations = 1000
    ///
    /// [[publishers]]
    /// topic = "heartbeat"
    /// mode = "multicast"        # unicast | broadcast | multicast
    /// address = "239.255.0.1"   # required for unicast
    /// port = 7100
    ///
    /// [[subscribers]]
    /// topic = "heartbeat"
    /// port = 7100
    /// multicast_group = "239.255.0.1"
    /// ```
    ///
    /// Omitted values fall back to `NodeConfig::default()`; omitted ports
    /// are derived from the topic name.
    #[derive(Debug, Clone)]
    pub struct TomlConfigProvider {
        config: NodeConfig,
    }

    impl TomlConfigProvider {
        /// Load configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// Returns error if the file cannot be read, parsed or validated.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

            Self::parse(&content)
        }

        /// Parse configuration from a TOML string.
        ///
        /// # Errors
        ///
        /// Returns error on malformed TOML, unknown address modes, bad
        /// addresses or values rejected by `NodeConfig::validate`.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

            let defaults = NodeConfig::default();
            let node = file.node;
            let config = NodeConfig {
                name: node.name.unwrap_or(defaults.name),
                namespace: node.namespace.filter(|ns| !ns.is_empty()),
                rate_hz: node.rate_hz.unwrap_or(defaults.rate_hz),
                heartbeat_period: node
                    .heartbeat_period_ms
                    .map_or(defaults.heartbeat_period, Duration::from_millis),
                max_iterations: node.max_iterations,
                publishers: file
                    .publishers
                    .into_iter()
                    .map(Self::publisher)
                    .collect::<Result<_, _>>()?,
                subscribers: file
                    .subscribers
                    .into_iter()
                    .map(Self::subscriber)
                    .collect::<Result<_, _>>()?,
            };

            config
                .validate()
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
            Ok(Self { config })
        }

        /// The parsed configuration.
        pub fn config(&self) -> &NodeConfig {
            &self.config
        }

        fn publisher(entry: PublisherEntry) -> Result<PublisherConfig, ConfigError> {
            let address = entry.address.as_deref().map(parse_ipv4).transpose()?;
            let mode = match (entry.mode.to_ascii_lowercase().as_str(), address) {
                ("unicast", Some(ip)) => AddressMode::Unicast(ip),
                ("unicast", None) => {
                    return Err(ConfigError::InvalidValue(format!(
                        "unicast publisher {:?} needs an address",
                        entry.topic
                    )))
                }
                ("broadcast", _) => AddressMode::Broadcast,
                ("multicast", None) => AddressMode::default_multicast(),
                ("multicast", Some(group)) if group.is_multicast() => AddressMode::Multicast(group),
                ("multicast", Some(group)) => {
                    return Err(ConfigError::InvalidValue(format!(
                        "{group} is not a multicast group"
                    )))
                }
                (other, _) => return Err(ConfigError::UnknownMode(other.to_string())),
            };

            Ok(PublisherConfig {
                topic: entry.topic,
                mode,
                port: entry.port,
            })
        }

        fn subscriber(entry: SubscriberEntry) -> Result<SubscriberConfig, ConfigError> {
            let multicast_group = entry.multicast_group.as_deref().map(parse_ipv4).transpose()?;
            if let Some(group) = multicast_group.filter(|g| !g.is_multicast()) {
                return Err(ConfigError::InvalidValue(format!(
                    "{group} is not a multicast group"
                )));
            }
            Ok(SubscriberConfig {
                topic: entry.topic,
                port: entry.port,
                multicast_group,
            })
        }
    }

    fn parse_ipv4(s: &str) -> Result<Ipv4Addr, ConfigError> {
        s.parse()
            .map_err(|_| ConfigError::InvalidAddress(s.to_string()))
    }

    impl ConfigProvider for TomlConfigProvider {
        fn node_config(&self) -> NodeConfig {
            self.config.clone()
        }
    }

    /// Errors that can occur during config loading.
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum ConfigError {
        /// File I/O error.
        #[error("failed to read {path}: {error}")]
        Io {
            /// Path of the file that failed to load.
            path: String,
            /// Error message from the I/O operation.
            error: String,
        },
        /// TOML parsing error.
        #[error("failed to parse config: {0}")]
        Parse(String),
        /// Publisher mode other than unicast, broadcast or multicast.
        #[error("unknown address mode: {0}")]
        UnknownMode(String),
        /// Not an IPv4 address.
        #[error("invalid IPv4 address: {0}")]
        InvalidAddress(String),
        /// Value parsed but rejected.
        #[error("invalid config value: {0}")]
        InvalidValue(String),
    }
}

#[cfg(feature = "network")]
pub use toml_config::{ConfigError, TomlConfigProvider};
