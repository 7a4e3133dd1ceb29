//! # Node Runtime Flows
//!
//! `pubsub-node` from configuration file to heartbeat exchange.

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use pubsub_node::{apply_env_overrides, Heartbeat, NodeRuntime};
    use udp_pubsub::adapters::{SystemClock, TomlConfigProvider, UdpTransportProvider};
    use udp_pubsub::test_utils::{LoopbackNetwork, ManualClock};
    use udp_pubsub::{ConfigProvider, Message, Timestamp, TopicRegistry};

    use crate::integration::fixtures::free_port;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_config_drives_heartbeats() {
        let file = write_config(
            r#"
            [node]
            name = "leg"
            rate_hz = 100.0
            heartbeat_period_ms = 30
            max_iterations = 10

            [[publishers]]
            topic = "heartbeat"
            mode = "broadcast"
            port = 7450

            [[subscribers]]
            topic = "heartbeat"
            port = 7450
            "#,
        );
        let config = TomlConfigProvider::load(file.path()).unwrap().node_config();

        let net = LoopbackNetwork::new();
        let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
        let mut runtime =
            NodeRuntime::with_registry(&config, Arc::new(net.clone()), clock.clone(), TopicRegistry::shared())
                .unwrap();

        // 10 ms ticks, heartbeat every 30 ms: fires at 30, 60 and 90 ms.
        assert_eq!(runtime.run(), 10);
        assert_eq!(runtime.heartbeats_sent(), 3);
        assert_eq!(runtime.heartbeats_received(), 3);

        let seqs: Vec<u32> = net
            .sent()
            .iter()
            .map(|d| Heartbeat::decode(&d.payload).seq)
            .collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert!(net.sent().iter().all(|d| d.destination.port() == 7450));
    }

    #[test]
    fn test_env_override_limits_iterations() {
        let mut config = pubsub_node::default_config();
        apply_env_overrides(&mut config, |key| {
            (key == pubsub_node::config::ENV_MAX_ITERATIONS).then(|| "3".to_string())
        });

        let net = LoopbackNetwork::new();
        let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
        let mut runtime =
            NodeRuntime::with_registry(&config, Arc::new(net.clone()), clock.clone(), TopicRegistry::shared())
                .unwrap();

        assert_eq!(runtime.run(), 3);
        assert_eq!(clock.sleeps().len(), 3);
    }

    #[test]
    fn test_heartbeats_over_udp() {
        let port = free_port();
        let file = write_config(&format!(
            r#"
            [node]
            name = "udp_node"
            rate_hz = 500.0
            heartbeat_period_ms = 4
            max_iterations = 100

            [[publishers]]
            topic = "heartbeat"
            mode = "unicast"
            address = "127.0.0.1"
            port = {port}

            [[subscribers]]
            topic = "heartbeat"
            port = {port}
            "#
        ));
        let config = TomlConfigProvider::load(file.path()).unwrap().node_config();

        let mut runtime = NodeRuntime::with_registry(
            &config,
            Arc::new(UdpTransportProvider::new()),
            Arc::new(SystemClock::new()),
            TopicRegistry::shared(),
        )
        .unwrap();

        let started = std::time::Instant::now();
        assert_eq!(runtime.run(), 100);
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert!(runtime.heartbeats_sent() > 0);
        assert!(runtime.heartbeats_received() > 0);
        assert!(runtime.heartbeats_received() <= runtime.heartbeats_sent());
    }
}
