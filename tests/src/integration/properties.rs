//! # Core Invariants
//!
//! Registry, subscriber intake, timer and node capacity behaviour checked
//! against the in-memory network and a manual clock.

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::time::Duration;

    use proptest::prelude::*;
    use udp_pubsub::test_utils::{LoopbackNetwork, ManualClock};
    use udp_pubsub::{
        auto_port, AddressMode, Clock, Direction, EndpointContext, Message, Node, PubSubError,
        QoSProfile, Subscriber, SubscriptionCallback, TableKind, Timer, Timestamp,
        TopicRegistry, TransportProvider, AUTO_PORT_SPAN, MAX_PUBLISHERS, MAX_SUBSCRIPTIONS,
        MAX_TIMERS,
    };

    use crate::integration::fixtures::MotorCommand;

    const PORT: u16 = 7300;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    struct Bench {
        net: LoopbackNetwork,
        clock: Arc<ManualClock>,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                net: LoopbackNetwork::new(),
                clock: Arc::new(ManualClock::new(Timestamp::from_micros(1_000))),
            }
        }

        fn subscriber(
            &self,
            qos: QoSProfile,
            callback: Option<SubscriptionCallback<MotorCommand>>,
        ) -> Subscriber<MotorCommand> {
            let ctx = EndpointContext::new(
                self.net.open(),
                self.clock.clone(),
                TopicRegistry::shared(),
            );
            let mut sub = Subscriber::new("/motor_cmd", PORT, qos, callback, ctx).unwrap();
            sub.init().unwrap();
            sub
        }

        fn node(&self) -> Node {
            Node::new("prop_node", Arc::new(self.net.clone()), self.clock.clone())
                .with_registry(TopicRegistry::shared())
        }
    }

    fn topic_name() -> impl Strategy<Value = String> {
        "/[a-z_]{1,40}"
    }

    // =========================================================================
    // REGISTRY
    // =========================================================================

    proptest! {
        #[test]
        fn test_repeat_registration_is_idempotent(
            name in topic_name(),
            port in any::<u16>(),
            size in 1u32..1472,
        ) {
            let mut registry = TopicRegistry::new();
            prop_assert!(registry.register(&name, port, size, Direction::Publish).is_ok());
            let first = registry.lookup_port(&name);

            prop_assert!(registry.register(&name, port, size, Direction::Publish).is_ok());
            prop_assert_eq!(registry.len(), 1);
            prop_assert_eq!(registry.lookup_port(&name), first);
        }

        #[test]
        fn test_auto_port_is_deterministic_and_bounded(
            name in ".{0,64}",
            base in 0u16..(u16::MAX - AUTO_PORT_SPAN),
        ) {
            let port = auto_port(&name, base);
            prop_assert_eq!(port, auto_port(&name, base));
            prop_assert!(port >= base && port < base + AUTO_PORT_SPAN);
        }
    }

    #[test]
    fn test_full_registry_still_accepts_known_names() {
        let mut registry = TopicRegistry::new();
        for i in 0..TopicRegistry::DEFAULT_CAPACITY {
            let port = 7000 + u16::try_from(i).unwrap();
            registry
                .register(&format!("/t{i}"), port, 8, Direction::Subscribe)
                .unwrap();
        }

        assert!(registry.register("/t0", 7000, 8, Direction::Subscribe).is_ok());
        assert_eq!(
            registry.register("/overflow", 7999, 8, Direction::Subscribe),
            Err(PubSubError::RegistryFull {
                capacity: TopicRegistry::DEFAULT_CAPACITY
            })
        );
        assert_eq!(registry.len(), TopicRegistry::DEFAULT_CAPACITY);
    }

    // =========================================================================
    // SUBSCRIBER INTAKE
    // =========================================================================

    proptest! {
        #[test]
        fn test_undersized_datagram_is_dropped(len in 0usize..MotorCommand::SIZE) {
            let bench = Bench::new();
            let calls = Rc::new(Cell::new(0u32));
            let seen = Rc::clone(&calls);
            let callback: SubscriptionCallback<MotorCommand> =
                Box::new(move |_| seen.set(seen.get() + 1));
            let mut sub = bench.subscriber(QoSProfile::default(), Some(callback));

            prop_assert!(bench.net.inject(PORT, &vec![0xAB; len]));
            prop_assert!(!sub.spin_once());

            prop_assert_eq!(sub.received_count(), 0);
            prop_assert_eq!(sub.dropped_count(), 1);
            prop_assert_eq!(calls.get(), 0);
        }

        #[test]
        fn test_exact_size_datagram_round_trips(
            motor_id in any::<u32>(),
            target in any::<f32>().prop_filter("comparable", |f| !f.is_nan()),
        ) {
            let bench = Bench::new();
            let mut sub = bench.subscriber(QoSProfile::default(), None);
            let sent = MotorCommand::new(motor_id, target);

            let mut payload = [0u8; MotorCommand::SIZE];
            sent.encode(&mut payload);
            prop_assert!(bench.net.inject(PORT, &payload));

            let received = sub.take();
            prop_assert_eq!(received, Some(sent));
            prop_assert_eq!(
                received.map(|m| m.target.to_bits()),
                Some(sent.target.to_bits())
            );
            prop_assert_eq!(sub.received_count(), 1);
            prop_assert_eq!(sub.dropped_count(), 0);
        }

        #[test]
        fn test_spin_all_stops_at_depth(depth in 1u8..20, pending in 0usize..40) {
            let bench = Bench::new();
            let mut sub = bench.subscriber(QoSProfile::default().with_depth(depth), None);
            let mut payload = [0u8; MotorCommand::SIZE];
            MotorCommand::new(1, 0.5).encode(&mut payload);
            for _ in 0..pending {
                bench.net.inject(PORT, &payload);
            }

            let processed = sub.spin_all();
            prop_assert_eq!(processed, pending.min(usize::from(depth)));
            prop_assert_eq!(bench.net.pending(PORT), pending - processed);
        }
    }

    #[test]
    fn test_oversized_datagram_uses_leading_bytes() {
        let bench = Bench::new();
        let mut sub = bench.subscriber(QoSProfile::default(), None);
        let sent = MotorCommand::new(9, 1.5);

        let mut payload = vec![0xEE; MotorCommand::SIZE + 8];
        sent.encode(&mut payload);
        bench.net.inject(PORT, &payload);

        assert_eq!(sub.take(), Some(sent));
        assert_eq!(sub.dropped_count(), 0);
    }

    // =========================================================================
    // TIMER
    // =========================================================================

    proptest! {
        #[test]
        fn test_timer_does_not_catch_up(period_ms in 1u64..1_000, missed in 1u32..10) {
            let period = Duration::from_millis(period_ms);
            let start = Timestamp::from_micros(5_000);
            let fired = Rc::new(Cell::new(0u32));
            let counter = Rc::clone(&fired);
            let mut timer = Timer::new(period, move || counter.set(counter.get() + 1), start).unwrap();

            let jumped = start.saturating_add(period * missed);
            prop_assert!(timer.spin_once(jumped));
            prop_assert!(!timer.spin_once(jumped));

            prop_assert_eq!(fired.get(), 1);
            prop_assert_eq!(timer.call_count(), 1);
            prop_assert_eq!(timer.last_fire_time(), jumped);
        }
    }

    #[test]
    fn test_node_timer_skips_missed_periods() {
        let bench = Bench::new();
        let mut node = bench.node();
        let handle = node.attach_timer(Duration::from_millis(10), || {}).unwrap();

        bench.clock.advance(Duration::from_millis(30));
        assert_eq!(node.dispatch_once(), 1);
        assert_eq!(node.dispatch_once(), 0);

        let now = bench.clock.now();
        assert_eq!(node.timer_mut(handle).unwrap().last_fire_time(), now);
    }

    // =========================================================================
    // NODE CAPACITY
    // =========================================================================

    #[test]
    fn test_publisher_capacity_ceiling() {
        let bench = Bench::new();
        let mut node = bench.node();
        for i in 0..MAX_PUBLISHERS {
            assert!(node
                .attach_publisher::<MotorCommand>(
                    &format!("pub{i}"),
                    AddressMode::Broadcast,
                    None,
                    QoSProfile::default(),
                )
                .is_ok());
        }

        let err = node
            .attach_publisher::<MotorCommand>("one_more", AddressMode::Broadcast, None, QoSProfile::default())
            .unwrap_err();
        assert_eq!(
            err,
            PubSubError::CapacityExceeded {
                kind: TableKind::Publishers,
                capacity: MAX_PUBLISHERS
            }
        );
        assert_eq!(node.publisher_count(), MAX_PUBLISHERS);
    }

    #[test]
    fn test_subscription_capacity_ceiling() {
        let bench = Bench::new();
        let mut node = bench.node();
        for i in 0..MAX_SUBSCRIPTIONS {
            let port = PORT + 1 + u16::try_from(i).unwrap();
            assert!(node
                .attach_subscriber::<MotorCommand>(&format!("sub{i}"), Some(port), QoSProfile::default(), None)
                .is_ok());
        }

        assert!(matches!(
            node.attach_subscriber::<MotorCommand>("one_more", Some(PORT), QoSProfile::default(), None),
            Err(PubSubError::CapacityExceeded {
                kind: TableKind::Subscriptions,
                ..
            })
        ));
        assert_eq!(node.subscriber_count(), MAX_SUBSCRIPTIONS);
    }

    #[test]
    fn test_timer_capacity_ceiling() {
        let bench = Bench::new();
        let mut node = bench.node();
        for _ in 0..MAX_TIMERS {
            assert!(node.attach_timer(Duration::from_millis(5), || {}).is_ok());
        }

        assert!(matches!(
            node.attach_timer(Duration::from_millis(5), || {}),
            Err(PubSubError::CapacityExceeded {
                kind: TableKind::Timers,
                ..
            })
        ));
        assert_eq!(node.timer_count(), MAX_TIMERS);
    }
}
