//! # Real UDP
//!
//! Publishers and subscribers over `127.0.0.1` sockets with the system
//! clock. Ports are picked from the OS free pool per test.

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
    use std::rc::Rc;
    use std::sync::Arc;

    use udp_pubsub::adapters::{SystemClock, UdpTransportProvider};
    use udp_pubsub::{
        AddressMode, EndpointContext, EndpointState, Message, Node, Publisher, QoSProfile,
        Subscriber, SubscriptionCallback, TopicRegistry, TransportProvider,
    };

    use crate::integration::fixtures::{eventually, free_port, MotorCommand};

    fn context() -> EndpointContext {
        EndpointContext::new(
            UdpTransportProvider::new().open(),
            Arc::new(SystemClock::new()),
            TopicRegistry::shared(),
        )
    }

    fn localhost_publisher(port: u16) -> Publisher<MotorCommand> {
        let mut publisher = Publisher::new(
            "/motor_cmd",
            AddressMode::Unicast(Ipv4Addr::LOCALHOST),
            port,
            QoSProfile::default(),
            context(),
        )
        .unwrap();
        publisher.init().unwrap();
        publisher
    }

    #[test]
    fn test_unicast_publish_reaches_callback() {
        let port = free_port();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        let callback: SubscriptionCallback<MotorCommand> =
            Box::new(move |cmd| sink.borrow_mut().push(*cmd));

        let mut sub = Subscriber::new("/motor_cmd", port, QoSProfile::default(), Some(callback), context())
            .unwrap();
        sub.init().unwrap();
        let mut publisher = localhost_publisher(port);

        let cmd = MotorCommand::new(3, 0.25);
        publisher.publish(&cmd).unwrap();

        assert!(eventually(|| sub.spin_once()));
        assert_eq!(*received.borrow(), vec![cmd]);
        assert_eq!(publisher.sent_count(), 1);
        assert!(publisher.last_send_time().is_some());
        assert_eq!(sub.received_count(), 1);
        assert!(sub.last_receive_time().is_some());
    }

    #[test]
    fn test_raw_short_datagram_dropped() {
        let port = free_port();
        let mut sub = Subscriber::<MotorCommand>::new("/motor_cmd", port, QoSProfile::default(), None, context())
            .unwrap();
        sub.init().unwrap();
        let mut publisher = localhost_publisher(port);

        publisher.publish_raw(&[1, 2, 3]).unwrap();
        assert_eq!(publisher.sent_count(), 0);

        assert!(eventually(|| {
            sub.spin_once();
            sub.dropped_count() == 1
        }));
        assert_eq!(sub.received_count(), 0);
    }

    #[test]
    fn test_foreign_sender_with_padding_accepted() {
        let port = free_port();
        let mut sub = Subscriber::<MotorCommand>::new("/motor_cmd", port, QoSProfile::default(), None, context())
            .unwrap();
        sub.init().unwrap();

        let cmd = MotorCommand::new(11, -2.0);
        let mut payload = vec![0u8; MotorCommand::SIZE + 4];
        cmd.encode(&mut payload);
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(&payload, SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
            .unwrap();

        let mut taken = None;
        assert!(eventually(|| {
            taken = sub.take();
            taken.is_some()
        }));
        assert_eq!(taken, Some(cmd));
    }

    #[test]
    fn test_second_bind_on_port_fails() {
        let port = free_port();
        let mut first = Subscriber::<MotorCommand>::new("/a", port, QoSProfile::default(), None, context())
            .unwrap();
        first.init().unwrap();

        let mut second = Subscriber::<MotorCommand>::new("/b", port, QoSProfile::default(), None, context())
            .unwrap();
        assert!(second.init().is_err());
        assert_eq!(second.state(), EndpointState::Failed);
        assert!(second.take().is_none());
    }

    #[test]
    fn test_release_frees_port() {
        let port = free_port();
        let mut sub = Subscriber::<MotorCommand>::new("/motor_cmd", port, QoSProfile::default(), None, context())
            .unwrap();
        sub.init().unwrap();
        sub.release();
        assert_eq!(sub.state(), EndpointState::Released);

        assert!(UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)).is_ok());
    }

    #[test]
    fn test_node_over_udp() {
        let port = free_port();
        let mut node = Node::with_namespace(
            "leg",
            "robot1",
            Arc::new(UdpTransportProvider::new()),
            Arc::new(SystemClock::new()),
        )
        .with_registry(TopicRegistry::shared());

        let sub = node
            .attach_subscriber::<MotorCommand>("motor_cmd", Some(port), QoSProfile::sensor_data(), None)
            .unwrap();
        let publisher = node
            .attach_publisher::<MotorCommand>(
                "motor_cmd",
                AddressMode::Unicast(Ipv4Addr::LOCALHOST),
                Some(port),
                QoSProfile::default(),
            )
            .unwrap();
        assert!(node.ok());

        for i in 0..3 {
            node.publisher_mut(publisher)
                .unwrap()
                .publish(&MotorCommand::new(i, 0.0))
                .unwrap();
        }

        let mut total = 0;
        assert!(eventually(|| {
            total += node.spin_subscriber(sub);
            total == 3
        }));

        let registry = node.registry().lock();
        assert_eq!(registry.lookup_port("/robot1/motor_cmd"), Some(port));
        assert_eq!(registry.len(), 1);
    }
}
