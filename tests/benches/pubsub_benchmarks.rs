//! # UDP Pub/Sub Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Registry | `auto_port`, `register` up to capacity, `lookup_port` |
//! | Endpoints | publish + take over the in-memory network |
//! | Node | `dispatch_once` with a full timer table |

use std::sync::Arc;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use udp_pubsub::test_utils::{LoopbackNetwork, ManualClock};
use udp_pubsub::{
    auto_port, raw_message, AddressMode, Direction, Node, QoSProfile, Timestamp, TopicRegistry,
    DEFAULT_BASE_PORT, MAX_TIMERS,
};

#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct ImuSample {
    accel: [f32; 3],
    gyro: [f32; 3],
    stamp_us: u64,
}
raw_message!(ImuSample);

// ============================================================================
// Registry
// ============================================================================

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    group.bench_function("auto_port", |b| {
        b.iter(|| auto_port(black_box("/robot1/leg_controller/motor_cmd"), DEFAULT_BASE_PORT))
    });

    let names: Vec<String> = (0..TopicRegistry::DEFAULT_CAPACITY)
        .map(|i| format!("/robot1/topic_{i}"))
        .collect();

    group.throughput(Throughput::Elements(names.len() as u64));
    group.bench_function("register_full_table", |b| {
        b.iter(|| {
            let mut registry = TopicRegistry::new();
            for name in &names {
                let port = auto_port(name, DEFAULT_BASE_PORT);
                let _ = registry.register(name, port, 32, Direction::Publish);
            }
            registry
        })
    });

    let mut registry = TopicRegistry::new();
    for name in &names {
        let _ = registry.register(name, auto_port(name, DEFAULT_BASE_PORT), 32, Direction::Publish);
    }
    group.throughput(Throughput::Elements(1));
    group.bench_function("lookup_last", |b| {
        b.iter(|| registry.lookup_port(black_box("/robot1/topic_31")))
    });

    group.finish();
}

// ============================================================================
// Endpoints
// ============================================================================

fn bench_publish_take(c: &mut Criterion) {
    let net = LoopbackNetwork::new();
    let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
    let mut node =
        Node::new("bench", Arc::new(net.clone()), clock).with_registry(TopicRegistry::shared());

    let sub = node
        .attach_subscriber::<ImuSample>("imu", Some(7600), QoSProfile::sensor_data(), None)
        .unwrap();
    let publisher = node
        .attach_publisher::<ImuSample>("imu", AddressMode::Broadcast, Some(7600), QoSProfile::default())
        .unwrap();

    let sample = ImuSample {
        accel: [0.0, 0.0, 9.81],
        gyro: [0.01, -0.02, 0.0],
        stamp_us: 42,
    };

    let mut group = c.benchmark_group("endpoints");
    group.throughput(Throughput::Elements(1));
    group.bench_function("publish_take_loopback", |b| {
        b.iter(|| {
            if let Some(p) = node.publisher_mut(publisher) {
                let _ = p.publish(black_box(&sample));
            }
            node.subscriber_mut(sub).and_then(|s| s.take())
        })
    });
    group.finish();
}

// ============================================================================
// Node
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
    let mut node = Node::new("bench", Arc::new(LoopbackNetwork::new()), clock.clone())
        .with_registry(TopicRegistry::shared());
    for _ in 0..MAX_TIMERS {
        let _ = node.attach_timer(Duration::from_micros(1), || {});
    }

    c.bench_function("node/dispatch_once_full", |b| {
        b.iter(|| {
            clock.advance(Duration::from_micros(1));
            node.dispatch_once()
        })
    });
}

criterion_group!(benches, bench_registry, bench_publish_take, bench_dispatch);
criterion_main!(benches);
