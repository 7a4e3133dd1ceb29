//! Integration scenarios. Each module is test-only.

pub mod node_flows;
pub mod properties;
pub mod udp_loopback;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::net::UdpSocket;
    use std::time::{Duration, Instant};

    use bytemuck::{Pod, Zeroable};
    use udp_pubsub::raw_message;

    /// 16-byte command record used across scenarios.
    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    pub struct MotorCommand {
        pub motor_id: u32,
        pub target: f32,
        pub kp: f32,
        pub kd: f32,
    }
    raw_message!(MotorCommand);

    impl MotorCommand {
        pub fn new(motor_id: u32, target: f32) -> Self {
            Self {
                motor_id,
                target,
                kp: 5.0,
                kd: 0.1,
            }
        }
    }

    /// A port the OS considers free right now.
    pub fn free_port() -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap().port()
    }

    /// Poll `f` until it returns true or two seconds pass.
    pub fn eventually(mut f: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }
}
