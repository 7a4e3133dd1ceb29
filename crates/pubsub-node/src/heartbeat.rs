use udp_pubsub::Message;

/// Liveness record published by every node.
///
/// Wire layout, little-endian: `seq: u32` then `uptime_us: u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heartbeat {
    pub seq: u32,
    pub uptime_us: u64,
}

impl Message for Heartbeat {
    const SIZE: usize = 12;

    fn encode(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.seq.to_le_bytes());
        out[4..12].copy_from_slice(&self.uptime_us.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut seq = [0u8; 4];
        let mut uptime_us = [0u8; 8];
        seq.copy_from_slice(&bytes[0..4]);
        uptime_us.copy_from_slice(&bytes[4..12]);
        Self {
            seq: u32::from_le_bytes(seq),
            uptime_us: u64::from_le_bytes(uptime_us),
        }
    }
}
