//! Value Objects for the pub/sub core

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Largest message record carried in one datagram (one Ethernet-MTU UDP payload).
pub const MAX_MESSAGE_SIZE: usize = 1472;

/// Default multicast group shared by publishers and subscribers.
pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 0, 1);

/// Monotonic instant in microseconds since an arbitrary clock origin.
///
/// Only differences between two timestamps from the same clock are meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The clock origin.
    pub const ZERO: Self = Self(0);

    /// Create a timestamp from microseconds.
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Get the underlying microseconds value.
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }

    /// Advance by a duration (saturating).
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(micros))
    }
}

/// Destination addressing bound to a publisher at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Single receiver
    Unicast(Ipv4Addr),
    /// Every host on the local subnet (255.255.255.255)
    Broadcast,
    /// Every host that joined the group
    Multicast(Ipv4Addr),
}

impl AddressMode {
    /// IP address datagrams are sent to for this mode.
    pub fn destination_ip(&self) -> Ipv4Addr {
        match self {
            Self::Unicast(ip) | Self::Multicast(ip) => *ip,
            Self::Broadcast => Ipv4Addr::BROADCAST,
        }
    }

    /// Multicast on the default group.
    pub fn default_multicast() -> Self {
        Self::Multicast(DEFAULT_MULTICAST_GROUP)
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unicast(ip) => write!(f, "unicast {ip}"),
            Self::Broadcast => write!(f, "broadcast"),
            Self::Multicast(ip) => write!(f, "multicast {ip}"),
        }
    }
}

/// Whether this process publishes to or subscribes from a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Publish,
    Subscribe,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publish => write!(f, "pub"),
            Self::Subscribe => write!(f, "sub"),
        }
    }
}

/// Reliability policy. Delivery is always best-effort over UDP; `Reliable`
/// is accepted for profile compatibility only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QoSReliability {
    Reliable,
    #[default]
    BestEffort,
}

/// History policy for the receive side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QoSHistory {
    #[default]
    KeepLast,
    KeepAll,
}

/// Quality of Service profile for publishers and subscribers.
///
/// `depth` caps how many datagrams one `spin_all` call may process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QoSProfile {
    pub reliability: QoSReliability,
    pub history: QoSHistory,
    depth: u8,
}

impl QoSProfile {
    /// Create a profile; a depth of 0 is raised to 1.
    pub fn new(reliability: QoSReliability, history: QoSHistory, depth: u8) -> Self {
        Self {
            reliability,
            history,
            depth: depth.max(1),
        }
    }

    /// Best effort, keep last 5.
    pub fn sensor_data() -> Self {
        Self::new(QoSReliability::BestEffort, QoSHistory::KeepLast, 5)
    }

    /// Same profile with a different depth.
    #[must_use]
    pub fn with_depth(self, depth: u8) -> Self {
        Self::new(self.reliability, self.history, depth)
    }

    /// Per-call processing ceiling.
    pub fn depth(&self) -> usize {
        usize::from(self.depth)
    }
}

impl Default for QoSProfile {
    /// Best effort, keep last 10.
    fn default() -> Self {
        Self::new(QoSReliability::BestEffort, QoSHistory::KeepLast, 10)
    }
}
