//! Fixed-size message records
//!
//! One datagram carries exactly one record. The byte layout is owned by
//! the message type; this crate only moves `SIZE` bytes around.

/// A fixed-size, self-describing binary record.
///
/// `encode` and `decode` are always handed slices of exactly `SIZE` bytes.
pub trait Message: Sized {
    /// Encoded length in bytes.
    const SIZE: usize;

    /// Write the wire form into `out`.
    fn encode(&self, out: &mut [u8]);

    /// Rebuild a value from its wire form.
    fn decode(bytes: &[u8]) -> Self;
}

/// Implement [`Message`] as a raw copy of the in-memory representation.
///
/// The type must be `bytemuck::Pod`, so every byte pattern is a valid value
/// and no padding is read.
///
/// ```rust
/// use udp_pubsub::{raw_message, Message};
/// use udp_pubsub::bytemuck::{Pod, Zeroable};
///
/// #[derive(Clone, Copy, Pod, Zeroable)]
/// #[repr(C)]
/// struct MotorCommand {
///     target: f32,
///     kp: f32,
/// }
///
/// raw_message!(MotorCommand);
/// assert_eq!(MotorCommand::SIZE, 8);
/// ```
#[macro_export]
macro_rules! raw_message {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Message for $ty {
                const SIZE: usize = ::core::mem::size_of::<$ty>();

                fn encode(&self, out: &mut [u8]) {
                    out[..Self::SIZE].copy_from_slice($crate::bytemuck::bytes_of(self));
                }

                fn decode(bytes: &[u8]) -> Self {
                    $crate::bytemuck::pod_read_unaligned(&bytes[..Self::SIZE])
                }
            }
        )+
    };
}
