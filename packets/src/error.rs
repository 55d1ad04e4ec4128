//! Error types for the packet codec

/// Returned when an append would push a packet past its capacity.
///
/// This is the normal "packet is full" signal: the assembler reacts by
/// publishing what it has and starting a fresh packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("packet overflow: {needed} bytes needed, {remaining} remaining")]
pub struct Overflow {
    /// Bytes the rejected append required
    pub needed: usize,
    /// Bytes left in the packet at the time of the append
    pub remaining: usize,
}

/// Errors raised while decoding bytes read back from a log or the air
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Input ended in the middle of a header or block
    #[error("truncated {what}: need {needed} bytes, {available} available")]
    Truncated {
        /// What was being decoded ("header", "block")
        what: &'static str,
        /// Bytes required
        needed: usize,
        /// Bytes actually present
        available: usize,
    },

    /// Tag byte does not name a known block kind
    #[error("unknown block kind tag {0:#04x}")]
    UnknownKind(u8),

    /// Payload length does not match the kind's fixed layout
    #[error("block kind {kind:#04x} expects {expected} payload bytes, got {actual}")]
    PayloadLength {
        /// Kind tag
        kind: u8,
        /// Fixed payload size for the kind
        expected: usize,
        /// Size supplied
        actual: usize,
    },
}
