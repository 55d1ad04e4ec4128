//! Append-only packet buffer
//!
//! A [`Packet`] owns a fixed `[u8; MAX_PACKET_LEN]` array and a committed
//! length. Nothing is heap allocated: buffers are created once and reused
//! with [`Packet::reset`].
//!
//! ```text
//! +----------------+--------+-----------+--------+-----------+-----
//! | callsign[6]    | seq u8 | kind u8   | payload| kind u8   | ...
//! +----------------+--------+-----------+--------+-----------+-----
//! |<---- Header (7 bytes) ->|<------ Block ----->|
//! ```

use crate::block::{Block, BlockKind, MAX_BLOCK_PAYLOAD};
use crate::error::Overflow;
use crate::header::Header;
use std::fmt;

/// Protocol maximum packet length in bytes
pub const MAX_PACKET_LEN: usize = 255;

/// Fixed-capacity packet under construction or published
#[derive(Clone)]
pub struct Packet {
    data: [u8; MAX_PACKET_LEN],
    len: usize,
    capacity: usize,
}

impl Packet {
    /// Empty packet with the protocol maximum capacity
    pub fn new() -> Self {
        Self::with_capacity(MAX_PACKET_LEN)
    }

    /// Empty packet bounded to `capacity` bytes (clamped to [`MAX_PACKET_LEN`])
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: [0; MAX_PACKET_LEN],
            len: 0,
            capacity: capacity.min(MAX_PACKET_LEN),
        }
    }

    /// Discard the contents. Old bytes stay in the buffer until overwritten.
    #[inline]
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Committed length
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Capacity bound
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes still available
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    /// Committed bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Append raw bytes.
    ///
    /// Fails without touching the committed length if `bytes` does not fit.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), Overflow> {
        if bytes.len() > self.remaining() {
            return Err(Overflow {
                needed: bytes.len(),
                remaining: self.remaining(),
            });
        }
        let end = self.len + bytes.len();
        self.data[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }

    /// Append an encoded header
    pub fn append_header(&mut self, header: &Header) -> Result<(), Overflow> {
        self.append(&header.to_bytes())
    }

    /// Append a kind tag followed by its payload.
    ///
    /// Space for both is checked up front, so either the whole block lands
    /// or nothing does.
    pub fn append_block(&mut self, kind: BlockKind, payload: &[u8]) -> Result<(), Overflow> {
        let needed = 1 + payload.len();
        if needed > self.remaining() {
            return Err(Overflow {
                needed,
                remaining: self.remaining(),
            });
        }
        self.append(&[kind.tag()])?;
        self.append(payload)
    }

    /// Encode and append a typed block
    pub fn push_block(&mut self, block: &Block) -> Result<(), Overflow> {
        let mut payload = [0u8; MAX_BLOCK_PAYLOAD];
        let n = block.encode_payload(&mut payload);
        self.append_block(block.kind(), &payload[..n])
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Packet {}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}
