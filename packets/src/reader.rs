//! Splitting a raw packet stream back into packets
//!
//! Log files are a plain concatenation of packets with no length prefix.
//! The framing is recovered by replaying the layout: a header, then blocks
//! for as long as the next byte is a known kind tag. Any other byte starts
//! the next header.
//!
//! Callsigns are printable ASCII, so their first byte never collides with a
//! kind tag (0x00..=0x07). A callsign starting with one of those bytes cannot
//! be split reliably.

use crate::block::{Block, BlockKind};
use crate::error::DecodeError;
use crate::header::{HEADER_LEN, Header};

/// A packet recovered from a byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket<'a> {
    pub header: Header,
    pub blocks: Vec<Block>,
    /// The packet's bytes as they appeared in the stream
    pub raw: &'a [u8],
}

/// Iterator over the packets in a concatenated stream.
///
/// Yields one error and then stops if the stream is malformed.
pub struct PacketReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Offset of the next unread byte
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_packet(&mut self) -> Result<DecodedPacket<'a>, DecodeError> {
        let start = self.pos;
        let header = Header::decode(&self.bytes[start..])?;
        let mut at = start + HEADER_LEN;
        let mut blocks = Vec::new();

        while let Some(&tag) = self.bytes.get(at) {
            if BlockKind::from_tag(tag).is_none() {
                break;
            }
            let (block, used) = Block::decode_tagged(&self.bytes[at..])?;
            blocks.push(block);
            at += used;
        }

        self.pos = at;
        Ok(DecodedPacket {
            header,
            blocks,
            raw: &self.bytes[start..at],
        })
    }
}

impl<'a> Iterator for PacketReader<'a> {
    type Item = Result<DecodedPacket<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let result = self.read_packet();
        if result.is_err() {
            self.pos = self.bytes.len();
        }
        Some(result)
    }
}

/// Split a whole stream, failing on the first malformed packet
pub fn split_packets(bytes: &[u8]) -> Result<Vec<DecodedPacket<'_>>, DecodeError> {
    PacketReader::new(bytes).collect()
}
