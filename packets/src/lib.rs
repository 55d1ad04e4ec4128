//! Pygmy telemetry packet format
//!
//! Packets are what the flight computer writes to power-safe storage and
//! sends over the radio link. Each packet is a fixed-width header followed
//! by a stream of self-describing blocks, all little-endian and unpadded,
//! bounded to [`MAX_PACKET_LEN`] bytes.
//!
//! ```
//! use pygmy_packets::{Block, Header, Packet};
//!
//! let mut packet = Packet::new();
//! packet.append_header(&Header::new("VA3INI", 0))?;
//! packet.push_block(&Block::pressure(1_500_000, 1013.25))?;
//! assert_eq!(packet.len(), 7 + 1 + 8);
//! # Ok::<(), pygmy_packets::Overflow>(())
//! ```

pub mod block;
pub mod error;
pub mod header;
pub mod packet;
pub mod reader;

pub use block::{Block, BlockKind, MAX_BLOCK_PAYLOAD, scale};
pub use error::{DecodeError, Overflow};
pub use header::{CALLSIGN_LEN, HEADER_LEN, Header};
pub use packet::{MAX_PACKET_LEN, Packet};
pub use reader::{DecodedPacket, PacketReader, split_packets};
