//! Packet header: station callsign plus rolling sequence number

use crate::error::DecodeError;

/// Fixed callsign width on the wire
pub const CALLSIGN_LEN: usize = 6;

/// Encoded header size (callsign + sequence byte)
pub const HEADER_LEN: usize = CALLSIGN_LEN + 1;

/// Header prefixed to every packet.
///
/// The callsign is a fixed-width field: shorter callsigns are zero padded,
/// longer ones are truncated. It is never null terminated on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    callsign: [u8; CALLSIGN_LEN],
    seq: u8,
}

impl Header {
    /// Build a header from a callsign and an initial sequence number.
    ///
    /// Copies at most [`CALLSIGN_LEN`] bytes of `callsign`.
    pub fn new(callsign: impl AsRef<[u8]>, seq: u8) -> Self {
        let src = callsign.as_ref();
        let n = src.len().min(CALLSIGN_LEN);
        let mut field = [0u8; CALLSIGN_LEN];
        field[..n].copy_from_slice(&src[..n]);
        Self {
            callsign: field,
            seq,
        }
    }

    /// Raw callsign field, including any zero padding
    pub fn callsign(&self) -> &[u8; CALLSIGN_LEN] {
        &self.callsign
    }

    /// Callsign with the zero padding stripped, lossily decoded for display
    pub fn callsign_str(&self) -> String {
        let end = self
            .callsign
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(CALLSIGN_LEN);
        String::from_utf8_lossy(&self.callsign[..end]).into_owned()
    }

    /// Current sequence number
    pub fn seq(&self) -> u8 {
        self.seq
    }

    /// Advance the sequence number, wrapping 255 -> 0
    pub fn increment(&mut self) {
        self.seq = self.seq.wrapping_add(1);
    }

    /// Wire representation
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..CALLSIGN_LEN].copy_from_slice(&self.callsign);
        out[CALLSIGN_LEN] = self.seq;
        out
    }

    /// Decode a header from the start of `bytes`
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::Truncated {
                what: "header",
                needed: HEADER_LEN,
                available: bytes.len(),
            });
        }
        let mut callsign = [0u8; CALLSIGN_LEN];
        callsign.copy_from_slice(&bytes[..CALLSIGN_LEN]);
        Ok(Self {
            callsign,
            seq: bytes[CALLSIGN_LEN],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_callsign_is_zero_padded() {
        let header = Header::new("VA3", 9);
        assert_eq!(header.callsign(), b"VA3\0\0\0");
        assert_eq!(header.callsign_str(), "VA3");
        assert_eq!(header.to_bytes(), *b"VA3\0\0\0\x09");
    }

    #[test]
    fn test_long_callsign_is_truncated() {
        let header = Header::new("VA3INIXYZ", 0);
        assert_eq!(header.callsign(), b"VA3INI");
        assert_eq!(header.to_bytes().len(), HEADER_LEN);
    }

    #[test]
    fn test_exact_width_callsign() {
        let header = Header::new(b"VE3ABC", 1);
        assert_eq!(header.callsign(), b"VE3ABC");
        assert_eq!(header.callsign_str(), "VE3ABC");
    }

    #[test]
    fn test_sequence_wraps() {
        let mut header = Header::new("VA3INI", 254);
        header.increment();
        assert_eq!(header.seq(), 255);
        header.increment();
        assert_eq!(header.seq(), 0);
    }

    #[test]
    fn test_decode() {
        let header = Header::new("VA3INI", 42);
        let bytes = header.to_bytes();
        assert_eq!(Header::decode(&bytes), Ok(header));
        assert!(matches!(
            Header::decode(&bytes[..4]),
            Err(DecodeError::Truncated { available: 4, .. })
        ));
    }
}
