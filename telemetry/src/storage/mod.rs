//! Power-safe log storage
//!
//! Packets are appended raw to `log<seq>.bin`. A file is never grown past
//! the configured ceiling: the write that would cross it fails with
//! [`Error::LogFull`](crate::Error::LogFull) and the log loop rotates.

mod dir;
mod memory;

pub use dir::DirStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// Directory of sequence-numbered log files
pub trait LogStorage: Send {
    /// Names of the entries in the log directory
    fn list(&self) -> Result<Vec<String>>;

    /// Open `log<seq>.bin` for appending, creating it if needed
    fn create(&mut self, seq: u32) -> Result<Box<dyn LogSink>>;
}

/// One open log file
pub trait LogSink: Send {
    /// Append `bytes` in full, or fail with `LogFull` without writing anything
    fn append(&mut self, bytes: &[u8]) -> Result<()>;

    /// Flush to durable storage
    fn sync(&mut self) -> Result<()>;

    /// Bytes in the file so far
    fn size(&self) -> u64;
}

/// File name for sequence number `seq`
pub fn log_file_name(seq: u32) -> String {
    format!("log{seq}.bin")
}

/// Sequence number encoded in a log file name, `None` for anything else
pub fn parse_log_seq(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("log")?.strip_suffix(".bin")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Sequence number to resume at: one past the highest existing file
pub fn next_sequence<'a>(names: impl IntoIterator<Item = &'a str>) -> u32 {
    names
        .into_iter()
        .filter_map(parse_log_seq)
        .max()
        .map_or(0, |max| max.wrapping_add(1))
}

/// Scan `storage` and pick the resume point.
///
/// A failed scan is not fatal: numbering restarts at 0.
pub fn recover_sequence(storage: &dyn LogStorage) -> u32 {
    match storage.list() {
        Ok(names) => next_sequence(names.iter().map(String::as_str)),
        Err(e) => {
            log::warn!("Could not scan log directory ({}), starting at log0", e);
            0
        }
    }
}
