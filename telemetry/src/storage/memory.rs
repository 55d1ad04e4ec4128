//! In-memory log storage for testing

use super::{LogSink, LogStorage, log_file_name};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

/// Shared in-memory log directory.
///
/// Clones share state, so a test can keep one handle while the log loop
/// owns another.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

struct MemoryInner {
    files: BTreeMap<String, Vec<u8>>,
    max_file_bytes: u64,
    fail_list: bool,
    fail_creates: usize,
    fail_writes: usize,
    syncs: usize,
}

impl MemoryStorage {
    pub fn new(max_file_bytes: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                files: BTreeMap::new(),
                max_file_bytes,
                fail_list: false,
                fail_creates: 0,
                fail_writes: 0,
                syncs: 0,
            })),
        }
    }

    /// Add a file as if left by an earlier run
    pub fn insert(&self, name: &str, contents: &[u8]) {
        self.inner
            .lock()
            .files
            .insert(name.to_string(), contents.to_vec());
    }

    /// Contents of `log<seq>.bin`
    pub fn file(&self, seq: u32) -> Option<Vec<u8>> {
        self.inner.lock().files.get(&log_file_name(seq)).cloned()
    }

    /// All file names, sorted
    pub fn names(&self) -> Vec<String> {
        self.inner.lock().files.keys().cloned().collect()
    }

    /// Make directory listing fail
    pub fn fail_list(&self, fail: bool) {
        self.inner.lock().fail_list = fail;
    }

    /// Fail the next `n` file creations
    pub fn fail_creates(&self, n: usize) {
        self.inner.lock().fail_creates = n;
    }

    /// Fail the next `n` appends with an I/O error
    pub fn fail_writes(&self, n: usize) {
        self.inner.lock().fail_writes = n;
    }

    pub fn sync_count(&self) -> usize {
        self.inner.lock().syncs
    }
}

fn injected(what: &str) -> Error {
    Error::Io(io::Error::other(format!("injected {what} failure")))
}

impl LogStorage for MemoryStorage {
    fn list(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock();
        if inner.fail_list {
            return Err(injected("list"));
        }
        Ok(inner.files.keys().cloned().collect())
    }

    fn create(&mut self, seq: u32) -> Result<Box<dyn LogSink>> {
        let mut inner = self.inner.lock();
        if inner.fail_creates > 0 {
            inner.fail_creates -= 1;
            return Err(injected("create"));
        }
        let name = log_file_name(seq);
        inner.files.entry(name.clone()).or_default();
        Ok(Box::new(MemorySink {
            storage: self.clone(),
            name,
            seq,
        }))
    }
}

struct MemorySink {
    storage: MemoryStorage,
    name: String,
    seq: u32,
}

impl LogSink for MemorySink {
    fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.storage.inner.lock();
        let inner = &mut *guard;
        if inner.fail_writes > 0 {
            inner.fail_writes -= 1;
            return Err(injected("write"));
        }
        let file = inner.files.entry(self.name.clone()).or_default();
        let size = file.len() as u64;
        if size + bytes.len() as u64 > inner.max_file_bytes {
            return Err(Error::LogFull {
                seq: self.seq,
                size,
                incoming: bytes.len(),
                limit: inner.max_file_bytes,
            });
        }
        file.extend_from_slice(bytes);
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.storage.inner.lock().syncs += 1;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.storage
            .inner
            .lock()
            .files
            .get(&self.name)
            .map_or(0, |f| f.len() as u64)
    }
}
