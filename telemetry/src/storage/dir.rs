//! Log files in a filesystem directory

use super::{LogSink, LogStorage, log_file_name};
use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Log directory on a (power-safe) filesystem
pub struct DirStorage {
    dir: PathBuf,
    max_file_bytes: u64,
}

impl DirStorage {
    /// Use `dir` for log files, creating it if missing
    pub fn open<P: AsRef<Path>>(dir: P, max_file_bytes: u64) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_file_bytes,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LogStorage for DirStorage {
    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn create(&mut self, seq: u32) -> Result<Box<dyn LogSink>> {
        let path = self.dir.join(log_file_name(seq));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        log::info!("Logging to {} ({} bytes)", path.display(), size);
        Ok(Box::new(DirSink {
            file,
            seq,
            size,
            limit: self.max_file_bytes,
        }))
    }
}

/// Unbuffered so every packet reaches the filesystem before the next one
struct DirSink {
    file: File,
    seq: u32,
    size: u64,
    limit: u64,
}

impl DirSink {
    /// Drop whatever part of a failed write reached the file.
    ///
    /// If the file cannot be cut back, adopt its real size so the ceiling
    /// still counts every byte on disk.
    fn discard_partial(&mut self) {
        if let Err(e) = self.file.set_len(self.size) {
            log::warn!("Cannot truncate log{}.bin after failed write: {}", self.seq, e);
            match self.file.metadata() {
                Ok(meta) => self.size = meta.len(),
                Err(e) => log::warn!("Cannot stat log{}.bin: {}", self.seq, e),
            }
        }
    }

    fn full(&self, incoming: usize) -> Error {
        Error::LogFull {
            seq: self.seq,
            size: self.size,
            incoming,
            limit: self.limit,
        }
    }
}

impl LogSink for DirSink {
    fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if self.size + bytes.len() as u64 > self.limit {
            return Err(self.full(bytes.len()));
        }
        let result = self.file.write_all(bytes);
        if result.is_err() {
            self.discard_partial();
        }
        match result {
            Ok(()) => {
                self.size += bytes.len() as u64;
                Ok(())
            }
            // Filesystem limit below ours
            Err(e) if e.kind() == ErrorKind::FileTooLarge => Err(self.full(bytes.len())),
            Err(e) => Err(e.into()),
        }
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }
}
