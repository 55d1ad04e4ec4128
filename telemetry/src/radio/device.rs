//! Radio behind a character device
//!
//! The driver treats each `write` as one over-the-air frame, so a packet
//! must go out in a single call.

use super::RadioTransport;
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct DeviceRadio {
    path: PathBuf,
    device: File,
}

impl DeviceRadio {
    /// Open a radio device (e.g. "/dev/rn2903") for writing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let device = OpenOptions::new().write(true).open(&path)?;
        log::info!("Opened radio device: {}", path.display());
        Ok(Self { path, device })
    }
}

impl RadioTransport for DeviceRadio {
    fn transmit(&mut self, packet: &[u8]) -> Result<()> {
        let written = self.device.write(packet)?;
        if written != packet.len() {
            return Err(Error::ShortWrite {
                written,
                expected: packet.len(),
            });
        }
        Ok(())
    }

    fn recover(&mut self) -> Result<()> {
        self.device = OpenOptions::new().write(true).open(&self.path)?;
        log::info!("Reopened radio device: {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_each_transmit_is_one_write() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("radio");
        fs::write(&path, b"").unwrap();

        let mut radio = DeviceRadio::open(&path).unwrap();
        radio.transmit(b"packet-one").unwrap();
        radio.recover().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"packet-one");
    }

    #[test]
    fn test_missing_device() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            DeviceRadio::open(tmp.path().join("absent")),
            Err(Error::Io(_))
        ));
    }
}
