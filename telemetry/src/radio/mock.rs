//! Mock radio for testing

use super::RadioTransport;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// Records every transmitted frame; failures can be injected.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct MockRadio {
    inner: Arc<Mutex<MockRadioInner>>,
}

#[derive(Default)]
struct MockRadioInner {
    frames: Vec<Vec<u8>>,
    attempts: usize,
    fail_next: usize,
    recoveries: usize,
    fail_recover: bool,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` transmits
    pub fn fail_next(&self, n: usize) {
        self.inner.lock().fail_next = n;
    }

    /// Make `recover` fail
    pub fn fail_recover(&self, fail: bool) {
        self.inner.lock().fail_recover = fail;
    }

    /// Frames accepted so far
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.inner.lock().frames.clone()
    }

    /// Transmit calls, successful or not
    pub fn attempts(&self) -> usize {
        self.inner.lock().attempts
    }

    pub fn recoveries(&self) -> usize {
        self.inner.lock().recoveries
    }
}

impl RadioTransport for MockRadio {
    fn transmit(&mut self, packet: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.attempts += 1;
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected radio failure",
            )));
        }
        inner.frames.push(packet.to_vec());
        Ok(())
    }

    fn recover(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.recoveries += 1;
        if inner.fail_recover {
            return Err(Error::Other("injected recover failure".into()));
        }
        Ok(())
    }
}
