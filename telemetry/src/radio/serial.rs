//! Radio module behind a UART

use super::RadioTransport;
use crate::error::Result;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::Write;
use std::time::Duration;

/// Write timeout; a 255-byte packet takes ~45 ms at 57600 baud
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

pub struct SerialRadio {
    path: String,
    baud_rate: u32,
    port: Box<dyn SerialPort>,
}

impl SerialRadio {
    /// Open a serial radio
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyS1")
    /// * `baud_rate` - Baud rate (e.g., 57600)
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = Self::open_port(path, baud_rate)?;
        log::info!("Opened radio serial port: {} at {} baud", path, baud_rate);
        Ok(Self {
            path: path.to_string(),
            baud_rate,
            port,
        })
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>> {
        Ok(serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()?)
    }
}

impl RadioTransport for SerialRadio {
    fn transmit(&mut self, packet: &[u8]) -> Result<()> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    fn recover(&mut self) -> Result<()> {
        self.port = Self::open_port(&self.path, self.baud_rate)?;
        log::info!("Reopened radio serial port: {}", self.path);
        Ok(())
    }
}
