//! Radio transport layer

use crate::config::{RadioConfig, RadioLinkKind};
use crate::error::Result;

mod device;
mod mock;
mod serial;

pub use device::DeviceRadio;
pub use mock::MockRadio;
pub use serial::SerialRadio;

/// Byte-oriented radio link
pub trait RadioTransport: Send {
    /// Send one packet, blocking until the link has accepted it
    fn transmit(&mut self, packet: &[u8]) -> Result<()>;

    /// Try to bring a failing link back (reopen the device)
    fn recover(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Radio that accepts and discards everything
pub struct NullRadio;

impl RadioTransport for NullRadio {
    fn transmit(&mut self, packet: &[u8]) -> Result<()> {
        log::trace!("Radio disabled, discarding {} bytes", packet.len());
        Ok(())
    }
}

/// Open the transport selected in `config`
pub fn open_radio(config: &RadioConfig) -> Result<Box<dyn RadioTransport>> {
    log::info!(
        "Radio: {:.3} MHz, {} kHz, SF{}, preamble {}, modulation {}, {:.1} dBm (configured by radio initializer)",
        config.frequency_hz as f64 / 1e6,
        config.bandwidth_khz,
        config.spread_factor,
        config.preamble_len,
        config.modulation,
        config.tx_power_dbm
    );
    Ok(match config.link {
        RadioLinkKind::Device => Box::new(DeviceRadio::open(&config.path)?),
        RadioLinkKind::Serial => Box::new(SerialRadio::open(&config.path, config.baud_rate)?),
        RadioLinkKind::Disabled => {
            log::warn!("Radio link disabled, packets are only logged");
            Box::new(NullRadio)
        }
    })
}
