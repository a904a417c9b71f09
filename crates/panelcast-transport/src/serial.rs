use std::io::Write;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{DeliveryError, Result};
use crate::traits::{Ack, Transport};

/// I/O timeout guarding against a stalled link.
pub const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Settle interval after opening before the first write. Opening a USB-UART
/// can still glitch the panel even with the reset lines deasserted.
pub const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Serial endpoint configuration: device path and baud rate.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud: u32,
}

/// An open serial link.
pub trait SerialLink: Write {
    /// Whether the handle still looks usable. A false answer triggers a
    /// reopen on the next delivery.
    fn is_open(&mut self) -> bool;
}

/// Opens serial links. The seam exists so tests can count opens and inject
/// failing handles.
pub trait SerialOpener {
    type Link: SerialLink;

    fn open(&mut self, settings: &SerialSettings) -> Result<Self::Link>;
}

/// The real opener: `serialport` with auto-reset suppression.
#[derive(Debug, Default)]
pub struct SystemSerial;

pub struct SystemLink(Box<dyn serialport::SerialPort>);

impl Write for SystemLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl SerialLink for SystemLink {
    fn is_open(&mut self) -> bool {
        // Any successful control query means the descriptor is still live.
        self.0.bytes_to_write().is_ok()
    }
}

impl SerialOpener for SystemSerial {
    type Link = SystemLink;

    fn open(&mut self, settings: &SerialSettings) -> Result<Self::Link> {
        let mut port = serialport::new(&settings.port, settings.baud)
            .timeout(IO_TIMEOUT)
            .open()?;

        // Deassert DTR/RTS so USB-UART bridges do not auto-reset the panel
        // every time the port opens. Not every adapter supports this.
        if let Err(err) = port.write_data_terminal_ready(false) {
            warn!(port = %settings.port, error = %err, "could not deassert DTR");
        }
        if let Err(err) = port.write_request_to_send(false) {
            warn!(port = %settings.port, error = %err, "could not deassert RTS");
        }
        std::thread::sleep(SETTLE_DELAY);

        debug!(port = %settings.port, baud = settings.baud, "serial port open");
        Ok(SystemLink(port))
    }
}

/// Serial delivery with an open-once, reuse-forever handle.
///
/// The handle is opened lazily on the first send and kept for the process
/// lifetime; it is reopened only when it reports itself closed.
pub struct SerialTransport<O: SerialOpener = SystemSerial> {
    settings: SerialSettings,
    opener: O,
    link: Option<O::Link>,
}

impl SerialTransport<SystemSerial> {
    pub fn new(settings: SerialSettings) -> Self {
        Self::with_opener(settings, SystemSerial)
    }
}

impl<O: SerialOpener> SerialTransport<O> {
    pub fn with_opener(settings: SerialSettings, opener: O) -> Self {
        Self {
            settings,
            opener,
            link: None,
        }
    }

    fn ensure_open(&mut self) -> Result<&mut O::Link> {
        let reopen = match self.link.as_mut() {
            Some(link) => {
                if link.is_open() {
                    false
                } else {
                    warn!(port = %self.settings.port, "serial handle reports closed, reopening");
                    true
                }
            }
            None => true,
        };
        if reopen {
            self.link = Some(self.opener.open(&self.settings)?);
        }
        self.link.as_mut().ok_or_else(|| DeliveryError::ConnectFailed {
            detail: "serial handle unavailable".to_string(),
        })
    }
}

impl<O: SerialOpener> Transport for SerialTransport<O> {
    fn prepare(&mut self) -> Result<()> {
        self.ensure_open().map(|_| ())
    }

    fn deliver(&mut self, payload: &[u8]) -> Result<Ack> {
        let link = self.ensure_open()?;
        link.write_all(payload)?;
        link.flush()?;
        debug!(bytes = payload.len(), "serial wrote payload");
        Ok("ok-serial".to_string())
    }

    fn close(&mut self) {
        self.link = None;
    }

    fn name(&self) -> &'static str {
        "serial"
    }
}
