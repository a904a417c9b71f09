use clap::Args;
use tracing::info;

use panelcast_text::frame_six;
use panelcast_transport::{SerialSettings, SerialTransport, Transport};

use crate::exit::{delivery_error, CliError, CliResult, SUCCESS, USAGE};

/// The fixed-geometry sibling protocol: no sanitizing, no wrapping, just
/// six rows of ten characters over a serial device (USB or a paired
/// Bluetooth RFCOMM port — both are device paths).
#[derive(Args, Debug)]
pub struct SixlineArgs {
    /// Six `|`-delimited fields, e.g. "one|two|three|four|five|six".
    pub fields: String,

    /// Serial device path.
    #[arg(long, env = "SERIAL_PORT")]
    pub serial_port: Option<String>,

    /// Serial baud rate.
    #[arg(long, env = "SERIAL_BAUD", default_value_t = 115_200)]
    pub baud: u32,
}

pub fn run(args: SixlineArgs) -> CliResult<i32> {
    let port = args.serial_port.ok_or_else(|| {
        CliError::new(USAGE, "--serial-port (SERIAL_PORT) is required for sixline")
    })?;

    let frame = frame_six(&args.fields);
    let mut transport = SerialTransport::new(SerialSettings {
        port,
        baud: args.baud,
    });
    transport
        .deliver(frame.as_bytes())
        .map_err(|err| delivery_error("sixline delivery failed", err))?;
    transport.close();

    info!("sixline frame sent");
    Ok(SUCCESS)
}
