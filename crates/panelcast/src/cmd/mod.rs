use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};

use panelcast_text::PanelConstraints;
use panelcast_transport::{
    BleConfig, BleSession, HttpTransport, SerialSettings, SerialTransport, Transport,
};

use crate::exit::{delivery_error, CliError, CliResult, USAGE};

pub mod run;
pub mod send;
pub mod sixline;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate, shape, and deliver a message every interval, forever.
    Run(run::RunArgs),
    /// Shape and deliver one message, then exit.
    Send(send::SendArgs),
    /// Send a fixed six-line frame over serial, no wrapping or sanitizing.
    Sixline(sixline::SixlineArgs),
    /// Show version information.
    Version(version::VersionArgs),
}

pub fn dispatch(command: Command) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Send(args) => send::run(args),
        Command::Sixline(args) => sixline::run(args),
        Command::Version(args) => version::run(args),
    }
}

/// Which delivery channel to use. Fixed for the process lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    Ble,
    Http,
    Usb,
}

/// Transport selection and endpoints, environment-supplied like the rest
/// of the deployment configuration.
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Delivery transport.
    #[arg(long, env = "TRANSPORT", value_enum, default_value = "ble")]
    pub transport: TransportKind,

    /// Panel HTTP endpoint, e.g. http://172.20.10.5/post (http transport).
    #[arg(long, env = "ESP32_URL")]
    pub url: Option<String>,

    /// Serial device path, e.g. /dev/ttyUSB0 (usb transport).
    #[arg(long, env = "SERIAL_PORT")]
    pub serial_port: Option<String>,

    /// Serial baud rate.
    #[arg(long, env = "SERIAL_BAUD", default_value_t = 115_200)]
    pub baud: u32,

    /// BLE device name prefix to scan for (ble transport).
    #[arg(long, env = "BLE_NAME", default_value = "MatrixPanel")]
    pub ble_name: String,

    /// Known BLE peer identifier; skips the initial scan.
    #[arg(long, env = "BLE_ADDRESS")]
    pub ble_address: Option<String>,
}

impl TransportArgs {
    /// Validate the selection and open the process-lifetime session.
    pub fn open(&self) -> CliResult<Box<dyn Transport>> {
        match self.transport {
            TransportKind::Http => {
                let url = self.url.clone().ok_or_else(|| {
                    CliError::new(USAGE, "--url (ESP32_URL) is required for the http transport")
                })?;
                let transport = HttpTransport::new(url)
                    .map_err(|err| delivery_error("http transport setup failed", err))?;
                Ok(Box::new(transport))
            }
            TransportKind::Usb => {
                let port = self.serial_port.clone().ok_or_else(|| {
                    CliError::new(
                        USAGE,
                        "--serial-port (SERIAL_PORT) is required for the usb transport",
                    )
                })?;
                Ok(Box::new(SerialTransport::new(SerialSettings {
                    port,
                    baud: self.baud,
                })))
            }
            TransportKind::Ble => {
                let config = BleConfig {
                    name_prefix: Some(self.ble_name.clone()),
                    address: self.ble_address.clone(),
                    ..Default::default()
                };
                let session = BleSession::open(config)
                    .map_err(|err| delivery_error("ble transport setup failed", err))?;
                Ok(Box::new(session))
            }
        }
    }
}

/// Panel geometry flags shared by `run` and `send`.
#[derive(Args, Debug, Clone)]
pub struct PanelArgs {
    /// Panel character cells per row.
    #[arg(long, env = "PANEL_COLS", default_value_t = 21)]
    pub columns: usize,

    /// Panel rows.
    #[arg(long, env = "MAX_LINES", default_value_t = 6)]
    pub max_lines: usize,

    /// Word-token budget per message.
    #[arg(long, env = "MAX_TOKENS", default_value_t = 28)]
    pub max_tokens: usize,
}

impl PanelArgs {
    pub fn constraints(&self) -> CliResult<PanelConstraints> {
        if self.columns == 0 || self.max_lines == 0 || self.max_tokens == 0 {
            return Err(CliError::new(
                USAGE,
                "panel geometry values must be greater than zero",
            ));
        }
        Ok(PanelConstraints {
            columns: self.columns,
            max_lines: self.max_lines,
            max_tokens: self.max_tokens,
        })
    }
}

/// Parse `"60"`, `"60s"`, or `"500ms"` into a duration.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("60").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn http_transport_without_url_is_a_usage_error() {
        let args = TransportArgs {
            transport: TransportKind::Http,
            url: None,
            serial_port: None,
            baud: 115_200,
            ble_name: "MatrixPanel".to_string(),
            ble_address: None,
        };
        let err = args.open().expect_err("missing url should fail");
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn usb_transport_without_port_is_a_usage_error() {
        let args = TransportArgs {
            transport: TransportKind::Usb,
            url: None,
            serial_port: None,
            baud: 115_200,
            ble_name: "MatrixPanel".to_string(),
            ble_address: None,
        };
        let err = args.open().expect_err("missing port should fail");
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn zero_geometry_is_a_usage_error() {
        let args = PanelArgs {
            columns: 0,
            max_lines: 6,
            max_tokens: 28,
        };
        assert_eq!(args.constraints().expect_err("should fail").code, USAGE);
    }
}
