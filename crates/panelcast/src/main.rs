mod cmd;
mod exit;
mod logging;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "panelcast",
    version,
    about = "Periodic LLM one-liners delivered to a character-matrix panel"
)]
struct Cli {
    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match cmd::dispatch(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::TransportKind;

    #[test]
    fn parses_run_subcommand_with_transport() {
        let cli = Cli::try_parse_from([
            "panelcast",
            "run",
            "--transport",
            "usb",
            "--serial-port",
            "/dev/ttyUSB0",
            "--interval",
            "30s",
        ])
        .expect("run args should parse");

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.transport.transport, TransportKind::Usb);
                assert_eq!(args.transport.serial_port.as_deref(), Some("/dev/ttyUSB0"));
                assert_eq!(args.interval, "30s");
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn run_defaults_to_ble_transport() {
        let cli = Cli::try_parse_from(["panelcast", "run"]).expect("run should parse");
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.transport.transport, TransportKind::Ble);
                assert_eq!(args.transport.ble_name, "MatrixPanel");
                assert_eq!(args.panel.columns, 21);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn parses_send_with_inline_text() {
        let cli = Cli::try_parse_from([
            "panelcast",
            "send",
            "--transport",
            "http",
            "--url",
            "http://panel.local/post",
            "Mountains hold their silence.",
        ])
        .expect("send args should parse");
        assert!(matches!(cli.command, Command::Send(_)));
    }

    #[test]
    fn parses_sixline_fields() {
        let cli = Cli::try_parse_from([
            "panelcast",
            "sixline",
            "--serial-port",
            "/dev/ttyUSB0",
            "a|b|c|d|e|f",
        ])
        .expect("sixline args should parse");
        match cli.command {
            Command::Sixline(args) => assert_eq!(args.fields, "a|b|c|d|e|f"),
            other => panic!("expected sixline, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_transport() {
        let err = Cli::try_parse_from(["panelcast", "run", "--transport", "carrier-pigeon"])
            .expect_err("unknown transport should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
