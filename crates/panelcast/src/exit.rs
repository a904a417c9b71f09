use std::fmt;
use std::io;

use panelcast_gen::GenerationError;
use panelcast_transport::DeliveryError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn delivery_error(context: &str, err: DeliveryError) -> CliError {
    match err {
        DeliveryError::Misconfigured(_) => CliError::new(USAGE, format!("{context}: {err}")),
        DeliveryError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        DeliveryError::Io(source) => io_error(context, source),
        DeliveryError::TargetNotFound { .. } | DeliveryError::Http { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn generation_error(context: &str, err: GenerationError) -> CliError {
    match err {
        GenerationError::CliTimeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        GenerationError::MalformedResponse(_) | GenerationError::BadStatus { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        GenerationError::Io(source) => io_error(context, source),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}
