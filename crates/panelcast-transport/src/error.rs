use std::time::Duration;

/// Errors that can occur while delivering a payload to the panel.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// No peer matched the configured name prefix or service UUID.
    #[error("delivery target not found (name={name:?}, address={address:?})")]
    TargetNotFound {
        name: Option<String>,
        address: Option<String>,
    },

    /// Connecting to a resolved target failed.
    #[error("connect failed: {detail}")]
    ConnectFailed { detail: String },

    /// A write on an established link failed.
    #[error("write failed: {detail}")]
    WriteFailed { detail: String },

    /// An operation exceeded its time budget.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The delivery endpoint answered with a non-success status.
    #[error("endpoint returned HTTP {status}")]
    Http { status: u16 },

    /// The selected transport is missing required configuration.
    #[error("transport misconfigured: {0}")]
    Misconfigured(&'static str),

    /// An I/O error occurred on the transport link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port layer error.
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// HTTP client layer error.
    #[error("http request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Bluetooth layer error.
    #[error("ble error: {0}")]
    Ble(#[from] btleplug::Error),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;
