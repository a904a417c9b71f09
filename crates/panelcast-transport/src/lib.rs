//! Delivery transports for the panel.
//!
//! One capability, three interchangeable implementations: `deliver` a
//! newline-terminated ASCII payload to the display controller over an HTTP
//! endpoint, a serial link, or a BLE characteristic write. Exactly one
//! transport is active per process; serial and BLE own a persistent session
//! that is opened lazily on the first send and reused across deliveries,
//! with a bounded reconnect policy for the flaky BLE case.

pub mod ble;
pub mod btle;
pub mod error;
pub mod http;
pub mod serial;
pub mod traits;

pub use ble::{
    BleBackend, BleConfig, BleSession, SessionState, TargetId, NUS_RX_CHAR_UUID, NUS_SERVICE_UUID,
};
pub use btle::BtleBackend;
pub use error::{DeliveryError, Result};
pub use http::HttpTransport;
pub use serial::{SerialLink, SerialOpener, SerialSettings, SerialTransport, SystemSerial};
pub use traits::{Ack, Transport};
