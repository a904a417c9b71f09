//! BLE delivery session.
//!
//! The hardest transport: BLE identifiers rotate, peripherals sleep, and
//! links drop without warning. The session keeps a process-lifetime state
//! machine around one cached target and applies a retry-exactly-once
//! policy at each stage, bounding the latency of a delivery attempt while
//! tolerating the common single transient failure.

use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::traits::{Ack, Transport};

/// Nordic UART Service, advertised by the panel firmware.
pub const NUS_SERVICE_UUID: Uuid = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);
/// NUS RX characteristic: the panel reads what we write here.
pub const NUS_RX_CHAR_UUID: Uuid = Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);

/// Opaque identifier of a resolved peer, stable for the process lifetime
/// unless the platform rotates it.
pub type TargetId = String;

/// BLE session configuration.
#[derive(Debug, Clone)]
pub struct BleConfig {
    /// Match peers whose advertised name starts with this.
    pub name_prefix: Option<String>,
    /// Known peer identifier; skips the initial scan when set.
    pub address: Option<String>,
    /// Budget for one scan pass.
    pub scan_timeout: Duration,
    /// Budget for the first connect attempt.
    pub connect_timeout: Duration,
    /// Budget for the single connect retry after re-resolving.
    pub reconnect_timeout: Duration,
    /// Budget for any other bridged operation, writes included.
    pub op_timeout: Duration,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            name_prefix: None,
            address: None,
            scan_timeout: Duration::from_secs(8),
            connect_timeout: Duration::from_secs(10),
            reconnect_timeout: Duration::from_secs(12),
            op_timeout: Duration::from_secs(15),
        }
    }
}

/// Session lifecycle. `Closed` is terminal and only reached at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No target cached.
    Unresolved,
    /// Scan or connect in progress.
    Resolving,
    /// Link established, writes possible.
    Connected,
    /// Link dropped; the cached target is still considered valid.
    Disconnected,
    /// Session released at shutdown.
    Closed,
}

/// Platform operations the session state machine drives.
///
/// The real implementation is [`crate::btle::BtleBackend`]; tests use
/// scripted doubles to exercise the retry policy without radio hardware.
pub trait BleBackend {
    /// Find a peer matching the config's name prefix or the NUS service
    /// UUID. Active filtered scan first, then a full discovery pass.
    fn resolve(&mut self, config: &BleConfig) -> Result<TargetId>;

    /// Establish a link to a previously resolved target.
    fn connect(&mut self, target: &TargetId, timeout: Duration) -> Result<()>;

    /// Write the payload to the NUS RX characteristic with response.
    fn write(&mut self, payload: &[u8], timeout: Duration) -> Result<()>;

    /// Drop the link. Best-effort, never fails.
    fn disconnect(&mut self);
}

/// Persistent BLE session: owns the cached target, the backend, and the
/// state machine. At most one exists per process, and all operations go
/// through `&mut self`, so no two deliveries can mutate connection state
/// concurrently.
pub struct BleSession<B: BleBackend> {
    config: BleConfig,
    backend: B,
    state: SessionState,
    target: Option<TargetId>,
}

impl<B: BleBackend> BleSession<B> {
    pub fn with_backend(config: BleConfig, backend: B) -> Self {
        // A configured address seeds the cache and skips the first scan.
        let target = config.address.clone();
        Self {
            config,
            backend,
            state: SessionState::Unresolved,
            target,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn resolve_target(&mut self) -> Result<TargetId> {
        if let Some(target) = &self.target {
            return Ok(target.clone());
        }
        self.state = SessionState::Resolving;
        match self.backend.resolve(&self.config) {
            Ok(target) => {
                info!(%target, "resolved ble target");
                self.target = Some(target.clone());
                Ok(target)
            }
            Err(err) => {
                self.state = SessionState::Unresolved;
                Err(err)
            }
        }
    }

    fn ensure_connected(&mut self) -> Result<()> {
        if self.state == SessionState::Connected {
            return Ok(());
        }
        let target = self.resolve_target()?;
        self.state = SessionState::Resolving;

        if let Err(first) = self.backend.connect(&target, self.config.connect_timeout) {
            // The cached identifier may be stale: platforms rotate peer
            // addresses. Discard it, re-resolve once, retry with a longer
            // budget.
            warn!(%target, error = %first, "ble connect failed, re-resolving");
            self.target = None;
            let target = match self.backend.resolve(&self.config) {
                Ok(target) => {
                    self.target = Some(target.clone());
                    target
                }
                Err(err) => {
                    self.state = SessionState::Unresolved;
                    return Err(err);
                }
            };
            if let Err(second) = self.backend.connect(&target, self.config.reconnect_timeout) {
                self.state = SessionState::Unresolved;
                return Err(second);
            }
        }

        self.state = SessionState::Connected;
        Ok(())
    }
}

impl<B: BleBackend> Transport for BleSession<B> {
    fn prepare(&mut self) -> Result<()> {
        self.ensure_connected()
    }

    fn deliver(&mut self, payload: &[u8]) -> Result<Ack> {
        self.ensure_connected()?;

        if let Err(first) = self.backend.write(payload, self.config.op_timeout) {
            // Write failures drop the link but not the cached target: the
            // peer did resolve, the connection just went away. Reconnect
            // and retry the write exactly once.
            self.state = SessionState::Disconnected;
            warn!(error = %first, "ble write failed, reconnecting once");
            self.ensure_connected()?;
            if let Err(second) = self.backend.write(payload, self.config.op_timeout) {
                self.state = SessionState::Disconnected;
                return Err(second);
            }
        }

        Ok("ok-ble".to_string())
    }

    fn close(&mut self) {
        self.backend.disconnect();
        self.state = SessionState::Closed;
    }

    fn name(&self) -> &'static str {
        "ble"
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::DeliveryError;

    #[derive(Default)]
    struct Script {
        resolve_results: Vec<Result<TargetId>>,
        connect_results: Vec<Result<()>>,
        write_results: Vec<Result<()>>,
        resolve_calls: usize,
        connect_calls: usize,
        write_calls: usize,
        disconnects: usize,
        connects_in_flight: usize,
        max_connects_in_flight: usize,
    }

    #[derive(Default, Clone)]
    struct FakeBackend(Rc<RefCell<Script>>);

    impl FakeBackend {
        fn push_resolve(&self, result: Result<TargetId>) {
            self.0.borrow_mut().resolve_results.push(result);
        }

        fn push_connect(&self, result: Result<()>) {
            self.0.borrow_mut().connect_results.push(result);
        }

        fn push_write(&self, result: Result<()>) {
            self.0.borrow_mut().write_results.push(result);
        }
    }

    fn connect_err() -> DeliveryError {
        DeliveryError::ConnectFailed {
            detail: "scripted".to_string(),
        }
    }

    fn write_err() -> DeliveryError {
        DeliveryError::WriteFailed {
            detail: "scripted".to_string(),
        }
    }

    impl BleBackend for FakeBackend {
        fn resolve(&mut self, _config: &BleConfig) -> Result<TargetId> {
            let mut script = self.0.borrow_mut();
            script.resolve_calls += 1;
            if script.resolve_results.is_empty() {
                Ok("AA:BB:CC:DD:EE:FF".to_string())
            } else {
                script.resolve_results.remove(0)
            }
        }

        fn connect(&mut self, _target: &TargetId, _timeout: Duration) -> Result<()> {
            let mut script = self.0.borrow_mut();
            script.connect_calls += 1;
            script.connects_in_flight += 1;
            script.max_connects_in_flight =
                script.max_connects_in_flight.max(script.connects_in_flight);
            let result = if script.connect_results.is_empty() {
                Ok(())
            } else {
                script.connect_results.remove(0)
            };
            script.connects_in_flight -= 1;
            result
        }

        fn write(&mut self, _payload: &[u8], _timeout: Duration) -> Result<()> {
            let mut script = self.0.borrow_mut();
            script.write_calls += 1;
            if script.write_results.is_empty() {
                Ok(())
            } else {
                script.write_results.remove(0)
            }
        }

        fn disconnect(&mut self) {
            self.0.borrow_mut().disconnects += 1;
        }
    }

    fn session(backend: &FakeBackend) -> BleSession<FakeBackend> {
        BleSession::with_backend(BleConfig::default(), backend.clone())
    }

    #[test]
    fn happy_path_resolves_connects_and_writes() {
        let backend = FakeBackend::default();
        let mut session = session(&backend);

        let ack = session.deliver(b"hi\n").expect("delivery should succeed");
        assert_eq!(ack, "ok-ble");
        assert_eq!(session.state(), SessionState::Connected);

        let script = backend.0.borrow();
        assert_eq!(script.resolve_calls, 1);
        assert_eq!(script.connect_calls, 1);
        assert_eq!(script.write_calls, 1);
    }

    #[test]
    fn prepare_connects_without_writing() {
        let backend = FakeBackend::default();
        let mut session = session(&backend);

        session.prepare().expect("prepare should connect");
        assert_eq!(session.state(), SessionState::Connected);

        let script = backend.0.borrow();
        assert_eq!(script.connect_calls, 1);
        assert_eq!(script.write_calls, 0);
        drop(script);

        // The first delivery reuses the prepared link.
        session.deliver(b"x\n").expect("delivery");
        assert_eq!(backend.0.borrow().connect_calls, 1);
    }

    #[test]
    fn configured_address_skips_initial_scan() {
        let backend = FakeBackend::default();
        let config = BleConfig {
            address: Some("11:22:33:44:55:66".to_string()),
            ..Default::default()
        };
        let mut session = BleSession::with_backend(config, backend.clone());

        session.deliver(b"x\n").expect("delivery should succeed");
        assert_eq!(backend.0.borrow().resolve_calls, 0);
    }

    #[test]
    fn connect_failure_then_retry_success_ends_connected() {
        let backend = FakeBackend::default();
        backend.push_connect(Err(connect_err()));
        let mut session = session(&backend);

        session.deliver(b"x\n").expect("retry should succeed");
        assert_eq!(session.state(), SessionState::Connected);
        // Stale-address policy: the second connect uses a fresh resolve.
        assert_eq!(backend.0.borrow().resolve_calls, 2);
        assert_eq!(backend.0.borrow().connect_calls, 2);
    }

    #[test]
    fn two_connect_failures_surface_and_leave_unresolved() {
        let backend = FakeBackend::default();
        backend.push_connect(Err(connect_err()));
        backend.push_connect(Err(connect_err()));
        let mut session = session(&backend);

        let err = session.deliver(b"x\n").expect_err("delivery should fail");
        assert!(matches!(err, DeliveryError::ConnectFailed { .. }));
        assert_eq!(session.state(), SessionState::Unresolved);
        assert_eq!(backend.0.borrow().write_calls, 0);
    }

    #[test]
    fn write_failure_reconnects_and_retries_once() {
        let backend = FakeBackend::default();
        backend.push_write(Err(write_err()));
        let mut session = session(&backend);

        session.deliver(b"x\n").expect("retry write should succeed");
        assert_eq!(session.state(), SessionState::Connected);

        let script = backend.0.borrow();
        assert_eq!(script.write_calls, 2);
        assert_eq!(script.connect_calls, 2);
        // Only connect failures discard the cached target.
        assert_eq!(script.resolve_calls, 1);
    }

    #[test]
    fn second_write_failure_surfaces_and_leaves_disconnected() {
        let backend = FakeBackend::default();
        backend.push_write(Err(write_err()));
        backend.push_write(Err(write_err()));
        let mut session = session(&backend);

        let err = session.deliver(b"x\n").expect_err("delivery should fail");
        assert!(matches!(err, DeliveryError::WriteFailed { .. }));
        assert_eq!(session.state(), SessionState::Disconnected);

        // Next delivery attempt recovers on its own.
        session.deliver(b"y\n").expect("next delivery should succeed");
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn resolve_failure_surfaces_target_not_found_and_stays_unresolved() {
        let backend = FakeBackend::default();
        backend.push_resolve(Err(DeliveryError::TargetNotFound {
            name: Some("MatrixPanel".to_string()),
            address: None,
        }));
        let mut session = session(&backend);

        let err = session.deliver(b"x\n").expect_err("delivery should fail");
        assert!(matches!(err, DeliveryError::TargetNotFound { .. }));
        assert_eq!(session.state(), SessionState::Unresolved);
    }

    #[test]
    fn back_to_back_deliveries_never_overlap_connect_attempts() {
        let backend = FakeBackend::default();
        backend.push_write(Err(write_err()));
        let mut session = session(&backend);

        session.deliver(b"a\n").expect("first delivery");
        session.deliver(b"b\n").expect("second delivery");

        let script = backend.0.borrow();
        assert!(script.connect_calls >= 2);
        assert_eq!(script.max_connects_in_flight, 1);
    }

    #[test]
    fn close_disconnects_and_marks_closed() {
        let backend = FakeBackend::default();
        let mut session = session(&backend);
        session.deliver(b"x\n").expect("delivery");

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(backend.0.borrow().disconnects, 1);
    }
}
