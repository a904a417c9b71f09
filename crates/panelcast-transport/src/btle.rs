//! btleplug-backed BLE operations.
//!
//! btleplug is async; the delivery loop is not. Every operation here runs
//! on a dedicated single-thread tokio runtime owned by the backend and is
//! awaited with an explicit timeout — a timeout drops the pending future,
//! cancelling the operation. The owned runtime also serializes the calls:
//! at most one BLE operation is ever in flight, so session state needs no
//! locking.

use std::future::Future;
use std::time::Duration;

use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tracing::debug;

use crate::ble::{BleBackend, BleConfig, TargetId, NUS_RX_CHAR_UUID, NUS_SERVICE_UUID};
use crate::error::{DeliveryError, Result};

/// Budget for adapter setup and peripheral cache lookups.
const SETUP_TIMEOUT: Duration = Duration::from_secs(5);
/// Poll interval while a scan window is open.
const SCAN_POLL: Duration = Duration::from_millis(250);
/// Slack added on top of a scan window for start/stop overhead.
const SCAN_GRACE: Duration = Duration::from_secs(2);

/// Real BLE backend bridging btleplug into the synchronous delivery loop.
pub struct BtleBackend {
    runtime: tokio::runtime::Runtime,
    adapter: Option<Adapter>,
    resolved: Option<(TargetId, Peripheral)>,
    connected: Option<Peripheral>,
    write_char: Option<Characteristic>,
}

impl BtleBackend {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            adapter: None,
            resolved: None,
            connected: None,
            write_char: None,
        })
    }

    /// Run a bridged operation to completion or cancel it at the deadline.
    fn bridge<T>(&self, limit: Duration, op: impl Future<Output = Result<T>>) -> Result<T> {
        self.runtime
            .block_on(async { tokio::time::timeout(limit, op).await })
            .unwrap_or(Err(DeliveryError::Timeout(limit)))
    }

    fn adapter(&mut self) -> Result<Adapter> {
        if let Some(adapter) = &self.adapter {
            return Ok(adapter.clone());
        }
        let adapter = self.bridge(SETUP_TIMEOUT, async {
            let manager = Manager::new().await?;
            manager
                .adapters()
                .await?
                .into_iter()
                .next()
                .ok_or(DeliveryError::Misconfigured("no bluetooth adapter present"))
        })?;
        self.adapter = Some(adapter.clone());
        Ok(adapter)
    }

    fn drop_link(&mut self) {
        self.write_char = None;
        if let Some(peripheral) = self.connected.take() {
            let result = self.bridge(SETUP_TIMEOUT, async {
                peripheral.disconnect().await.map_err(Into::into)
            });
            if let Err(err) = result {
                debug!(error = %err, "ble disconnect failed (ignored)");
            }
        }
    }

    fn lookup(&mut self, target: &TargetId) -> Result<Peripheral> {
        if let Some((id, peripheral)) = &self.resolved {
            if id == target {
                return Ok(peripheral.clone());
            }
        }
        let adapter = self.adapter()?;
        let wanted = target.clone();
        let found = self.bridge(SETUP_TIMEOUT, async move {
            for peripheral in adapter.peripherals().await? {
                if peripheral_id(&peripheral) == wanted {
                    return Ok(Some(peripheral));
                }
            }
            Ok(None)
        })?;
        found.ok_or_else(|| DeliveryError::ConnectFailed {
            detail: format!("ble target {target} not in adapter cache"),
        })
    }
}

fn peripheral_id(peripheral: &Peripheral) -> TargetId {
    format!("{:?}", peripheral.id())
}

/// One bounded scan window: start scanning with `filter`, poll the adapter
/// cache until a peer matches, stop scanning.
///
/// A name-prefix match wins immediately; otherwise the first peer
/// advertising the NUS service is taken.
async fn scan_pass(
    adapter: &Adapter,
    filter: ScanFilter,
    name_prefix: Option<&str>,
    window: Duration,
) -> Result<Option<Peripheral>> {
    adapter.start_scan(filter).await?;
    let deadline = tokio::time::Instant::now() + window;

    let found = loop {
        match pick_match(adapter, name_prefix).await {
            Ok(Some(peripheral)) => break Some(peripheral),
            Ok(None) => {}
            Err(err) => {
                let _ = adapter.stop_scan().await;
                return Err(err);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            break None;
        }
        tokio::time::sleep(SCAN_POLL).await;
    };

    let _ = adapter.stop_scan().await;
    Ok(found)
}

async fn pick_match(adapter: &Adapter, name_prefix: Option<&str>) -> Result<Option<Peripheral>> {
    let mut by_service = None;
    for peripheral in adapter.peripherals().await? {
        let Some(props) = peripheral.properties().await? else {
            continue;
        };
        if let (Some(prefix), Some(name)) = (name_prefix, props.local_name.as_deref()) {
            if name.starts_with(prefix) {
                return Ok(Some(peripheral));
            }
        }
        if by_service.is_none() && props.services.contains(&NUS_SERVICE_UUID) {
            by_service = Some(peripheral);
        }
    }
    Ok(by_service)
}

impl BleBackend for BtleBackend {
    fn resolve(&mut self, config: &BleConfig) -> Result<TargetId> {
        let adapter = self.adapter()?;
        let prefix = config.name_prefix.clone();
        let window = config.scan_timeout;

        // Filtered active scan on the NUS service first; some platforms
        // only surface a peer once a filter names its service.
        let filtered = ScanFilter {
            services: vec![NUS_SERVICE_UUID],
        };
        let mut hit = self.bridge(
            window + SCAN_GRACE,
            scan_pass(&adapter, filtered, prefix.as_deref(), window),
        )?;

        if hit.is_none() {
            debug!("filtered scan found nothing, running full discovery pass");
            hit = self.bridge(
                window + SCAN_GRACE,
                scan_pass(&adapter, ScanFilter::default(), prefix.as_deref(), window),
            )?;
        }

        let peripheral = hit.ok_or_else(|| DeliveryError::TargetNotFound {
            name: config.name_prefix.clone(),
            address: config.address.clone(),
        })?;

        let target = peripheral_id(&peripheral);
        self.resolved = Some((target.clone(), peripheral));
        Ok(target)
    }

    fn connect(&mut self, target: &TargetId, timeout: Duration) -> Result<()> {
        // Tear down any previous link before dialing again.
        self.drop_link();

        let peripheral = self.lookup(target)?;
        self.bridge(timeout, async {
            peripheral.connect().await?;
            peripheral.discover_services().await?;
            Ok(())
        })?;

        let write_char = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == NUS_RX_CHAR_UUID)
            .ok_or_else(|| DeliveryError::ConnectFailed {
                detail: format!("peer {target} does not expose the NUS RX characteristic"),
            })?;

        debug!(%target, "ble link established");
        self.connected = Some(peripheral);
        self.write_char = Some(write_char);
        Ok(())
    }

    fn write(&mut self, payload: &[u8], timeout: Duration) -> Result<()> {
        let (peripheral, write_char) = match (&self.connected, &self.write_char) {
            (Some(p), Some(c)) => (p.clone(), c.clone()),
            _ => {
                return Err(DeliveryError::WriteFailed {
                    detail: "no ble link established".to_string(),
                })
            }
        };
        self.bridge(timeout, async move {
            peripheral
                .write(&write_char, payload, WriteType::WithResponse)
                .await
                .map_err(Into::into)
        })
    }

    fn disconnect(&mut self) {
        self.drop_link();
    }
}

impl crate::ble::BleSession<BtleBackend> {
    /// Open a session backed by the platform's Bluetooth stack.
    pub fn open(config: BleConfig) -> Result<Self> {
        Ok(Self::with_backend(config, BtleBackend::new()?))
    }
}
