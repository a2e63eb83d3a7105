//! BLE visibility check.
//!
//! Scans as a central for a bounded window and reports whether the distance
//! server is discoverable, along with every other advertiser that was seen.

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::stream::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::ble::uuids::is_distance_service;
use crate::error::{Error, Result};

/// Default scan window.
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(10);

/// An advertiser seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Platform identifier of the peripheral.
    pub identifier: String,
    /// Bluetooth address.
    pub address: String,
    /// Advertised local name, if any.
    pub local_name: Option<String>,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
    /// Advertised service UUIDs.
    pub services: Vec<Uuid>,
}

impl DiscoveredDevice {
    /// Whether this advertiser is a distance server called `device_name`.
    ///
    /// A match on either the name or the distance service UUID counts, since
    /// some stacks drop the name from the primary advertisement.
    pub fn is_distance_server(&self, device_name: &str) -> bool {
        self.local_name.as_deref() == Some(device_name)
            || self.services.iter().any(is_distance_service)
    }
}

/// Outcome of a visibility scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Every advertiser seen, by identifier.
    pub devices: HashMap<String, DiscoveredDevice>,
}

impl ScanReport {
    /// The distance server, if it was seen.
    pub fn find(&self, device_name: &str) -> Option<&DiscoveredDevice> {
        self.devices
            .values()
            .filter(|d| d.is_distance_server(device_name))
            .max_by_key(|d| d.rssi.unwrap_or(i16::MIN))
    }

    /// Devices sorted by signal strength (strongest first).
    pub fn by_signal(&self) -> Vec<&DiscoveredDevice> {
        let mut devices: Vec<_> = self.devices.values().collect();
        devices.sort_by_key(|d| std::cmp::Reverse(d.rssi.unwrap_or(i16::MIN)));
        devices
    }
}

/// Central-role scanner used to verify that the server is advertising.
pub struct VisibilityScanner {
    adapter: Adapter,
}

impl VisibilityScanner {
    /// Open the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdapterUnavailable`] if there is no adapter.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::AdapterUnavailable)?;

        let adapters = manager.adapters().await?;
        for adapter in &adapters {
            debug!("Adapter: {:?}", adapter.adapter_info().await.ok());
        }

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::AdapterUnavailable)?;

        info!(
            "Using Bluetooth adapter: {}",
            adapter
                .adapter_info()
                .await
                .unwrap_or_else(|_| "unknown".to_string())
        );

        Ok(Self { adapter })
    }

    /// Scan for `window` and collect every advertiser seen.
    pub async fn scan(&self, window: Duration) -> Result<ScanReport> {
        info!("Scanning for {:?}", window);

        let mut events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let mut report = ScanReport::default();
        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = events.next() => match event {
                    Some(event) => self.handle_event(event, &mut report).await,
                    None => break,
                },
            }
        }

        self.adapter.stop_scan().await?;

        // Peripherals that were already cached before the scan started do
        // not always produce a discovery event.
        for peripheral in self.adapter.peripherals().await? {
            let id = peripheral.id();
            if !report.devices.contains_key(&id.to_string()) {
                self.record(id, &mut report).await;
            }
        }

        debug!("Scan finished, {} devices", report.devices.len());
        Ok(report)
    }

    async fn handle_event(&self, event: CentralEvent, report: &mut ScanReport) {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                trace!("Advertiser: {:?}", id);
                self.record(id, report).await;
            }
            CentralEvent::ServicesAdvertisement { id, services } => {
                if services.iter().any(is_distance_service) {
                    trace!("Distance service advertised by {:?}", id);
                    self.record(id, report).await;
                }
            }
            _ => {}
        }
    }

    async fn record(&self, id: PeripheralId, report: &mut ScanReport) {
        let peripheral = match self.adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return,
        };

        let identifier = id.to_string();
        report.devices.insert(
            identifier.clone(),
            DiscoveredDevice {
                identifier,
                address: properties.address.to_string(),
                local_name: properties.local_name,
                rssi: properties.rssi,
                services: properties.services,
            },
        );
    }
}
