//! GATT peripheral exposing the distance characteristic.
//!
//! Registers one primary service with one read/notify characteristic on the
//! first available BlueZ adapter and advertises it under the configured
//! device name. The BLE callbacks only ever touch a [`ReadingPublisher`].

use bluer::adv::{Advertisement, AdvertisementHandle};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, ReqError, Service,
};
use bluer::{Adapter, Session};
use futures::FutureExt;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::ble::uuids::{DISTANCE_CHARACTERISTIC_UUID, DISTANCE_SERVICE_UUID};
use crate::config::BleConfig;
use crate::error::{Error, Result};
use crate::publisher::ReadingPublisher;

/// Steps for an operator when no adapter can be used.
pub const ADAPTER_TROUBLESHOOTING: &[&str] = &[
    "Bluetooth service running: sudo systemctl status bluetooth",
    "Adapter up: sudo hciconfig hci0 up",
    "Permissions: sudo usermod -a -G bluetooth $USER",
    "Restart Bluetooth: sudo systemctl restart bluetooth",
];

/// Running GATT server. Dropping it stops advertising and unregisters the
/// service.
pub struct GattServer {
    // Handles first: they must be dropped before the session.
    _advertisement: AdvertisementHandle,
    _application: ApplicationHandle,
    adapter: Adapter,
    device_name: String,
    _session: Session,
}

impl GattServer {
    /// Power the first adapter, register the distance service and start
    /// advertising.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdapterUnavailable`] if BlueZ is not reachable or has
    /// no adapter, and [`Error::Bluetooth`] if registration fails.
    pub async fn start(config: &BleConfig, publisher: ReadingPublisher) -> Result<Self> {
        let session = Session::new().await.map_err(|e| {
            warn!("Cannot reach bluetoothd: {}", e);
            Error::AdapterUnavailable
        })?;

        let adapter = select_adapter(&session).await?;
        adapter.set_powered(true).await?;
        info!(
            "Using Bluetooth adapter {} ({})",
            adapter.name(),
            adapter.address().await?
        );

        let application = adapter
            .serve_gatt_application(distance_application(
                publisher,
                config.notify_interval,
            ))
            .await?;
        debug!("GATT application registered");

        let advertisement = adapter
            .advertise(distance_advertisement(&config.device_name))
            .await?;

        info!("Advertising as '{}'", config.device_name);
        info!("Service UUID: {}", DISTANCE_SERVICE_UUID);
        info!("Characteristic UUID: {}", DISTANCE_CHARACTERISTIC_UUID);

        Ok(Self {
            _advertisement: advertisement,
            _application: application,
            adapter,
            device_name: config.device_name.clone(),
            _session: session,
        })
    }

    /// Name of the adapter in use, e.g. `hci0`.
    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    /// Advertised device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Stop advertising and unregister the service.
    pub fn shutdown(self) {
        info!("Stopping BLE server on {}", self.adapter.name());
    }
}

async fn select_adapter(session: &Session) -> Result<Adapter> {
    let names = session.adapter_names().await?;
    debug!("Bluetooth adapters: {:?}", names);

    let name = names.into_iter().next().ok_or(Error::AdapterUnavailable)?;
    Ok(session.adapter(&name)?)
}

/// Advertisement carrying the device name and the distance service UUID.
pub fn distance_advertisement(device_name: &str) -> Advertisement {
    Advertisement {
        service_uuids: [DISTANCE_SERVICE_UUID].into_iter().collect(),
        discoverable: Some(true),
        local_name: Some(device_name.to_string()),
        ..Default::default()
    }
}

/// GATT application with the distance service.
pub fn distance_application(publisher: ReadingPublisher, notify_interval: Duration) -> Application {
    Application {
        services: vec![Service {
            uuid: DISTANCE_SERVICE_UUID,
            primary: true,
            characteristics: vec![Characteristic {
                uuid: DISTANCE_CHARACTERISTIC_UUID,
                read: Some(read_handler(publisher.clone())),
                notify: Some(notify_handler(publisher, notify_interval)),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn read_handler(publisher: ReadingPublisher) -> CharacteristicRead {
    CharacteristicRead {
        read: true,
        fun: Box::new(move |request| {
            let publisher = publisher.clone();
            async move {
                trace!(
                    "Read from {} at offset {}",
                    request.device_address,
                    request.offset
                );
                let payload = publisher.payload().map_err(|e| {
                    error!("Failed to encode distance: {}", e);
                    ReqError::Failed
                })?;
                slice_from_offset(payload, request.offset)
            }
            .boxed()
        }),
        ..Default::default()
    }
}

fn notify_handler(publisher: ReadingPublisher, interval: Duration) -> CharacteristicNotify {
    CharacteristicNotify {
        notify: true,
        method: CharacteristicNotifyMethod::Fun(Box::new(move |notifier| {
            let publisher = publisher.clone();
            async move {
                tokio::spawn(notify_session(publisher, notifier, interval));
            }
            .boxed()
        })),
        ..Default::default()
    }
}

/// Push the reading to one subscriber whenever a new sample is published.
async fn notify_session(
    publisher: ReadingPublisher,
    mut notifier: CharacteristicNotifier,
    interval: Duration,
) {
    info!("Client subscribed to distance notifications");

    let mut seen = 0;
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        if notifier.is_stopped() {
            break;
        }

        match publisher.payload_since(seen) {
            Ok(Some((sequence, payload))) => {
                if let Err(e) = notifier.notify(payload).await {
                    warn!("Notification failed: {}", e);
                    break;
                }
                seen = sequence;
            }
            Ok(None) => {}
            Err(e) => {
                error!("Failed to encode distance: {}", e);
                break;
            }
        }
    }

    info!("Distance notification session ended");
}

/// Part of the value a long read asks for.
fn slice_from_offset(mut payload: Vec<u8>, offset: u16) -> std::result::Result<Vec<u8>, ReqError> {
    let offset = usize::from(offset);
    if offset > payload.len() {
        return Err(ReqError::InvalidOffset);
    }
    Ok(payload.split_off(offset))
}
