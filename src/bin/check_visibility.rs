//! Check that the distance server is discoverable.
//!
//! Scans for ten seconds (or the number of seconds given as the first
//! argument), lists every advertiser and reports whether the configured
//! device name or distance service UUID was seen.
//!
//! Run with: check-visibility [seconds]

use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use rangefinder_ble::ble::{ADAPTER_TROUBLESHOOTING, DEFAULT_SCAN_WINDOW};
use rangefinder_ble::{Config, Error, Result, VisibilityScanner};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(Error::AdapterUnavailable) => {
            println!("No Bluetooth adapter found. Checks:");
            for (i, step) in ADAPTER_TROUBLESHOOTING.iter().enumerate() {
                println!("  {}. {}", i + 1, step);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<bool> {
    let config = Config::from_env()?;
    let window = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| Error::InvalidParameter {
                name: "seconds".to_string(),
                value: arg,
            })?,
        None => DEFAULT_SCAN_WINDOW,
    };

    println!("BLE Visibility Check");
    println!("====================\n");
    println!(
        "Looking for '{}' for {}s...\n",
        config.ble.device_name,
        window.as_secs()
    );

    let scanner = VisibilityScanner::new().await?;
    let report = scanner.scan(window).await?;

    println!("Found {} devices:", report.devices.len());
    for device in report.by_signal() {
        println!(
            "  {:<20} {:<24} {}",
            device.address,
            device.local_name.as_deref().unwrap_or("(unnamed)"),
            device
                .rssi
                .map(|r| format!("{r} dBm"))
                .unwrap_or_else(|| "-".to_string())
        );
    }
    println!();

    match report.find(&config.ble.device_name) {
        Some(device) => {
            println!(
                "OK: distance server visible at {} ({})",
                device.address,
                device.rssi.map(|r| format!("{r} dBm")).unwrap_or_default()
            );
            Ok(true)
        }
        None => {
            println!("NOT FOUND: '{}' is not advertising", config.ble.device_name);
            println!("Is rangefinder-ble running on the Pi?");
            Ok(false)
        }
    }
}
