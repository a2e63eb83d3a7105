//! Distance server.
//!
//! Samples the HC-SR04 in the background and serves the latest reading over
//! BLE until interrupted with Ctrl+C or SIGTERM.
//!
//! Run with: RUST_LOG=debug rangefinder-ble

use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rangefinder_ble::ble::ADAPTER_TROUBLESHOOTING;
use rangefinder_ble::shutdown::{run_blocking, stop_sampling, ShutdownSignals};
use rangefinder_ble::{
    Config, DistanceSampler, Error, GattServer, ReadingPublisher, Result, RpiLines,
    SamplingLoop, SharedReading,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::AdapterUnavailable) => {
            error!("No usable Bluetooth adapter");
            info!("Checks:");
            for (i, step) in ADAPTER_TROUBLESHOOTING.iter().enumerate() {
                info!("{}. {}", i + 1, step);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    // Before any pin is claimed: an interrupt from here on still reaches
    // the cleanup below.
    let mut shutdown = ShutdownSignals::install()?;
    info!("Starting distance server");

    let reading = SharedReading::new();

    let sensor = config.sensor.clone();
    let lines = run_blocking(move || RpiLines::from_config(&sensor)).await?;
    let sampler = DistanceSampler::new(lines, (&config.sensor).into());
    let sampling =
        SamplingLoop::new(sampler, reading.clone(), config.sensor.sample_interval).spawn()?;

    let started = tokio::select! {
        started = GattServer::start(&config.ble, ReadingPublisher::new(reading)) => Some(started),
        signal = shutdown.recv() => {
            info!("{} during startup", signal);
            None
        }
    };
    let server = match started {
        Some(Ok(server)) => server,
        Some(Err(e)) => {
            if let Err(stop_err) = stop_sampling(sampling).await {
                error!("Failed to stop sampling: {}", stop_err);
            }
            return Err(e);
        }
        None => {
            stop_sampling(sampling).await?;
            info!("Resources released");
            return Ok(());
        }
    };
    info!(
        "Waiting for connections on {} as '{}', press Ctrl+C to stop",
        server.adapter_name(),
        server.device_name()
    );

    let signal = shutdown.recv().await;
    info!("{} received, shutting down", signal);

    server.shutdown();
    stop_sampling(sampling).await?;

    info!("Resources released");
    Ok(())
}
