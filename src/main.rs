use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::Receiver;
use machwatch::cli::Cli;
use machwatch::config::MonitorConfig;
use machwatch::csv_output::CsvExporter;
use machwatch::export;
use machwatch::monitor::{Monitor, MonitorError, StopReason};
use machwatch::sensor::{ReplaySensor, SensorError, SensorSource, SimulatedSensor};
use machwatch::storage::JsonlStore;
use nix::sys::signal::{SigSet, Signal};
use std::thread;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber (info by default, trace with --debug)
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Route SIGINT/SIGTERM to a channel the acquisition loop waits on
///
/// Must run before any other thread is spawned so every thread inherits
/// the blocked mask.
fn install_shutdown_handler() -> Result<Receiver<()>> {
    let mut signals = SigSet::empty();
    signals.add(Signal::SIGINT);
    signals.add(Signal::SIGTERM);
    signals
        .thread_block()
        .context("Failed to block shutdown signals")?;

    let (tx, rx) = crossbeam::channel::bounded(1);
    thread::Builder::new()
        .name("machwatch-signals".to_string())
        .spawn(move || {
            match signals.wait() {
                Ok(signal) => tracing::info!(?signal, "Program terminated by user"),
                Err(e) => tracing::error!(error = %e, "signal wait failed, shutting down"),
            }
            let _ = tx.send(());
        })
        .context("Failed to spawn signal thread")?;

    Ok(rx)
}

fn load_config(args: &Cli) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;

    let store = JsonlStore::open(&config.storage.database_path).with_context(|| {
        format!(
            "Failed to open reading store {}",
            config.storage.database_path.display()
        )
    })?;
    let mut exporter = CsvExporter::new(&config.storage.csv_path);

    if args.export_only {
        let rows = export::export_all(&store, &mut exporter).context("Export failed")?;
        println!(
            "Exported {} readings to {}",
            rows,
            config.storage.csv_path.display()
        );
        return Ok(());
    }

    let sensor: Box<dyn SensorSource> = match &args.replay {
        Some(path) => Box::new(
            ReplaySensor::from_csv_file(path)
                .with_context(|| format!("Failed to load replay file {}", path.display()))?,
        ),
        None => Box::new(SimulatedSensor::new(config.sensor.clone())),
    };

    let shutdown = install_shutdown_handler()?;

    eprintln!("IoT Predictive Maintenance Monitor");
    eprintln!("Press Ctrl+C to stop");

    let mut monitor = Monitor::from_config(&config, sensor, Box::new(store), Box::new(exporter));
    let result = monitor.run(&shutdown, args.max_readings);

    let outcome = match result {
        Ok(_) => Ok(()),
        // End of a replay is the natural end of the session
        Err(MonitorError::Sensor(SensorError::Exhausted(readings))) if args.replay.is_some() => {
            tracing::info!(readings, "Replay finished");
            monitor.finish(StopReason::SourceExhausted);
            Ok(())
        }
        Err(e) => Err(e).context("Acquisition loop aborted"),
    };

    monitor.summary().print_summary();
    outcome
}
