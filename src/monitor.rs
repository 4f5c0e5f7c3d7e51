//! Acquisition loop: sample → score → persist → alert → export → retain → sleep
//!
//! [`Monitor`] owns the sliding window and the reading counter; every
//! collaborator (sensor, scorer, store, exporter, alert sink, clock) is
//! injected behind a trait object so a cycle can be driven step by step in
//! tests.
//!
//! # Failure policy
//!
//! - Sensor failures (including non-finite readings) stop the loop and are
//!   returned as [`MonitorError::Sensor`].
//! - Storage and export failures are logged and counted; the cycle
//!   continues and the next scheduled cycle is the retry.

use crate::alert::{AlertSink, ConsoleAlertSink};
use crate::anomaly::{self, AnomalyScorer};
use crate::clock::{Clock, LocalClock};
use crate::config::{MonitorConfig, MonitorSettings};
use crate::export::{self, ReadingExporter};
use crate::sample::ScoredSample;
use crate::sensor::{SensorError, SensorSource};
use crate::storage::ReadingStore;
use crate::window::{RetentionPolicy, SlidingWindow};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Fatal monitor errors
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Sensor(#[from] SensorError),
}

/// Where the monitor currently is within its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorState {
    Idle,
    Sampling,
    Scoring,
    Persisting,
    Exporting,
    Retaining,
    Sleeping,
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Idle => "idle",
            MonitorState::Sampling => "sampling",
            MonitorState::Scoring => "scoring",
            MonitorState::Persisting => "persisting",
            MonitorState::Exporting => "exporting",
            MonitorState::Retaining => "retaining",
            MonitorState::Sleeping => "sleeping",
            MonitorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Result of the export step of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Reading count not on the export cadence
    NotDue,
    /// Export written with this many readings
    Exported(usize),
    /// Export attempted and failed (logged)
    Failed,
}

/// What happened during one cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub reading: ScoredSample,
    /// 1-based count of readings since the monitor started
    pub reading_number: u64,
    pub persisted: bool,
    pub alerted: bool,
    pub export: ExportOutcome,
    /// Samples dropped by window retention this cycle
    pub evicted: usize,
    pub window_len: usize,
}

/// Why [`Monitor::run`] returned normally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Shutdown requested (signal or channel closed)
    Shutdown,
    /// Configured reading limit reached
    ReadingLimit,
    /// Finite sensor source (replay) ran out of readings
    SourceExhausted,
}

/// Running totals of a monitor session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub readings: u64,
    pub alerts: u64,
    pub storage_failures: u64,
    pub exports: u64,
    pub export_failures: u64,
    pub stop_reason: Option<StopReason>,
}

impl RunSummary {
    /// Print session summary report
    pub fn print_summary(&self) {
        eprintln!("\n=== Monitoring Session Summary ===");
        eprintln!("Readings taken:       {}", self.readings);
        eprintln!("Maintenance alerts:   {}", self.alerts);
        eprintln!("Exports written:      {}", self.exports);
        if self.storage_failures > 0 {
            eprintln!("Storage failures:     {}", self.storage_failures);
        }
        if self.export_failures > 0 {
            eprintln!("Export failures:      {}", self.export_failures);
        }
        match self.stop_reason {
            Some(StopReason::Shutdown) => eprintln!("Stopped by: shutdown request"),
            Some(StopReason::ReadingLimit) => eprintln!("Stopped by: reading limit"),
            Some(StopReason::SourceExhausted) => eprintln!("Stopped by: end of readings"),
            None => {}
        }
    }
}

/// The acquisition loop and its owned state
pub struct Monitor {
    settings: MonitorSettings,
    window: SlidingWindow,
    scorer: Box<dyn AnomalyScorer>,
    sensor: Box<dyn SensorSource>,
    store: Box<dyn ReadingStore>,
    exporter: Box<dyn ReadingExporter>,
    alert_sink: Box<dyn AlertSink>,
    clock: Box<dyn Clock>,
    state: MonitorState,
    reading_count: u64,
    /// Reading count at the last successful export
    exported_at: u64,
    summary: RunSummary,
}

impl Monitor {
    /// Create a monitor with console alerts and the local clock
    pub fn new(
        settings: MonitorSettings,
        retention: RetentionPolicy,
        scorer: Box<dyn AnomalyScorer>,
        sensor: Box<dyn SensorSource>,
        store: Box<dyn ReadingStore>,
        exporter: Box<dyn ReadingExporter>,
    ) -> Self {
        Self {
            settings,
            window: SlidingWindow::new(retention),
            scorer,
            sensor,
            store,
            exporter,
            alert_sink: Box::new(ConsoleAlertSink),
            clock: Box::new(LocalClock),
            state: MonitorState::Idle,
            reading_count: 0,
            exported_at: 0,
            summary: RunSummary::default(),
        }
    }

    /// Create a monitor from configuration, choosing the configured scorer
    pub fn from_config(
        config: &MonitorConfig,
        sensor: Box<dyn SensorSource>,
        store: Box<dyn ReadingStore>,
        exporter: Box<dyn ReadingExporter>,
    ) -> Self {
        Self::new(
            config.monitor.clone(),
            config.window,
            anomaly::scorer_for(&config.scoring),
            sensor,
            store,
            exporter,
        )
    }

    pub fn with_alert_sink(mut self, alert_sink: Box<dyn AlertSink>) -> Self {
        self.alert_sink = alert_sink;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn store(&self) -> &dyn ReadingStore {
        self.store.as_ref()
    }

    pub fn reading_count(&self) -> u64 {
        self.reading_count
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    fn enter(&mut self, state: MonitorState) {
        tracing::trace!(from = %self.state, to = %state, "monitor state");
        self.state = state;
    }

    /// Run one full cycle, without the trailing sleep
    pub fn run_cycle(&mut self) -> Result<CycleReport, MonitorError> {
        self.enter(MonitorState::Sampling);
        let sample = match self.sensor.read() {
            Ok(sample) if sample.is_finite() => sample,
            Ok(sample) => {
                self.enter(MonitorState::Stopped);
                return Err(SensorError::Fault(format!(
                    "non-finite reading (vibration={}, temperature={})",
                    sample.vibration, sample.temperature
                ))
                .into());
            }
            Err(e) => {
                self.enter(MonitorState::Stopped);
                return Err(e.into());
            }
        };

        // Scored against prior history only: the window does not hold `sample` yet
        self.enter(MonitorState::Scoring);
        let score = self.scorer.score(&sample, &self.window);
        self.window.push(sample);

        self.enter(MonitorState::Persisting);
        let reading = ScoredSample::new(self.clock.now(), sample, score);
        let persisted = match self.store.append(&reading) {
            Ok(()) => {
                tracing::info!(
                    "Stored data: {}, Vibration: {}, Temperature: {}, Anomaly: {}",
                    reading.timestamp,
                    sample.vibration,
                    sample.temperature,
                    score
                );
                true
            }
            Err(e) => {
                self.summary.storage_failures += 1;
                tracing::error!(error = %e, "failed to store reading");
                false
            }
        };

        let alerted = score < self.settings.alert_threshold;
        if alerted {
            self.summary.alerts += 1;
            self.alert_sink.notify(&sample, score);
        }

        self.reading_count += 1;
        self.summary.readings = self.reading_count;

        let export = if self.reading_count % self.settings.export_every == 0 {
            self.enter(MonitorState::Exporting);
            self.export_now()
        } else {
            ExportOutcome::NotDue
        };

        self.enter(MonitorState::Retaining);
        let evicted = self.window.retain_recent();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.window.len(), "window retention");
        }

        Ok(CycleReport {
            reading,
            reading_number: self.reading_count,
            persisted,
            alerted,
            export,
            evicted,
            window_len: self.window.len(),
        })
    }

    /// Export the full persisted history now
    pub fn export_now(&mut self) -> ExportOutcome {
        match export::export_all(self.store.as_ref(), self.exporter.as_mut()) {
            Ok(rows) => {
                self.summary.exports += 1;
                self.exported_at = self.reading_count;
                ExportOutcome::Exported(rows)
            }
            Err(e) => {
                self.summary.export_failures += 1;
                tracing::error!(error = %e, "export failed, retrying at next scheduled export");
                ExportOutcome::Failed
            }
        }
    }

    /// Run cycles until shutdown, the reading limit, or a sensor failure
    ///
    /// Between cycles the monitor waits `interval` on `shutdown`; a message
    /// or a disconnected channel ends the loop. Pass
    /// `crossbeam::channel::never()` to run without a shutdown path.
    pub fn run(
        &mut self,
        shutdown: &Receiver<()>,
        max_readings: Option<u64>,
    ) -> Result<RunSummary, MonitorError> {
        tracing::info!(
            scorer = self.scorer.name(),
            interval_secs = self.settings.interval_secs,
            "Starting predictive maintenance monitor"
        );

        let stop_reason = loop {
            if let Err(e) = self.run_cycle() {
                tracing::error!(error = %e, readings = self.reading_count, "acquisition loop aborted");
                return Err(e);
            }

            if max_readings.is_some_and(|max| self.reading_count >= max) {
                break StopReason::ReadingLimit;
            }

            self.enter(MonitorState::Sleeping);
            match shutdown.recv_timeout(self.settings.interval()) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break StopReason::Shutdown,
            }
        };

        Ok(self.finish(stop_reason))
    }

    /// Stop gracefully: export unexported readings (if enabled) and record
    /// why the session ended
    pub fn finish(&mut self, stop_reason: StopReason) -> RunSummary {
        tracing::info!(reason = ?stop_reason, readings = self.reading_count, "Monitor stopping");

        if self.settings.export_on_shutdown && self.reading_count > self.exported_at {
            self.enter(MonitorState::Exporting);
            self.export_now();
        }

        self.enter(MonitorState::Stopped);
        self.summary.stop_reason = Some(stop_reason);
        self.summary.clone()
    }
}
