// Shared test doubles for monitor integration tests
//
// Collaborators hand their captured state out through Rc<RefCell<..>> so a
// test can inspect it after the monitor has taken ownership of the boxes.
#![allow(dead_code)]

use machwatch::alert::AlertSink;
use machwatch::anomaly::ZScoreScorer;
use machwatch::clock::Clock;
use machwatch::config::MonitorSettings;
use machwatch::export::{ExportError, ReadingExporter};
use machwatch::monitor::Monitor;
use machwatch::sample::{Sample, ScoredSample};
use machwatch::sensor::ReplaySensor;
use machwatch::storage::{ReadingStore, StorageError};
use machwatch::window::RetentionPolicy;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Store whose contents stay visible to the test
#[derive(Clone, Default)]
pub struct SharedStore {
    pub readings: Rc<RefCell<Vec<ScoredSample>>>,
}

impl ReadingStore for SharedStore {
    fn append(&mut self, reading: &ScoredSample) -> Result<(), StorageError> {
        self.readings.borrow_mut().push(reading.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ScoredSample>, StorageError> {
        Ok(self.readings.borrow().clone())
    }
}

/// Exporter that records every batch, optionally failing
#[derive(Clone, Default)]
pub struct CapturingExporter {
    pub batches: Rc<RefCell<Vec<Vec<ScoredSample>>>>,
    pub fail: Rc<Cell<bool>>,
}

impl ReadingExporter for CapturingExporter {
    fn export(&mut self, readings: &[ScoredSample]) -> Result<(), ExportError> {
        if self.fail.get() {
            return Err(ExportError::Io(std::io::Error::other("sink unavailable")));
        }
        self.batches.borrow_mut().push(readings.to_vec());
        Ok(())
    }
}

/// Alert sink whose alerts stay visible to the test
#[derive(Clone, Default)]
pub struct SharedAlerts {
    pub alerts: Rc<RefCell<Vec<(Sample, f64)>>>,
}

impl AlertSink for SharedAlerts {
    fn notify(&mut self, sample: &Sample, score: f64) {
        self.alerts.borrow_mut().push((*sample, score));
    }
}

/// Clock advancing one minute per call, starting at 2024-01-01 00:00:00
#[derive(Default)]
pub struct MinuteClock {
    calls: Cell<u32>,
}

impl Clock for MinuteClock {
    fn now(&self) -> String {
        let n = self.calls.get();
        self.calls.set(n + 1);
        format!("2024-01-01 {:02}:{:02}:00", (n / 60) % 24, n % 60)
    }
}

/// Handles onto the collaborators of a test monitor
pub struct Harness {
    pub monitor: Monitor,
    pub store: SharedStore,
    pub exporter: CapturingExporter,
    pub alerts: SharedAlerts,
}

/// Zero-interval monitor with z-score scoring over the given readings
pub fn harness(samples: Vec<Sample>) -> Harness {
    harness_with(samples, MonitorSettings {
        interval_secs: 0,
        ..MonitorSettings::default()
    })
}

pub fn harness_with(samples: Vec<Sample>, settings: MonitorSettings) -> Harness {
    let store = SharedStore::default();
    let exporter = CapturingExporter::default();
    let alerts = SharedAlerts::default();

    let monitor = Monitor::new(
        settings,
        RetentionPolicy::default(),
        Box::new(ZScoreScorer::default()),
        Box::new(ReplaySensor::new(samples)),
        Box::new(store.clone()),
        Box::new(exporter.clone()),
    )
    .with_alert_sink(Box::new(alerts.clone()))
    .with_clock(Box::new(MinuteClock::default()));

    Harness {
        monitor,
        store,
        exporter,
        alerts,
    }
}

/// Readings alternating around (2.0, 40.0), so both channels have spread
pub fn calm_samples(n: usize) -> Vec<Sample> {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                Sample::new(1.9, 39.5)
            } else {
                Sample::new(2.1, 40.5)
            }
        })
        .collect()
}
