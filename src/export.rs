//! Periodic export of the full reading history

use crate::sample::ScoredSample;
use crate::storage::{ReadingStore, StorageError};
use thiserror::Error;

/// Export failures; the monitor logs these and retries on the next scheduled export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to load history for export: {0}")]
    Load(#[from] StorageError),

    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for exported readings
pub trait ReadingExporter {
    /// Write `readings` (already in chronological order) to the sink
    fn export(&mut self, readings: &[ScoredSample]) -> Result<(), ExportError>;
}

/// Export every persisted reading in chronological order
///
/// Returns the number of readings written.
pub fn export_all(
    store: &dyn ReadingStore,
    exporter: &mut dyn ReadingExporter,
) -> Result<usize, ExportError> {
    let mut readings = store.load_all()?;
    // Stable: readings sharing a timestamp keep insertion order
    readings.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    exporter.export(&readings)?;
    Ok(readings.len())
}
