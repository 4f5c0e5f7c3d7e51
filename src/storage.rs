//! Persistence of scored readings
//!
//! Readings are append-only. [`JsonlStore`] keeps one JSON object per line,
//! with the same columns as the `machine_data` table
//! (`timestamp, vibration, temperature, anomaly_score`).

use crate::sample::ScoredSample;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage failures; the monitor logs these and carries on
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize reading: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Corrupt record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("Refusing to store non-finite reading at {timestamp}")]
    NonFinite { timestamp: String },
}

/// Append-only store of scored readings
pub trait ReadingStore {
    fn append(&mut self, reading: &ScoredSample) -> Result<(), StorageError>;

    /// Every persisted reading, in insertion order
    fn load_all(&self) -> Result<Vec<ScoredSample>, StorageError>;
}

/// In-process store, lost on exit
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    readings: Vec<ScoredSample>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readings(&self) -> &[ScoredSample] {
        &self.readings
    }
}

impl ReadingStore for MemoryStore {
    fn append(&mut self, reading: &ScoredSample) -> Result<(), StorageError> {
        self.readings.push(reading.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ScoredSample>, StorageError> {
        Ok(self.readings.clone())
    }
}

/// JSON-lines file store
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    /// Open (creating if needed) the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), "reading store opened");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadingStore for JsonlStore {
    fn append(&mut self, reading: &ScoredSample) -> Result<(), StorageError> {
        // serde_json writes NaN/inf as null, which load_all cannot read back
        if !(reading.anomaly_score.is_finite() && reading.sample.is_finite()) {
            return Err(StorageError::NonFinite {
                timestamp: reading.timestamp.clone(),
            });
        }

        let mut line = serde_json::to_string(reading)?;
        line.push('\n');

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ScoredSample>, StorageError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut readings = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let reading = serde_json::from_str(&line).map_err(|e| StorageError::Corrupt {
                line: idx + 1,
                reason: e.to_string(),
            })?;
            readings.push(reading);
        }

        Ok(readings)
    }
}
