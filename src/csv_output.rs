//! CSV export of persisted readings
//!
//! Produces `machine_data.csv` for spreadsheet and BI tools. The file is
//! rewritten with the full history on every export.

use crate::export::{ExportError, ReadingExporter};
use crate::sample::ScoredSample;
use std::fs;
use std::path::{Path, PathBuf};

/// Column order of the export
pub const CSV_HEADER: &str = "timestamp,vibration,temperature,anomaly_score";

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput {
    rows: Vec<ScoredSample>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reading(&mut self, reading: ScoredSample) {
        self.rows.push(reading);
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_reading(reading: &ScoredSample) -> String {
        format!(
            "{},{},{},{}",
            Self::escape_field(&reading.timestamp),
            reading.sample.vibration,
            reading.sample.temperature,
            reading.anomaly_score
        )
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::with_capacity(64 * (self.rows.len() + 1));
        output.push_str(CSV_HEADER);
        output.push('\n');

        for reading in &self.rows {
            output.push_str(&Self::format_reading(reading));
            output.push('\n');
        }

        output
    }
}

impl FromIterator<ScoredSample> for CsvOutput {
    fn from_iter<I: IntoIterator<Item = ScoredSample>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Writes the export to a CSV file
#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadingExporter for CsvExporter {
    fn export(&mut self, readings: &[ScoredSample]) -> Result<(), ExportError> {
        let csv: CsvOutput = readings.iter().cloned().collect();

        // Replace atomically via a sibling staging file
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, csv.to_csv())?;
        fs::rename(&staging, &self.path)?;

        tracing::info!(
            path = %self.path.display(),
            rows = readings.len(),
            "Data exported to {}",
            self.path.display()
        );
        Ok(())
    }
}
