//! Maintenance alerts

use crate::sample::Sample;

/// Receives maintenance alerts; must not fail the caller
pub trait AlertSink {
    fn notify(&mut self, sample: &Sample, score: f64);
}

/// Logs the alert and prints an operator banner on stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleAlertSink;

impl AlertSink for ConsoleAlertSink {
    fn notify(&mut self, sample: &Sample, score: f64) {
        tracing::warn!(
            vibration = sample.vibration,
            temperature = sample.temperature,
            score,
            "Potential maintenance issue detected!"
        );
        eprintln!("⚠️  MAINTENANCE ALERT: Potential issue detected!");
        eprintln!("   Vibration: {} mm/s", sample.vibration);
        eprintln!("   Temperature: {} °C", sample.temperature);
    }
}

/// Keeps every alert in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingAlertSink {
    alerts: Vec<(Sample, f64)>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> &[(Sample, f64)] {
        &self.alerts
    }
}

impl AlertSink for RecordingAlertSink {
    fn notify(&mut self, sample: &Sample, score: f64) {
        self.alerts.push((*sample, score));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let mut sink = RecordingAlertSink::new();
        sink.notify(&Sample::new(9.0, 90.0), -1.0);
        sink.notify(&Sample::new(8.0, 85.0), -1.0);

        assert_eq!(sink.alerts().len(), 2);
        assert_eq!(sink.alerts()[0].0, Sample::new(9.0, 90.0));
    }

    #[test]
    fn test_console_sink_does_not_panic() {
        ConsoleAlertSink.notify(&Sample::new(4.9, 79.0), -1.0);
    }
}
