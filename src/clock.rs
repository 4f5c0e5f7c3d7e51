//! Timestamp source for persisted readings

use chrono::Local;

/// Format used for every persisted timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Provides the capture time of a reading
pub trait Clock {
    /// Current local time as `YYYY-MM-DD HH:MM:SS`
    fn now(&self) -> String;
}

/// Wall-clock local time
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Always reports the same instant
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl FixedClock {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self(timestamp.into())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_clock_format() {
        let ts = LocalClock.now();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(ts.len(), 19);
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new("2024-01-01 00:00:00");
        assert_eq!(clock.now(), "2024-01-01 00:00:00");
        assert_eq!(clock.now(), clock.now());
    }
}
