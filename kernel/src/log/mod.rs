// Log Records
//
// Immutable log entries as handed to the index by an acquisition
// collaborator, plus the errors raised when the index contract is broken.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::DayCalendar;

pub mod source;

/// Layout used wherever a record timestamp is shown.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub use source::{LogSource, MemorySource, SourceError};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Undefined,
    Debug,
    Info,
    #[default]
    Notice,
    Error,
    Fault,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Undefined => "undefined",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Notice => "notice",
            Level::Error => "error",
            Level::Fault => "fault",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the process emitting records.
///
/// Passed explicitly to [`LogRecord::new`] so records can be built for
/// synthetic processes in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub process: String,
    pub sender: String,
    pub process_id: i32,
    pub thread_id: u64,
    pub subsystem: String,
    pub category: String,
}

impl ProcessIdentity {
    /// Identity of the running process.
    ///
    /// The thread id is left at 0 (unknown); std exposes no stable numeric
    /// thread id. Renderers omit a zero thread id.
    pub fn current() -> Self {
        let process = std::env::current_exe()
            .ok()
            .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            sender: process.clone(),
            process,
            process_id: std::process::id() as i32,
            thread_id: 0,
            subsystem: String::new(),
            category: "default".to_string(),
        }
    }

    pub fn with_thread_id(mut self, thread_id: u64) -> Self {
        self.thread_id = thread_id;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = subsystem.into();
        self
    }
}

/// A single log entry.
///
/// Records are never mutated once appended to a
/// [`GroupedLogIndex`](crate::index::GroupedLogIndex); the index only hands
/// out shared references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub process: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub process_id: i32,
    #[serde(default)]
    pub thread_id: u64,
    #[serde(default)]
    pub subsystem: String,
    #[serde(default)]
    pub category: String,
}

impl LogRecord {
    pub fn new(
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        identity: &ProcessIdentity,
    ) -> Self {
        Self {
            timestamp,
            message: message.into(),
            level: Level::default(),
            process: identity.process.clone(),
            sender: identity.sender.clone(),
            process_id: identity.process_id,
            thread_id: identity.thread_id,
            subsystem: identity.subsystem.clone(),
            category: identity.category.clone(),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn pid(&self) -> i32 {
        self.process_id
    }

    pub fn tid(&self) -> u64 {
        self.thread_id
    }

    /// Library (image) that emitted the record.
    pub fn library(&self) -> &str {
        &self.sender
    }

    /// Timestamp as wall-clock time in `calendar`'s zone.
    pub fn local_timestamp(&self, calendar: &DayCalendar) -> String {
        calendar
            .local_time(&self.timestamp)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    /// One-line description with the timestamp shown in `calendar`'s zone.
    pub fn describe(&self, calendar: &DayCalendar) -> String {
        format!(
            "[{}] [{}] {}",
            self.local_timestamp(calendar),
            self.category,
            self.message
        )
    }
}

/// Description in UTC.
impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(&DayCalendar::utc()))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LogError {
    #[error("out of order input: {next} does not follow {previous}")]
    OutOfOrderInput {
        previous: DateTime<Utc>,
        next: DateTime<Utc>,
    },

    #[error("index out of range: {index} not in 0..{len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("slice {start}..{end} out of bounds for storage of {len} records")]
    SliceOutOfBounds { start: usize, end: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn identity() -> ProcessIdentity {
        ProcessIdentity {
            process: "daylogd".into(),
            sender: "libdaylog".into(),
            process_id: 42,
            thread_id: 7,
            subsystem: "com.example.daylog".into(),
            category: "ingest".into(),
        }
    }

    #[test]
    fn record_takes_payload_from_identity() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let record = LogRecord::new("hello", ts, &identity()).with_level(Level::Error);

        assert_eq!(record.pid(), 42);
        assert_eq!(record.tid(), 7);
        assert_eq!(record.library(), "libdaylog");
        assert_eq!(record.level, Level::Error);
        assert_eq!(record.category, "ingest");
    }

    #[test]
    fn description_includes_category_and_message() {
        let ts = Utc.timestamp_opt(100_000, 0).unwrap();
        let record = LogRecord::new("booted", ts, &identity());

        assert_eq!(
            record.to_string(),
            "[1970-01-02 03:46:40.000] [ingest] booted"
        );
    }

    #[test]
    fn description_uses_calendar_zone() {
        let ts = Utc.timestamp_opt(100_000, 0).unwrap();
        let record = LogRecord::new("booted", ts, &identity());
        let calendar = DayCalendar::from_offset_seconds(-5 * 3600).unwrap();

        assert_eq!(
            record.describe(&calendar),
            "[1970-01-01 22:46:40.000] [ingest] booted"
        );
        assert_eq!(calendar.day_of(&ts).to_string(), "1970-01-01");
    }

    #[test]
    fn record_json_defaults_missing_payload() {
        let json = r#"{"timestamp":"1970-01-01T00:00:00Z","message":"bare"}"#;
        let record: LogRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.message, "bare");
        assert_eq!(record.level, Level::Notice);
        assert!(record.category.is_empty());
    }

    #[test]
    fn current_identity_uses_process_id() {
        let identity = ProcessIdentity::current();
        assert_eq!(identity.process_id, std::process::id() as i32);
    }
}
