// Log Source Abstraction
//
// Defines the acquisition contract for records fed into the index.
// Implementations may poll an OS log facility, tail a file, etc.

use chrono::{DateTime, Utc};

use super::LogRecord;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Producer of log records.
///
/// Properties required from implementations:
/// - Records are returned in non-decreasing timestamp order
/// - Only records strictly after `after` are returned
///
/// Implementations MUST NOT:
/// - Reorder records
/// - Return a record twice across successive reads
pub trait LogSource {
    /// Read every record with a timestamp strictly after `after`, or all
    /// records when `after` is `None`.
    fn read_after(&mut self, after: Option<DateTime<Utc>>) -> Result<Vec<LogRecord>, SourceError>;
}

/// Source backed by an in-memory buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    records: Vec<LogRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<LogRecord>) -> Self {
        Self { records }
    }

    /// Simulate the facility emitting a new record.
    pub fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }
}

impl LogSource for MemorySource {
    fn read_after(&mut self, after: Option<DateTime<Utc>>) -> Result<Vec<LogRecord>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|record| after.map_or(true, |after| record.timestamp > after))
            .cloned()
            .collect())
    }
}
