// JSON Lines Source Adapter
//
// Reads log records from a file holding one JSON-encoded record per
// line, as written by `serde_json::to_string(&record)`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::log::{LogRecord, LogSource, SourceError};

/// File-backed [`LogSource`].
///
/// The file is re-read on every call so records appended by another
/// process between polls are picked up.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
    process_id: Option<i32>,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            process_id: None,
        }
    }

    /// Only yield records emitted by `process_id`.
    pub fn with_process_id(mut self, process_id: i32) -> Self {
        self.process_id = Some(process_id);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse JSON lines text into records. Blank lines are skipped; line numbers
/// in errors are 1-based.
pub fn parse_records(text: &str) -> Result<Vec<LogRecord>, SourceError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| SourceError::Parse { line: i + 1, source })
        })
        .collect()
}

impl LogSource for JsonLinesSource {
    fn read_after(&mut self, after: Option<DateTime<Utc>>) -> Result<Vec<LogRecord>, SourceError> {
        let text = fs::read_to_string(&self.path)?;
        let records: Vec<LogRecord> = parse_records(&text)?
            .into_iter()
            .filter(|r| after.map_or(true, |after| r.timestamp > after))
            .filter(|r| self.process_id.map_or(true, |pid| r.process_id == pid))
            .collect();

        debug!(path = %self.path.display(), read = records.len(), "read json lines");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Level;
    use chrono::TimeZone;
    use std::io::Write;

    const LINES: &str = r##"
{"timestamp":"1970-01-01T00:00:00Z","message":"#1","level":"info","process_id":10}
{"timestamp":"1970-01-02T03:46:40Z","message":"#2","level":"error","process_id":11}

{"timestamp":"1970-01-02T03:46:41Z","message":"#3","process_id":10}
"##;

    fn write_lines(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn parse_json_lines() {
        let records = parse_records(LINES).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].level, Level::Info);
        assert_eq!(records[1].level, Level::Error);
        assert_eq!(records[2].level, Level::Notice);
        assert_eq!(records[1].timestamp, Utc.timestamp_opt(100_000, 0).unwrap());
    }

    #[test]
    fn parse_error_reports_line() {
        let err = parse_records("{\"timestamp\":\"1970-01-01T00:00:00Z\",\"message\":\"ok\"}\nnot json\n")
            .unwrap_err();

        assert!(matches!(err, SourceError::Parse { line: 2, .. }));
    }

    #[test]
    fn reads_file_after_position() {
        let file = write_lines(LINES);
        let mut source = JsonLinesSource::new(file.path());

        assert_eq!(source.read_after(None).unwrap().len(), 3);

        let after = Utc.timestamp_opt(100_000, 0).unwrap();
        let newer = source.read_after(Some(after)).unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].message, "#3");
    }

    #[test]
    fn filters_by_process() {
        let file = write_lines(LINES);
        let mut source = JsonLinesSource::new(file.path()).with_process_id(10);

        let records = source.read_after(None).unwrap();
        assert_eq!(
            records.iter().map(|r| r.message.as_str()).collect::<Vec<_>>(),
            vec!["#1", "#3"]
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = JsonLinesSource::new(dir.path().join("absent.jsonl"));

        assert!(matches!(source.read_after(None), Err(SourceError::Io(_))));
    }
}
