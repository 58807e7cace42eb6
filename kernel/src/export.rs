// Plain-Text Export
//
// Renders the flat, append-ordered record sequence of an index as text,
// one record description per line.

use std::io::{self, Write};

use crate::calendar::DayCalendar;
use crate::index::GroupedLogIndex;
use crate::log::LogRecord;

/// Suggested file name for exported logs.
pub const DEFAULT_FILE_NAME: &str = "console.log";

#[derive(Debug, Clone, Copy, Default)]
pub struct LogExport<'a> {
    records: &'a [LogRecord],
    calendar: DayCalendar,
}

impl<'a> LogExport<'a> {
    /// Export every record of `index` in chronological order, regardless of
    /// its traversal direction. Timestamps use the index's calendar zone.
    pub fn from_index(index: &'a GroupedLogIndex) -> Self {
        Self {
            records: index.records(),
            calendar: *index.calendar(),
        }
    }

    /// Export `records` with UTC timestamps.
    pub fn from_records(records: &'a [LogRecord]) -> Self {
        Self {
            records,
            calendar: DayCalendar::utc(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Newline-joined record descriptions, without a trailing newline.
    pub fn to_plain_text(&self) -> String {
        self.records
            .iter()
            .map(|record| record.describe(&self.calendar))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(self.to_plain_text().as_bytes())?;
        writer.flush()
    }
}
