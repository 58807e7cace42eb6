// Source Tailing
//
// Drains a log source into a grouped index, either once or
// incrementally by remembering the last timestamp observed.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::calendar::DayCalendar;
use crate::index::GroupedLogIndex;
use crate::log::{LogError, LogSource, SourceError};

/// Errors that can occur while feeding an index from a source.
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("index error: {0}")]
    Log(#[from] LogError),
}

/// Read everything `source` currently holds into a new index.
pub fn read_all<S: LogSource>(
    source: &mut S,
    calendar: DayCalendar,
    reversed: bool,
) -> Result<GroupedLogIndex, TailError> {
    let mut index = GroupedLogIndex::with_calendar(calendar);
    index.set_reversed(reversed);
    index.append_all(source.read_after(None)?)?;
    Ok(index)
}

/// Incremental reader over a [`LogSource`].
///
/// Each poll asks the source only for records newer than the last one seen.
#[derive(Debug)]
pub struct Tail<S> {
    source: S,
    position: Option<DateTime<Utc>>,
}

impl<S: LogSource> Tail<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            position: None,
        }
    }

    /// Resume after `position`, e.g. the last timestamp of an index built by
    /// [`read_all`].
    pub fn starting_after(source: S, position: Option<DateTime<Utc>>) -> Self {
        Self { source, position }
    }

    pub fn position(&self) -> Option<DateTime<Utc>> {
        self.position
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Append any new records to `index`. Returns how many were appended.
    ///
    /// The position only advances when the batch was accepted.
    pub fn poll(&mut self, index: &mut GroupedLogIndex) -> Result<usize, TailError> {
        let records = self.source.read_after(self.position)?;
        let last = records.last().map(|r| r.timestamp);

        let appended = index.append_all(records)?;
        if let Some(last) = last {
            self.position = Some(last);
        }

        debug!(appended, position = ?self.position, "polled source");
        Ok(appended)
    }
}
