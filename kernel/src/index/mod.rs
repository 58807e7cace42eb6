// Grouped Log Index
//
// Append-only, ordered record storage partitioned into contiguous
// calendar-day runs. Groups are addressed by position in either
// traversal direction; each yields a borrowed slice of its records.

use std::iter::FusedIterator;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::calendar::DayCalendar;
use crate::invariants::{InvariantEngine, InvariantViolation};
use crate::log::{LogError, LogRecord};

pub mod slice;

pub use slice::{RecordSlice, Records};

/// Start of a day's run within flat storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStart {
    pub day: NaiveDate,
    pub start: usize,
}

/// One day and its records, in the traversal order of the view that
/// produced it.
#[derive(Debug, Clone, Copy)]
pub struct DayGroup<'a> {
    pub day: NaiveDate,
    pub records: RecordSlice<'a>,
}

/// Read-only access to the raw storage of an index.
#[derive(Debug, Clone, Copy)]
pub struct IndexParts<'a> {
    pub records: &'a [LogRecord],
    pub groups: &'a [GroupStart],
    pub calendar: &'a DayCalendar,
}

/// Records grouped by calendar day.
///
/// Records must be appended with strictly increasing timestamps. Existing
/// offsets never change, so groups handed out earlier stay meaningful after
/// later appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedLogIndex {
    records: Vec<LogRecord>,
    groups: Vec<GroupStart>,
    calendar: DayCalendar,
    reversed: bool,
}

impl GroupedLogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendar(calendar: DayCalendar) -> Self {
        Self {
            calendar,
            ..Self::default()
        }
    }

    /// Build an index from an already ordered batch.
    pub fn from_records<I>(records: I, reversed: bool) -> Result<Self, LogError>
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let mut index = Self::new();
        index.reversed = reversed;
        index.append_all(records)?;
        Ok(index)
    }

    /// Append a single record.
    ///
    /// Fails with [`LogError::OutOfOrderInput`] unless the record is strictly
    /// later than the last one appended. The index is unchanged on failure.
    pub fn append(&mut self, record: LogRecord) -> Result<(), LogError> {
        let day = self.calendar.day_of(&record.timestamp);

        if let Err(err) = check_order(self.records.last(), self.groups.last(), &record, day) {
            warn!(error = %err, "rejected out of order record");
            return Err(err);
        }

        if self.groups.last().map(|g| g.day) != Some(day) {
            debug!(%day, start = self.records.len(), "starting day group");
            self.groups.push(GroupStart {
                day,
                start: self.records.len(),
            });
        }

        self.records.push(record);
        Ok(())
    }

    /// Append a batch of records.
    ///
    /// Ends in the same state as calling [`append`](Self::append) for each
    /// record. If any record is out of order the whole batch is discarded and
    /// the index is left as it was. Returns the number of records appended.
    pub fn append_all<I>(&mut self, records: I) -> Result<usize, LogError>
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let old_len = self.records.len();
        let old_groups = self.groups.len();

        self.records.extend(records);

        for index in old_len..self.records.len() {
            let record = &self.records[index];
            let day = self.calendar.day_of(&record.timestamp);
            let previous = index.checked_sub(1).map(|p| &self.records[p]);

            if let Err(err) = check_order(previous, self.groups.last(), record, day) {
                warn!(
                    error = %err,
                    discarded = self.records.len() - old_len,
                    "rolling back out of order batch"
                );
                self.records.truncate(old_len);
                self.groups.truncate(old_groups);
                return Err(err);
            }

            if self.groups.last().map(|g| g.day) != Some(day) {
                self.groups.push(GroupStart { day, start: index });
            }
        }

        let appended = self.records.len() - old_len;
        if appended > 0 {
            debug!(
                appended,
                new_groups = self.groups.len() - old_groups,
                "appended batch"
            );
        }
        Ok(appended)
    }

    /// Number of day groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// All records in append order, regardless of traversal direction.
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn groups(&self) -> &[GroupStart] {
        &self.groups
    }

    pub fn calendar(&self) -> &DayCalendar {
        &self.calendar
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records.last().map(|r| r.timestamp)
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn set_reversed(&mut self, reversed: bool) {
        self.reversed = reversed;
    }

    /// The same index with the traversal direction flipped.
    pub fn into_reversed(mut self) -> Self {
        self.reversed = !self.reversed;
        self
    }

    /// View in the current traversal direction.
    pub fn view(&self) -> GroupsView<'_> {
        GroupsView {
            records: &self.records,
            groups: &self.groups,
            reversed: self.reversed,
        }
    }

    /// View in the opposite traversal direction.
    pub fn reversed_view(&self) -> GroupsView<'_> {
        self.view().reversed()
    }

    /// Group at `position` in the current traversal direction.
    pub fn get(&self, position: usize) -> Result<DayGroup<'_>, LogError> {
        self.view().get(position)
    }

    pub fn iter(&self) -> Groups<'_> {
        self.view().iter()
    }

    /// Days in traversal order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.iter().map(|group| group.day)
    }

    pub fn parts(&self) -> IndexParts<'_> {
        IndexParts {
            records: &self.records,
            groups: &self.groups,
            calendar: &self.calendar,
        }
    }

    /// Run `engine` against the current storage.
    pub fn check(&self, engine: &InvariantEngine) -> Result<(), InvariantViolation> {
        engine.evaluate(&self.parts())
    }
}

impl<'a> IntoIterator for &'a GroupedLogIndex {
    type Item = DayGroup<'a>;
    type IntoIter = Groups<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn check_order(
    previous: Option<&LogRecord>,
    last_group: Option<&GroupStart>,
    record: &LogRecord,
    day: NaiveDate,
) -> Result<(), LogError> {
    let Some(previous) = previous else {
        return Ok(());
    };

    let regressed_day = last_group.is_some_and(|group| day < group.day);
    if record.timestamp <= previous.timestamp || regressed_day {
        return Err(LogError::OutOfOrderInput {
            previous: previous.timestamp,
            next: record.timestamp,
        });
    }
    Ok(())
}

/// Borrowed, directional view over the groups of an index.
#[derive(Debug, Clone, Copy)]
pub struct GroupsView<'a> {
    records: &'a [LogRecord],
    groups: &'a [GroupStart],
    reversed: bool,
}

impl<'a> GroupsView<'a> {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Same groups, opposite direction. O(1).
    pub fn reversed(&self) -> Self {
        Self {
            reversed: !self.reversed,
            ..*self
        }
    }

    /// Group at `position`, counted from the latest day when reversed.
    ///
    /// The returned slice follows the same direction.
    pub fn get(&self, position: usize) -> Result<DayGroup<'a>, LogError> {
        let count = self.groups.len();
        if position >= count {
            return Err(LogError::IndexOutOfRange {
                index: position,
                len: count,
            });
        }

        let logical = if self.reversed {
            count - 1 - position
        } else {
            position
        };

        let group = &self.groups[logical];
        let run_start = group.start;
        let run_end = self
            .groups
            .get(logical + 1)
            .map_or(self.records.len(), |next| next.start);

        let records = if self.reversed {
            RecordSlice::new(self.records, run_end, run_start)?
        } else {
            RecordSlice::new(self.records, run_start, run_end)?
        };

        Ok(DayGroup {
            day: group.day,
            records,
        })
    }

    /// Group at a position already known to be in range.
    ///
    /// Panics if the index storage is inconsistent, which append never
    /// allows.
    fn group_at(&self, position: usize) -> DayGroup<'a> {
        match self.get(position) {
            Ok(group) => group,
            Err(err) => panic!("group {position} of {} unreadable: {err}", self.len()),
        }
    }

    pub fn iter(&self) -> Groups<'a> {
        Groups {
            view: *self,
            front: 0,
            back: self.len(),
        }
    }
}

impl<'a> IntoIterator for GroupsView<'a> {
    type Item = DayGroup<'a>;
    type IntoIter = Groups<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the day groups of a [`GroupsView`].
#[derive(Debug, Clone)]
pub struct Groups<'a> {
    view: GroupsView<'a>,
    front: usize,
    back: usize,
}

impl<'a> Iterator for Groups<'a> {
    type Item = DayGroup<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let group = self.view.group_at(self.front);
        self.front += 1;
        Some(group)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Groups<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(self.view.group_at(self.back))
    }
}

impl ExactSizeIterator for Groups<'_> {}

impl FusedIterator for Groups<'_> {}
