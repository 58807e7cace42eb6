// Record Slices
//
// Zero-copy, reversible windows over a contiguous run of flat record
// storage.

use std::iter::FusedIterator;
use std::ops::Range;

use crate::log::{LogError, LogRecord};

/// Borrowed view over `storage[start..end]`.
///
/// Constructed with `start > end`, the view covers `storage[end..start]`
/// and yields records latest-first.
#[derive(Debug, Clone, Copy)]
pub struct RecordSlice<'a> {
    base: &'a [LogRecord],
    start: usize,
    end: usize,
    reversed: bool,
}

impl<'a> RecordSlice<'a> {
    pub fn new(base: &'a [LogRecord], start: usize, end: usize) -> Result<Self, LogError> {
        let (lo, hi, reversed) = if start > end {
            (end, start, true)
        } else {
            (start, end, false)
        };

        if hi > base.len() {
            return Err(LogError::SliceOutOfBounds {
                start: lo,
                end: hi,
                len: base.len(),
            });
        }

        Ok(Self {
            base,
            start: lo,
            end: hi,
            reversed,
        })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Normalized storage range covered by the view.
    pub fn offsets(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Record at `position` in view order.
    pub fn get(&self, position: usize) -> Result<&'a LogRecord, LogError> {
        if position >= self.len() {
            return Err(LogError::IndexOutOfRange {
                index: position,
                len: self.len(),
            });
        }
        Ok(&self.base[self.storage_index(position)])
    }

    pub fn first(&self) -> Option<&'a LogRecord> {
        self.get(0).ok()
    }

    pub fn last(&self) -> Option<&'a LogRecord> {
        self.len().checked_sub(1).and_then(|p| self.get(p).ok())
    }

    /// Same records, opposite order. O(1).
    pub fn reversed(&self) -> Self {
        Self {
            reversed: !self.reversed,
            ..*self
        }
    }

    pub fn iter(&self) -> Records<'a> {
        Records {
            slice: *self,
            front: 0,
            back: self.len(),
        }
    }

    fn storage_index(&self, position: usize) -> usize {
        if self.reversed {
            self.end - position - 1
        } else {
            self.start + position
        }
    }
}

impl<'a> IntoIterator for RecordSlice<'a> {
    type Item = &'a LogRecord;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &RecordSlice<'a> {
    type Item = &'a LogRecord;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`RecordSlice`] in view order.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    slice: RecordSlice<'a>,
    front: usize,
    back: usize,
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a LogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let record = &self.slice.base[self.slice.storage_index(self.front)];
        self.front += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Records<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(&self.slice.base[self.slice.storage_index(self.back)])
    }
}

impl ExactSizeIterator for Records<'_> {}

impl FusedIterator for Records<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::ProcessIdentity;
    use chrono::{TimeZone, Utc};

    fn records(n: usize) -> Vec<LogRecord> {
        let identity = ProcessIdentity::current();
        (1..=n)
            .map(|i| {
                LogRecord::new(
                    format!("#{i}"),
                    Utc.timestamp_opt(i as i64, 0).unwrap(),
                    &identity,
                )
            })
            .collect()
    }

    fn messages(slice: RecordSlice<'_>) -> Vec<&str> {
        slice.iter().map(|r| r.message.as_str()).collect()
    }

    #[test]
    fn empty_slice_over_empty_storage() {
        let slice = RecordSlice::new(&[], 0, 0).unwrap();
        assert_eq!(slice.len(), 0);
        assert_eq!(slice.iter().count(), 0);
    }

    #[test]
    fn empty_slice_at_end_of_storage() {
        let base = records(1);
        let slice = RecordSlice::new(&base, 1, 1).unwrap();

        assert!(slice.is_empty());
        assert_eq!(slice.iter().count(), 0);
        assert!(slice.first().is_none());
        assert!(slice.last().is_none());
    }

    #[test]
    fn forward_slice() {
        let base = records(5);
        let slice = RecordSlice::new(&base, 1, 4).unwrap();

        assert_eq!(slice.len(), 3);
        assert!(!slice.is_reversed());
        assert_eq!(slice.get(0).unwrap().message, "#2");
        assert_eq!(slice.get(2).unwrap().message, "#4");
        assert_eq!(messages(slice), vec!["#2", "#3", "#4"]);
    }

    #[test]
    fn swapped_bounds_reverse_the_slice() {
        let base = records(5);
        let slice = RecordSlice::new(&base, 4, 1).unwrap();

        assert_eq!(slice.len(), 3);
        assert!(slice.is_reversed());
        assert_eq!(slice.offsets(), 1..4);
        assert_eq!(messages(slice), vec!["#4", "#3", "#2"]);
    }

    #[test]
    fn reversed_flips_order_without_moving_bounds() {
        let base = records(5);
        let slice = RecordSlice::new(&base, 0, 5).unwrap();

        let back = slice.reversed();
        assert_eq!(back.offsets(), slice.offsets());
        assert_eq!(messages(back), vec!["#5", "#4", "#3", "#2", "#1"]);
        assert_eq!(messages(back.reversed()), messages(slice));
    }

    #[test]
    fn iterator_is_double_ended() {
        let base = records(4);
        let slice = RecordSlice::new(&base, 0, 4).unwrap();
        let mut iter = slice.iter();

        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next().unwrap().message, "#1");
        assert_eq!(iter.next_back().unwrap().message, "#4");
        assert_eq!(iter.len(), 2);
        let rest: Vec<_> = iter.rev().map(|r| r.message.as_str()).collect();
        assert_eq!(rest, vec!["#3", "#2"]);
    }

    #[test]
    fn out_of_range_position() {
        let base = records(3);
        let slice = RecordSlice::new(&base, 0, 2).unwrap();

        assert_eq!(
            slice.get(2).unwrap_err(),
            LogError::IndexOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn bounds_past_storage_are_rejected() {
        let base = records(2);

        assert_eq!(
            RecordSlice::new(&base, 3, 1).unwrap_err(),
            LogError::SliceOutOfBounds {
                start: 1,
                end: 3,
                len: 2
            }
        );
    }
}
