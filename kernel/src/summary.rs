// Index Summary
//
// Per-day counts and time bounds of a grouped index, for reporting.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::index::GroupsView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub day: NaiveDate,
    pub count: usize,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub reversed: bool,
    pub total_records: usize,
    pub days: Vec<DaySummary>,
}

impl IndexSummary {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Summarize `view` in its traversal order.
pub fn summarize(view: &GroupsView<'_>) -> IndexSummary {
    let mut days = Vec::with_capacity(view.len());

    for group in view.iter() {
        // Bounds are chronological whatever the slice direction.
        let (Some(a), Some(b)) = (group.records.first(), group.records.last()) else {
            continue;
        };
        let (first, last) = if group.records.is_reversed() { (b, a) } else { (a, b) };

        days.push(DaySummary {
            day: group.day,
            count: group.records.len(),
            first: first.timestamp,
            last: last.timestamp,
        });
    }

    IndexSummary {
        reversed: view.is_reversed(),
        total_records: days.iter().map(|d| d.count).sum(),
        days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::GroupedLogIndex;
    use crate::log::{LogRecord, ProcessIdentity};
    use chrono::TimeZone;

    fn index() -> GroupedLogIndex {
        let identity = ProcessIdentity::current();
        let records = [0, 100_000, 100_001, 100_002, 200_000]
            .into_iter()
            .map(|secs| LogRecord::new("m", Utc.timestamp_opt(secs, 0).unwrap(), &identity));
        GroupedLogIndex::from_records(records, false).unwrap()
    }

    #[test]
    fn summary_counts_each_day() {
        let index = index();
        let summary = summarize(&index.view());

        assert_eq!(summary.total_records, 5);
        assert_eq!(
            summary.days.iter().map(|d| d.count).collect::<Vec<_>>(),
            vec![1, 3, 1]
        );
        assert_eq!(summary.days[1].first, Utc.timestamp_opt(100_000, 0).unwrap());
        assert_eq!(summary.days[1].last, Utc.timestamp_opt(100_002, 0).unwrap());
    }

    #[test]
    fn reversed_summary_keeps_chronological_bounds() {
        let index = index();
        let summary = summarize(&index.reversed_view());

        assert!(summary.reversed);
        assert_eq!(summary.days[0].day, NaiveDate::from_ymd_opt(1970, 1, 3).unwrap());
        assert_eq!(summary.days[1].first, Utc.timestamp_opt(100_000, 0).unwrap());
        assert_eq!(summary.days[1].last, Utc.timestamp_opt(100_002, 0).unwrap());
    }

    #[test]
    fn empty_index_summary() {
        let index = GroupedLogIndex::new();
        let summary = summarize(&index.view());

        assert!(summary.is_empty());
        assert_eq!(summary.total_records, 0);
        assert_eq!(serde_json::to_value(&summary).unwrap()["days"], serde_json::json!([]));
    }
}
