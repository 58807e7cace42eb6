// Record Metadata Options
//
// Selects which per-record metadata fields a renderer shows next to the
// message.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use crate::calendar::DayCalendar;
use crate::log::LogRecord;

/// Set of metadata fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MetadataOptions(u8);

impl MetadataOptions {
    pub const TYPE: Self = Self(1 << 0);
    pub const TIMESTAMP: Self = Self(1 << 1);
    pub const PROCESS_NAME: Self = Self(1 << 2);
    pub const LIBRARY: Self = Self(1 << 3);
    pub const PID: Self = Self(1 << 4);
    pub const TID: Self = Self(1 << 5);
    pub const SUBSYSTEM: Self = Self(1 << 6);
    pub const CATEGORY: Self = Self(1 << 7);

    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u8::MAX);

    const FIELDS: [(Self, &'static str); 8] = [
        (Self::TYPE, "type"),
        (Self::TIMESTAMP, "timestamp"),
        (Self::PROCESS_NAME, "process"),
        (Self::LIBRARY, "library"),
        (Self::PID, "pid"),
        (Self::TID, "tid"),
        (Self::SUBSYSTEM, "subsystem"),
        (Self::CATEGORY, "category"),
    ];

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Only the given fields.
    pub fn show(options: &[Self]) -> Self {
        options.iter().fold(Self::NONE, |acc, o| acc | *o)
    }

    /// Every field except the given ones.
    pub fn hide(options: &[Self]) -> Self {
        options.iter().fold(Self::ALL, |mut acc, o| {
            acc.remove(*o);
            acc
        })
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Selected fields of `record`, space separated, in declaration order.
    /// Timestamps are shown in `calendar`'s zone. Empty strings and an
    /// unknown (zero) thread id are skipped.
    pub fn format(&self, record: &LogRecord, calendar: &DayCalendar) -> String {
        let mut parts = Vec::new();

        for (field, _) in Self::FIELDS {
            if !self.contains(field) {
                continue;
            }
            let value = match field {
                Self::TYPE => record.level.to_string(),
                Self::TIMESTAMP => record.local_timestamp(calendar),
                Self::PROCESS_NAME => record.process.clone(),
                Self::LIBRARY => record.sender.clone(),
                Self::PID => record.process_id.to_string(),
                Self::TID if record.thread_id == 0 => String::new(),
                Self::TID => format!("{:#x}", record.thread_id),
                Self::SUBSYSTEM => record.subsystem.clone(),
                _ => record.category.clone(),
            };
            if !value.is_empty() {
                parts.push(value);
            }
        }

        parts.join(" ")
    }
}

impl BitOr for MetadataOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MetadataOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown metadata field `{0}`")]
pub struct UnknownField(pub String);

impl FromStr for MetadataOptions {
    type Err = UnknownField;

    /// Parse a single field name, e.g. `pid`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::FIELDS
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map(|(field, _)| *field)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

impl fmt::Display for MetadataOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = Self::FIELDS
            .iter()
            .filter(|(field, _)| self.contains(*field))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{Level, ProcessIdentity};
    use chrono::{TimeZone, Utc};

    fn record() -> LogRecord {
        let identity = ProcessIdentity {
            process: "daylogd".into(),
            sender: "libdaylog".into(),
            process_id: 42,
            thread_id: 255,
            subsystem: String::new(),
            category: "ingest".into(),
        };
        LogRecord::new("hello", Utc.timestamp_opt(0, 0).unwrap(), &identity)
            .with_level(Level::Info)
    }

    #[test]
    fn show_and_hide() {
        let shown = MetadataOptions::show(&[MetadataOptions::PID, MetadataOptions::TID]);
        assert!(shown.contains(MetadataOptions::PID));
        assert!(!shown.contains(MetadataOptions::TYPE));

        let hidden = MetadataOptions::hide(&[MetadataOptions::PID]);
        assert!(!hidden.contains(MetadataOptions::PID));
        assert!(hidden.contains(MetadataOptions::CATEGORY));

        assert_eq!(MetadataOptions::show(&[]), MetadataOptions::NONE);
        assert_eq!(MetadataOptions::hide(&[]), MetadataOptions::ALL);
    }

    #[test]
    fn format_selected_fields_in_order() {
        let options = MetadataOptions::CATEGORY | MetadataOptions::TYPE | MetadataOptions::TID;
        assert_eq!(options.format(&record(), &DayCalendar::utc()), "info 0xff ingest");
    }

    #[test]
    fn format_skips_empty_fields() {
        let options = MetadataOptions::show(&[MetadataOptions::SUBSYSTEM, MetadataOptions::PID]);
        assert_eq!(options.format(&record(), &DayCalendar::utc()), "42");
        assert_eq!(MetadataOptions::NONE.format(&record(), &DayCalendar::utc()), "");
    }

    #[test]
    fn format_skips_unknown_thread_id() {
        let mut record = record();
        record.thread_id = 0;

        let options = MetadataOptions::show(&[MetadataOptions::PID, MetadataOptions::TID]);
        assert_eq!(options.format(&record, &DayCalendar::utc()), "42");
    }

    #[test]
    fn format_timestamp_in_calendar_zone() {
        let calendar = DayCalendar::from_offset_seconds(-5 * 3600).unwrap();

        assert_eq!(
            MetadataOptions::TIMESTAMP.format(&record(), &calendar),
            "1969-12-31 19:00:00.000"
        );
    }

    #[test]
    fn parse_field_names() {
        assert_eq!("pid".parse::<MetadataOptions>(), Ok(MetadataOptions::PID));
        assert_eq!("Process".parse::<MetadataOptions>(), Ok(MetadataOptions::PROCESS_NAME));
        assert_eq!(
            "color".parse::<MetadataOptions>(),
            Err(UnknownField("color".into()))
        );
    }

    #[test]
    fn display_lists_names() {
        let options = MetadataOptions::PID | MetadataOptions::CATEGORY;
        assert_eq!(options.to_string(), "[pid, category]");
    }
}
