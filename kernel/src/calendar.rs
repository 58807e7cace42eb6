// Day Calendar
//
// Maps record timestamps to the calendar day used to group them, and to
// the wall-clock time shown next to them.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, TimeZone, Utc};

/// Time zone the calendar resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Fixed(FixedOffset),
    /// System zone, resolved at each timestamp so daylight-saving changes
    /// land on the right side of midnight.
    Local,
}

/// Calendar used to derive day keys.
///
/// With a fixed offset, day keys never decrease for non-decreasing
/// timestamps. The local zone can only step back where clocks fall back
/// across midnight, which the index reports as out-of-order input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCalendar {
    zone: Zone,
}

impl Default for DayCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl DayCalendar {
    pub fn utc() -> Self {
        Self::with_offset(Utc.fix())
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            zone: Zone::Fixed(offset),
        }
    }

    /// Offset east of UTC in seconds. `None` if out of range (+/- 24h).
    pub fn from_offset_seconds(seconds: i32) -> Option<Self> {
        FixedOffset::east_opt(seconds).map(Self::with_offset)
    }

    /// System time zone (honours `TZ`).
    pub fn local() -> Self {
        Self { zone: Zone::Local }
    }

    pub fn is_local(&self) -> bool {
        self.zone == Zone::Local
    }

    /// Offset in force at `timestamp`.
    pub fn offset_at(&self, timestamp: &DateTime<Utc>) -> FixedOffset {
        match self.zone {
            Zone::Fixed(offset) => offset,
            Zone::Local => Local.offset_from_utc_datetime(&timestamp.naive_utc()).fix(),
        }
    }

    /// Wall-clock time of `timestamp` in this calendar.
    pub fn local_time(&self, timestamp: &DateTime<Utc>) -> DateTime<FixedOffset> {
        timestamp.with_timezone(&self.offset_at(timestamp))
    }

    /// Day key of a timestamp.
    pub fn day_of(&self, timestamp: &DateTime<Utc>) -> NaiveDate {
        self.local_time(timestamp).date_naive()
    }
}
