// Daylog Kernel
//
// Append-only log record index grouped by calendar day, with
// reversible zero-copy traversal.

pub mod adapters;
pub mod calendar;
pub mod export;
pub mod index;
pub mod invariants;
pub mod log;
pub mod metadata;
pub mod summary;
pub mod tail;
