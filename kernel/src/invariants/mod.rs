// Invariant Framework
//
// Invariants are pure rules over the raw storage of a grouped index.
// They let tests and tooling verify that a sequence of appends left the
// record and group tables consistent.

use crate::index::IndexParts;

/// Result of invariant evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantResult {
    Pass,
    Fail(String),
}

/// Trait implemented by all invariants.
///
/// Invariants must be:
/// - Pure
/// - Deterministic
/// - Side-effect free
pub trait Invariant: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, index: &IndexParts<'_>) -> InvariantResult;
}

/// Invariant engine that evaluates a set of invariants.
#[derive(Default)]
pub struct InvariantEngine {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantEngine {
    /// Create an engine with no invariants registered.
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    /// Engine checking every structural guarantee of a grouped index.
    pub fn standard() -> Self {
        let mut engine = Self::new();
        engine.register(StrictlyOrderedRecords);
        engine.register(IncreasingDays);
        engine.register(ConsistentGroupOffsets);
        engine.register(NonEmptyGroups);
        engine.register(GroupsBoundedByRecords);
        engine
    }

    /// Register an invariant.
    pub fn register<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    /// Evaluate all invariants.
    ///
    /// Stops at the first failure.
    pub fn evaluate(&self, index: &IndexParts<'_>) -> Result<(), InvariantViolation> {
        for invariant in &self.invariants {
            match invariant.validate(index) {
                InvariantResult::Pass => continue,
                InvariantResult::Fail(reason) => {
                    return Err(InvariantViolation {
                        invariant: invariant.name(),
                        reason,
                    })
                }
            }
        }
        Ok(())
    }
}

/// Returned when an invariant is violated.
#[derive(Debug, thiserror::Error)]
#[error("invariant `{invariant}` violated: {reason}")]
pub struct InvariantViolation {
    pub invariant: &'static str,
    pub reason: String,
}

/// Each record is strictly later than the one before it.
pub struct StrictlyOrderedRecords;

impl Invariant for StrictlyOrderedRecords {
    fn name(&self) -> &'static str {
        "strictly-ordered-records"
    }

    fn validate(&self, index: &IndexParts<'_>) -> InvariantResult {
        match index
            .records
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            Some(i) => InvariantResult::Fail(format!(
                "record {} at {} does not follow {}",
                i + 1,
                index.records[i + 1].timestamp,
                index.records[i].timestamp
            )),
            None => InvariantResult::Pass,
        }
    }
}

/// Group days strictly increase.
pub struct IncreasingDays;

impl Invariant for IncreasingDays {
    fn name(&self) -> &'static str {
        "increasing-days"
    }

    fn validate(&self, index: &IndexParts<'_>) -> InvariantResult {
        match index
            .groups
            .windows(2)
            .position(|pair| pair[1].day <= pair[0].day)
        {
            Some(i) => InvariantResult::Fail(format!(
                "group {} day {} does not follow {}",
                i + 1,
                index.groups[i + 1].day,
                index.groups[i].day
            )),
            None => InvariantResult::Pass,
        }
    }
}

/// Group offsets start at zero, strictly increase, stay inside storage and
/// point at a record of the group's day.
pub struct ConsistentGroupOffsets;

impl Invariant for ConsistentGroupOffsets {
    fn name(&self) -> &'static str {
        "consistent-group-offsets"
    }

    fn validate(&self, index: &IndexParts<'_>) -> InvariantResult {
        if let Some(first) = index.groups.first() {
            if first.start != 0 {
                return InvariantResult::Fail(format!(
                    "first group starts at {}",
                    first.start
                ));
            }
        } else if !index.records.is_empty() {
            return InvariantResult::Fail("records without groups".into());
        }

        let mut previous = None;
        for (i, group) in index.groups.iter().enumerate() {
            if previous.is_some_and(|p| group.start <= p) {
                return InvariantResult::Fail(format!(
                    "group {i} start {} is not after {}",
                    group.start,
                    previous.unwrap_or_default()
                ));
            }
            let Some(record) = index.records.get(group.start) else {
                return InvariantResult::Fail(format!(
                    "group {i} start {} past {} records",
                    group.start,
                    index.records.len()
                ));
            };
            let day = index.calendar.day_of(&record.timestamp);
            if day != group.day {
                return InvariantResult::Fail(format!(
                    "group {i} is keyed {} but starts on {day}",
                    group.day
                ));
            }
            previous = Some(group.start);
        }

        InvariantResult::Pass
    }
}

/// Every run holds at least one record, and every record in a run shares
/// the run's day.
pub struct NonEmptyGroups;

impl Invariant for NonEmptyGroups {
    fn name(&self) -> &'static str {
        "non-empty-groups"
    }

    fn validate(&self, index: &IndexParts<'_>) -> InvariantResult {
        for (i, group) in index.groups.iter().enumerate() {
            let end = index
                .groups
                .get(i + 1)
                .map_or(index.records.len(), |next| next.start);
            if end <= group.start {
                return InvariantResult::Fail(format!("group {i} ({}) is empty", group.day));
            }
            let run = index.records.get(group.start..end).unwrap_or_default();
            if let Some(stray) = run
                .iter()
                .find(|r| index.calendar.day_of(&r.timestamp) != group.day)
            {
                return InvariantResult::Fail(format!(
                    "group {i} ({}) holds record from {}",
                    group.day, stray.timestamp
                ));
            }
        }
        InvariantResult::Pass
    }
}

/// There are never more groups than records.
pub struct GroupsBoundedByRecords;

impl Invariant for GroupsBoundedByRecords {
    fn name(&self) -> &'static str {
        "groups-bounded-by-records"
    }

    fn validate(&self, index: &IndexParts<'_>) -> InvariantResult {
        if index.groups.len() > index.records.len() {
            InvariantResult::Fail(format!(
                "{} groups for {} records",
                index.groups.len(),
                index.records.len()
            ))
        } else {
            InvariantResult::Pass
        }
    }
}
