//! Half-open time interval algebra.
//!
//! Every comparison in the engine is made on `[start, end)` intervals: an interval
//! contains its start and excludes its end, so two intervals that merely touch
//! (`a.end == b.start`) never overlap. Zero-length intervals are degenerate and
//! overlap nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` span of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Build an interval, returning `None` when `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// True for zero-length intervals, which are excluded from conflict checks.
    pub fn is_degenerate(&self) -> bool {
        self.start >= self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// The overlapping part of two intervals, if it has a positive length.
    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Interval { start, end })
    }
}

/// Strict half-open overlap test.
///
/// Two intervals overlap iff `a.start < b.end && b.start < a.end`. Touching
/// endpoints do not count, and a degenerate interval overlaps nothing, including
/// itself.
pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    if a.is_degenerate() || b.is_degenerate() {
        return false;
    }
    a.start < b.end && b.start < a.end
}

/// Sort and coalesce intervals into a minimal, sorted, non-overlapping list.
///
/// Overlapping and touching intervals are joined; degenerate intervals are
/// dropped. The result is a fixed point: merging it again returns it unchanged.
pub fn merge(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals
        .iter()
        .copied()
        .filter(|i| !i.is_degenerate())
        .collect();

    if sorted.is_empty() {
        return Vec::new();
    }

    // Sort by start time (then by end time for stability).
    sorted.sort_by_key(|i| (i.start, i.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }

    merged
}

/// Portions of `occupied` that no `available` interval covers.
///
/// Available intervals are sorted by start and swept once with a cursor that
/// starts at `occupied.start`. Every gap between the cursor and the next
/// available start becomes a conflict, and a trailing gap up to `occupied.end` is
/// emitted when non-empty. Available intervals may overlap each other or extend
/// past the occupied span.
pub fn subtract_available(occupied: &Interval, available: &[Interval]) -> Vec<Interval> {
    if occupied.is_degenerate() {
        return Vec::new();
    }

    let mut sorted: Vec<&Interval> = available.iter().filter(|a| !a.is_degenerate()).collect();
    sorted.sort_by_key(|a| (a.start, a.end));

    let mut conflicts = Vec::new();
    let mut cursor = occupied.start;

    for slot in sorted {
        if slot.start >= occupied.end {
            break;
        }
        if slot.end <= cursor {
            continue;
        }
        if cursor < slot.start {
            conflicts.push(Interval {
                start: cursor,
                end: slot.start,
            });
        }
        cursor = cursor.max(slot.end);
    }

    // Trailing uncovered stretch after the last available slot.
    if cursor < occupied.end {
        conflicts.push(Interval {
            start: cursor,
            end: occupied.end,
        });
    }

    conflicts
}

