//! Validation results.
//!
//! A [`ConflictReport`] is produced fresh by every validation call and never
//! persisted. Violations keep the order the checks ran in: double-book, then
//! category, then availability.

use std::fmt;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::event::Resource;
use crate::interval::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    DoubleBook,
    CategoryNotAllowed,
    Availability,
}

/// The resource a violation is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
}

impl From<&Resource> for ResourceRef {
    fn from(r: &Resource) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Another event already holds a resource that refuses double-booking.
    DoubleBook {
        resource: ResourceRef,
        other_event: String,
        /// The candidate occurrence that collided.
        interval: Interval,
    },
    /// The resource does not accept some of the event's categories.
    CategoryNotAllowed {
        resource: ResourceRef,
        categories: Vec<String>,
    },
    /// The event occupies time the resource's working calendar does not offer.
    Availability {
        resource: ResourceRef,
        intervals: Vec<Interval>,
    },
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Violation::DoubleBook { .. } => ViolationKind::DoubleBook,
            Violation::CategoryNotAllowed { .. } => ViolationKind::CategoryNotAllowed,
            Violation::Availability { .. } => ViolationKind::Availability,
        }
    }

    pub fn resource(&self) -> &ResourceRef {
        match self {
            Violation::DoubleBook { resource, .. }
            | Violation::CategoryNotAllowed { resource, .. }
            | Violation::Availability { resource, .. } => resource,
        }
    }

    /// Human-readable message with times shown in `tz`.
    pub fn describe(&self, tz: Tz) -> String {
        match self {
            Violation::DoubleBook {
                resource,
                other_event,
                interval,
            } => format!(
                "The resource '{}' cannot be double-booked: event '{}' already holds it during {}",
                resource.name,
                other_event,
                format_interval(interval, tz)
            ),
            Violation::CategoryNotAllowed {
                resource,
                categories,
            } => format!(
                "The resource '{}' is not allowed for the event types: {}",
                resource.name,
                categories.join(", ")
            ),
            Violation::Availability {
                resource,
                intervals,
            } => {
                let lines: Vec<String> = intervals
                    .iter()
                    .map(|i| format!("  {}", format_interval(i, tz)))
                    .collect();
                format!(
                    "The resource '{}' is not available at these times:\n{}",
                    resource.name,
                    lines.join("\n")
                )
            }
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(Tz::UTC))
    }
}

/// Render an interval as `start to end` in `tz`.
pub fn format_interval(interval: &Interval, tz: Tz) -> String {
    format!(
        "{} to {}",
        interval.start.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"),
        interval.end.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z")
    )
}

/// Outcome of validating one event. Empty means the event may be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub event_id: String,
    pub violations: Vec<Violation>,
}

impl ConflictReport {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            violations: Vec::new(),
        }
    }

    pub fn is_clear(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn kinds(&self) -> Vec<ViolationKind> {
        self.violations.iter().map(Violation::kind).collect()
    }

    /// `Err(BookingError::Rejected)` when the report holds any violation.
    pub fn into_result(self) -> Result<()> {
        if self.is_clear() {
            Ok(())
        } else {
            Err(BookingError::Rejected(self))
        }
    }

    /// All violation messages, times shown in `tz`.
    pub fn render(&self, tz: Tz) -> String {
        if self.is_clear() {
            return format!("Event '{}': no conflicts", self.event_id);
        }
        let messages: Vec<String> = self.violations.iter().map(|v| v.describe(tz)).collect();
        format!("Event '{}':\n{}", self.event_id, messages.join("\n"))
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Tz::UTC))
    }
}
