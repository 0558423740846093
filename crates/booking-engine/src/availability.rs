//! Resource availability: working-calendar lookups and unavailable-time conflicts.
//!
//! A resource's working calendar is an external collaborator. The engine asks it,
//! one local day at a time, which sub-intervals of that day the resource is
//! available, and reports every part of an event's occupied span that falls
//! outside them.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dst::{localize, DstPolicy};
use crate::error::Result;
use crate::event::Resource;
use crate::expander::Occurrence;
use crate::interval::{merge, subtract_available, Interval};

/// Source of a resource's available (worked) time.
pub trait WorkingCalendar: Send + Sync {
    /// Available sub-intervals of `resource` within `[window_start, window_end)`.
    fn work_intervals(
        &self,
        resource: &Resource,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Interval>>;
}

impl<C: WorkingCalendar + ?Sized> WorkingCalendar for &C {
    fn work_intervals(
        &self,
        resource: &Resource,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        (**self).work_intervals(resource, window_start, window_end)
    }
}

/// What a resource without a working calendar means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoCalendarPolicy {
    /// No calendar, no constraint: the resource is always available.
    #[default]
    Unconstrained,
    /// No calendar means the resource is never available.
    Unavailable,
}

/// A resource's availability for one local day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayAvailability {
    pub day: NaiveDate,
    /// `[00:00, next 00:00)` of `day` in the event timezone.
    pub window: Interval,
    /// Sorted, merged available intervals clipped to `window`.
    pub available: Vec<Interval>,
}

/// The UTC span of a local calendar day.
pub fn day_window(day: NaiveDate, tz: Tz) -> Result<Interval> {
    let start = localize(day.and_time(NaiveTime::MIN), tz, DstPolicy::ShiftForward)?;
    let end = localize(
        (day + Duration::days(1)).and_time(NaiveTime::MIN),
        tz,
        DstPolicy::ShiftForward,
    )?;
    Ok(Interval {
        start: start.with_timezone(&Utc),
        end: end.with_timezone(&Utc),
    })
}

/// Ask the calendar for `resource`'s available intervals in `[day_start, day_end)`.
///
/// The result is clipped to the window and merged, so callers can rely on a
/// sorted, non-overlapping list.
pub fn available_intervals<C: WorkingCalendar + ?Sized>(
    calendar: &C,
    resource: &Resource,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
) -> Result<Vec<Interval>> {
    let window = Interval {
        start: day_start,
        end: day_end,
    };
    let clipped: Vec<Interval> = calendar
        .work_intervals(resource, day_start, day_end)?
        .iter()
        .filter_map(|i| i.intersection(&window))
        .collect();
    Ok(merge(&clipped))
}

/// Unavailable parts of `occupied`, given the availability of every day it touches.
///
/// A day with no available interval makes the whole occupied portion of that day
/// a conflict. Otherwise timed events are compared interval by interval; all-day
/// events are measured in whole days and skip that comparison.
pub fn conflicts_for(occupied: &Interval, days: &[DayAvailability], all_day: bool) -> Vec<Interval> {
    let mut conflicts = Vec::new();

    for day in days {
        let Some(portion) = occupied.intersection(&day.window) else {
            continue;
        };
        if day.available.is_empty() {
            conflicts.push(portion);
        } else if !all_day {
            conflicts.extend(subtract_available(&portion, &day.available));
        }
    }

    merge(&conflicts)
}

/// Per-call availability lookups for one timezone, cached by resource and day.
pub struct AvailabilityResolver<'a, C: ?Sized> {
    calendar: &'a C,
    timezone: Tz,
    cache: HashMap<(String, NaiveDate), DayAvailability>,
}

impl<'a, C: WorkingCalendar + ?Sized> AvailabilityResolver<'a, C> {
    /// `timezone` is the event timezone that defines day boundaries.
    pub fn new(calendar: &'a C, timezone: Tz) -> Self {
        Self {
            calendar,
            timezone,
            cache: HashMap::new(),
        }
    }

    /// Availability of `resource` on `day`, querying the calendar once per day.
    pub fn day(&mut self, resource: &Resource, day: NaiveDate) -> Result<DayAvailability> {
        let key = (resource.id.clone(), day);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let window = day_window(day, self.timezone)?;
        let available = available_intervals(self.calendar, resource, window.start, window.end)?;
        if available.is_empty() {
            debug!(resource = %resource.id, %day, "no working time on day");
        }

        let availability = DayAvailability {
            day,
            window,
            available,
        };
        self.cache.insert(key, availability.clone());
        Ok(availability)
    }

    /// Unavailable parts of one occurrence for `resource`.
    pub fn conflicts(&mut self, resource: &Resource, occurrence: &Occurrence) -> Result<Vec<Interval>> {
        let days = occurrence
            .days()
            .map(|day| self.day(resource, day))
            .collect::<Result<Vec<_>>>()?;
        Ok(conflicts_for(&occurrence.interval(), &days, occurrence.all_day))
    }
}
