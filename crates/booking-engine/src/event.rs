//! Calendar events, bookable resources, and recurrence rules.
//!
//! Event start/stop are stored timezone-naive and interpreted in the event's
//! timezone label (falling back to the caller's context timezone, then UTC).

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// Recurrence frequency. Daily is the finest granularity supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// The RFC 5545 `FREQ` value.
    pub fn as_rrule(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

fn default_interval() -> u32 {
    1
}

/// How a recurring event repeats between its start and stop dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: Frequency,
    /// Repeat every `interval` periods. Zero is rejected at expansion.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Weekdays to repeat on (weekly rules only). Empty means the start's weekday.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_weekday: Vec<Weekday>,
    /// Last day of the series. Caps the series; never extends past the stop date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
    /// Days removed from the series.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exdates: Vec<NaiveDate>,
}

impl Recurrence {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            by_weekday: Vec::new(),
            until: None,
            exdates: Vec::new(),
        }
    }

    pub fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    pub fn weekly_on(days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            by_weekday: days.into_iter().collect(),
            ..Self::new(Frequency::Weekly)
        }
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    pub fn except(mut self, day: NaiveDate) -> Self {
        self.exdates.push(day);
        self
    }
}

/// A bookable resource (room, vehicle, equipment, person).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    /// When false, no two overlapping events may claim this resource.
    #[serde(default)]
    pub allow_double_book: bool,
    /// Event categories this resource may be booked for.
    #[serde(default)]
    pub allowed_categories: BTreeSet<String>,
    /// Working calendar id, resolved by the [`WorkingCalendar`](crate::availability::WorkingCalendar).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<String>,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            allow_double_book: false,
            allowed_categories: BTreeSet::new(),
            calendar: None,
        }
    }

    pub fn double_bookable(mut self, allow: bool) -> Self {
        self.allow_double_book = allow;
        self
    }

    pub fn allowing<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_categories
            .extend(categories.into_iter().map(Into::into));
        self
    }

    pub fn with_calendar(mut self, calendar: impl Into<String>) -> Self {
        self.calendar = Some(calendar.into());
        self
    }
}

/// A calendar event bound to zero or more resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    /// IANA timezone the naive start/stop are expressed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Event {
    pub fn new(id: impl Into<String>, start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            start,
            stop,
            timezone: None,
            all_day: false,
            recurrence: None,
            categories: BTreeSet::new(),
            resources: Vec::new(),
        }
    }

    pub fn in_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn all_day(mut self) -> Self {
        self.all_day = true;
        self
    }

    pub fn recurring(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn tagged<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(categories.into_iter().map(Into::into));
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Resources that refuse overlapping bookings.
    pub fn restricted_resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(|r| !r.allow_double_book)
    }

    /// Reject events whose stop does not come after their start.
    ///
    /// All-day events only compare dates, so a single-day all-day event may have
    /// `stop.date() == start.date()`.
    pub fn check_interval(&self) -> Result<()> {
        let malformed = if self.all_day {
            self.stop.date() < self.start.date()
        } else {
            self.stop <= self.start
        };
        if malformed {
            return Err(BookingError::InvalidInterval {
                event: self.id.clone(),
                start: self.start,
                stop: self.stop,
            });
        }
        Ok(())
    }

    /// True when a field that feeds validation differs from `other`.
    ///
    /// An edit that changes any of these must be re-validated, and so must the
    /// events it overlaps before and after the edit.
    pub fn scheduling_changed(&self, other: &Event) -> bool {
        self.start != other.start
            || self.stop != other.stop
            || self.all_day != other.all_day
            || self.timezone != other.timezone
            || self.recurrence != other.recurrence
            || self.categories != other.categories
            || self.resources != other.resources
    }
}
