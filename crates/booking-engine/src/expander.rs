//! Occurrence expansion -- turns an event into concrete `(start, end)` instances.
//!
//! A recurring event's `start`/`stop` bound the whole series: the series runs
//! from `start.date()` through `stop.date()`, and each occurrence spans
//! `start.time()` to `stop.time()` on its day. Days are picked by the recurrence
//! rule through the `rrule` crate, so weekly/monthly/yearly rules and EXDATE
//! exclusions follow RFC 5545.
//!
//! No occurrence ends after the event's `stop`. Overnight occurrences (stop time
//! not after start time) therefore start at the latest on the day before
//! `stop.date()`. A stop of exactly midnight is the overnight case too: the
//! previous day was the last one occupied.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use rrule::RRuleSet;
use serde::Serialize;

use crate::dst::{localize, DstPolicy};
use crate::error::{BookingError, Result};
use crate::event::{Event, Frequency, Recurrence};
use crate::interval::Interval;
use crate::timezone::{FallbackResolver, TimezoneResolver};

/// One concrete instance of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occurrence {
    /// Start, in the reference timezone.
    pub start: DateTime<Tz>,
    /// End (exclusive), in the reference timezone.
    pub end: DateTime<Tz>,
    /// First calendar day occupied, in the event's timezone.
    pub first_day: NaiveDate,
    /// Last calendar day occupied, in the event's timezone.
    pub last_day: NaiveDate,
    pub all_day: bool,
}

impl Occurrence {
    /// The occurrence as a UTC half-open interval.
    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start.with_timezone(&Utc),
            end: self.end.with_timezone(&Utc),
        }
    }

    /// Local calendar days this occurrence touches, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day;
        self.first_day.iter_days().take_while(move |d| *d <= last)
    }
}

/// Naive local bounds of one occurrence, before localization.
#[derive(Debug, Clone, Copy)]
struct LocalSpan {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

/// The finite, ordered occurrences of one event.
///
/// Local spans are computed up front; localization happens lazily in
/// [`Occurrences::iter`], which can be called any number of times.
#[derive(Debug, Clone)]
pub struct Occurrences {
    spans: Vec<LocalSpan>,
    event_tz: Tz,
    reference_tz: Tz,
    policy: DstPolicy,
    all_day: bool,
}

impl Occurrences {
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The timezone the event's naive datetimes were interpreted in.
    pub fn event_timezone(&self) -> Tz {
        self.event_tz
    }

    pub fn reference_timezone(&self) -> Tz {
        self.reference_tz
    }

    /// Localize each occurrence on demand.
    pub fn iter(&self) -> impl Iterator<Item = Result<Occurrence>> + '_ {
        self.spans.iter().map(move |span| self.resolve(span))
    }

    pub fn to_vec(&self) -> Result<Vec<Occurrence>> {
        self.iter().collect()
    }

    fn resolve(&self, span: &LocalSpan) -> Result<Occurrence> {
        // Midnight boundaries of all-day events must always resolve.
        let policy = if self.all_day {
            DstPolicy::ShiftForward
        } else {
            self.policy
        };
        let start = localize(span.start, self.event_tz, policy)?;
        let end = localize(span.end, self.event_tz, policy)?.max(start);

        Ok(Occurrence {
            start: start.with_timezone(&self.reference_tz),
            end: end.with_timezone(&self.reference_tz),
            first_day: span.start.date(),
            last_day: last_occupied_day(span.start, span.end),
            all_day: self.all_day,
        })
    }
}

/// Expand an event into occurrences.
///
/// # Arguments
/// - `event` -- the event to expand
/// - `event_tz` -- timezone the event's naive start/stop are expressed in
/// - `reference_tz` -- timezone the returned occurrences are expressed in
/// - `policy` -- how wall times inside a DST gap are handled
///
/// # Errors
/// Returns `BookingError::InvalidInterval` if the event's stop is not after its start.
/// Returns `BookingError::InvalidRule` if the recurrence rule is malformed.
/// Returns `BookingError::Expansion` if the series is too long to enumerate.
pub fn expand(
    event: &Event,
    event_tz: Tz,
    reference_tz: Tz,
    policy: DstPolicy,
) -> Result<Occurrences> {
    event.check_interval()?;

    let spans = match &event.recurrence {
        None => vec![single_span(event)],
        Some(rule) => {
            let (first, last) = series_bounds(event, rule);
            series_days(rule, first, last)?
                .into_iter()
                .map(|day| day_span(event, day))
                .collect()
        }
    };

    Ok(Occurrences {
        spans,
        event_tz,
        reference_tz,
        policy,
        all_day: event.all_day,
    })
}

/// Expand an event, resolving its timezone as event timezone → `context` → UTC.
pub fn expand_with_fallback(
    event: &Event,
    context: Option<Tz>,
    reference_tz: Tz,
) -> Result<Occurrences> {
    let event_tz = FallbackResolver.resolve(event, context)?;
    expand(event, event_tz, reference_tz, DstPolicy::default())
}

/// The instant the event (or its whole series) stops, as UTC.
///
/// All-day events stop at the end of their stop date.
pub fn event_end(event: &Event, event_tz: Tz) -> Result<DateTime<Utc>> {
    let stop = if event.all_day {
        next_midnight(event.stop.date())
    } else {
        event.stop
    };
    Ok(localize(stop, event_tz, DstPolicy::ShiftForward)?.with_timezone(&Utc))
}

/// Last calendar day a span occupies: a span ending exactly at midnight does
/// not occupy the day it ends on.
pub fn last_occupied_day(start: NaiveDateTime, end: NaiveDateTime) -> NaiveDate {
    if end > start && end.time() == NaiveTime::MIN {
        end.date() - Duration::days(1)
    } else {
        end.date()
    }
}

/// Every calendar day from `start` through `stop`, honoring the midnight rule.
pub fn event_days(start: NaiveDateTime, stop: NaiveDateTime) -> Vec<NaiveDate> {
    let last = last_occupied_day(start, stop);
    start
        .date()
        .iter_days()
        .take_while(|d| *d <= last)
        .collect()
}

fn next_midnight(day: NaiveDate) -> NaiveDateTime {
    (day + Duration::days(1)).and_time(NaiveTime::MIN)
}

fn single_span(event: &Event) -> LocalSpan {
    if event.all_day {
        LocalSpan {
            start: event.start.date().and_time(NaiveTime::MIN),
            end: next_midnight(event.stop.date()),
        }
    } else {
        LocalSpan {
            start: event.start,
            end: event.stop,
        }
    }
}

fn day_span(event: &Event, day: NaiveDate) -> LocalSpan {
    if event.all_day {
        return LocalSpan {
            start: day.and_time(NaiveTime::MIN),
            end: next_midnight(day),
        };
    }

    let end_day = if runs_overnight(event) {
        day + Duration::days(1)
    } else {
        day
    };

    LocalSpan {
        start: day.and_time(event.start.time()),
        end: end_day.and_time(event.stop.time()),
    }
}

/// An occurrence whose stop time is not after its start time runs overnight.
fn runs_overnight(event: &Event) -> bool {
    event.stop.time() <= event.start.time()
}

fn series_bounds(event: &Event, rule: &Recurrence) -> (NaiveDate, NaiveDate) {
    let first = event.start.date();
    let mut last = if event.all_day || !runs_overnight(event) {
        event.stop.date()
    } else {
        // The occurrence starting on stop.date() would end after stop.
        event.stop.date() - Duration::days(1)
    };
    if let Some(until) = rule.until {
        last = last.min(until);
    }
    (first, last)
}

fn weekday_code(day: &Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Days are anchored at noon UTC so rule evaluation is pure date arithmetic.
fn ical_day(day: NaiveDate) -> String {
    format!("{}T120000Z", day.format("%Y%m%d"))
}

fn series_days(rule: &Recurrence, first: NaiveDate, last: NaiveDate) -> Result<Vec<NaiveDate>> {
    if rule.interval == 0 {
        return Err(BookingError::InvalidRule(
            "interval must be at least 1".to_string(),
        ));
    }
    if !rule.by_weekday.is_empty() && rule.frequency != Frequency::Weekly {
        return Err(BookingError::InvalidRule(format!(
            "by_weekday requires a weekly frequency, got {}",
            rule.frequency.as_rrule()
        )));
    }

    if last < first {
        return Ok(Vec::new());
    }

    // The series is bounded by its stop date, so its length in days caps the
    // number of instances.
    let span_days = (last - first).num_days() + 1;
    let limit = u16::try_from(span_days).map_err(|_| {
        BookingError::Expansion(format!(
            "series spans {} days, at most {} are supported",
            span_days,
            u16::MAX
        ))
    })?;

    let mut rrule_str = format!(
        "FREQ={};INTERVAL={}",
        rule.frequency.as_rrule(),
        rule.interval
    );
    if !rule.by_weekday.is_empty() {
        let codes: Vec<&str> = rule.by_weekday.iter().map(weekday_code).collect();
        rrule_str.push_str(&format!(";BYDAY={}", codes.join(",")));
    }
    rrule_str.push_str(&format!(";UNTIL={}", ical_day(last)));

    let mut rrule_text = format!("DTSTART:{}\nRRULE:{}", ical_day(first), rrule_str);

    if !rule.exdates.is_empty() {
        let exdate_icals: Vec<String> = rule.exdates.iter().map(|d| ical_day(*d)).collect();
        rrule_text.push_str(&format!("\nEXDATE:{}", exdate_icals.join(",")));
    }

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| BookingError::InvalidRule(format!("{}", e)))?;

    let instances = rrule_set.all(limit);

    Ok(instances
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .collect())
}
