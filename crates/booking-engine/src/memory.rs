//! In-memory reference collaborators and the scenario document format.
//!
//! The checker only talks to [`EventStore`] and [`WorkingCalendar`]. The types
//! here implement both over plain data so the engine can be driven from a JSON
//! scenario (CLI, WASM) and exercised in tests.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::availability::WorkingCalendar;
use crate::dst::{localize, DstPolicy};
use crate::error::{BookingError, Result};
use crate::event::{Event, Recurrence, Resource};
use crate::expander::expand;
use crate::interval::{merge, overlaps, Interval};
use crate::store::EventStore;
use crate::timezone::{parse_timezone, FallbackResolver, Localization, TimezoneResolver};

// ---------------------------------------------------------------------------
// Event store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredEvent {
    event: Event,
    spans: Vec<Interval>,
}

/// Event store backed by a `Vec`, with each event's occurrences precomputed.
///
/// Occurrences are localized with [`FallbackResolver`] under the store's
/// [`Localization`], which a checker must share: see
/// [`CheckOptions::localization`](crate::checker::CheckOptions::localization).
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    localization: Localization,
    entries: Vec<StoredEvent>,
}

impl InMemoryEventStore {
    /// `context_tz` localizes stored events that carry no timezone of their own.
    pub fn new(context_tz: Option<Tz>) -> Self {
        Self::with_localization(Localization {
            context: context_tz,
            dst_policy: DstPolicy::default(),
        })
    }

    pub fn with_localization(localization: Localization) -> Self {
        Self {
            localization,
            entries: Vec::new(),
        }
    }

    /// Insert or replace (by id) an event.
    pub fn insert(&mut self, event: Event) -> Result<()> {
        let event_tz = FallbackResolver.resolve(&event, self.localization.context)?;
        let spans = expand(&event, event_tz, Tz::UTC, self.localization.dst_policy)?
            .iter()
            .map(|o| o.map(|o| o.interval()))
            .collect::<Result<Vec<_>>>()?;

        self.entries.retain(|e| e.event.id != event.id);
        self.entries.push(StoredEvent { event, spans });
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Event> {
        let index = self.entries.iter().position(|e| e.event.id == id)?;
        Some(self.entries.remove(index).event)
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.entries.iter().map(|e| &e.event).find(|e| e.id == id)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter().map(|e| &e.event)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EventStore for InMemoryEventStore {
    fn find_overlapping(
        &self,
        exclude_id: &str,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let query = Interval { start, end: stop };
        Ok(self
            .entries
            .iter()
            .filter(|e| e.event.id != exclude_id)
            .filter(|e| e.spans.iter().any(|span| overlaps(span, &query)))
            .map(|e| e.event.clone())
            .collect())
    }

    fn localization(&self) -> Option<Localization> {
        Some(self.localization)
    }
}

// ---------------------------------------------------------------------------
// Working calendars
// ---------------------------------------------------------------------------

/// A daily working slot in local time. A slot whose `to` is not after its
/// `from` runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSlot {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

/// Weekly working hours in one timezone, minus closed dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCalendar {
    pub timezone: String,
    #[serde(default)]
    pub hours: HashMap<Weekday, Vec<WorkSlot>>,
    /// Whole local days with no working time (holidays, leaves).
    #[serde(default)]
    pub closed: BTreeSet<NaiveDate>,
}

impl WeeklyCalendar {
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
            hours: HashMap::new(),
            closed: BTreeSet::new(),
        }
    }

    pub fn with_hours(mut self, weekday: Weekday, from: NaiveTime, to: NaiveTime) -> Self {
        self.hours
            .entry(weekday)
            .or_default()
            .push(WorkSlot { from, to });
        self
    }

    /// The same slot Monday through Friday.
    pub fn weekdays(self, from: NaiveTime, to: NaiveTime) -> Self {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ]
        .into_iter()
        .fold(self, |cal, day| cal.with_hours(day, from, to))
    }

    pub fn closed_on(mut self, day: NaiveDate) -> Self {
        self.closed.insert(day);
        self
    }

    /// Working intervals overlapping `[window_start, window_end)`, clipped to it.
    pub fn intervals_between(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        let window = Interval {
            start: window_start,
            end: window_end,
        };
        if window.is_degenerate() {
            return Ok(Vec::new());
        }

        let tz = parse_timezone(&self.timezone)?;
        // Start a day early so overnight slots from the previous day are seen.
        let first = window_start.with_timezone(&tz).date_naive() - Duration::days(1);
        let last = window_end.with_timezone(&tz).date_naive();

        let mut intervals = Vec::new();
        for day in first.iter_days().take_while(|d| *d <= last) {
            if self.closed.contains(&day) {
                continue;
            }
            let Some(slots) = self.hours.get(&day.weekday()) else {
                continue;
            };
            for slot in slots {
                let end_day = if slot.to > slot.from {
                    day
                } else {
                    day + Duration::days(1)
                };
                let interval = local_interval(day.and_time(slot.from), end_day.and_time(slot.to), tz)?;
                if let Some(clipped) = interval.intersection(&window) {
                    intervals.push(clipped);
                }
            }
        }

        Ok(merge(&intervals))
    }
}

fn local_interval(start: NaiveDateTime, end: NaiveDateTime, tz: Tz) -> Result<Interval> {
    let start = localize(start, tz, DstPolicy::ShiftForward)?.with_timezone(&Utc);
    let end = localize(end, tz, DstPolicy::ShiftForward)?.with_timezone(&Utc);
    Ok(Interval {
        start,
        end: end.max(start),
    })
}

impl WorkingCalendar for WeeklyCalendar {
    fn work_intervals(
        &self,
        _resource: &Resource,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        self.intervals_between(window_start, window_end)
    }
}

/// Working calendars by id; dispatches on [`Resource::calendar`].
#[derive(Debug, Clone, Default)]
pub struct CalendarRegistry {
    calendars: HashMap<String, WeeklyCalendar>,
}

impl CalendarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, calendar: WeeklyCalendar) {
        self.calendars.insert(id.into(), calendar);
    }

    pub fn with(mut self, id: impl Into<String>, calendar: WeeklyCalendar) -> Self {
        self.insert(id, calendar);
        self
    }

    pub fn get(&self, id: &str) -> Option<&WeeklyCalendar> {
        self.calendars.get(id)
    }
}

impl WorkingCalendar for CalendarRegistry {
    fn work_intervals(
        &self,
        resource: &Resource,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        let Some(id) = resource.calendar.as_deref() else {
            return Ok(Vec::new());
        };
        let calendar = self.calendars.get(id).ok_or_else(|| {
            BookingError::Calendar(format!(
                "resource '{}' references unknown calendar '{}'",
                resource.id, id
            ))
        })?;
        calendar.intervals_between(window_start, window_end)
    }
}

// ---------------------------------------------------------------------------
// Scenario documents
// ---------------------------------------------------------------------------

/// An event as written in a scenario: resources are referenced by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    pub id: String,
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// A self-contained booking world: resources, their calendars, and events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Context timezone for events without their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub calendars: HashMap<String, WeeklyCalendar>,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BookingError::Scenario(e.to_string()))
    }

    pub fn context_timezone(&self) -> Result<Option<Tz>> {
        self.timezone.as_deref().map(parse_timezone).transpose()
    }

    /// Attach full resource records to a scenario event.
    pub fn resolve(&self, draft: &ScenarioEvent) -> Result<Event> {
        let resources = draft
            .resources
            .iter()
            .map(|id| {
                self.resources
                    .iter()
                    .find(|r| &r.id == id)
                    .cloned()
                    .ok_or_else(|| BookingError::UnknownResource(id.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Event {
            id: draft.id.clone(),
            start: draft.start,
            stop: draft.stop,
            timezone: draft.timezone.clone(),
            all_day: draft.all_day,
            recurrence: draft.recurrence.clone(),
            categories: draft.categories.clone(),
            resources,
        })
    }

    pub fn events(&self) -> Result<Vec<Event>> {
        self.events.iter().map(|e| self.resolve(e)).collect()
    }

    pub fn event(&self, id: &str) -> Result<Event> {
        let draft = self
            .events
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| BookingError::UnknownEvent(id.to_string()))?;
        self.resolve(draft)
    }

    /// A store holding every scenario event, localized under the scenario's
    /// context timezone.
    pub fn store(&self) -> Result<InMemoryEventStore> {
        self.store_with(Localization {
            context: self.context_timezone()?,
            dst_policy: DstPolicy::default(),
        })
    }

    /// A store holding every scenario event, localized as given.
    pub fn store_with(&self, localization: Localization) -> Result<InMemoryEventStore> {
        let mut store = InMemoryEventStore::with_localization(localization);
        for event in self.events()? {
            store.insert(event)?;
        }
        debug!(events = store.len(), "scenario store loaded");
        Ok(store)
    }

    pub fn calendars(&self) -> CalendarRegistry {
        CalendarRegistry {
            calendars: self.calendars.clone(),
        }
    }
}
