//! Resource conflict validation.
//!
//! [`ConflictChecker::validate`] runs three independent checks on a candidate
//! event and aggregates their violations into a [`ConflictReport`]:
//!
//! 1. **Double-booking** -- another event already holds a resource that refuses
//!    overlapping bookings.
//! 2. **Category** -- the event carries categories a resource does not accept.
//! 3. **Availability** -- the event occupies time outside a resource's working
//!    calendar.
//!
//! Events whose stop lies before `now` are never checked. Each check stops at its
//! first violation; whether the remaining checks still run is decided by
//! [`CheckMode`]. Recurring events are checked occurrence by occurrence, and one
//! conflicting occurrence is enough to reject the whole series.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::availability::{AvailabilityResolver, NoCalendarPolicy, WorkingCalendar};
use crate::dst::DstPolicy;
use crate::error::{BookingError, Result};
use crate::event::{Event, Resource};
use crate::expander::{self, Occurrence};
use crate::interval::{merge, overlaps, Interval};
use crate::report::{ConflictReport, ResourceRef, Violation};
use crate::store::EventStore;
use crate::timezone::{FallbackResolver, Localization, TimezoneResolver};

/// Whether later checks run once an earlier one found a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// Run all three checks and report every kind of violation found.
    #[default]
    Exhaustive,
    /// Stop after the first check that reports a violation.
    FailFast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckOptions {
    pub mode: CheckMode,
    pub no_calendar: NoCalendarPolicy,
    pub dst_policy: DstPolicy,
}

impl CheckOptions {
    /// How validation under `ctx` localizes naive event times. A store that
    /// localizes its own events must be built with the same settings.
    pub fn localization(&self, ctx: &ValidationContext) -> Localization {
        Localization {
            context: ctx.timezone,
            dst_policy: self.dst_policy,
        }
    }
}

/// Everything a validation call needs from its caller's environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationContext {
    /// Events stopping before this instant are in the past.
    pub now: DateTime<Utc>,
    /// The caller's timezone, used for events without their own.
    pub timezone: Option<Tz>,
    /// Timezone occurrences are expressed in.
    pub reference_timezone: Tz,
}

impl ValidationContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            timezone: None,
            reference_timezone: Tz::UTC,
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }

    pub fn with_reference(mut self, timezone: Tz) -> Self {
        self.reference_timezone = timezone;
        self
    }
}

/// Validates events against an event store and the resources' working calendars.
pub struct ConflictChecker<S, C, R = FallbackResolver> {
    store: S,
    calendar: C,
    resolver: R,
    options: CheckOptions,
}

impl<S: EventStore, C: WorkingCalendar> ConflictChecker<S, C, FallbackResolver> {
    pub fn new(store: S, calendar: C) -> Self {
        Self {
            store,
            calendar,
            resolver: FallbackResolver,
            options: CheckOptions::default(),
        }
    }
}

impl<S, C, R> ConflictChecker<S, C, R>
where
    S: EventStore,
    C: WorkingCalendar,
    R: TimezoneResolver,
{
    pub fn with_resolver<R2: TimezoneResolver>(self, resolver: R2) -> ConflictChecker<S, C, R2> {
        ConflictChecker {
            store: self.store,
            calendar: self.calendar,
            resolver,
            options: self.options,
        }
    }

    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate one event.
    ///
    /// # Errors
    /// Returns `BookingError::InvalidInterval` before any check runs when the
    /// event's stop is not after its start, and
    /// `BookingError::LocalizationMismatch` when the store localized its events
    /// under another context timezone or DST policy. Timezone, recurrence, and
    /// collaborator failures are propagated. Violations are *not* errors: they are returned in
    /// the report (see [`ConflictReport::into_result`]).
    pub fn validate(&self, event: &Event, ctx: &ValidationContext) -> Result<ConflictReport> {
        event.check_interval()?;
        self.check_localization(ctx)?;

        let mut report = ConflictReport::new(event.id.clone());
        let event_tz = self.resolver.resolve(event, ctx.timezone)?;

        if expander::event_end(event, event_tz)? < ctx.now {
            debug!(event = %event.id, "event is in the past, skipping checks");
            return Ok(report);
        }

        let occurrences = expander::expand(
            event,
            event_tz,
            ctx.reference_timezone,
            self.options.dst_policy,
        )?
        .to_vec()?;
        debug!(
            event = %event.id,
            timezone = %event_tz.name(),
            occurrences = occurrences.len(),
            "validating event"
        );

        if let Some(violation) = self.check_double_book(event, &occurrences, ctx)? {
            report.violations.push(violation);
        }
        if self.should_continue(&report) {
            if let Some(violation) = self.check_categories(event) {
                report.violations.push(violation);
            }
        }
        if self.should_continue(&report) {
            if let Some(violation) = self.check_availability(event, &occurrences, event_tz)? {
                report.violations.push(violation);
            }
        }

        Ok(report)
    }

    /// Validate independent events in parallel. Results keep the input order.
    pub fn validate_all(&self, events: &[Event], ctx: &ValidationContext) -> Vec<Result<ConflictReport>> {
        events.par_iter().map(|event| self.validate(event, ctx)).collect()
    }

    /// Re-validate every stored event that overlaps `changed`.
    ///
    /// An edit to one event can create a conflict for its neighbors, so callers
    /// run this after committing `changed` to the store. Reports are ordered by
    /// event id.
    pub fn revalidate_neighbors(
        &self,
        changed: &Event,
        ctx: &ValidationContext,
    ) -> Result<Vec<ConflictReport>> {
        self.check_localization(ctx)?;
        let event_tz = self.resolver.resolve(changed, ctx.timezone)?;
        let occurrences = expander::expand(
            changed,
            event_tz,
            ctx.reference_timezone,
            self.options.dst_policy,
        )?;

        let mut neighbors: BTreeMap<String, Event> = BTreeMap::new();
        for occurrence in occurrences.iter() {
            let interval = occurrence?.interval();
            if interval.is_degenerate() {
                continue;
            }
            for other in self
                .store
                .find_overlapping(&changed.id, interval.start, interval.end)?
            {
                neighbors.entry(other.id.clone()).or_insert(other);
            }
        }

        let neighbors: Vec<Event> = neighbors.into_values().collect();
        debug!(event = %changed.id, neighbors = neighbors.len(), "re-validating neighbors");
        self.validate_all(&neighbors, ctx).into_iter().collect()
    }

    fn check_localization(&self, ctx: &ValidationContext) -> Result<()> {
        let expected = self.options.localization(ctx);
        match self.store.localization() {
            Some(store) if store != expected => Err(BookingError::LocalizationMismatch {
                store: store.to_string(),
                validation: expected.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Whether `other`, localized the way this checker localizes events, has an
    /// occurrence overlapping `interval`.
    fn occupies(&self, other: &Event, interval: &Interval, ctx: &ValidationContext) -> Result<bool> {
        let other_tz = self.resolver.resolve(other, ctx.timezone)?;
        let occurrences =
            expander::expand(other, other_tz, ctx.reference_timezone, self.options.dst_policy)?;
        for occurrence in occurrences.iter() {
            if overlaps(&occurrence?.interval(), interval) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn should_continue(&self, report: &ConflictReport) -> bool {
        self.options.mode == CheckMode::Exhaustive || report.is_clear()
    }

    fn check_double_book(
        &self,
        event: &Event,
        occurrences: &[Occurrence],
        ctx: &ValidationContext,
    ) -> Result<Option<Violation>> {
        let restricted: Vec<&Resource> = event.restricted_resources().collect();
        if restricted.is_empty() {
            debug!(event = %event.id, "no double-book restricted resources");
            return Ok(None);
        }

        for occurrence in occurrences {
            let interval = occurrence.interval();
            if interval.is_degenerate() {
                continue;
            }
            let overlapping = self
                .store
                .find_overlapping(&event.id, interval.start, interval.end)?;
            for other in overlapping {
                let shared = restricted
                    .iter()
                    .find(|r| other.resources.iter().any(|o| o.id == r.id));
                let Some(resource) = shared else {
                    continue;
                };
                // The store matched with its own resolver; confirm with ours.
                if self.occupies(&other, &interval, ctx)? {
                    info!(
                        event = %event.id,
                        resource = %resource.id,
                        other = %other.id,
                        "double-booking detected"
                    );
                    return Ok(Some(Violation::DoubleBook {
                        resource: ResourceRef::from(*resource),
                        other_event: other.id,
                        interval,
                    }));
                }
            }
        }

        Ok(None)
    }

    fn check_categories(&self, event: &Event) -> Option<Violation> {
        if event.categories.is_empty() {
            return None;
        }

        for resource in &event.resources {
            let disallowed: Vec<String> = event
                .categories
                .difference(&resource.allowed_categories)
                .cloned()
                .collect();
            if !disallowed.is_empty() {
                info!(
                    event = %event.id,
                    resource = %resource.id,
                    categories = ?disallowed,
                    "categories not allowed on resource"
                );
                return Some(Violation::CategoryNotAllowed {
                    resource: ResourceRef::from(resource),
                    categories: disallowed,
                });
            }
        }

        None
    }

    fn check_availability(
        &self,
        event: &Event,
        occurrences: &[Occurrence],
        event_tz: Tz,
    ) -> Result<Option<Violation>> {
        let mut resolver = AvailabilityResolver::new(&self.calendar, event_tz);

        for resource in &event.resources {
            let conflicts = if resource.calendar.is_some() {
                let mut found = Vec::new();
                for occurrence in occurrences {
                    found.extend(resolver.conflicts(resource, occurrence)?);
                }
                merge(&found)
            } else {
                match self.options.no_calendar {
                    NoCalendarPolicy::Unconstrained => continue,
                    NoCalendarPolicy::Unavailable => {
                        warn!(resource = %resource.id, "resource has no working calendar");
                        let spans: Vec<Interval> =
                            occurrences.iter().map(Occurrence::interval).collect();
                        merge(&spans)
                    }
                }
            };

            if !conflicts.is_empty() {
                info!(
                    event = %event.id,
                    resource = %resource.id,
                    conflicts = conflicts.len(),
                    "resource unavailable"
                );
                return Ok(Some(Violation::Availability {
                    resource: ResourceRef::from(resource),
                    intervals: conflicts,
                }));
            }
        }

        Ok(None)
    }
}
