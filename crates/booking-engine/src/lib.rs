//! # booking-engine
//!
//! Conflict detection for calendar events that book shared resources.
//!
//! Given an event (possibly recurring, all-day, or in its own timezone) and the
//! resources it claims, the engine decides whether the event double-books a
//! resource, uses a category the resource does not accept, or occupies time
//! outside the resource's working calendar.
//!
//! ## Modules
//!
//! - [`interval`] -- Half-open interval overlap, merge, and subtraction
//! - [`expander`] -- Event → concrete occurrences in a reference timezone
//! - [`dst`] -- DST gap policies for localizing wall-clock times
//! - [`timezone`] -- Effective timezone resolution (event → context → UTC)
//! - [`availability`] -- Working-calendar lookups and unavailable-time conflicts
//! - [`checker`] -- Double-book, category, and availability validation
//! - [`report`] -- Violations and conflict reports
//! - [`store`] -- Event store collaborator trait
//! - [`memory`] -- In-memory store, weekly calendars, and scenario documents
//! - [`config`] -- TOML checker configuration
//! - [`event`] -- Events, resources, and recurrence rules
//! - [`error`] -- Error types

pub mod availability;
pub mod checker;
pub mod config;
pub mod dst;
pub mod error;
pub mod event;
pub mod expander;
pub mod interval;
pub mod memory;
pub mod report;
pub mod store;
pub mod timezone;

pub use availability::{NoCalendarPolicy, WorkingCalendar};
pub use checker::{CheckMode, CheckOptions, ConflictChecker, ValidationContext};
pub use config::CheckerConfig;
pub use dst::DstPolicy;
pub use error::BookingError;
pub use event::{Event, Frequency, Recurrence, Resource};
pub use expander::{expand, expand_with_fallback, Occurrence, Occurrences};
pub use interval::{merge, overlaps, subtract_available, Interval};
pub use memory::{CalendarRegistry, InMemoryEventStore, Scenario, WeeklyCalendar};
pub use report::{ConflictReport, Violation, ViolationKind};
pub use store::EventStore;
pub use timezone::{FallbackResolver, Localization, TimezoneResolver};
