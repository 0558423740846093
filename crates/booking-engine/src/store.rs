//! Event store collaborator.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::event::Event;
use crate::timezone::Localization;

/// Queryable source of already-booked events.
///
/// Implementations must be safe for concurrent reads: independent events are
/// validated in parallel against the same store.
pub trait EventStore: Send + Sync {
    /// Events, other than `exclude_id`, with an occurrence overlapping
    /// `[start, stop)` under strict half-open overlap.
    fn find_overlapping(
        &self,
        exclude_id: &str,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Result<Vec<Event>>;

    /// How the store turned naive event times into instants, for stores that
    /// localize events themselves. The checker refuses to validate under
    /// different settings. `None` for stores that keep no naive times.
    fn localization(&self) -> Option<Localization> {
        None
    }
}

impl<S: EventStore + ?Sized> EventStore for &S {
    fn find_overlapping(
        &self,
        exclude_id: &str,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        (**self).find_overlapping(exclude_id, start, stop)
    }

    fn localization(&self) -> Option<Localization> {
        (**self).localization()
    }
}
