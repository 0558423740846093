//! DST transition policies for localizing naive wall-clock times.

use chrono::{DateTime, Duration, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// Policy for wall-clock times that fall inside a DST gap.
///
/// Ambiguous times (the repeated hour when clocks fall back) always resolve to
/// the earlier instant, so an occurrence never shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Move the time forward by the length of the gap (02:30 becomes 03:30 on a
    /// one-hour spring-forward).
    #[default]
    ShiftForward,
    /// Fail with [`BookingError::NonexistentLocalTime`].
    Reject,
}

/// Interpret a naive wall-clock time in `tz`.
pub fn localize(naive: NaiveDateTime, tz: Tz, policy: DstPolicy) -> Result<DateTime<Tz>> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Ok(dt);
    }

    match policy {
        DstPolicy::Reject => Err(BookingError::NonexistentLocalTime(naive, tz.name().to_string())),
        DstPolicy::ShiftForward => {
            // Apply the offset in force before the gap; the resulting instant reads
            // as the wall time shifted past the gap.
            let offset = offset_before_gap(naive, tz)
                .ok_or_else(|| BookingError::NonexistentLocalTime(naive, tz.name().to_string()))?;
            let utc = naive - Duration::seconds(i64::from(offset));
            Ok(Utc.from_utc_datetime(&utc).with_timezone(&tz))
        }
    }
}

/// Longest gap searched for; historical gaps reach a whole skipped day
/// (Pacific/Apia, 2011-12-30).
const MAX_GAP_HOURS: i64 = 48;

/// UTC offset, in seconds, of the last valid wall time before `naive`.
fn offset_before_gap(naive: NaiveDateTime, tz: Tz) -> Option<i32> {
    (1..=MAX_GAP_HOURS)
        .map(|hours| naive - Duration::hours(hours))
        .find_map(|earlier| tz.from_local_datetime(&earlier).earliest())
        .map(|before| before.offset().fix().local_minus_utc())
}
