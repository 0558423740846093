//! Effective timezone resolution for events.
//!
//! Every place a naive event datetime is localized goes through one
//! [`TimezoneResolver`], so an event never gets different occurrence boundaries
//! depending on which code path localized it.

use std::fmt;

use chrono_tz::Tz;

use crate::dst::DstPolicy;
use crate::error::{BookingError, Result};
use crate::event::Event;

/// Decides which timezone an event's naive datetimes are expressed in.
pub trait TimezoneResolver: Send + Sync {
    fn resolve(&self, event: &Event, context: Option<Tz>) -> Result<Tz>;
}

/// Event timezone, then the caller's context timezone, then UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResolver;

impl TimezoneResolver for FallbackResolver {
    fn resolve(&self, event: &Event, context: Option<Tz>) -> Result<Tz> {
        match event.timezone.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => parse_timezone(name),
            _ => Ok(context.unwrap_or(Tz::UTC)),
        }
    }
}

/// How naive event datetimes become instants: the context timezone for events
/// without their own, and the DST gap policy.
///
/// Two events compared for overlap must be localized under the same settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Localization {
    pub context: Option<Tz>,
    pub dst_policy: DstPolicy,
}

impl fmt::Display for Localization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "context timezone {}, DST policy {:?}",
            self.context.map_or("none", |tz| tz.name()),
            self.dst_policy
        )
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| BookingError::InvalidTimezone(name.to_string()))
}
