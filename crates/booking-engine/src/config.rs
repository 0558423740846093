//! Checker configuration, loaded from TOML.
//!
//! ```toml
//! [checker]
//! mode = "exhaustive"        # or "fail_fast"
//! no_calendar = "unconstrained"  # or "unavailable"
//! dst_policy = "shift_forward"   # or "reject"
//!
//! [timezone]
//! reference = "UTC"
//! default = "Europe/Brussels"
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::availability::NoCalendarPolicy;
use crate::checker::{CheckMode, CheckOptions, ValidationContext};
use crate::dst::DstPolicy;
use crate::error::{BookingError, Result};
use crate::timezone::parse_timezone;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub checker: CheckerSection,
    pub timezone: TimezoneSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerSection {
    pub mode: CheckMode,
    pub no_calendar: NoCalendarPolicy,
    pub dst_policy: DstPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimezoneSection {
    /// Timezone occurrences and reports are expressed in.
    pub reference: String,
    /// Context timezone for events that carry none.
    pub default: Option<String>,
}

impl Default for TimezoneSection {
    fn default() -> Self {
        Self {
            reference: "UTC".to_string(),
            default: None,
        }
    }
}

impl CheckerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BookingError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        tracing::info!("Loading checker config from: {}", path.display());
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: CheckerConfig =
            toml::from_str(content).map_err(|e| BookingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every timezone name parses.
    pub fn validate(&self) -> Result<()> {
        self.reference_timezone()?;
        self.default_timezone()?;
        Ok(())
    }

    pub fn reference_timezone(&self) -> Result<Tz> {
        parse_timezone(&self.timezone.reference)
            .map_err(|e| BookingError::Config(format!("timezone.reference: {}", e)))
    }

    pub fn default_timezone(&self) -> Result<Option<Tz>> {
        self.timezone
            .default
            .as_deref()
            .map(|name| {
                parse_timezone(name)
                    .map_err(|e| BookingError::Config(format!("timezone.default: {}", e)))
            })
            .transpose()
    }

    pub fn options(&self) -> CheckOptions {
        CheckOptions {
            mode: self.checker.mode,
            no_calendar: self.checker.no_calendar,
            dst_policy: self.checker.dst_policy,
        }
    }

    /// A validation context at `now` carrying the configured timezones.
    pub fn context(&self, now: DateTime<Utc>) -> Result<ValidationContext> {
        Ok(ValidationContext {
            now,
            timezone: self.default_timezone()?,
            reference_timezone: self.reference_timezone()?,
        })
    }
}
