//! WASM bindings for booking-engine.
//!
//! Exposes scenario validation and occurrence expansion to JavaScript via
//! `wasm-bindgen`. All complex types are passed as JSON strings.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p booking-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir pkg/ \
//!   target/wasm32-unknown-unknown/release/booking_engine_wasm.wasm
//! ```

use booking_engine::timezone::parse_timezone;
use booking_engine::{CheckOptions, ConflictChecker, Event, Occurrence, Scenario, ValidationContext};
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Serde-friendly DTOs for crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct OccurrenceDto {
    start: String,
    end: String,
    duration_minutes: i64,
    all_day: bool,
}

impl From<&Occurrence> for OccurrenceDto {
    fn from(o: &Occurrence) -> Self {
        Self {
            start: o.start.to_rfc3339(),
            end: o.end.to_rfc3339(),
            duration_minutes: o.interval().duration_minutes(),
            all_day: o.all_day,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts both RFC 3339 (with timezone offset, e.g., "2024-01-15T10:00:00+01:00")
/// and naive time (e.g., "2024-01-15T10:00:00"), which is interpreted as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, JsValue> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| JsValue::from_str(&format!("Invalid datetime '{}': {}", s, e)))
}

fn parse_optional_timezone(name: Option<String>) -> Result<Option<Tz>, JsValue> {
    name.as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(parse_timezone)
        .transpose()
        .map_err(js_error)
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Validate the events of a scenario document against each other and their
/// resources' working calendars.
///
/// Returns a JSON string containing an array of conflict reports, one per
/// validated event, each with `event_id` and a `violations` array.
///
/// # Arguments
/// - `scenario_json` -- scenario document (resources, calendars, events)
/// - `event_id` -- Optional event to validate; all events when omitted
/// - `now` -- ISO 8601 instant; events stopping earlier are not checked
#[wasm_bindgen(js_name = "validateScenario")]
pub fn validate_scenario(
    scenario_json: &str,
    event_id: Option<String>,
    now: &str,
) -> Result<String, JsValue> {
    let scenario = Scenario::from_json(scenario_json).map_err(js_error)?;
    let now = parse_datetime(now)?;

    let mut ctx = ValidationContext::at(now);
    if let Some(tz) = scenario.context_timezone().map_err(js_error)? {
        ctx = ctx.with_timezone(tz);
    }

    let events = match event_id.as_deref() {
        Some(id) => vec![scenario.event(id).map_err(js_error)?],
        None => scenario.events().map_err(js_error)?,
    };

    let options = CheckOptions::default();
    let store = scenario
        .store_with(options.localization(&ctx))
        .map_err(js_error)?;
    let calendars = scenario.calendars();
    let checker = ConflictChecker::new(&store, &calendars).with_options(options);

    // wasm32 has no threads, so validate sequentially.
    let reports = events
        .iter()
        .map(|event| checker.validate(event, &ctx))
        .collect::<Result<Vec<_>, _>>()
        .map_err(js_error)?;

    serde_json::to_string(&reports)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Expand one event into its concrete occurrences.
///
/// Returns a JSON string containing an array of
/// `{start, end, duration_minutes, all_day}` objects with RFC 3339 datetimes in
/// the reference timezone.
///
/// # Arguments
/// - `event_json` -- event object (`id`, `start`, `stop`, optional `timezone`,
///   `all_day`, `recurrence`)
/// - `context_tz` -- Optional IANA timezone for events without their own
/// - `reference_tz` -- Optional IANA timezone for the output (default UTC)
#[wasm_bindgen(js_name = "expandEvent")]
pub fn expand_event(
    event_json: &str,
    context_tz: Option<String>,
    reference_tz: Option<String>,
) -> Result<String, JsValue> {
    let event: Event = serde_json::from_str(event_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid event JSON: {}", e)))?;
    let context = parse_optional_timezone(context_tz)?;
    let reference = parse_optional_timezone(reference_tz)?.unwrap_or(Tz::UTC);

    let occurrences = booking_engine::expand_with_fallback(&event, context, reference)
        .and_then(|o| o.to_vec())
        .map_err(js_error)?;

    let dtos: Vec<OccurrenceDto> = occurrences.iter().map(OccurrenceDto::from).collect();

    serde_json::to_string(&dtos)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
