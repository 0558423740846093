//! Tests for occurrence expansion: timezones, recurrence, all-day, and DST.

use booking_engine::expander::{event_days, expand, expand_with_fallback};
use booking_engine::{BookingError, DstPolicy, Event, Recurrence};
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

fn dt(s: &str) -> NaiveDateTime {
    s.parse().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn tz(name: &str) -> Tz {
    name.parse().unwrap()
}

// ---------------------------------------------------------------------------
// Single events and timezone resolution
// ---------------------------------------------------------------------------

#[test]
fn single_event_in_utc() {
    let event = Event::new("e1", dt("2024-01-15T09:00:00"), dt("2024-01-15T10:00:00"));
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();

    assert_eq!(occurrences.len(), 1);
    let interval = occurrences[0].interval();
    assert_eq!(interval.start, Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
    assert_eq!(interval.end, Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
}

#[test]
fn event_timezone_converted_to_reference() {
    // 09:00 in New York (UTC-5 in January) = 14:00 UTC = 15:00 in Paris.
    let event = Event::new("e1", dt("2024-01-15T09:00:00"), dt("2024-01-15T10:00:00"))
        .in_timezone("America/New_York");
    let occurrences = expand_with_fallback(&event, None, tz("Europe/Paris"))
        .unwrap()
        .to_vec()
        .unwrap();

    assert_eq!(occurrences[0].start.hour(), 15, "15:00 in the Paris reference timezone");
    assert_eq!(
        occurrences[0].interval().start,
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    );
}

#[test]
fn event_without_timezone_uses_context_then_utc() {
    let event = Event::new("e1", dt("2024-01-15T09:00:00"), dt("2024-01-15T10:00:00"));

    // Context Asia/Tokyo (UTC+9): 09:00 JST = 00:00 UTC.
    let with_context = expand_with_fallback(&event, Some(tz("Asia/Tokyo")), Tz::UTC)
        .unwrap()
        .to_vec()
        .unwrap();
    assert_eq!(with_context[0].interval().start.hour(), 0);

    // No context: naive times are UTC.
    let without = expand_with_fallback(&event, None, Tz::UTC)
        .unwrap()
        .to_vec()
        .unwrap();
    assert_eq!(without[0].interval().start.hour(), 9);
}

#[test]
fn event_timezone_wins_over_context() {
    let event = Event::new("e1", dt("2024-01-15T09:00:00"), dt("2024-01-15T10:00:00"))
        .in_timezone("UTC");
    let occurrences = expand_with_fallback(&event, Some(tz("Asia/Tokyo")), Tz::UTC)
        .unwrap()
        .to_vec()
        .unwrap();
    assert_eq!(occurrences[0].interval().start.hour(), 9);
}

#[test]
fn invalid_event_timezone_is_rejected() {
    let event = Event::new("e1", dt("2024-01-15T09:00:00"), dt("2024-01-15T10:00:00"))
        .in_timezone("Mars/Olympus_Mons");
    let result = expand_with_fallback(&event, None, Tz::UTC);
    assert!(matches!(result, Err(BookingError::InvalidTimezone(_))));
}

#[test]
fn stop_not_after_start_is_invalid_interval() {
    let event = Event::new("bad", dt("2024-01-15T10:00:00"), dt("2024-01-15T10:00:00"));
    let result = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default());
    assert!(matches!(result, Err(BookingError::InvalidInterval { .. })));
}

#[test]
fn multi_day_single_event_lists_every_day() {
    let event = Event::new("e1", dt("2024-01-01T20:00:00"), dt("2024-01-03T08:00:00"));
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();
    let days: Vec<NaiveDate> = occurrences[0].days().collect();
    assert_eq!(days, vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]);
}

// ---------------------------------------------------------------------------
// Recurring events
// ---------------------------------------------------------------------------

#[test]
fn daily_series_produces_one_occurrence_per_day() {
    // 2024-01-01 09:00 → 2024-01-03 17:00: Jan 1, 2, 3 from 09:00 to 17:00.
    let event = Event::new("daily", dt("2024-01-01T09:00:00"), dt("2024-01-03T17:00:00"))
        .recurring(Recurrence::daily());
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();

    assert_eq!(occurrences.len(), 3);
    for (i, occurrence) in occurrences.iter().enumerate() {
        let day = 1 + i as u32;
        assert_eq!(
            occurrence.interval().start,
            Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
        );
        assert_eq!(
            occurrence.interval().end,
            Utc.with_ymd_and_hms(2024, 1, day, 17, 0, 0).unwrap()
        );
    }
}

#[test]
fn series_ending_at_midnight_excludes_final_day() {
    // Stops at 2024-01-04 00:00: the last occupied day is Jan 3.
    let event = Event::new("late", dt("2024-01-01T22:00:00"), dt("2024-01-04T00:00:00"))
        .recurring(Recurrence::daily());
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();

    assert_eq!(occurrences.len(), 3, "no extra empty occurrence on Jan 4");
    let last = occurrences.last().unwrap();
    assert_eq!(last.first_day, date(2024, 1, 3));
    assert_eq!(last.last_day, date(2024, 1, 3), "ending at midnight occupies one day");
    assert_eq!(
        last.interval().end,
        Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap()
    );
}

#[test]
fn overnight_series_never_ends_after_stop() {
    // 22:00 -> 02:00 nightly until 2024-01-03 02:00: the night starting Jan 3
    // would run past the stop, so the series is Jan 1 and Jan 2 only.
    let event = Event::new("night", dt("2024-01-01T22:00:00"), dt("2024-01-03T02:00:00"))
        .recurring(Recurrence::daily());
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();

    let starts: Vec<NaiveDate> = occurrences.iter().map(|o| o.first_day).collect();
    assert_eq!(starts, vec![date(2024, 1, 1), date(2024, 1, 2)]);

    let last = occurrences.last().unwrap();
    assert_eq!(last.last_day, date(2024, 1, 3));
    assert_eq!(
        last.interval().end,
        Utc.with_ymd_and_hms(2024, 1, 3, 2, 0, 0).unwrap()
    );
}

#[test]
fn event_days_honors_midnight_rule() {
    assert_eq!(
        event_days(dt("2024-01-01T10:00:00"), dt("2024-01-03T00:00:00")),
        vec![date(2024, 1, 1), date(2024, 1, 2)]
    );
    assert_eq!(
        event_days(dt("2024-01-01T10:00:00"), dt("2024-01-03T00:01:00")),
        vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]
    );
}

#[test]
fn until_caps_the_series() {
    let event = Event::new("capped", dt("2024-01-01T09:00:00"), dt("2024-01-10T10:00:00"))
        .recurring(Recurrence::daily().until(date(2024, 1, 2)));
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default()).unwrap();
    assert_eq!(occurrences.len(), 2);
}

#[test]
fn weekly_series_on_selected_weekdays() {
    // Mon 2024-01-01 → Sun 2024-01-14, Mondays and Wednesdays: Jan 1, 3, 8, 10.
    let event = Event::new("standup", dt("2024-01-01T10:00:00"), dt("2024-01-14T11:00:00"))
        .recurring(Recurrence::weekly_on([Weekday::Mon, Weekday::Wed]));
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();

    let days: Vec<NaiveDate> = occurrences.iter().map(|o| o.first_day).collect();
    assert_eq!(
        days,
        vec![date(2024, 1, 1), date(2024, 1, 3), date(2024, 1, 8), date(2024, 1, 10)]
    );
}

#[test]
fn every_other_day_interval() {
    let event = Event::new("alt", dt("2024-01-01T10:00:00"), dt("2024-01-07T11:00:00"))
        .recurring(Recurrence::daily().every(2));
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();
    let days: Vec<NaiveDate> = occurrences.iter().map(|o| o.first_day).collect();
    assert_eq!(
        days,
        vec![date(2024, 1, 1), date(2024, 1, 3), date(2024, 1, 5), date(2024, 1, 7)]
    );
}

#[test]
fn exdates_are_removed_from_series() {
    let event = Event::new("ex", dt("2024-01-01T09:00:00"), dt("2024-01-05T10:00:00"))
        .recurring(Recurrence::daily().except(date(2024, 1, 3)));
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();

    assert_eq!(occurrences.len(), 4);
    assert!(occurrences.iter().all(|o| o.first_day != date(2024, 1, 3)));
}

#[test]
fn zero_interval_is_invalid_rule() {
    let event = Event::new("bad", dt("2024-01-01T09:00:00"), dt("2024-01-05T10:00:00"))
        .recurring(Recurrence::daily().every(0));
    let result = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default());
    assert!(matches!(result, Err(BookingError::InvalidRule(_))));
}

#[test]
fn weekdays_on_daily_rule_is_invalid_rule() {
    let mut rule = Recurrence::daily();
    rule.by_weekday = vec![Weekday::Mon];
    let event = Event::new("bad", dt("2024-01-01T09:00:00"), dt("2024-01-05T10:00:00"))
        .recurring(rule);
    let result = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default());
    assert!(matches!(result, Err(BookingError::InvalidRule(_))));
}

#[test]
fn occurrences_are_restartable() {
    let event = Event::new("daily", dt("2024-01-01T09:00:00"), dt("2024-01-03T17:00:00"))
        .recurring(Recurrence::daily());
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default()).unwrap();

    let first: Vec<_> = occurrences.iter().map(|o| o.unwrap().interval()).collect();
    let second: Vec<_> = occurrences.iter().map(|o| o.unwrap().interval()).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn daily_series_keeps_wall_clock_across_dst() {
    // America/Los_Angeles springs forward on 2024-03-10.
    // 14:00 PST (UTC-8) = 22:00 UTC; 14:00 PDT (UTC-7) = 21:00 UTC.
    let event = Event::new("dst", dt("2024-03-09T14:00:00"), dt("2024-03-11T15:00:00"))
        .in_timezone("America/Los_Angeles")
        .recurring(Recurrence::daily());
    let occurrences = expand_with_fallback(&event, None, Tz::UTC)
        .unwrap()
        .to_vec()
        .unwrap();

    let hours: Vec<u32> = occurrences.iter().map(|o| o.start.hour()).collect();
    assert_eq!(hours, vec![22, 21, 21]);
}

// ---------------------------------------------------------------------------
// All-day events
// ---------------------------------------------------------------------------

#[test]
fn all_day_event_spans_whole_local_days() {
    let event = Event::new("offsite", dt("2024-02-05T08:00:00"), dt("2024-02-06T18:00:00"))
        .all_day();
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();

    assert_eq!(occurrences.len(), 1);
    let interval = occurrences[0].interval();
    assert_eq!(interval.start, Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap());
    assert_eq!(interval.end, Utc.with_ymd_and_hms(2024, 2, 7, 0, 0, 0).unwrap());
    assert_eq!(
        occurrences[0].days().collect::<Vec<_>>(),
        vec![date(2024, 2, 5), date(2024, 2, 6)]
    );
}

#[test]
fn single_day_all_day_event_is_valid() {
    let event = Event::new("holiday", dt("2024-02-05T00:00:00"), dt("2024-02-05T00:00:00"))
        .all_day();
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();
    assert_eq!(occurrences[0].interval().duration_minutes(), 24 * 60);
}

#[test]
fn recurring_all_day_event_yields_full_days() {
    let event = Event::new("camp", dt("2024-02-05T00:00:00"), dt("2024-02-07T00:00:00"))
        .all_day()
        .recurring(Recurrence::daily());
    let occurrences = expand(&event, Tz::UTC, Tz::UTC, DstPolicy::default())
        .unwrap()
        .to_vec()
        .unwrap();

    // All-day events ignore times, so the stop date itself is included.
    assert_eq!(occurrences.len(), 3);
    assert!(occurrences.iter().all(|o| o.all_day));
    assert!(occurrences
        .iter()
        .all(|o| o.interval().duration_minutes() == 24 * 60));
}

#[test]
fn all_day_event_uses_local_midnight() {
    // Midnight in Los Angeles (UTC-8 in February) = 08:00 UTC.
    let event = Event::new("offsite", dt("2024-02-05T00:00:00"), dt("2024-02-05T00:00:00"))
        .in_timezone("America/Los_Angeles")
        .all_day();
    let occurrences = expand_with_fallback(&event, None, Tz::UTC)
        .unwrap()
        .to_vec()
        .unwrap();
    assert_eq!(
        occurrences[0].interval().start,
        Utc.with_ymd_and_hms(2024, 2, 5, 8, 0, 0).unwrap()
    );
}

// ---------------------------------------------------------------------------
// DST gaps
// ---------------------------------------------------------------------------

#[test]
fn gap_time_shifts_forward_by_default() {
    // 02:30 does not exist in Los Angeles on 2024-03-10; it becomes 03:30 PDT.
    let event = Event::new("gap", dt("2024-03-10T02:30:00"), dt("2024-03-10T04:00:00"))
        .in_timezone("America/Los_Angeles");
    let occurrences = expand_with_fallback(&event, None, Tz::UTC)
        .unwrap()
        .to_vec()
        .unwrap();
    assert_eq!(
        occurrences[0].interval().start,
        Utc.with_ymd_and_hms(2024, 3, 10, 10, 30, 0).unwrap()
    );
}

#[test]
fn gap_time_rejected_under_reject_policy() {
    let event = Event::new("gap", dt("2024-03-10T02:30:00"), dt("2024-03-10T04:00:00"));
    let result = expand(&event, tz("America/Los_Angeles"), Tz::UTC, DstPolicy::Reject)
        .unwrap()
        .to_vec();
    assert!(matches!(result, Err(BookingError::NonexistentLocalTime(_, _))));
}

#[test]
fn ambiguous_time_resolves_to_earlier_instant() {
    // 01:30 happens twice in Los Angeles on 2024-11-03; the first is PDT (UTC-7).
    let local = booking_engine::dst::localize(
        dt("2024-11-03T01:30:00"),
        tz("America/Los_Angeles"),
        DstPolicy::Reject,
    )
    .unwrap();
    assert_eq!(
        local.with_timezone(&Utc),
        Utc.with_ymd_and_hms(2024, 11, 3, 8, 30, 0).unwrap()
    );
}

#[test]
fn skipped_day_shifts_forward_by_the_whole_gap() {
    // Samoa skipped 2011-12-30 entirely, moving from UTC-10 to UTC+14.
    let apia = tz("Pacific/Apia");
    let naive = dt("2011-12-30T10:00:00");

    let local = booking_engine::dst::localize(naive, apia, DstPolicy::ShiftForward).unwrap();
    assert_eq!(local.naive_local(), dt("2011-12-31T10:00:00"));
    assert_eq!(
        local.with_timezone(&Utc),
        Utc.with_ymd_and_hms(2011, 12, 30, 20, 0, 0).unwrap()
    );

    assert!(matches!(
        booking_engine::dst::localize(naive, apia, DstPolicy::Reject),
        Err(BookingError::NonexistentLocalTime(_, _))
    ));
}
