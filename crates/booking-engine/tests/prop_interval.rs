//! Property-based tests for the interval algebra using proptest.
//!
//! These tests verify invariants that should hold for *any* intervals, not just
//! the specific examples in `interval_tests.rs`.

use booking_engine::interval::{merge, overlaps, subtract_available, Interval};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// An interval within one day, at minute resolution, possibly zero-length.
fn arb_interval() -> impl Strategy<Value = Interval> {
    (0i64..1440, 0i64..240).prop_map(|(offset, length)| {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let start = base + Duration::minutes(offset);
        Interval {
            start,
            end: start + Duration::minutes(length),
        }
    })
}

fn arb_intervals() -> impl Strategy<Value = Vec<Interval>> {
    prop::collection::vec(arb_interval(), 0..12)
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Property 1: overlap is symmetric
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn overlap_is_symmetric(a in arb_interval(), b in arb_interval()) {
        prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
    }
}

// ---------------------------------------------------------------------------
// Property 2: an interval overlaps itself unless it is zero-length
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn self_overlap_unless_degenerate(a in arb_interval()) {
        prop_assert_eq!(overlaps(&a, &a), !a.is_degenerate());
    }
}

// ---------------------------------------------------------------------------
// Property 3: merge is idempotent and produces sorted, disjoint output
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn merge_is_idempotent(xs in arb_intervals()) {
        let once = merge(&xs);
        let twice = merge(&once);
        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn merge_output_is_sorted_and_separated(xs in arb_intervals()) {
        let merged = merge(&xs);
        for pair in merged.windows(2) {
            // Strictly separated: touching intervals would have been joined.
            prop_assert!(pair[0].end < pair[1].start);
        }
        for i in &merged {
            prop_assert!(!i.is_degenerate());
        }
    }
}

// ---------------------------------------------------------------------------
// Property 4: conflicts stay inside the occupied span and avoid available time
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn conflicts_are_inside_span_and_outside_available(
        occupied in arb_interval(),
        available in arb_intervals(),
    ) {
        let conflicts = subtract_available(&occupied, &available);
        for c in &conflicts {
            prop_assert!(!c.is_degenerate());
            prop_assert!(c.start >= occupied.start && c.end <= occupied.end);
            for a in &available {
                prop_assert!(!overlaps(c, a), "conflict {:?} overlaps available {:?}", c, a);
            }
        }
    }

    #[test]
    fn conflicts_plus_covered_time_fill_the_span(
        occupied in arb_interval(),
        available in arb_intervals(),
    ) {
        let conflict_minutes: i64 = subtract_available(&occupied, &available)
            .iter()
            .map(Interval::duration_minutes)
            .sum();
        let clipped: Vec<Interval> = available
            .iter()
            .filter_map(|a| a.intersection(&occupied))
            .collect();
        let covered_minutes: i64 = merge(&clipped).iter().map(Interval::duration_minutes).sum();
        prop_assert_eq!(conflict_minutes + covered_minutes, occupied.duration_minutes());
    }
}
