//! Interval arithmetic for schedule conflicts and blackout windows.

use chrono::NaiveDate;

use crate::types::Timestamp;

/// Closed-interval overlap test: `[start_a, end_a]` ∩ `[start_b, end_b]` ≠ ∅.
///
/// Intervals that merely touch at an endpoint count as overlapping, which is
/// what schedule-conflict detection wants: a shift ending at 14:00 conflicts
/// with one starting at 14:00.
pub fn closed_overlap(
    start_a: Timestamp,
    end_a: Timestamp,
    start_b: Timestamp,
    end_b: Timestamp,
) -> bool {
    start_a <= end_b && start_b <= end_a
}

/// An inclusive calendar-date range (blackout windows are whole days).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// A one-day range.
    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Extend a timestamp interval to the full calendar days it touches.
///
/// A job from Tue 22:00 to Wed 02:00 blocks both Tuesday and Wednesday for
/// blackout purposes.
pub fn day_extended(start: Timestamp, end: Timestamp) -> DateRange {
    DateRange {
        start: start.date_naive(),
        end: end.date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn ts(s: &str) -> Timestamp {
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn disjoint_intervals_do_not_overlap() {
        assert!(!closed_overlap(
            ts("2026-09-01 08:00"),
            ts("2026-09-01 12:00"),
            ts("2026-09-01 13:00"),
            ts("2026-09-01 17:00"),
        ));
    }

    #[test]
    fn touching_endpoints_overlap() {
        assert!(closed_overlap(
            ts("2026-09-01 08:00"),
            ts("2026-09-01 12:00"),
            ts("2026-09-01 12:00"),
            ts("2026-09-01 17:00"),
        ));
    }

    #[test]
    fn containment_overlaps() {
        assert!(closed_overlap(
            ts("2026-09-01 08:00"),
            ts("2026-09-01 20:00"),
            ts("2026-09-01 10:00"),
            ts("2026-09-01 12:00"),
        ));
    }

    #[test]
    fn date_range_overlap_is_inclusive() {
        let a = DateRange { start: date("2026-09-01"), end: date("2026-09-05") };
        let b = DateRange::single(date("2026-09-05"));
        let c = DateRange::single(date("2026-09-06"));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn overnight_job_extends_across_both_days() {
        let range = day_extended(ts("2026-09-01 22:00"), ts("2026-09-02 02:00"));
        assert_eq!(range.start, date("2026-09-01"));
        assert_eq!(range.end, date("2026-09-02"));
    }
}
