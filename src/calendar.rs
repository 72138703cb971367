use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// One candidate trip: a (depart, return) date pair. The pair itself is the
/// identity used for price history and alert dedup - exact match, not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TravelWindow {
    pub depart: NaiveDate,
    pub ret: NaiveDate,
}

impl TravelWindow {
    pub fn new(depart: NaiveDate, ret: NaiveDate) -> Self {
        debug_assert!(depart < ret, "travel window must depart before it returns");
        Self { depart, ret }
    }
}

impl std::fmt::Display for TravelWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.depart, self.ret)
    }
}

fn window(dy: i32, dm: u32, dd: u32, ry: i32, rm: u32, rd: u32) -> TravelWindow {
    // Dates are compile-time constants from the school calendar below.
    TravelWindow::new(
        NaiveDate::from_ymd_opt(dy, dm, dd).unwrap(),
        NaiveDate::from_ymd_opt(ry, rm, rd).unwrap(),
    )
}

/// ISD 833 (South Washington County) 2025-2026 school calendar, expressed as
/// bookable round trips around each break.
pub fn travel_windows() -> Vec<TravelWindow> {
    vec![
        // Fall Break - Oct 16-17 off, Thu-Sun trip
        window(2025, 10, 16, 2025, 10, 19),
        // Thanksgiving - Nov 26-28 off, Wed-Sun
        window(2025, 11, 26, 2025, 11, 30),
        // Winter Break - Dec 22 to Jan 2, two options
        window(2025, 12, 20, 2025, 12, 28), // Christmas week
        window(2025, 12, 27, 2026, 1, 3),   // New Year's week
        // MLK Day - Jan 19 off, Fri-Mon
        window(2026, 1, 16, 2026, 1, 19),
        // Presidents' Day - Feb 16 off, Fri-Mon
        window(2026, 2, 13, 2026, 2, 16),
        // Spring Break - Mar 6-13 off, full week
        window(2026, 3, 6, 2026, 3, 13),
        // Summer - Jun 5 to ~Sep 1: five representative weeks
        window(2026, 6, 12, 2026, 6, 19),
        window(2026, 6, 26, 2026, 7, 3),
        window(2026, 7, 10, 2026, 7, 17),
        window(2026, 7, 31, 2026, 8, 7),
        window(2026, 8, 14, 2026, 8, 21),
    ]
}

/// Windows whose departure falls within `[today, today + lookahead_days]`.
pub fn upcoming_windows(today: NaiveDate, lookahead_days: i64) -> Vec<TravelWindow> {
    let cutoff = today + Duration::days(lookahead_days);
    travel_windows()
        .into_iter()
        .filter(|w| w.depart >= today && w.depart <= cutoff)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn display_names_both_dates() {
        let w = TravelWindow::new(date(2026, 3, 6), date(2026, 3, 13));
        assert_eq!(w.to_string(), "2026-03-06 -> 2026-03-13");
    }

    #[test]
    fn windows_are_ordered_pairs() {
        for w in travel_windows() {
            assert!(w.depart < w.ret, "{w} departs after it returns");
        }
    }

    #[test]
    fn lookahead_filters_by_departure() {
        // From Oct 1 2025 with a 90-day horizon: fall break, Thanksgiving,
        // both winter options - but not MLK (Jan 16 is day 107).
        let upcoming = upcoming_windows(date(2025, 10, 1), 90);
        assert_eq!(upcoming.len(), 4);
        assert_eq!(upcoming[0].depart, date(2025, 10, 16));
        assert_eq!(upcoming[3].depart, date(2025, 12, 27));
    }

    #[test]
    fn past_windows_are_excluded() {
        let upcoming = upcoming_windows(date(2026, 9, 1), 90);
        assert!(upcoming.is_empty());
    }

    #[test]
    fn cutoff_is_inclusive() {
        // Fall break departs exactly 15 days after Oct 1.
        let upcoming = upcoming_windows(date(2025, 10, 1), 15);
        assert_eq!(upcoming.len(), 1);
    }
}
