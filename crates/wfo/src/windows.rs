//! Partitions a historical range into walk-forward windows.
//!
//! Windows tile the range back to back: each spans one in-sample period
//! immediately followed by its out-of-sample period, and the next window
//! starts where the previous one ended. Out-of-sample ranges are therefore
//! contiguous, non-overlapping, and strictly forward of the in-sample data
//! that selected their parameters. A trailing remainder shorter than a full
//! window is dropped.

use crate::error::WfoError;
use chrono::{DateTime, Duration, Utc};
use quant_forge_core::DateRange;

/// One in-sample/out-of-sample pair. All bounds are half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkWindow {
    pub is_start: DateTime<Utc>,
    pub is_end: DateTime<Utc>,
    pub oos_start: DateTime<Utc>,
    pub oos_end: DateTime<Utc>,
}

impl WalkWindow {
    #[must_use]
    pub const fn in_sample(&self) -> DateRange {
        DateRange::new(self.is_start, self.is_end)
    }

    #[must_use]
    pub const fn out_of_sample(&self) -> DateRange {
        DateRange::new(self.oos_start, self.oos_end)
    }
}

/// Splits `range` into full walk-forward windows.
///
/// # Errors
/// Returns `WfoError::InvalidWindowing` if either period length is
/// non-positive or the range is too short to hold even one full window.
pub fn partition(
    range: DateRange,
    in_sample_days: i64,
    out_of_sample_days: i64,
) -> Result<Vec<WalkWindow>, WfoError> {
    if in_sample_days <= 0 {
        return Err(WfoError::InvalidWindowing(
            "in-sample length must be positive".to_string(),
        ));
    }
    if out_of_sample_days <= 0 {
        return Err(WfoError::InvalidWindowing(
            "out-of-sample length must be positive".to_string(),
        ));
    }

    let is_len = Duration::days(in_sample_days);
    let oos_len = Duration::days(out_of_sample_days);

    let mut windows = Vec::new();
    let mut is_start = range.start;
    loop {
        let is_end = is_start + is_len;
        let oos_end = is_end + oos_len;
        if oos_end > range.end {
            break;
        }
        windows.push(WalkWindow {
            is_start,
            is_end,
            oos_start: is_end,
            oos_end,
        });
        is_start = oos_end;
    }

    if windows.is_empty() {
        return Err(WfoError::InvalidWindowing(format!(
            "range of {} days cannot hold one {}+{} day window",
            range.duration().num_days(),
            in_sample_days,
            out_of_sample_days,
        )));
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range_of_days(days: i64) -> DateRange {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        DateRange::new(start, start + Duration::days(days))
    }

    #[test]
    fn window_count_is_floor_of_range_over_window_length() {
        // 8 + 2 day windows over various range lengths.
        for (total, expected) in [(10, 1), (19, 1), (20, 2), (95, 9), (100, 10)] {
            let windows = partition(range_of_days(total), 8, 2).unwrap();
            assert_eq!(windows.len(), expected, "range of {total} days");
        }
    }

    #[test]
    fn oos_follows_is_with_zero_gap() {
        let windows = partition(range_of_days(40), 8, 2).unwrap();
        for w in &windows {
            assert_eq!(w.is_end, w.oos_start);
            assert_eq!(w.oos_end - w.oos_start, Duration::days(2));
            assert_eq!(w.is_end - w.is_start, Duration::days(8));
        }
    }

    #[test]
    fn consecutive_windows_tile_without_overlap() {
        let windows = partition(range_of_days(50), 8, 2).unwrap();
        assert_eq!(windows.len(), 5);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].oos_end, pair[1].is_start);
        }
    }

    #[test]
    fn twenty_month_range_with_eight_two_split_yields_two_windows() {
        // 600 days with 240-day in-sample and 60-day out-of-sample.
        let range = range_of_days(600);
        let windows = partition(range, 240, 60).unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].is_start, range.start);
        assert_eq!(windows[0].oos_end, range.start + Duration::days(300));
        assert_eq!(windows[1].is_start, range.start + Duration::days(300));
        assert_eq!(windows[1].oos_end, range.end);
    }

    #[test]
    fn trailing_partial_window_is_dropped() {
        let windows = partition(range_of_days(29), 8, 2).unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(
            windows.last().unwrap().oos_end,
            range_of_days(29).start + Duration::days(20)
        );
    }

    #[test]
    fn range_shorter_than_one_window_is_rejected() {
        let err = partition(range_of_days(9), 8, 2).unwrap_err();
        assert!(matches!(err, WfoError::InvalidWindowing(_)));
    }

    #[test]
    fn non_positive_period_lengths_are_rejected() {
        assert!(matches!(
            partition(range_of_days(100), 0, 2).unwrap_err(),
            WfoError::InvalidWindowing(_)
        ));
        assert!(matches!(
            partition(range_of_days(100), 8, -1).unwrap_err(),
            WfoError::InvalidWindowing(_)
        ));
    }
}
