//! Smoothed change summaries for reporting

use chrono::NaiveDate;

use crate::data::DailySeries;
use crate::error::{ForecastError, Result};

const ROLLING_WINDOW: usize = 5;
const ROLLING_MIN_PERIODS: usize = 3;
const WEEK_DAYS: usize = 7;
const MONTH_DAYS: usize = 30;

/// Day-over-day changes smoothed with a centered rolling mean.
///
/// Each entry is dated at the later day of its difference pair.
pub fn daily_change(series: &DailySeries) -> Result<Vec<(NaiveDate, f64)>> {
    if series.len() < ROLLING_MIN_PERIODS + 1 {
        return Err(ForecastError::Data(format!(
            "daily change needs at least {} observations",
            ROLLING_MIN_PERIODS + 1
        )));
    }
    let diffs: Vec<f64> = series
        .values()
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect();
    let half = ROLLING_WINDOW / 2;

    Ok(diffs
        .iter()
        .enumerate()
        .map(|(idx, _)| {
            let from = idx.saturating_sub(half);
            let to = (idx + half + 1).min(diffs.len());
            let window = &diffs[from..to];
            let smoothed = window.iter().sum::<f64>() / window.len() as f64;
            (series.dates()[idx + 1], smoothed)
        })
        .collect())
}

/// Total smoothed change over the trailing week and month.
pub fn recent_changes(day_change: &[(NaiveDate, f64)]) -> (f64, f64) {
    let tail_sum = |days: usize| {
        day_change
            .iter()
            .skip(day_change.len().saturating_sub(days))
            .map(|(_, value)| value)
            .sum::<f64>()
    };
    (tail_sum(WEEK_DAYS), tail_sum(MONTH_DAYS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: Vec<f64>) -> DailySeries {
        DailySeries::from_start(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), values).unwrap()
    }

    #[test]
    fn daily_change_smooths_a_constant_step() {
        // Constant +2 steps: every smoothed change is exactly 2.
        let changes = daily_change(&series(vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0])).unwrap();
        assert_eq!(changes.len(), 5);
        for (_, value) in changes {
            assert_eq!(value, 2.0);
        }
    }

    #[test]
    fn daily_change_rejects_short_series() {
        assert!(daily_change(&series(vec![1.0, 2.0])).is_err());
    }

    #[test]
    fn recent_changes_sum_the_tails() {
        let changes = daily_change(&series(vec![0.0; 40])).unwrap();
        let (week, month) = recent_changes(&changes);
        assert_eq!(week, 0.0);
        assert_eq!(month, 0.0);
    }
}
