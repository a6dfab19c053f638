//! Forecast trimming
//!
//! A forecast stops being informative once its uncertainty growth and its
//! direction of travel have both settled. The trimmer finds the first date
//! where the day-over-day relative change of the standard error and of the
//! mean simultaneously fall under their thresholds and keeps the prefix up
//! to and including that date. Without such a date the forecast is returned
//! unmodified; trimming is optional, never mandatory.

use crate::config::TrimConfig;
use crate::forecast::ForecastFrame;

/// Trim a forecast frame to its informative prefix. Returns a copy; the
/// input frame is never mutated.
pub fn trim_forecast(frame: &ForecastFrame, config: &TrimConfig) -> ForecastFrame {
    let se_bound = 1.0 - config.alpha_threshold / 100.0;
    let mean_bound = config.km_ratio / 100.0;
    let mean = frame.mean();
    let se = frame.mean_se();

    // Row 0 has no prior row to diff against; it stays in the output but is
    // excluded from the trigger search.
    for t in 1..frame.len() {
        let mean_change = (mean[t] - mean[t - 1]) / mean[t].abs();
        let se_change = (se[t] - se[t - 1]) / se[t].abs();
        if se_change <= se_bound && mean_change <= mean_bound {
            return frame.truncated(t + 1);
        }
    }
    frame.clone()
}
