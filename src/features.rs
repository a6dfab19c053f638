//! Exogenous feature matrix: deterministic trend and momentum segment trends
//!
//! The feature builder spans the observed date range plus the forecast
//! horizon at daily frequency. Deterministic trend columns let the model
//! capture long-run drift; segment-trend columns are zero before an anchor
//! date and climb by one per day from the anchor onward, which lets the model
//! express a change of growth regime without manual breakpoint modeling.

use chrono::{Duration, NaiveDate};

use crate::config::{ForecastConfig, TrendBasis};
use crate::data::DailySeries;
use crate::error::{ForecastError, Result};

const COLUMN_CONST: &str = "const";
const COLUMN_TREND: &str = "trend";
const COLUMN_TREND_SQUARED: &str = "trend_squared";

pub(crate) const COLUMN_MOMENTUM_LONG: &str = "momentum_long";
pub(crate) const COLUMN_MOMENTUM_SHORT: &str = "momentum_short";

/// Column-oriented regressor matrix over a contiguous daily date index.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    start: NaiveDate,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build the deterministic trend columns over `[start, end]` inclusive.
    ///
    /// The linear trend starts at 1 on the first row, the same convention the
    /// original trend helper used; the intercept absorbs the offset.
    pub fn with_trend(start: NaiveDate, end: NaiveDate, basis: TrendBasis) -> Result<Self> {
        if end < start {
            return Err(ForecastError::InvalidParameter(format!(
                "feature range end {end} precedes start {start}"
            )));
        }
        let len = (end - start).num_days() as usize + 1;

        let mut names = vec![COLUMN_CONST.to_string()];
        let mut columns = vec![vec![1.0; len]];
        if matches!(
            basis,
            TrendBasis::ConstantLinear | TrendBasis::ConstantLinearQuadratic
        ) {
            names.push(COLUMN_TREND.to_string());
            columns.push((1..=len).map(|step| step as f64).collect());
        }
        if basis == TrendBasis::ConstantLinearQuadratic {
            names.push(COLUMN_TREND_SQUARED.to_string());
            columns.push((1..=len).map(|step| (step * step) as f64).collect());
        }

        Ok(Self {
            start,
            names,
            columns,
        })
    }

    /// Number of daily rows.
    pub fn len(&self) -> usize {
        self.columns[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.start + Duration::days(self.len() as i64 - 1)
    }

    /// Row index of `date`, if it falls inside the matrix range.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        if date < self.start {
            return None;
        }
        let offset = (date - self.start).num_days() as usize;
        (offset < self.len()).then_some(offset)
    }

    /// Column values by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|existing| existing == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Single row as a dense vector, column order matching `names()`.
    pub fn row(&self, idx: usize) -> Vec<f64> {
        self.columns.iter().map(|column| column[idx]).collect()
    }

    /// Row-major values for the half-open row range `[from, to)`.
    pub(crate) fn flat_rows(&self, from: usize, to: usize) -> Vec<f64> {
        let mut flat = Vec::with_capacity((to - from) * self.width());
        for idx in from..to {
            for column in &self.columns {
                flat.push(column[idx]);
            }
        }
        flat
    }

    /// Return a new matrix with a segment-trend column appended: zero for
    /// every date before `anchor`, then an exact 0, 1, 2, … ramp per day.
    ///
    /// An anchor outside the matrix range is an input error and is never
    /// clamped.
    pub fn add_segment_trend(&self, anchor: NaiveDate, name: &str) -> Result<Self> {
        let anchor_idx = self.index_of(anchor).ok_or_else(|| {
            ForecastError::OutOfRange(format!(
                "segment-trend anchor {anchor} outside feature range [{}, {}]",
                self.start_date(),
                self.end_date()
            ))
        })?;

        let mut column = vec![0.0; self.len()];
        for (step, value) in column[anchor_idx..].iter_mut().enumerate() {
            *value = step as f64;
        }

        let mut updated = self.clone();
        updated.names.push(name.to_string());
        updated.columns.push(column);
        Ok(updated)
    }
}

/// Build the full feature matrix for a series and horizon: deterministic
/// trend over `[series.start, series.end + horizon]` plus the long and short
/// momentum segment trends anchored before the series end.
pub fn build_features(
    series: &DailySeries,
    horizon_days: usize,
    config: &ForecastConfig,
) -> Result<FeatureMatrix> {
    if series.len() < 2 {
        return Err(ForecastError::Data(
            "trend features need at least two observations".to_string(),
        ));
    }
    let end = series.end_date() + Duration::days(horizon_days as i64);
    let features = FeatureMatrix::with_trend(series.start_date(), end, config.trend_basis)?;
    let features = features.add_segment_trend(
        series.end_date() - Duration::days(config.momentum_long_days),
        COLUMN_MOMENTUM_LONG,
    )?;
    features.add_segment_trend(
        series.end_date() - Duration::days(config.momentum_short_days),
        COLUMN_MOMENTUM_SHORT,
    )
}
