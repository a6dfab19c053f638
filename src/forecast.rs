//! Forecast generation with confidence bounds
//!
//! The forecast mean combines the exogenous regression over future feature
//! rows with the ARMA recursion on the residuals (future innovations zero).
//! The standard error of the mean adds the regression-coefficient covariance
//! term to the psi-weight accumulation of the innovation variance, so bounds
//! widen with the horizon as uncertainty compounds. Output dates are always
//! a strict consecutive daily sequence starting the day after the last
//! observed date.

use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::config::ForecastConfig;
use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use crate::features::FeatureMatrix;
use crate::models::FittedModel;

const DATE_FORMAT: &str = "%Y-%m-%d";
const CSV_HEADER: [&str; 5] = ["date", "mean", "mean_se", "lower", "upper"];

/// Daily forecast rows beyond the last observed date.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastFrame {
    dates: Vec<NaiveDate>,
    mean: Vec<f64>,
    mean_se: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ForecastRow {
    date: String,
    mean: f64,
    mean_se: f64,
    lower: f64,
    upper: f64,
}

impl ForecastFrame {
    /// Build a frame from column vectors; dates are derived as consecutive
    /// days starting at `first_date`, which keeps the index invariant true
    /// by construction.
    pub fn new(
        first_date: NaiveDate,
        mean: Vec<f64>,
        mean_se: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self> {
        let len = mean.len();
        if len == 0 {
            return Err(ForecastError::InvalidParameter(
                "forecast frame must contain at least one row".to_string(),
            ));
        }
        if mean_se.len() != len || lower.len() != len || upper.len() != len {
            return Err(ForecastError::InvalidParameter(format!(
                "forecast columns must share one length, got {}/{}/{}/{}",
                len,
                mean_se.len(),
                lower.len(),
                upper.len()
            )));
        }
        let dates = (0..len)
            .map(|offset| first_date + Duration::days(offset as i64))
            .collect();
        Ok(Self {
            dates,
            mean,
            mean_se,
            lower,
            upper,
        })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn mean_se(&self) -> &[f64] {
        &self.mean_se
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn start_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn end_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Copied prefix of the first `len` rows; the original is untouched.
    pub fn truncated(&self, len: usize) -> Self {
        let len = len.min(self.len());
        Self {
            dates: self.dates[..len].to_vec(),
            mean: self.mean[..len].to_vec(),
            mean_se: self.mean_se[..len].to_vec(),
            lower: self.lower[..len].to_vec(),
            upper: self.upper[..len].to_vec(),
        }
    }

    fn rows(&self) -> Vec<ForecastRow> {
        (0..self.len())
            .map(|idx| ForecastRow {
                date: self.dates[idx].format(DATE_FORMAT).to_string(),
                mean: self.mean[idx],
                mean_se: self.mean_se[idx],
                lower: self.lower[idx],
                upper: self.upper[idx],
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.rows()).map_err(|err| ForecastError::Data(err.to_string()))
    }

    /// Write the frame as CSV, creating parent directories as needed.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(CSV_HEADER)?;
        for row in self.rows() {
            writer.write_record([
                row.date,
                format!("{:.6}", row.mean),
                format!("{:.6}", row.mean_se),
                format!("{:.6}", row.lower),
                format!("{:.6}", row.upper),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a frame previously written with `write_csv`.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut first_date = None;
        let mut previous: Option<NaiveDate> = None;
        let mut mean = Vec::new();
        let mut mean_se = Vec::new();
        let mut lower = Vec::new();
        let mut upper = Vec::new();

        for row in reader.deserialize::<ForecastRow>() {
            let row = row?;
            let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT)
                .map_err(|err| ForecastError::Data(format!("bad date '{}': {err}", row.date)))?;
            if let Some(previous) = previous {
                if date - previous != Duration::days(1) {
                    return Err(ForecastError::Data(format!(
                        "forecast CSV dates must be consecutive, found {previous} then {date}"
                    )));
                }
            }
            first_date.get_or_insert(date);
            previous = Some(date);
            mean.push(row.mean);
            mean_se.push(row.mean_se);
            lower.push(row.lower);
            upper.push(row.upper);
        }

        let first_date =
            first_date.ok_or_else(|| ForecastError::Data("forecast CSV is empty".to_string()))?;
        Self::new(first_date, mean, mean_se, lower, upper)
    }
}

impl FittedModel {
    /// Produce the forecast frame for `horizon_days` future days.
    ///
    /// The feature matrix must cover every future day; a matrix that falls
    /// short is a caller contract violation, reported as
    /// `InsufficientFeatureRange` rather than silently truncated.
    pub fn forecast(
        &self,
        series: &DailySeries,
        features: &FeatureMatrix,
        horizon_days: usize,
        config: &ForecastConfig,
    ) -> Result<ForecastFrame> {
        if horizon_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be at least one day".to_string(),
            ));
        }
        if config.confidence_alpha <= 0.0 || config.confidence_alpha >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "confidence_alpha must be between 0 and 1".to_string(),
            ));
        }
        if series.len() != self.n_obs() {
            return Err(ForecastError::Data(format!(
                "series length ({}) doesn't match the fitted model ({})",
                series.len(),
                self.n_obs()
            )));
        }
        if features.width() != self.beta().len() {
            return Err(ForecastError::Data(format!(
                "feature width ({}) doesn't match the fitted model ({})",
                features.width(),
                self.beta().len()
            )));
        }
        let first_future = series.end_date() + Duration::days(1);
        let last_future = series.end_date() + Duration::days(horizon_days as i64);
        let from = features.index_of(first_future).ok_or_else(|| {
            ForecastError::InsufficientFeatureRange(format!(
                "feature matrix [{}, {}] does not reach {first_future}",
                features.start_date(),
                features.end_date()
            ))
        })?;
        if features.index_of(last_future).is_none() {
            return Err(ForecastError::InsufficientFeatureRange(format!(
                "feature matrix ends at {} but the horizon needs {last_future}",
                features.end_date()
            )));
        }

        let residual_path = self.extend_residuals(horizon_days);
        let psi = psi_weights(self.ar(), self.ma(), horizon_days);
        let z = normal_quantile(1.0 - config.confidence_alpha / 2.0)?;

        let n = series.len();
        let mut mean = Vec::with_capacity(horizon_days);
        let mut mean_se = Vec::with_capacity(horizon_days);
        let mut lower = Vec::with_capacity(horizon_days);
        let mut upper = Vec::with_capacity(horizon_days);
        let mut cumulative_psi2 = 0.0;

        for step in 0..horizon_days {
            let row = DVector::from_vec(features.row(from + step));
            let regression_mean = row.dot(self.beta_vector());
            let point = regression_mean + residual_path[n + step];

            cumulative_psi2 += psi[step] * psi[step];
            let coefficient_var = (self.cov_beta() * &row).dot(&row).max(0.0);
            let variance = coefficient_var + self.sigma2() * cumulative_psi2;
            let se = variance.sqrt();

            mean.push(point);
            mean_se.push(se);
            lower.push(point - z * se);
            upper.push(point + z * se);
        }

        ForecastFrame::new(first_future, mean, mean_se, lower, upper)
    }

    /// In-sample residuals extended by the ARMA recursion, future
    /// innovations set to zero.
    fn extend_residuals(&self, horizon_days: usize) -> Vec<f64> {
        let observed = self.residuals();
        let innovations = self.innovations();
        let n = observed.len();
        let mut path = observed.to_vec();
        for step in 0..horizon_days {
            let t = n + step;
            let mut next = 0.0;
            for (lag, phi) in self.ar().iter().enumerate() {
                next += phi * path[t - lag - 1];
            }
            for (lag, theta) in self.ma().iter().enumerate() {
                let source = t - lag - 1;
                if source < n {
                    next += theta * innovations[source];
                }
            }
            path.push(next);
        }
        path
    }
}

/// Psi-weight recursion of the ARMA moving-average representation:
/// `psi_0 = 1`, `psi_j = theta_j + sum phi_i * psi_{j-i}`.
fn psi_weights(ar: &[f64], ma: &[f64], horizon: usize) -> Vec<f64> {
    let mut psi = vec![0.0; horizon];
    if horizon == 0 {
        return psi;
    }
    psi[0] = 1.0;
    for j in 1..horizon {
        let mut weight = if j <= ma.len() { ma[j - 1] } else { 0.0 };
        for (i, phi) in ar.iter().enumerate() {
            if j > i {
                weight += phi * psi[j - i - 1];
            }
        }
        psi[j] = weight;
    }
    psi
}

fn normal_quantile(probability: f64) -> Result<f64> {
    let standard = Normal::new(0.0, 1.0)
        .map_err(|err| ForecastError::InvalidParameter(err.to_string()))?;
    Ok(standard.inverse_cdf(probability))
}
