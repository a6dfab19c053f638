//! Pipeline configuration
//!
//! All tunables of the forecasting pipeline live in explicit config structs
//! passed into each component. The defaults reproduce the calibration the
//! forecast was originally tuned with; they are starting points for parameter
//! sweeps, not analytically defended optima.

use crate::error::{ForecastError, Result};

const DEFAULT_HORIZON_DAYS: usize = 120;
const DEFAULT_MAX_ORDER: usize = 6;
const DEFAULT_CONFIDENCE_ALPHA: f64 = 0.01;
const DEFAULT_BOUND_FACTOR: f64 = 0.995;
const DEFAULT_MOMENTUM_LONG_DAYS: i64 = 365;
const DEFAULT_MOMENTUM_SHORT_DAYS: i64 = 31;

const DEFAULT_ALPHA_THRESHOLD: f64 = 99.95;
const DEFAULT_KM_RATIO: f64 = 0.01;

const DEFAULT_MAX_ITERS: u64 = 400;
const DEFAULT_HISTORY: usize = 10;
const DEFAULT_TOL_GRAD: f64 = 1e-8;
const DEFAULT_TOL_COST: f64 = 1e-10;

/// Deterministic trend basis used by the feature builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendBasis {
    /// Constant term only.
    Constant,
    /// Constant plus linear trend.
    ConstantLinear,
    /// Constant, linear and quadratic trend.
    ConstantLinearQuadratic,
}

/// Settings for feature construction, model selection and forecasting.
#[derive(Debug, Clone, Copy)]
pub struct ForecastConfig {
    /// Number of future days to forecast.
    pub horizon_days: usize,
    /// Exclusive upper bound for both the AR order p and the MA order q.
    pub max_order: usize,
    /// Significance level of the confidence bounds (0.01 gives ~99% bands).
    pub confidence_alpha: f64,
    /// Dampening factor of the AIC acceptance rule; slightly below 1 so a
    /// challenger must beat the incumbent by a proportional margin.
    pub bound_factor: f64,
    /// Anchor of the long momentum segment, in days before the series end.
    pub momentum_long_days: i64,
    /// Anchor of the short momentum segment, in days before the series end.
    pub momentum_short_days: i64,
    /// Deterministic trend basis of the feature matrix.
    pub trend_basis: TrendBasis,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            max_order: DEFAULT_MAX_ORDER,
            confidence_alpha: DEFAULT_CONFIDENCE_ALPHA,
            bound_factor: DEFAULT_BOUND_FACTOR,
            momentum_long_days: DEFAULT_MOMENTUM_LONG_DAYS,
            momentum_short_days: DEFAULT_MOMENTUM_SHORT_DAYS,
            trend_basis: TrendBasis::ConstantLinear,
        }
    }
}

impl ForecastConfig {
    /// Validate parameter ranges before a pipeline run.
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon_days must be at least 1".to_string(),
            ));
        }
        if self.max_order == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_order must be at least 1".to_string(),
            ));
        }
        if self.confidence_alpha <= 0.0 || self.confidence_alpha >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "confidence_alpha must be between 0 and 1".to_string(),
            ));
        }
        if self.bound_factor <= 0.0 || self.bound_factor > 1.0 {
            return Err(ForecastError::InvalidParameter(
                "bound_factor must be within (0, 1]".to_string(),
            ));
        }
        if self.momentum_long_days <= 0 || self.momentum_short_days <= 0 {
            return Err(ForecastError::InvalidParameter(
                "momentum segment lengths must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Thresholds of the forecast trimmer, both expressed as percentages.
#[derive(Debug, Clone, Copy)]
pub struct TrimConfig {
    /// Confidence-growth threshold; the standard-error change ratio must fall
    /// to `1 - alpha_threshold / 100` or below.
    pub alpha_threshold: f64,
    /// Rate-of-change threshold; the mean change ratio must fall to
    /// `km_ratio / 100` or below.
    pub km_ratio: f64,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            km_ratio: DEFAULT_KM_RATIO,
        }
    }
}

/// Settings of the L-BFGS optimizer used for the ARMA coefficient fit.
#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    pub max_iters: u64,
    pub history: usize,
    pub tol_grad: f64,
    pub tol_cost: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iters: DEFAULT_MAX_ITERS,
            history: DEFAULT_HISTORY,
            tol_grad: DEFAULT_TOL_GRAD,
            tol_cost: DEFAULT_TOL_COST,
        }
    }
}
