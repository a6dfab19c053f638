//! Model family for the forecasting core
//!
//! The series is modeled in levels as a linear regression on the exogenous
//! feature columns with ARMA(p, q) errors; the integration order is fixed at
//! zero because the trend and momentum regressors already absorb the
//! nonstationarity. `selection` searches the bounded (p, q) grid, `arma`
//! fits one candidate.

mod arma;
mod selection;

pub use self::arma::{fit_model, FittedModel};
pub use self::selection::{candidate_orders, score_candidates, select_model};

use std::fmt;

use serde::Serialize;

use crate::error::{ForecastError, Result};

/// Autoregressive and moving-average orders of a candidate model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArmaSpec {
    pub p: usize,
    pub q: usize,
}

impl ArmaSpec {
    pub fn new(p: usize, q: usize) -> Self {
        Self { p, q }
    }

    /// Combined order p + q, the simplicity key of the selector.
    pub fn complexity(&self) -> usize {
        self.p + self.q
    }
}

impl fmt::Display for ArmaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARMA({}, {})", self.p, self.q)
    }
}

/// Named coefficient of a fitted model.
#[derive(Debug, Clone, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub value: f64,
}

/// Descriptive report of a fitted model, consumed by external
/// reporting/logging collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub order: ArmaSpec,
    pub coefficients: Vec<Coefficient>,
    pub sigma2: f64,
    pub aic: f64,
    pub n_obs: usize,
}

impl ModelSummary {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| ForecastError::Data(err.to_string()))
    }
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}  n_obs={}  sigma2={:.6}  AIC={:.3}",
            self.order, self.n_obs, self.sigma2, self.aic
        )?;
        for coefficient in &self.coefficients {
            writeln!(f, "  {:>16}  {:>14.6}", coefficient.name, coefficient.value)?;
        }
        Ok(())
    }
}
