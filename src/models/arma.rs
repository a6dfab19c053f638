//! Single-candidate fit: exogenous regression with ARMA(p, q) errors
//!
//! The fit is two-stage: ordinary least squares of the series on the feature
//! columns, then a conditional sum-of-squares ARMA fit on the regression
//! residuals, minimized with L-BFGS from a zero start so repeated runs on
//! identical inputs reproduce the same coefficients bit for bit.

use std::f64::consts::PI;

use argmin::core::{CostFunction, Error as ArgminError, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::{DMatrix, DVector};

use crate::config::FitConfig;
use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use crate::features::FeatureMatrix;
use crate::models::{ArmaSpec, Coefficient, ModelSummary};

const LARGE_COST: f64 = 1e30;
const SVD_EPSILON: f64 = 1e-12;
const MIN_SIGMA2: f64 = 1e-12;
const LINESEARCH_C1: f64 = 1e-4;
const LINESEARCH_C2: f64 = 0.9;
const GRADIENT_STEP: f64 = 1e-4;

/// Fitted regression-with-ARMA-errors model for one (p, q) candidate.
///
/// Created once per forecast run by the selector, consumed by the
/// forecaster, then discarded.
#[derive(Debug, Clone)]
pub struct FittedModel {
    spec: ArmaSpec,
    exog_names: Vec<String>,
    beta: DVector<f64>,
    cov_beta: DMatrix<f64>,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    n_obs: usize,
    residuals: Vec<f64>,
    innovations: Vec<f64>,
}

impl FittedModel {
    pub fn spec(&self) -> ArmaSpec {
        self.spec
    }

    pub fn order(&self) -> (usize, usize) {
        (self.spec.p, self.spec.q)
    }

    /// Exogenous regression coefficients, ordered like the feature columns.
    pub fn beta(&self) -> &[f64] {
        self.beta.as_slice()
    }

    pub fn ar(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma(&self) -> &[f64] {
        &self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Regression residuals over the observed range.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// One-step innovations of the ARMA recursion over the residuals.
    pub fn innovations(&self) -> &[f64] {
        &self.innovations
    }

    pub(crate) fn beta_vector(&self) -> &DVector<f64> {
        &self.beta
    }

    pub(crate) fn cov_beta(&self) -> &DMatrix<f64> {
        &self.cov_beta
    }

    /// Descriptive summary for reporting: order, named coefficients, AIC.
    pub fn summary(&self) -> ModelSummary {
        let mut coefficients: Vec<Coefficient> = self
            .exog_names
            .iter()
            .zip(self.beta.iter())
            .map(|(name, value)| Coefficient {
                name: name.clone(),
                value: *value,
            })
            .collect();
        for (lag, value) in self.ar.iter().enumerate() {
            coefficients.push(Coefficient {
                name: format!("ar.L{}", lag + 1),
                value: *value,
            });
        }
        for (lag, value) in self.ma.iter().enumerate() {
            coefficients.push(Coefficient {
                name: format!("ma.L{}", lag + 1),
                value: *value,
            });
        }
        ModelSummary {
            order: self.spec,
            coefficients,
            sigma2: self.sigma2,
            aic: self.aic,
            n_obs: self.n_obs,
        }
    }
}

/// Fit one candidate order against a series and its feature matrix.
pub fn fit_model(
    series: &DailySeries,
    features: &FeatureMatrix,
    spec: ArmaSpec,
    config: &FitConfig,
) -> Result<FittedModel> {
    let exog = observed_matrix(series, features)?;
    fit_candidate(series.values(), &exog, features.names(), spec, config)
}

/// Feature rows restricted to the observed date range, as a dense matrix.
pub(crate) fn observed_matrix(
    series: &DailySeries,
    features: &FeatureMatrix,
) -> Result<DMatrix<f64>> {
    let from = features.index_of(series.start_date()).ok_or_else(|| {
        ForecastError::Data("feature matrix does not cover the series start".to_string())
    })?;
    let to = features.index_of(series.end_date()).ok_or_else(|| {
        ForecastError::Data("feature matrix does not cover the series end".to_string())
    })?;
    let flat = features.flat_rows(from, to + 1);
    Ok(DMatrix::from_row_slice(
        series.len(),
        features.width(),
        &flat,
    ))
}

pub(crate) fn fit_candidate(
    y: &[f64],
    exog: &DMatrix<f64>,
    exog_names: &[String],
    spec: ArmaSpec,
    config: &FitConfig,
) -> Result<FittedModel> {
    let n = y.len();
    let k = exog.ncols();
    if exog.nrows() != n {
        return Err(ForecastError::Fit(format!(
            "exog rows ({}) don't match series length ({n})",
            exog.nrows()
        )));
    }
    if n <= k + spec.complexity() + 1 {
        return Err(ForecastError::Fit(format!(
            "{spec} needs more than {} observations, got {n}",
            k + spec.complexity() + 1
        )));
    }
    if y.iter().any(|value| !value.is_finite()) {
        return Err(ForecastError::Fit(
            "series contains non-finite values".to_string(),
        ));
    }

    let target = DVector::from_column_slice(y);
    let (beta, xtx_inv) = least_squares(&target, exog)?;
    let fitted = exog * &beta;
    let residuals: Vec<f64> = y
        .iter()
        .zip(fitted.iter())
        .map(|(observed, predicted)| observed - predicted)
        .collect();

    let (ar, ma) = if spec.complexity() == 0 {
        (Vec::new(), Vec::new())
    } else {
        estimate_arma(&residuals, spec, config)?
    };

    let innovations = innovations(&residuals, &ar, &ma);
    let sse: f64 = innovations.iter().map(|value| value * value).sum();
    let sigma2 = (sse / n as f64).max(MIN_SIGMA2);
    let n_params = k + spec.complexity() + 1;
    let log_likelihood = -0.5 * n as f64 * ((2.0 * PI * sigma2).ln() + 1.0);
    let aic = 2.0 * n_params as f64 - 2.0 * log_likelihood;
    if !aic.is_finite() {
        return Err(ForecastError::Fit("non-finite AIC".to_string()));
    }
    let cov_beta = xtx_inv * sigma2;

    Ok(FittedModel {
        spec,
        exog_names: exog_names.to_vec(),
        beta,
        cov_beta,
        ar,
        ma,
        sigma2,
        log_likelihood,
        aic,
        n_obs: n,
        residuals,
        innovations,
    })
}

/// OLS via SVD, plus `(X'X)^-1` for the coefficient covariance.
fn least_squares(
    target: &DVector<f64>,
    exog: &DMatrix<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let svd = exog.clone().svd(true, true);
    let beta = svd
        .solve(target, SVD_EPSILON)
        .map_err(|err| ForecastError::Fit(err.to_string()))?;
    if beta.iter().any(|value| !value.is_finite()) {
        return Err(ForecastError::Fit(
            "non-finite regression coefficients".to_string(),
        ));
    }
    let xtx = exog.transpose() * exog;
    let cholesky = xtx
        .cholesky()
        .ok_or_else(|| ForecastError::Fit("singular regressor matrix".to_string()))?;
    Ok((beta, cholesky.inverse()))
}

fn estimate_arma(
    residuals: &[f64],
    spec: ArmaSpec,
    config: &FitConfig,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let problem = CssProblem {
        residuals: residuals.to_vec(),
        p: spec.p,
        q: spec.q,
    };
    let init = vec![0.0; spec.complexity()];
    let linesearch = MoreThuenteLineSearch::new()
        .with_c(LINESEARCH_C1, LINESEARCH_C2)
        .map_err(fit_error)?;
    let solver = LBFGS::new(linesearch, config.history)
        .with_tolerance_grad(config.tol_grad)
        .map_err(fit_error)?
        .with_tolerance_cost(config.tol_cost)
        .map_err(fit_error)?;

    let result = Executor::new(problem, solver)
        .configure(|state| state.param(init).max_iters(config.max_iters))
        .run()
        .map_err(fit_error)?;

    if result.state.get_best_cost() >= LARGE_COST {
        return Err(ForecastError::Fit(format!(
            "{spec} found no admissible coefficients"
        )));
    }
    let param = result
        .state
        .get_best_param()
        .ok_or_else(|| ForecastError::Fit("optimizer returned no parameters".to_string()))?
        .clone();
    if param.iter().any(|value| !value.is_finite()) {
        return Err(ForecastError::Fit(
            "non-finite ARMA coefficients".to_string(),
        ));
    }
    let (ar, ma) = param.split_at(spec.p);
    Ok((ar.to_vec(), ma.to_vec()))
}

fn fit_error(err: impl ToString) -> ForecastError {
    ForecastError::Fit(err.to_string())
}

/// One-step innovations of the ARMA recursion, pre-sample values zero.
pub(crate) fn innovations(residuals: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut output = vec![0.0; residuals.len()];
    for t in 0..residuals.len() {
        let mut predicted = 0.0;
        for (lag, phi) in ar.iter().enumerate() {
            if t > lag {
                predicted += phi * residuals[t - lag - 1];
            }
        }
        for (lag, theta) in ma.iter().enumerate() {
            if t > lag {
                predicted += theta * output[t - lag - 1];
            }
        }
        output[t] = residuals[t] - predicted;
    }
    output
}

/// Conditional sum-of-squares objective over (phi, theta).
#[derive(Clone)]
struct CssProblem {
    residuals: Vec<f64>,
    p: usize,
    q: usize,
}

impl CssProblem {
    fn css(&self, param: &[f64]) -> f64 {
        if param.len() != self.p + self.q {
            return LARGE_COST;
        }
        if param.iter().any(|value| !value.is_finite()) {
            return LARGE_COST;
        }
        let (ar, ma) = param.split_at(self.p);
        // Restrict the search to the sum-of-moduli stationarity and
        // invertibility region; outside it the psi-weight expansion the
        // forecaster relies on diverges.
        if ar.iter().map(|value| value.abs()).sum::<f64>() >= 1.0 {
            return LARGE_COST;
        }
        if ma.iter().map(|value| value.abs()).sum::<f64>() >= 1.0 {
            return LARGE_COST;
        }
        let sse: f64 = innovations(&self.residuals, ar, ma)
            .iter()
            .map(|value| value * value)
            .sum();
        if sse.is_finite() {
            sse
        } else {
            LARGE_COST
        }
    }
}

impl CostFunction for CssProblem {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, ArgminError> {
        Ok(self.css(param))
    }
}

impl Gradient for CssProblem {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> std::result::Result<Self::Gradient, ArgminError> {
        let mut gradient = vec![0.0; param.len()];
        for i in 0..param.len() {
            let step = GRADIENT_STEP * (1.0 + param[i].abs());
            let mut plus = param.clone();
            let mut minus = param.clone();
            plus[i] += step;
            minus[i] -= step;
            gradient[i] = (self.css(&plus) - self.css(&minus)) / (2.0 * step);
        }
        Ok(gradient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innovations_without_arma_terms_echo_residuals() {
        let residuals = vec![1.0, -2.0, 3.0];
        assert_eq!(innovations(&residuals, &[], &[]), residuals);
    }

    #[test]
    fn innovations_apply_ar_lag() {
        let residuals = vec![1.0, 1.0, 1.0];
        let output = innovations(&residuals, &[0.5], &[]);
        assert_eq!(output, vec![1.0, 0.5, 0.5]);
    }

    #[test]
    fn css_rejects_non_stationary_coefficients() {
        let problem = CssProblem {
            residuals: vec![1.0, -1.0, 1.0, -1.0],
            p: 1,
            q: 0,
        };
        assert!(problem.css(&[1.5]) >= LARGE_COST);
        assert!(problem.css(&[0.3]) < LARGE_COST);
    }
}
