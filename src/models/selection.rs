//! Order selection over a bounded ARMA grid
//!
//! Candidates are evaluated simplest first (increasing p + q) and folded
//! through a dampened acceptance rule: a challenger replaces the running best
//! only when its AIC undercuts `best.aic * bound_factor`. Together the two
//! policies keep low-order models unless a higher order is meaningfully
//! better, trading a little statistical optimality for forecast stability.

use crate::config::{FitConfig, ForecastConfig};
use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use crate::features::FeatureMatrix;
use crate::models::arma::{fit_candidate, observed_matrix};
use crate::models::{ArmaSpec, FittedModel};

/// All candidate orders with p, q in `[0, max_order)`, in evaluation order:
/// increasing p + q, grid order within equal sums.
pub fn candidate_orders(max_order: usize) -> Vec<ArmaSpec> {
    let mut orders: Vec<ArmaSpec> = (0..max_order)
        .flat_map(|p| (0..max_order).map(move |q| ArmaSpec::new(p, q)))
        .collect();
    orders.sort_by_key(ArmaSpec::complexity);
    orders
}

/// Dampened acceptance rule. Note this is not "replace on any improvement":
/// the challenger must undercut the incumbent by the proportional margin.
pub(crate) fn replaces_incumbent(
    incumbent_aic: f64,
    challenger_aic: f64,
    bound_factor: f64,
) -> bool {
    incumbent_aic * bound_factor > challenger_aic
}

/// Fit every candidate order and return the accepted best.
///
/// Individual fit failures are logged at debug level and skipped; the search
/// only fails when the entire grid fails. For fixed inputs the outcome is
/// fully reproducible.
pub fn select_model(
    series: &DailySeries,
    features: &FeatureMatrix,
    config: &ForecastConfig,
    fit_config: &FitConfig,
) -> Result<FittedModel> {
    config.validate()?;
    let exog = observed_matrix(series, features)?;

    let mut failures = 0usize;
    let best = candidate_orders(config.max_order)
        .into_iter()
        .filter_map(|spec| {
            match fit_candidate(series.values(), &exog, features.names(), spec, fit_config) {
                Ok(candidate) => {
                    tracing::debug!(%spec, aic = candidate.aic(), "candidate fitted");
                    Some(candidate)
                }
                Err(err) => {
                    failures += 1;
                    tracing::debug!(%spec, error = %err, "candidate fit failed, skipping");
                    None
                }
            }
        })
        .fold(None, |incumbent: Option<FittedModel>, challenger| {
            match incumbent {
                None => Some(challenger),
                Some(incumbent)
                    if replaces_incumbent(
                        incumbent.aic(),
                        challenger.aic(),
                        config.bound_factor,
                    ) =>
                {
                    Some(challenger)
                }
                keep => keep,
            }
        });

    let best = best.ok_or_else(|| {
        ForecastError::NoConvergingModel(format!(
            "all {failures} candidate orders failed to fit"
        ))
    })?;
    tracing::info!(spec = %best.spec(), aic = best.aic(), "selected model");
    Ok(best)
}

/// AIC of every candidate that fits, in evaluation order. Diagnostic
/// companion to `select_model`; candidates that fail to fit are omitted.
pub fn score_candidates(
    series: &DailySeries,
    features: &FeatureMatrix,
    config: &ForecastConfig,
    fit_config: &FitConfig,
) -> Result<Vec<(ArmaSpec, f64)>> {
    config.validate()?;
    let exog = observed_matrix(series, features)?;
    Ok(candidate_orders(config.max_order)
        .into_iter()
        .filter_map(|spec| {
            fit_candidate(series.values(), &exog, features.names(), spec, fit_config)
                .ok()
                .map(|candidate| (spec, candidate.aic()))
        })
        .collect())
}
