//! # Area Forecast
//!
//! A Rust library for short-horizon statistical forecasting of a daily
//! controlled-territory area series.
//!
//! ## Pipeline
//!
//! Data flows strictly forward, and every stage is a pure function of its
//! inputs:
//!
//! 1. **Aggregation** (`data`) — reads the raw area-history CSV, buckets
//!    records per day and category, and interpolates gaps into a strictly
//!    daily [`DailySeries`].
//! 2. **Feature builder** (`features`) — deterministic trend columns plus
//!    two momentum segment trends spanning the observed range and the
//!    forecast horizon.
//! 3. **Model selector** (`models`) — searches ARMA(p, q) orders simplest
//!    first and keeps a challenger only when its AIC beats the incumbent by
//!    a proportional margin.
//! 4. **Forecaster** (`forecast`) — point forecasts with confidence bounds
//!    over consecutive future days.
//! 5. **Trimmer** (`trim`) — truncates the forecast once uncertainty growth
//!    and rate of change have both settled.
//!
//! ## Quick Start
//!
//! ```no_run
//! use area_forecast::config::{FitConfig, ForecastConfig, TrimConfig};
//! use area_forecast::data::load_area_history;
//! use area_forecast::features::build_features;
//! use area_forecast::models::select_model;
//! use area_forecast::trim::trim_forecast;
//!
//! # fn main() -> area_forecast::Result<()> {
//! let config = ForecastConfig::default();
//! let series = load_area_history("data/area_history.csv")?.controlled_series()?;
//! let features = build_features(&series, config.horizon_days, &config)?;
//!
//! let model = select_model(&series, &features, &config, &FitConfig::default())?;
//! println!("{}", model.summary());
//!
//! let frame = model.forecast(&series, &features, config.horizon_days, &config)?;
//! let trimmed = trim_forecast(&frame, &TrimConfig::default());
//! trimmed.write_csv("dist/forecast.csv")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod trim;

// Re-export commonly used types
pub use crate::config::{FitConfig, ForecastConfig, TrendBasis, TrimConfig};
pub use crate::data::{load_area_history, AreaHistory, DailySeries};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{build_features, FeatureMatrix};
pub use crate::forecast::ForecastFrame;
pub use crate::models::{select_model, ArmaSpec, FittedModel, ModelSummary};
pub use crate::trim::trim_forecast;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
