//! Error types for the area_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the area_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A segment-trend anchor or requested date fell outside the feature index
    #[error("Date out of range: {0}")]
    OutOfRange(String),

    /// Every candidate order failed to produce a converging fit
    #[error("No converging model: {0}")]
    NoConvergingModel(String),

    /// The feature matrix does not extend far enough for the requested horizon
    #[error("Insufficient feature range: {0}")]
    InsufficientFeatureRange(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    Data(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A single candidate fit failed; recovered inside the selector
    #[error("Fit error: {0}")]
    Fit(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}
