use area_forecast::config::{FitConfig, ForecastConfig, TrendBasis};
use area_forecast::data::DailySeries;
use area_forecast::features::{build_features, FeatureMatrix};
use area_forecast::forecast::ForecastFrame;
use area_forecast::models::{fit_model, ArmaSpec, FittedModel};
use area_forecast::ForecastError;
use assert_approx_eq::assert_approx_eq;
use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn noise(step: usize) -> f64 {
    ((step * step * 31 + step * 17 + 7) % 97) as f64 - 48.0
}

fn synthetic_series(len: usize) -> DailySeries {
    let values = (0..len)
        .map(|step| 90_000.0 - 4.0 * step as f64 + 0.5 * noise(step))
        .collect();
    DailySeries::from_start(date(2022, 6, 1), values).unwrap()
}

/// Fit an ARMA(1, 0) candidate over plain trend features covering `horizon`
/// extra days.
fn fitted_model(series: &DailySeries, horizon: usize) -> (FittedModel, FeatureMatrix) {
    let features = FeatureMatrix::with_trend(
        series.start_date(),
        series.end_date() + Duration::days(horizon as i64),
        TrendBasis::ConstantLinear,
    )
    .unwrap();
    let model = fit_model(series, &features, ArmaSpec::new(1, 0), &FitConfig::default()).unwrap();
    (model, features)
}

#[test]
fn forecast_length_and_dates_match_the_horizon() {
    let config = ForecastConfig::default();
    let series = synthetic_series(200);
    let (model, features) = fitted_model(&series, 30);

    let frame = model.forecast(&series, &features, 30, &config).unwrap();

    assert_eq!(frame.len(), 30);
    assert_eq!(frame.start_date(), series.end_date() + Duration::days(1));
    assert_eq!(frame.end_date(), series.end_date() + Duration::days(30));
    for pair in frame.dates().windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::days(1));
    }
}

#[test]
fn forecast_bounds_bracket_the_mean() {
    let config = ForecastConfig::default();
    let series = synthetic_series(200);
    let (model, features) = fitted_model(&series, 40);

    let frame = model.forecast(&series, &features, 40, &config).unwrap();

    for idx in 0..frame.len() {
        assert!(frame.mean_se()[idx] > 0.0, "se must be positive at {idx}");
        assert!(frame.lower()[idx] < frame.mean()[idx]);
        assert!(frame.mean()[idx] < frame.upper()[idx]);
    }
    // Uncertainty compounds with the horizon as a general tendency.
    assert!(frame.mean_se()[frame.len() - 1] >= frame.mean_se()[0]);
}

#[test]
fn short_feature_matrix_is_a_contract_violation() {
    let config = ForecastConfig::default();
    let series = synthetic_series(200);
    let (model, features) = fitted_model(&series, 10);

    let result = model.forecast(&series, &features, 30, &config);
    assert!(matches!(
        result,
        Err(ForecastError::InsufficientFeatureRange(_))
    ));
}

#[test]
fn zero_horizon_is_rejected() {
    let config = ForecastConfig::default();
    let series = synthetic_series(200);
    let (model, features) = fitted_model(&series, 10);

    let result = model.forecast(&series, &features, 0, &config);
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn wider_alpha_gives_wider_bounds() {
    let series = synthetic_series(200);
    let (model, features) = fitted_model(&series, 20);

    let narrow = model
        .forecast(
            &series,
            &features,
            20,
            &ForecastConfig {
                confidence_alpha: 0.10,
                ..ForecastConfig::default()
            },
        )
        .unwrap();
    let wide = model
        .forecast(
            &series,
            &features,
            20,
            &ForecastConfig {
                confidence_alpha: 0.01,
                ..ForecastConfig::default()
            },
        )
        .unwrap();

    for idx in 0..narrow.len() {
        assert!(wide.upper()[idx] - wide.lower()[idx] > narrow.upper()[idx] - narrow.lower()[idx]);
    }
}

#[test]
fn momentum_features_flow_into_the_forecast_mean() {
    let config = ForecastConfig::default();
    let series = synthetic_series(400);
    let features = build_features(&series, 60, &config).unwrap();
    let model = fit_model(&series, &features, ArmaSpec::new(0, 0), &FitConfig::default()).unwrap();

    let frame = model.forecast(&series, &features, 60, &config).unwrap();

    // The series drifts downward by ~4/day; the forecast must continue in
    // that direction rather than flatten out.
    assert!(frame.mean()[frame.len() - 1] < frame.mean()[0]);
}

#[test]
fn frame_round_trips_through_csv() {
    let config = ForecastConfig::default();
    let series = synthetic_series(200);
    let (model, features) = fitted_model(&series, 15);
    let frame = model.forecast(&series, &features, 15, &config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forecast.csv");
    frame.write_csv(&path).unwrap();
    let restored = ForecastFrame::read_csv(&path).unwrap();

    assert_eq!(restored.len(), frame.len());
    assert_eq!(restored.dates(), frame.dates());
    for idx in 0..frame.len() {
        // Values are written with six decimal places.
        assert_approx_eq!(restored.mean()[idx], frame.mean()[idx], 1e-5);
        assert_approx_eq!(restored.mean_se()[idx], frame.mean_se()[idx], 1e-5);
        assert_approx_eq!(restored.lower()[idx], frame.lower()[idx], 1e-5);
        assert_approx_eq!(restored.upper()[idx], frame.upper()[idx], 1e-5);
    }
}

#[test]
fn reading_an_empty_forecast_csv_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, "date,mean,mean_se,lower,upper\n").unwrap();

    let result = ForecastFrame::read_csv(&path);
    assert!(matches!(result, Err(ForecastError::Data(_))));
}

#[test]
fn frame_serializes_to_json_rows() {
    let frame = ForecastFrame::new(
        date(2023, 3, 1),
        vec![10.0, 11.0],
        vec![1.0, 1.1],
        vec![7.0, 8.0],
        vec![13.0, 14.0],
    )
    .unwrap();

    let json = frame.to_json().unwrap();
    assert!(json.contains("\"2023-03-01\""));
    assert!(json.contains("\"mean_se\""));
}

#[test]
fn frame_constructor_validates_column_lengths() {
    let result = ForecastFrame::new(
        date(2023, 3, 1),
        vec![10.0, 11.0],
        vec![1.0],
        vec![7.0, 8.0],
        vec![13.0, 14.0],
    );
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));

    let empty = ForecastFrame::new(date(2023, 3, 1), vec![], vec![], vec![], vec![]);
    assert!(matches!(empty, Err(ForecastError::InvalidParameter(_))));
}
