use area_forecast::config::TrimConfig;
use area_forecast::forecast::ForecastFrame;
use area_forecast::trim::trim_forecast;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn frame(mean: Vec<f64>, mean_se: Vec<f64>) -> ForecastFrame {
    let lower = mean
        .iter()
        .zip(&mean_se)
        .map(|(m, s)| m - 2.0 * s)
        .collect();
    let upper = mean
        .iter()
        .zip(&mean_se)
        .map(|(m, s)| m + 2.0 * s)
        .collect();
    ForecastFrame::new(date(2023, 6, 1), mean, mean_se, lower, upper).unwrap()
}

/// A frame whose mean keeps falling fast and whose se keeps growing fast:
/// the joint condition never triggers.
fn restless_frame() -> ForecastFrame {
    let mean: Vec<f64> = (0..10).map(|i| 1000.0 - 50.0 * i as f64).collect();
    let se: Vec<f64> = (0..10).map(|i| 10.0 * 1.5_f64.powi(i)).collect();
    frame(mean, se)
}

/// A frame that settles from row 5 onward: both change ratios drop to zero.
fn settling_frame() -> ForecastFrame {
    let mut mean = vec![1000.0, 940.0, 890.0, 850.0, 820.0];
    let mut se = vec![10.0, 14.0, 17.0, 19.0, 20.0];
    for _ in 0..5 {
        mean.push(820.0);
        se.push(20.0);
    }
    frame(mean, se)
}

#[test]
fn trimming_keeps_the_prefix_through_the_trigger_date() {
    let trimmed = trim_forecast(&settling_frame(), &TrimConfig::default());
    // Row 5 is the first where both ratios are 0: kept inclusive.
    assert_eq!(trimmed.len(), 6);
    assert_eq!(trimmed.end_date(), date(2023, 6, 6));
}

#[test]
fn trimming_without_a_trigger_returns_the_frame_unmodified() {
    let input = restless_frame();
    let trimmed = trim_forecast(&input, &TrimConfig::default());
    assert_eq!(trimmed, input);
}

#[test]
fn trimming_never_mutates_the_input() {
    let input = settling_frame();
    let before = input.clone();
    let _ = trim_forecast(&input, &TrimConfig::default());
    assert_eq!(input, before);
}

#[test]
fn first_row_is_excluded_from_triggering_but_kept() {
    // Both conditions hold from the second row on; the first row alone can
    // never trigger, so the shortest possible trim keeps two rows.
    let flat = frame(vec![500.0; 6], vec![5.0; 6]);
    let trimmed = trim_forecast(&flat, &TrimConfig::default());
    assert_eq!(trimmed.len(), 2);

    let single = frame(vec![500.0], vec![5.0]);
    assert_eq!(trim_forecast(&single, &TrimConfig::default()).len(), 1);
}

#[rstest]
#[case::settling(settling_frame())]
#[case::restless(restless_frame())]
fn trimming_is_idempotent(#[case] input: ForecastFrame) {
    let config = TrimConfig::default();
    let once = trim_forecast(&input, &config);
    let twice = trim_forecast(&once, &config);
    assert_eq!(once, twice);
}

#[test]
fn more_permissive_thresholds_never_lengthen_the_prefix() {
    // Both change ratios decay roughly like 1/t^2, so different thresholds
    // trigger at different rows.
    let mean: Vec<f64> = (0..50)
        .scan(10_000.0, |level, i| {
            *level *= 1.0 + 0.5 / ((1.0 + i as f64) * (1.0 + i as f64));
            Some(*level)
        })
        .collect();
    let se: Vec<f64> = (0..50)
        .scan(50.0, |level, i| {
            *level *= 1.0 + 1.0 / ((1.0 + i as f64) * (1.0 + i as f64));
            Some(*level)
        })
        .collect();
    let input = frame(mean, se);

    let strict = TrimConfig {
        alpha_threshold: 99.95,
        km_ratio: 0.01,
    };
    // Lower alpha_threshold loosens the se bound; higher km_ratio loosens
    // the mean bound. A looser pair triggers no later than the strict pair.
    let loose_se = TrimConfig {
        alpha_threshold: 99.0,
        km_ratio: 0.01,
    };
    let loose_mean = TrimConfig {
        alpha_threshold: 99.95,
        km_ratio: 0.5,
    };
    let loose_both = TrimConfig {
        alpha_threshold: 98.0,
        km_ratio: 1.0,
    };

    let strict_len = trim_forecast(&input, &strict).len();
    assert!(trim_forecast(&input, &loose_se).len() <= strict_len);
    assert!(trim_forecast(&input, &loose_mean).len() < strict_len);
    assert!(trim_forecast(&input, &loose_both).len() < strict_len);
}
