use area_forecast::config::{FitConfig, ForecastConfig, TrimConfig};
use area_forecast::data::DailySeries;
use area_forecast::features::build_features;
use area_forecast::metrics::{daily_change, recent_changes};
use area_forecast::models::select_model;
use area_forecast::trim::trim_forecast;
use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    println!("Area Forecast: Basic Pipeline Example");
    println!("=====================================\n");

    let config = ForecastConfig::default();
    let series = create_sample_series();
    println!(
        "Sample series: {} daily points, {} .. {}\n",
        series.len(),
        series.start_date(),
        series.end_date()
    );

    let features = build_features(&series, config.horizon_days, &config)?;
    println!(
        "Feature matrix: {} rows x {} columns ({})\n",
        features.len(),
        features.width(),
        features.names().join(", ")
    );

    let model = select_model(&series, &features, &config, &FitConfig::default())?;
    println!("Selected model:\n{}", model.summary());

    let frame = model.forecast(&series, &features, config.horizon_days, &config)?;
    let trimmed = trim_forecast(&frame, &TrimConfig::default());
    println!(
        "Forecast: {} days, trimmed to {} informative days\n",
        frame.len(),
        trimmed.len()
    );

    println!("First forecast rows (mean / se / lower / upper):");
    for idx in 0..trimmed.len().min(5) {
        println!(
            "  {}  {:>10.1} {:>8.1} {:>10.1} {:>10.1}",
            trimmed.dates()[idx],
            trimmed.mean()[idx],
            trimmed.mean_se()[idx],
            trimmed.lower()[idx],
            trimmed.upper()[idx]
        );
    }

    let changes = daily_change(&series)?;
    let (week, month) = recent_changes(&changes);
    println!("\nRecent change: {week:.2} over the last week, {month:.2} over the last month");

    trimmed.write_csv("dist/forecast.csv")?;
    println!("Saved trimmed forecast to dist/forecast.csv");

    Ok(())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("area_forecast=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Create a sample series with slow loss, a late regime shift and
/// deterministic noise.
fn create_sample_series() -> DailySeries {
    let start = NaiveDate::from_ymd_opt(2022, 11, 12).unwrap();
    let values = (0..500)
        .map(|step| {
            let base = 108_000.0 - 4.0 * step as f64;
            let shift = if step >= 460 {
                -800.0 - 12.0 * (step - 460) as f64
            } else {
                0.0
            };
            let noise = ((step * step * 31 + step * 17 + 7) % 97) as f64 - 48.0;
            base + shift + 0.7 * noise
        })
        .collect();
    DailySeries::from_start(start, values).expect("sample series is contiguous")
}
