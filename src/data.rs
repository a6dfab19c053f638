//! History ingestion and daily series construction
//!
//! Reads the raw area-history CSV (columns `time_index`, `area`, `percent`,
//! `area_type`, `hash`), buckets the records per calendar day and category,
//! and produces the net controlled-area series the forecasting core runs on.
//! Gaps between observed days are interpolated linearly so the output series
//! is strictly daily with no holes.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use polars::prelude::*;

use crate::error::{ForecastError, Result};

const COLUMN_TIME: &str = "time_index";
const COLUMN_AREA: &str = "area";
const COLUMN_AREA_TYPE: &str = "area_type";
const COLUMN_HASH: &str = "hash";

const AREA_TYPE_OCCUPIED: &str = "occupied_after_24_02_2022";
const AREA_TYPE_OTHER: &str = "other_territories";
const OPPONENT_HASH: &str = "#01579b";

const TIME_FORMAT_OFFSET: &str = "%Y-%m-%d %H:%M:%S %z";
const TIME_FORMAT_NAIVE: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const UTC_SUFFIX: &str = " UTC";

/// Observed daily series: one value per calendar day, no gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DailySeries {
    /// Create a series, validating that the date index is strictly
    /// consecutive daily with no duplicates.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::Data(format!(
                "dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }
        if dates.is_empty() {
            return Err(ForecastError::Data("empty series".to_string()));
        }
        for pair in dates.windows(2) {
            if pair[1] - pair[0] != Duration::days(1) {
                return Err(ForecastError::Data(format!(
                    "date index must be consecutive daily, found {} followed by {}",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(Self { dates, values })
    }

    /// Convenience constructor: consecutive daily dates starting at `start`.
    pub fn from_start(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let dates = (0..values.len())
            .map(|offset| start + Duration::days(offset as i64))
            .collect();
        Self::new(dates, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn start_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn end_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }
}

/// Accumulator for averaging multiple records within one day.
#[derive(Debug, Default, Clone, Copy)]
struct DayBucket {
    sum: f64,
    count: u32,
}

impl DayBucket {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

type DailyBuckets = BTreeMap<NaiveDate, DayBucket>;

/// Raw history bucketed per day: the occupied-area records and the
/// opponent-held records that must be netted out.
#[derive(Debug, Default)]
pub struct AreaHistory {
    occupied: DailyBuckets,
    opponent: DailyBuckets,
}

/// Load the raw area-history CSV into per-day buckets.
pub fn load_area_history<P: AsRef<Path>>(path: P) -> Result<AreaHistory> {
    let file = File::open(path)?;
    let df = CsvReader::new(file)
        .infer_schema(None)
        .has_header(true)
        .finish()?;
    AreaHistory::from_dataframe(&df)
}

impl AreaHistory {
    /// Bucket an already-loaded DataFrame with the raw history schema.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let time = string_column(df, COLUMN_TIME)?;
        let area = float_column(df, COLUMN_AREA)?;
        let area_type = string_column(df, COLUMN_AREA_TYPE)?;
        let hash = string_column(df, COLUMN_HASH)?;

        let mut history = Self::default();
        for idx in 0..df.height() {
            // Rows with missing fields are dropped, matching the upstream
            // aggregation contract.
            let (Some(raw_time), Some(kind), Some(value)) =
                (&time[idx], &area_type[idx], area[idx])
            else {
                continue;
            };
            let date = parse_time_index(raw_time)?.date_naive();
            match kind.as_str() {
                AREA_TYPE_OCCUPIED => history.occupied.entry(date).or_default().add(value),
                AREA_TYPE_OTHER if hash[idx].as_deref() == Some(OPPONENT_HASH) => {
                    history.opponent.entry(date).or_default().add(value);
                }
                _ => {}
            }
        }
        Ok(history)
    }

    /// Net controlled-area series: per-day mean of occupied area minus the
    /// opponent-held area, interpolated over the full contiguous date range.
    pub fn controlled_series(&self) -> Result<DailySeries> {
        let first = self
            .occupied
            .keys()
            .chain(self.opponent.keys())
            .min()
            .copied()
            .ok_or_else(|| ForecastError::Data("no usable records in history".to_string()))?;
        let last = self
            .occupied
            .keys()
            .chain(self.opponent.keys())
            .max()
            .copied()
            .ok_or_else(|| ForecastError::Data("no usable records in history".to_string()))?;

        let span = (last - first).num_days() as usize;
        let dates: Vec<NaiveDate> = (0..=span)
            .map(|offset| first + Duration::days(offset as i64))
            .collect();

        let occupied = interpolate_daily(&dates, &self.occupied);
        let opponent = interpolate_daily(&dates, &self.opponent);
        let values = occupied
            .iter()
            .zip(opponent)
            .map(|(held, lost)| held - lost)
            .collect();

        DailySeries::new(dates, values)
    }
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::Utf8)?;
    Ok(column
        .utf8()?
        .into_iter()
        .map(|value| value.map(String::from))
        .collect())
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Parse a `time_index` value in any of the formats the source data has used
/// over time: RFC 3339, offset-suffixed, naive with a ` UTC` suffix, plain
/// naive datetime, or a bare date.
fn parse_time_index(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ForecastError::Data("empty time_index".to_string()));
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.with_timezone(&Utc));
    }
    if let Ok(datetime) = DateTime::parse_from_str(trimmed, TIME_FORMAT_OFFSET) {
        return Ok(datetime.with_timezone(&Utc));
    }
    if let Some(stripped) = trimmed.strip_suffix(UTC_SUFFIX) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped.trim_end(), TIME_FORMAT_NAIVE) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, TIME_FORMAT_NAIVE) {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    Err(ForecastError::Data(format!(
        "unrecognized time_index '{trimmed}'"
    )))
}

/// Fill a daily grid from sparse per-day buckets: linear interpolation
/// between known points, flat extension before the first and after the last.
fn interpolate_daily(dates: &[NaiveDate], buckets: &DailyBuckets) -> Vec<f64> {
    let known: Vec<(usize, f64)> = dates
        .iter()
        .enumerate()
        .filter_map(|(idx, date)| {
            buckets
                .get(date)
                .and_then(DayBucket::mean)
                .map(|value| (idx, value))
        })
        .collect();

    let mut values = vec![0.0; dates.len()];
    let Some(&(first_idx, first_value)) = known.first() else {
        return values;
    };
    let &(last_idx, last_value) = known.last().expect("known is non-empty");

    for slot in &mut values[..first_idx] {
        *slot = first_value;
    }
    for slot in &mut values[last_idx..] {
        *slot = last_value;
    }
    for pair in known.windows(2) {
        let (from, start_value) = pair[0];
        let (to, end_value) = pair[1];
        values[from] = start_value;
        let gap = (to - from) as f64;
        for step in 1..(to - from) {
            values[from + step] = start_value + (end_value - start_value) * step as f64 / gap;
        }
    }
    values[first_idx] = first_value;

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn parse_time_index_accepts_known_formats() {
        let expected = date(2023, 5, 1);
        for raw in [
            "2023-05-01 12:30:00 UTC",
            "2023-05-01 12:30:00",
            "2023-05-01T12:30:00Z",
            "2023-05-01 12:30:00 +0000",
            "2023-05-01",
        ] {
            assert_eq!(parse_time_index(raw).unwrap().date_naive(), expected);
        }
    }

    #[test]
    fn parse_time_index_rejects_garbage() {
        assert!(parse_time_index("").is_err());
        assert!(parse_time_index("not a date").is_err());
    }

    #[test]
    fn interpolation_fills_interior_gaps_linearly() {
        let dates: Vec<NaiveDate> = (0..5).map(|i| date(2023, 1, 1) + Duration::days(i)).collect();
        let mut buckets = DailyBuckets::new();
        buckets.entry(dates[0]).or_insert_with(DayBucket::default).add(10.0);
        buckets.entry(dates[4]).or_insert_with(DayBucket::default).add(50.0);

        let values = interpolate_daily(&dates, &buckets);
        assert_eq!(values, vec![10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn interpolation_extends_edges_flat() {
        let dates: Vec<NaiveDate> = (0..4).map(|i| date(2023, 1, 1) + Duration::days(i)).collect();
        let mut buckets = DailyBuckets::new();
        buckets.entry(dates[1]).or_insert_with(DayBucket::default).add(7.0);
        buckets.entry(dates[2]).or_insert_with(DayBucket::default).add(9.0);

        let values = interpolate_daily(&dates, &buckets);
        assert_eq!(values, vec![7.0, 7.0, 9.0, 9.0]);
    }

    #[test]
    fn day_bucket_averages_within_a_day() {
        let mut bucket = DayBucket::default();
        bucket.add(2.0);
        bucket.add(4.0);
        assert_eq!(bucket.mean(), Some(3.0));
        assert_eq!(DayBucket::default().mean(), None);
    }
}
