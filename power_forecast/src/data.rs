//! Power consumption data handling
//!
//! Raw rows are [`Observation`]s; evaluation works on [`WeekWindow`]s of seven
//! consecutive rows and on the append-only [`History`] built from them.

use crate::config::{DataConfig, SplitConfig};
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Rows in a week window, and values in a weekly forecast
pub const DAYS_PER_WEEK: usize = 7;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of readings; the first field is total power
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObservation")]
pub struct Observation {
    /// Start of the period the readings cover
    timestamp: NaiveDateTime,
    /// Measured fields in file order
    values: Vec<f64>,
}

impl Observation {
    /// Create an observation; at least one field is required
    pub fn new(timestamp: NaiveDateTime, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::DataFormat(format!(
                "Observation at {} has no measured fields",
                timestamp
            )));
        }

        Ok(Self { timestamp, values })
    }

    /// Timestamp of the row
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// All measured fields
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Total power, the first measured field
    pub fn total_power(&self) -> f64 {
        self.values[0]
    }
}

/// Seven consecutive observation rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeekWindow")]
pub struct WeekWindow {
    rows: Vec<Observation>,
}

// Deserialized forms, checked by the constructors before use
#[derive(Deserialize)]
struct RawObservation {
    timestamp: NaiveDateTime,
    values: Vec<f64>,
}

impl TryFrom<RawObservation> for Observation {
    type Error = ForecastError;

    fn try_from(raw: RawObservation) -> Result<Self> {
        Observation::new(raw.timestamp, raw.values)
    }
}

#[derive(Deserialize)]
struct RawWeekWindow {
    rows: Vec<Observation>,
}

impl TryFrom<RawWeekWindow> for WeekWindow {
    type Error = ForecastError;

    fn try_from(raw: RawWeekWindow) -> Result<Self> {
        WeekWindow::new(raw.rows)
    }
}

impl WeekWindow {
    /// Create a week from exactly seven rows
    pub fn new(rows: Vec<Observation>) -> Result<Self> {
        if rows.len() != DAYS_PER_WEEK {
            return Err(ForecastError::DataFormat(format!(
                "A week window needs {} rows, got {}",
                DAYS_PER_WEEK,
                rows.len()
            )));
        }

        Ok(Self { rows })
    }

    /// Build a week of daily rows holding only total power, starting at `start`
    pub fn from_total_power(start: NaiveDate, values: &[f64]) -> Result<Self> {
        let first_day = midnight(start)?;
        let rows = values
            .iter()
            .enumerate()
            .map(|(day, &value)| {
                Observation::new(first_day + Duration::days(day as i64), vec![value])
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(rows)
    }

    /// The rows of the week
    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    /// Timestamp of the first row
    pub fn start(&self) -> NaiveDateTime {
        self.rows[0].timestamp()
    }

    /// Total power of each day
    pub fn total_power(&self) -> Vec<f64> {
        self.rows.iter().map(Observation::total_power).collect()
    }

    /// Total power of the last day
    pub fn last_total_power(&self) -> f64 {
        self.rows[DAYS_PER_WEEK - 1].total_power()
    }
}

/// Ordered, append-only sequence of weeks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    weeks: Vec<WeekWindow>,
}

impl History {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history from weeks in chronological order
    pub fn from_weeks(weeks: Vec<WeekWindow>) -> Self {
        Self { weeks }
    }

    /// Append the next week
    pub fn push(&mut self, week: WeekWindow) {
        self.weeks.push(week);
    }

    /// Number of weeks
    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    /// Check if there are no weeks
    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    /// All weeks in order
    pub fn weeks(&self) -> &[WeekWindow] {
        &self.weeks
    }

    /// The most recent week
    pub fn last_week(&self) -> Option<&WeekWindow> {
        self.weeks.last()
    }

    /// The week `weeks_back` weeks before the end; `1` is the last week
    pub fn week_back(&self, weeks_back: usize) -> Option<&WeekWindow> {
        if weeks_back == 0 || weeks_back > self.weeks.len() {
            return None;
        }
        self.weeks.get(self.weeks.len() - weeks_back)
    }

    /// Total power of every day, flattened chronologically
    pub fn total_power_series(&self) -> Vec<f64> {
        total_power_series(&self.weeks)
    }
}

/// Flatten weeks into one chronological total power series
pub fn total_power_series(weeks: &[WeekWindow]) -> Vec<f64> {
    weeks
        .iter()
        .flat_map(|week| week.rows().iter().map(Observation::total_power))
        .collect()
}

/// Observations loaded from a file, with their field names
#[derive(Debug, Clone, PartialEq)]
pub struct PowerDataset {
    /// Names of the measured fields
    columns: Vec<String>,
    /// Rows in file order
    rows: Vec<Observation>,
}

impl PowerDataset {
    /// Create a dataset; every row must carry one value per column
    pub fn new(columns: Vec<String>, rows: Vec<Observation>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ForecastError::DataFormat(
                "Dataset needs at least one measured column".to_string(),
            ));
        }
        if let Some(row) = rows.iter().find(|r| r.values().len() != columns.len()) {
            return Err(ForecastError::DataFormat(format!(
                "Row at {} has {} fields, expected {}",
                row.timestamp(),
                row.values().len(),
                columns.len()
            )));
        }

        Ok(Self { columns, rows })
    }

    /// Names of the measured fields
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows
    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum rows per calendar date, one row per day stamped at midnight
    pub fn resample_daily(&self) -> Result<Self> {
        let mut days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for row in &self.rows {
            let totals = days
                .entry(row.timestamp().date())
                .or_insert_with(|| vec![0.0; self.columns.len()]);
            for (total, value) in totals.iter_mut().zip(row.values()) {
                *total += value;
            }
        }

        let rows = days
            .into_iter()
            .map(|(date, totals)| Observation::new(midnight(date)?, totals))
            .collect::<Result<Vec<_>>>()?;

        info!(
            from_rows = self.rows.len(),
            days = rows.len(),
            "Resampled dataset to daily totals"
        );

        Self::new(self.columns.clone(), rows)
    }
}

/// Loader for delimited power consumption files
///
/// The first column holds the timestamp; every other column is numeric.
/// Values written as `?` or left empty are filled with the same field
/// `fill_lag_rows` rows earlier, or zero at the start of the file.
#[derive(Debug, Clone)]
pub struct DataLoader {
    delimiter: u8,
    fill_lag_rows: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self {
            delimiter: b',',
            fill_lag_rows: DataConfig::default().fill_lag_rows,
        }
    }
}

impl DataLoader {
    /// Create a loader from the data section of the configuration
    ///
    /// The delimiter must be a single ASCII character.
    pub fn from_config(config: &DataConfig) -> Result<Self> {
        let delimiter = u8::try_from(config.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                ForecastError::InvalidParameter(format!(
                    "Delimiter must be an ASCII character, got {:?}",
                    config.delimiter
                ))
            })?;

        Ok(Self {
            delimiter,
            fill_lag_rows: config.fill_lag_rows.max(1),
        })
    }

    /// Load a dataset from a file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<PowerDataset> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let dataset = self.read(file)?;

        info!(
            path = %path.display(),
            rows = dataset.len(),
            columns = dataset.columns().len(),
            "Loaded power dataset"
        );

        Ok(dataset)
    }

    /// Load a dataset from any reader
    pub fn read<R: Read>(&self, reader: R) -> Result<PowerDataset> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(ForecastError::DataFormat(
                "Expected a timestamp column followed by at least one measured column"
                    .to_string(),
            ));
        }
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut rows: Vec<Observation> = Vec::new();
        let mut filled = 0usize;

        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let line = index + 2;

            if record.len() != headers.len() {
                return Err(ForecastError::DataFormat(format!(
                    "Line {} has {} fields, expected {}",
                    line,
                    record.len(),
                    headers.len()
                )));
            }

            let timestamp = parse_timestamp(&record[0]).ok_or_else(|| {
                ForecastError::DataFormat(format!(
                    "Line {}: unrecognized timestamp '{}'",
                    line, &record[0]
                ))
            })?;

            let mut values = Vec::with_capacity(columns.len());
            for (column, field) in record.iter().skip(1).enumerate() {
                let value = if field.is_empty() || field == "?" {
                    filled += 1;
                    self.fill_value(&rows, column)
                } else {
                    field.parse::<f64>().map_err(|_| {
                        ForecastError::DataFormat(format!(
                            "Line {}: '{}' in column '{}' is not a number",
                            line, field, columns[column]
                        ))
                    })?
                };
                values.push(value);
            }

            rows.push(Observation::new(timestamp, values)?);
        }

        if filled > 0 {
            warn!(
                filled,
                lag_rows = self.fill_lag_rows,
                "Filled missing values from earlier rows"
            );
        }

        PowerDataset::new(columns, rows)
    }

    fn fill_value(&self, rows: &[Observation], column: usize) -> f64 {
        rows.len()
            .checked_sub(self.fill_lag_rows)
            .and_then(|i| rows.get(i))
            .map(|row| row.values()[column])
            .unwrap_or(0.0)
    }
}

fn parse_timestamp(field: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(field, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(field, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn midnight(date: NaiveDate) -> Result<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| ForecastError::DataFormat(format!("Invalid date {}", date)))
}

/// Cut rows into consecutive weeks; the row count must be a multiple of seven
pub fn into_weeks(rows: &[Observation]) -> Result<Vec<WeekWindow>> {
    if rows.len() % DAYS_PER_WEEK != 0 {
        return Err(ForecastError::DataFormat(format!(
            "{} rows do not divide into weeks of {}",
            rows.len(),
            DAYS_PER_WEEK
        )));
    }

    rows.chunks_exact(DAYS_PER_WEEK)
        .map(|chunk| WeekWindow::new(chunk.to_vec()))
        .collect()
}

/// Split rows into training and test weeks at fixed offsets
///
/// Train is `rows[skip_leading .. n - test_rows]` and test is
/// `rows[n - test_rows .. n - drop_trailing]`.
pub fn train_test_split(
    rows: &[Observation],
    config: &SplitConfig,
) -> Result<(Vec<WeekWindow>, Vec<WeekWindow>)> {
    let n = rows.len();
    if config.drop_trailing > config.test_rows {
        return Err(ForecastError::InvalidParameter(format!(
            "drop_trailing ({}) exceeds test_rows ({})",
            config.drop_trailing, config.test_rows
        )));
    }
    if n <= config.skip_leading + config.test_rows {
        return Err(ForecastError::DataFormat(format!(
            "{} rows leave no training data after skipping {} and reserving {} for test",
            n, config.skip_leading, config.test_rows
        )));
    }

    let test_start = n - config.test_rows;
    let test_end = n - config.drop_trailing;

    let train = into_weeks(&rows[config.skip_leading..test_start])?;
    let test = into_weeks(&rows[test_start..test_end])?;

    info!(
        train_weeks = train.len(),
        test_weeks = test.len(),
        "Split dataset into weeks"
    );

    Ok((train, test))
}
