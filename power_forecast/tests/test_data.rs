use chrono::NaiveDate;
use power_forecast::config::{DataConfig, SplitConfig};
use power_forecast::data::{into_weeks, train_test_split};
use power_forecast::{DataLoader, ForecastError, History, Observation, WeekWindow};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn daily_rows(values: &[f64]) -> Vec<Observation> {
    let start = NaiveDate::from_ymd_opt(2007, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    values
        .iter()
        .enumerate()
        .map(|(day, &v)| Observation::new(start + chrono::Duration::days(day as i64), vec![v]).unwrap())
        .collect()
}

fn week(start_day: u32, values: [f64; 7]) -> WeekWindow {
    WeekWindow::from_total_power(NaiveDate::from_ymd_opt(2007, 1, start_day).unwrap(), &values)
        .unwrap()
}

#[test]
fn test_data_loader_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "datetime,Global_active_power,Voltage").unwrap();
    writeln!(file, "2006-12-16 17:24:00,4.216,234.84").unwrap();
    writeln!(file, "2006-12-16 17:25:00,5.360,233.63").unwrap();
    writeln!(file, "2006-12-16 17:26:00,5.374,233.29").unwrap();

    let data = DataLoader::default().load(file.path()).unwrap();

    assert_eq!(data.len(), 3);
    assert_eq!(data.columns(), ["Global_active_power", "Voltage"]);
    assert_eq!(data.rows()[1].values(), [5.360, 233.63]);
    assert_eq!(data.rows()[2].total_power(), 5.374);
}

#[test]
fn test_missing_values_copy_earlier_rows() {
    let input = "datetime;power\n\
                 2007-01-01;1.0\n\
                 2007-01-02;2.0\n\
                 2007-01-03;?\n\
                 2007-01-04;\n";
    let loader = DataLoader::from_config(&DataConfig {
        delimiter: ';',
        resample_daily: false,
        fill_lag_rows: 2,
    })
    .unwrap();

    let data = loader.read(input.as_bytes()).unwrap();
    let power: Vec<f64> = data.rows().iter().map(Observation::total_power).collect();

    // Row 3 copies row 1, row 4 copies the filled row 2
    assert_eq!(power, vec![1.0, 2.0, 1.0, 2.0]);
}

#[test]
fn test_missing_value_without_lagged_row_is_zero() {
    let input = "datetime,power\n2007-01-01,?\n2007-01-02,3.5\n";
    let data = DataLoader::default().read(input.as_bytes()).unwrap();
    assert_eq!(data.rows()[0].total_power(), 0.0);
}

#[test]
fn test_loader_rejects_malformed_input() {
    let loader = DataLoader::default();

    let single_column = loader.read("datetime\n2007-01-01\n".as_bytes());
    assert!(matches!(single_column, Err(ForecastError::DataFormat(_))));

    let bad_number = loader.read("datetime,power\n2007-01-01,abc\n".as_bytes());
    assert!(matches!(bad_number, Err(ForecastError::DataFormat(_))));

    let bad_timestamp = loader.read("datetime,power\nyesterday,1.0\n".as_bytes());
    assert!(matches!(bad_timestamp, Err(ForecastError::DataFormat(_))));
}

#[test]
fn test_loader_reports_missing_file() {
    let result = DataLoader::default().load("/nonexistent/household_power.csv");
    assert!(matches!(result, Err(ForecastError::Io(_))));
}

#[test]
fn test_resample_daily_sums_each_date() {
    let input = "datetime,power,sub_metering\n\
                 2007-01-01 23:58:00,1.0,10.0\n\
                 2007-01-01 23:59:00,2.0,20.0\n\
                 2007-01-02 00:00:00,4.0,40.0\n";
    let data = DataLoader::default().read(input.as_bytes()).unwrap();

    let daily = data.resample_daily().unwrap();

    assert_eq!(daily.len(), 2);
    assert_eq!(daily.rows()[0].values(), [3.0, 30.0]);
    assert_eq!(daily.rows()[1].values(), [4.0, 40.0]);
    assert_eq!(
        daily.rows()[1].timestamp(),
        NaiveDate::from_ymd_opt(2007, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    );
}

#[test]
fn test_week_window_requires_seven_rows() {
    let rows = daily_rows(&[1.0, 2.0, 3.0]);
    assert!(matches!(
        WeekWindow::new(rows),
        Err(ForecastError::DataFormat(_))
    ));
}

#[test]
fn test_into_weeks() {
    let values: Vec<f64> = (0..14).map(f64::from).collect();
    let weeks = into_weeks(&daily_rows(&values)).unwrap();

    assert_eq!(weeks.len(), 2);
    assert_eq!(weeks[1].total_power(), vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0]);
    assert_eq!(weeks[1].last_total_power(), 13.0);

    let ragged = into_weeks(&daily_rows(&values[..10]));
    assert!(matches!(ragged, Err(ForecastError::DataFormat(_))));
}

#[test]
fn test_train_test_split_offsets() {
    // 1 skipped + 3 training weeks + 2 test weeks + 3 trailing rows
    let values: Vec<f64> = (0..1 + 21 + 14 + 3).map(f64::from).collect();
    let rows = daily_rows(&values);
    let split = SplitConfig {
        skip_leading: 1,
        test_rows: 17,
        drop_trailing: 3,
    };

    let (train, test) = train_test_split(&rows, &split).unwrap();

    assert_eq!(train.len(), 3);
    assert_eq!(test.len(), 2);
    assert_eq!(train[0].total_power()[0], 1.0);
    assert_eq!(test[0].total_power()[0], 22.0);
    assert_eq!(test[1].last_total_power(), 35.0);
}

#[test]
fn test_train_test_split_rejects_bad_sizes() {
    let rows = daily_rows(&(0..20).map(f64::from).collect::<Vec<_>>());

    let too_short = SplitConfig {
        skip_leading: 1,
        test_rows: 19,
        drop_trailing: 0,
    };
    assert!(matches!(
        train_test_split(&rows, &too_short),
        Err(ForecastError::DataFormat(_))
    ));

    let over_drop = SplitConfig {
        skip_leading: 0,
        test_rows: 7,
        drop_trailing: 8,
    };
    assert!(matches!(
        train_test_split(&rows, &over_drop),
        Err(ForecastError::InvalidParameter(_))
    ));

    let ragged = SplitConfig {
        skip_leading: 0,
        test_rows: 7,
        drop_trailing: 0,
    };
    assert!(matches!(
        train_test_split(&rows, &ragged),
        Err(ForecastError::DataFormat(_))
    ));
}

#[test]
fn test_history_lookback() {
    let mut history = History::new();
    assert!(history.last_week().is_none());

    history.push(week(1, [1.0; 7]));
    history.push(week(8, [2.0; 7]));
    history.push(week(15, [3.0; 7]));

    assert_eq!(history.len(), 3);
    assert_eq!(history.week_back(1).unwrap().total_power(), vec![3.0; 7]);
    assert_eq!(history.week_back(3).unwrap().total_power(), vec![1.0; 7]);
    assert!(history.week_back(0).is_none());
    assert!(history.week_back(4).is_none());
    assert_eq!(history.total_power_series().len(), 21);
}

#[test]
fn test_non_ascii_delimiter_is_rejected() {
    let config = DataConfig {
        delimiter: '§',
        ..DataConfig::default()
    };
    assert!(matches!(
        DataLoader::from_config(&config),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_deserialized_week_is_checked() {
    let empty_week = serde_json::from_str::<WeekWindow>(r#"{"rows":[]}"#);
    assert!(empty_week.is_err());

    let empty_row = serde_json::from_str::<Observation>(
        r#"{"timestamp":"2007-01-01T00:00:00","values":[]}"#,
    );
    assert!(empty_row.is_err());

    let original = week(1, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    let json = serde_json::to_string(&original).unwrap();
    let restored: WeekWindow = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, original);
    assert_eq!(restored.last_total_power(), 7.0);
}
