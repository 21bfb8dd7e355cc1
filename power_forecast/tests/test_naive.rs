use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use power_forecast::models::naive::{NaiveModel, Persistence};
use power_forecast::{evaluate_model, ForecastError, ForecastModel, History, TrainedForecastModel, WeekWindow};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn weeks(values: &[[f64; 7]]) -> Vec<WeekWindow> {
    let start = NaiveDate::from_ymd_opt(2006, 12, 17).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(i, week)| WeekWindow::from_total_power(start + Duration::weeks(i as i64), week).unwrap())
        .collect()
}

fn numbered_weeks(count: usize) -> Vec<WeekWindow> {
    let values: Vec<[f64; 7]> = (0..count)
        .map(|w| {
            let mut week = [0.0; 7];
            for (d, v) in week.iter_mut().enumerate() {
                *v = (w * 7 + d) as f64;
            }
            week
        })
        .collect();
    weeks(&values)
}

#[rstest]
#[case::daily(NaiveModel::daily(), [16.0; 7])]
#[case::weekly(NaiveModel::weekly(), [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0])]
fn test_persistence_forecast(#[case] model: NaiveModel, #[case] expected: [f64; 7]) {
    let train = weeks(&[[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]]);
    let trained = model.train(&train).unwrap();

    let forecast = trained.forecast(&History::from_weeks(train)).unwrap();

    assert_eq!(forecast.values(), expected);
}

#[test]
fn test_daily_persistence_scores() {
    let train = weeks(&[[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]]);
    let test = weeks(&[[20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0]]);

    let report = evaluate_model(&NaiveModel::daily(), &train, &test).unwrap();

    assert_eq!(report.name, "daily");
    assert_eq!(report.forecasts.len(), 1);
    assert_relative_eq!(report.score.per_day[0], 4.0);
    assert_relative_eq!(report.score.overall, 4.0);
}

#[test]
fn test_weekly_walks_forward_one_week_behind() {
    let all = numbered_weeks(4);
    let (train, test) = all.split_at(2);

    let report = evaluate_model(&NaiveModel::weekly(), train, test).unwrap();

    // Each forecast repeats the week revealed just before it
    assert_eq!(report.forecasts[0].values(), all[1].total_power().as_slice());
    assert_eq!(report.forecasts[1].values(), all[2].total_power().as_slice());
    // Consecutive numbered weeks differ by exactly 7 every day
    assert_relative_eq!(report.score.overall, 7.0);
}

#[test]
fn test_year_ago_repeats_lagged_week() {
    let history = History::from_weeks(numbered_weeks(52));
    let model = NaiveModel::year_ago(52).unwrap();
    assert_eq!(model.name(), "year-ago");

    let forecast = model.train(&[]).unwrap().forecast(&history).unwrap();

    assert_eq!(forecast.values(), [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn test_year_ago_needs_a_year_of_history() {
    let history = History::from_weeks(numbered_weeks(51));
    let persistence = Persistence::YearAgo { lag_weeks: 52 };

    assert!(matches!(
        persistence.forecast(&history),
        Err(ForecastError::InsufficientHistory(_))
    ));
}

#[rstest]
#[case(Persistence::Daily)]
#[case(Persistence::Weekly)]
#[case(Persistence::YearAgo { lag_weeks: 1 })]
fn test_empty_history_is_rejected(#[case] persistence: Persistence) {
    assert!(matches!(
        persistence.forecast(&History::new()),
        Err(ForecastError::InsufficientHistory(_))
    ));
}

#[test]
fn test_year_ago_rejects_zero_lag() {
    assert!(matches!(
        NaiveModel::year_ago(0),
        Err(ForecastError::InvalidParameter(_))
    ));
}
