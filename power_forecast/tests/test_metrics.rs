use approx::assert_relative_eq;
use power_forecast::{evaluate_forecasts, summarize_scores, ForecastError, Score};
use pretty_assertions::assert_eq;

#[test]
fn test_perfect_forecast_scores_zero() {
    let actual = vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]; 3];

    let score = evaluate_forecasts(&actual, &actual).unwrap();

    assert_eq!(score.overall, 0.0);
    assert_eq!(score.per_day, vec![0.0; 7]);
}

#[test]
fn test_per_day_and_overall_rmse() {
    let actual = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
    let predicted = vec![vec![3.0, 1.0], vec![4.0, 1.0]];

    let score = evaluate_forecasts(&actual, &predicted).unwrap();

    assert_relative_eq!(score.per_day[0], (12.5_f64).sqrt());
    assert_relative_eq!(score.per_day[1], 1.0);
    // (9 + 1 + 16 + 1) / 4 cells
    assert_relative_eq!(score.overall, (27.0_f64 / 4.0).sqrt());
}

#[test]
fn test_overall_is_bounded_by_per_day_scores() {
    let actual = vec![vec![5.0, 1.0, 9.0], vec![2.0, 8.0, 4.0]];
    let predicted = vec![vec![4.0, 3.0, 6.0], vec![2.5, 1.0, 4.0]];

    let score = evaluate_forecasts(&actual, &predicted).unwrap();

    let min = score.per_day.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = score.per_day.iter().cloned().fold(0.0, f64::max);
    assert!(score.overall >= min && score.overall <= max);
}

#[test]
fn test_empty_evaluation() {
    let result = evaluate_forecasts(&[], &[]);
    assert!(matches!(result, Err(ForecastError::EmptyEvaluation)));
}

#[test]
fn test_shape_mismatch() {
    let actual = vec![vec![1.0; 7]; 2];

    let fewer_weeks = evaluate_forecasts(&actual, &[vec![1.0; 7]]);
    assert!(matches!(fewer_weeks, Err(ForecastError::Validation(_))));

    let short_week = evaluate_forecasts(&actual, &[vec![1.0; 7], vec![1.0; 6]]);
    assert!(matches!(short_week, Err(ForecastError::Validation(_))));
}

#[test]
fn test_summary_format() {
    let score = Score {
        overall: 465.294,
        per_day: vec![490.2, 501.5, 411.0, 466.6, 495.7, 385.6, 468.1],
    };

    assert_eq!(
        summarize_scores("weekly", &score),
        "weekly: [465.294] 490.2, 501.5, 411.0, 466.6, 495.7, 385.6, 468.1"
    );
}
