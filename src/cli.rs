//! Command line interface
//!
//! Loads the dataset, splits it into weeks and prints one summary line per
//! selected strategy:
//!
//! ```text
//! daily: [511.886] 452.9, 596.4, 532.1, 490.5, 534.3, 481.5, 482.0
//! ```

use anyhow::Context;
use clap::Parser;
use power_forecast::data::train_test_split;
use power_forecast::{Config, DataLoader, StrategyKind};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "household-power")]
#[command(about = "Compare weekly household power forecasts with walk-forward validation")]
#[command(version)]
pub struct Cli {
    /// Input file: a timestamp column followed by measured columns, total power first
    #[arg(short, long)]
    pub data: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Strategy to evaluate (daily, weekly, year-ago, arima, cnn); repeat for several.
    /// Summary lines are labelled with the same names
    #[arg(short, long = "strategy")]
    pub strategies: Vec<StrategyKind>,

    /// Sum rows per calendar date before splitting
    #[arg(long)]
    pub resample_daily: bool,

    /// Log filter, overrides the configured level
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print every report as a JSON line instead of a summary
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Configuration from `--config`, or the defaults
    pub fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Could not load config from {}", path.display())),
            None => Ok(Config::default()),
        }
    }

    /// Strategies to run; all of them when none were named
    pub fn selected_strategies(&self) -> Vec<StrategyKind> {
        if self.strategies.is_empty() {
            StrategyKind::ALL.to_vec()
        } else {
            self.strategies.clone()
        }
    }
}

/// Evaluate the selected strategies and print their results
///
/// Returns how many strategies failed.
pub fn run(cli: &Cli, config: &Config) -> anyhow::Result<usize> {
    let loader = DataLoader::from_config(&config.data)?;
    let mut dataset = loader
        .load(&cli.data)
        .with_context(|| format!("Could not load data from {}", cli.data.display()))?;

    if cli.resample_daily || config.data.resample_daily {
        dataset = dataset.resample_daily()?;
    }

    let (train, test) = train_test_split(dataset.rows(), &config.split)?;

    let mut failures = 0;
    for strategy in cli.selected_strategies() {
        info!(%strategy, "Evaluating strategy");
        match strategy.evaluate(config, &train, &test) {
            Ok(report) if cli.json => println!("{}", report.to_json()?),
            Ok(report) => println!("{}", report.summary()),
            Err(err) => {
                error!(%strategy, error = %err, "Strategy failed");
                failures += 1;
            }
        }
    }

    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use power_forecast::config::SplitConfig;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_daily_csv(days: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "datetime,Global_active_power,Voltage").unwrap();
        for day in 0..days {
            // 28-day months keep every date valid
            let (month, day_of_month) = (1 + day / 28, 1 + day % 28);
            let power = 1500.0 + 200.0 * ((day % 7) as f64);
            writeln!(file, "2007-{:02}-{:02},{},240.0", month, day_of_month, power).unwrap();
        }
        file
    }

    fn small_config() -> Config {
        Config {
            split: SplitConfig {
                skip_leading: 1,
                test_rows: 14,
                drop_trailing: 0,
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_strategies() {
        let cli = Cli::try_parse_from([
            "household-power",
            "--data",
            "power.csv",
            "--strategy",
            "daily",
            "-s",
            "year-ago",
        ])
        .unwrap();

        assert_eq!(
            cli.selected_strategies(),
            vec![StrategyKind::Daily, StrategyKind::YearAgo]
        );
        assert!(!cli.json);
    }

    #[test]
    fn test_defaults_to_every_strategy() {
        let cli = Cli::try_parse_from(["household-power", "--data", "power.csv"]).unwrap();
        assert_eq!(cli.selected_strategies(), StrategyKind::ALL.to_vec());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        let result =
            Cli::try_parse_from(["household-power", "--data", "power.csv", "-s", "prophet"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_counts_failed_strategies() {
        // 1 skipped row, 4 training weeks, 2 test weeks
        let file = write_daily_csv(1 + 28 + 14);
        let cli = Cli::try_parse_from([
            "household-power",
            "--data",
            file.path().to_str().unwrap(),
            "-s",
            "daily",
            "-s",
            "weekly",
            "-s",
            "year-ago",
        ])
        .unwrap();

        // year-ago needs 52 weeks of history
        let failures = run(&cli, &small_config()).unwrap();
        assert_eq!(failures, 1);
    }

    #[test]
    fn test_run_reports_missing_file() {
        let cli =
            Cli::try_parse_from(["household-power", "--data", "/nonexistent/power.csv"]).unwrap();
        assert!(run(&cli, &small_config()).is_err());
    }
}
