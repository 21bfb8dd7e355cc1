use clap::Parser;

mod cli;
mod telemetry;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli.load_config()?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    telemetry::init_logging(&level)?;

    let failures = cli::run(&cli, &config)?;
    if failures > 0 {
        anyhow::bail!("{} of the selected strategies failed", failures);
    }

    Ok(())
}
