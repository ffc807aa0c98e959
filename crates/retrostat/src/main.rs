// retrostat entry point: compute one statistic for one player and print it.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (stderr, so stdout carries only the result)
// 3. Load config
// 4. Build the metric engine and run the query

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;

use retrostat::config;
use retrostat::{MetricEngine, Player, Statistic};

#[derive(Debug, Parser)]
#[command(name = "retrostat", about = "Player statistics from Retrosheet play-by-play data")]
struct Cli {
    /// Config file (defaults to ./retrostat.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Decimal places (defaults to metrics.default_precision).
    #[arg(long)]
    precision: Option<u32>,

    /// Print a JSON object instead of a bare value.
    #[arg(long)]
    json: bool,

    stat: StatArg,

    /// Retrosheet player id, e.g. judga001.
    player: String,

    /// First date, YYYY-MM-DD.
    start: NaiveDate,

    /// Last date (inclusive), YYYY-MM-DD.
    end: NaiveDate,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatArg {
    Avg,
    Obp,
    Era,
}

impl From<StatArg> for Statistic {
    fn from(arg: StatArg) -> Self {
        match arg {
            StatArg::Avg => Statistic::BattingAverage,
            StatArg::Obp => Statistic::OnBasePercentage,
            StatArg::Era => Statistic::EarnedRunAverage,
        }
    }
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    player: &'a str,
    stat: Statistic,
    start: NaiveDate,
    end: NaiveDate,
    value: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let config = config::load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let precision = cli.precision.unwrap_or(config.metrics.default_precision);

    let mut engine =
        MetricEngine::from_config(&config).context("failed to initialize metric engine")?;
    info!("Data root: {}", engine.data_root().display());

    let player = Player::new(cli.player);
    let stat = Statistic::from(cli.stat);
    let value = player
        .stat(&mut engine, stat, cli.start, cli.end, precision)
        .with_context(|| {
            format!(
                "failed to compute {} for {}",
                stat.abbreviation(),
                player.id()
            )
        })?;

    if cli.json {
        let report = Report {
            player: player.id(),
            stat,
            start: cli.start,
            end: cli.end,
            value,
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        match value {
            Some(v) => println!("{v:.prec$}", prec = precision as usize),
            None => println!("undefined"),
        }
    }

    Ok(())
}

/// Initialize tracing to stderr.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("retrostat=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
