//! peervol CLI: target listing, peer selection, and forecast runs.
//!
//! Commands:
//! - `targets`: list recent listings in a sector, optionally with their peers
//! - `peers`: select point-in-time peers for one target
//! - `run`: full pipeline (peers, reference series, walk-forward forecast, skill)

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use peervol_core::{
    build_peer_map, select_peers, target_list, CsvReturnsProvider, SelectionConfig, SeriesProvider,
};
use peervol_runner::{load_universe_file, run_pipeline, save_artifacts, PipelineConfig, PipelineResult};

#[derive(Parser)]
#[command(
    name = "peervol",
    about = "peervol: point-in-time peer-augmented volatility forecasting"
)]
struct Cli {
    /// Log filter when RUST_LOG is unset (e.g. info, debug, peervol_core=debug).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List targets: listings in a sector on or after a date.
    Targets {
        /// Universe CSV (tic, ipodate, gsector, mkvaltq, rdq).
        #[arg(long)]
        universe: PathBuf,

        /// Sector code.
        #[arg(long, default_value = "45")]
        sector: String,

        /// Earliest listing date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-01-01")]
        since: String,

        /// Also select peers for every target.
        #[arg(long, default_value_t = false)]
        with_peers: bool,

        /// Maximum peers per target (with --with-peers).
        #[arg(long, default_value_t = 10)]
        peer_count: usize,
    },
    /// Select point-in-time peers for one target.
    Peers {
        /// Universe CSV (tic, ipodate, gsector, mkvaltq, rdq).
        #[arg(long)]
        universe: PathBuf,

        /// Target ticker.
        #[arg(long)]
        target: String,

        /// Maximum number of peers.
        #[arg(long, default_value_t = 10)]
        peer_count: usize,

        /// Reporting lag in days.
        #[arg(long, default_value_t = 45)]
        reporting_lag_days: i64,
    },
    /// Run the full forecast pipeline for one target.
    Run {
        /// Universe CSV (tic, ipodate, gsector, mkvaltq, rdq).
        #[arg(long)]
        universe: PathBuf,

        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Daily returns CSV (ticker, date, ret) used as the external source.
        #[arg(long)]
        returns: Option<PathBuf>,

        /// Target ticker (overrides the config).
        #[arg(long)]
        target: Option<String>,

        /// Use synthetic series when external data is unavailable.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Targets {
            universe,
            sector,
            since,
            with_peers,
            peer_count,
        } => run_targets(universe, &sector, &since, with_peers, peer_count),
        Commands::Peers {
            universe,
            target,
            peer_count,
            reporting_lag_days,
        } => run_peers(universe, &target, peer_count, reporting_lag_days),
        Commands::Run {
            universe,
            config,
            returns,
            target,
            synthetic,
            output_dir,
        } => run_forecast(universe, config, returns, target, synthetic, output_dir),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

fn run_targets(
    universe: PathBuf,
    sector: &str,
    since: &str,
    with_peers: bool,
    peer_count: usize,
) -> Result<()> {
    let since = NaiveDate::parse_from_str(since, "%Y-%m-%d")
        .with_context(|| format!("invalid --since date '{since}'"))?;
    let load = load_universe_file(&universe)?;
    let targets = target_list(&load.records, sector, since);
    println!("Found {} target listings in sector {sector} since {since}.", targets.len());

    if !with_peers {
        for t in &targets {
            println!("{t}");
        }
        return Ok(());
    }

    let map = build_peer_map(&load.records, &targets, peer_count, &SelectionConfig::default())?;
    for assignment in &map {
        println!("Target: {} | Peers: {}", assignment.target, assignment.peers.join(", "));
    }
    Ok(())
}

fn run_peers(
    universe: PathBuf,
    target: &str,
    peer_count: usize,
    reporting_lag_days: i64,
) -> Result<()> {
    let load = load_universe_file(&universe)?;
    let config = SelectionConfig {
        reporting_lag_days,
        ..Default::default()
    };
    let peers = select_peers(&load.records, target, peer_count, &config)?;
    if peers.is_empty() {
        println!("Target: {target} | no eligible peers");
    } else {
        println!("Target: {target} | Peers: {}", peers.join(", "));
    }
    Ok(())
}

fn run_forecast(
    universe: PathBuf,
    config_path: Option<PathBuf>,
    returns: Option<PathBuf>,
    target: Option<String>,
    synthetic: bool,
    output_dir: PathBuf,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_file(&path)?,
        None => PipelineConfig::default(),
    };
    if target.is_some() {
        config.target = target;
    }
    if synthetic {
        config.data.synthetic_fallback = true;
    }

    let load = load_universe_file(&universe)?;
    let provider = returns
        .as_deref()
        .map(CsvReturnsProvider::from_path)
        .transpose()
        .context("failed to load returns CSV")?;
    let provider_ref: Option<&dyn SeriesProvider> =
        provider.as_ref().map(|p| p as &dyn SeriesProvider);

    let result = run_pipeline(&config, &load.records, provider_ref)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, &output_dir)?;
    info!(dir = %run_dir.display(), "artifacts saved");
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn print_summary(result: &PipelineResult) {
    println!();
    println!("=== Forecast Summary ===");
    println!("Target:        {}", result.target);
    println!("Peers:         {}", result.peers.join(", "));
    if result.peers_used.len() != result.peers.len() {
        println!("Peers w/ data: {}", result.peers_used.join(", "));
    }
    println!(
        "Data:          {:?}{}",
        result.data_source,
        if result.is_synthetic() { " (SYNTHETIC)" } else { "" }
    );
    println!("Aligned rows:  {}", result.aligned_rows);
    println!("Forecasts:     {}", result.records.len());
    if result.degenerate_steps() > 0 {
        println!("Degenerate:    {} steps", result.degenerate_steps());
    }
    println!("Model RMSE:    {:.6}", result.skill.model_error);
    println!("Naive RMSE:    {:.6}", result.skill.baseline_error);
    println!("Skill score:   {:.2}%", result.skill.skill_score * 100.0);
    println!("Dataset hash:  {}", &result.dataset_hash[..result.dataset_hash.len().min(16)]);
}
