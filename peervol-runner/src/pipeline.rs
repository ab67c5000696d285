//! End-to-end pipeline: universe → peers → reference pair → forecast → skill.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use peervol_core::walk_forward::StepFit;
use peervol_core::{
    evaluate, select_peers, target_list, DataSource, EntityRecord, ForecastError, ForecastRecord,
    SelectionError, SeriesProvider, SkillError, SkillReport, WalkForwardForecaster,
};

use crate::config::{ConfigError, PipelineConfig};
use crate::data_loader::{load_reference_pair, LoadError, LoadOptions};

/// Current schema version for persisted pipeline results.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("no targets in sector '{sector}' listed on or after {since}")]
    NoTargets { sector: String, since: NaiveDate },

    #[error("peer selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("data loading failed: {0}")]
    Load(#[from] LoadError),

    #[error("forecast failed: {0}")]
    Forecast(#[from] ForecastError),

    #[error("evaluation failed: {0}")]
    Skill(#[from] SkillError),
}

/// Complete result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub target: String,
    /// Peers chosen by selection, closest first.
    pub peers: Vec<String>,
    /// Peers that had series data.
    pub peers_used: Vec<String>,
    pub data_source: DataSource,
    pub dataset_hash: String,
    pub config_hash: String,
    pub config: PipelineConfig,
    /// Rows of the aligned reference pair.
    pub aligned_rows: usize,
    pub records: Vec<ForecastRecord>,
    pub fits: Vec<StepFit<NaiveDate>>,
    pub skill: SkillReport,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl PipelineResult {
    pub fn is_synthetic(&self) -> bool {
        self.data_source == DataSource::Synthetic
    }

    /// Steps whose training window was rank-deficient.
    pub fn degenerate_steps(&self) -> usize {
        self.fits.iter().filter(|f| f.is_degenerate()).count()
    }
}

/// Resolve the target to forecast: the configured one, or the first listing in
/// the configured sector on or after `start_date`.
pub fn resolve_target(
    config: &PipelineConfig,
    universe: &[EntityRecord],
) -> Result<String, PipelineError> {
    if let Some(target) = &config.target {
        return Ok(target.clone());
    }
    target_list(universe, &config.sector, config.start_date)
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::NoTargets {
            sector: config.sector.clone(),
            since: config.start_date,
        })
}

/// Run the full pipeline for one target.
///
/// `provider` is the caller-owned external source. When it is `None` or fails,
/// synthetic data is used only if `config.data.synthetic_fallback` is set.
pub fn run_pipeline(
    config: &PipelineConfig,
    universe: &[EntityRecord],
    provider: Option<&dyn SeriesProvider>,
) -> Result<PipelineResult, PipelineError> {
    config.validate()?;

    let target = resolve_target(config, universe)?;
    let peers = select_peers(universe, &target, config.peer_count, &config.selection)?;
    info!(ticker = target.as_str(), peers = peers.len(), "selected peers");

    let opts = LoadOptions {
        start: config.start_date,
        end: config.end_date,
        synthetic: config.data.synthetic_fallback,
        synthetic_seed: config.data.synthetic_seed,
    };
    let pair = load_reference_pair(&target, &peers, provider, &opts)?;
    debug!(rows = pair.actual.len(), source = ?pair.source, "reference pair ready");

    let run = WalkForwardForecaster::new(config.forecast.clone()).run(
        &pair.actual,
        &pair.peer_reference,
        config.window_size,
    )?;
    let skill = evaluate(&run.records)?;

    info!(
        ticker = target.as_str(),
        forecasts = run.records.len(),
        model_rmse = skill.model_error,
        naive_rmse = skill.baseline_error,
        skill = skill.skill_score,
        "pipeline complete"
    );

    Ok(PipelineResult {
        schema_version: SCHEMA_VERSION,
        target,
        peers,
        peers_used: pair.peers_used,
        data_source: pair.source,
        dataset_hash: pair.dataset_hash,
        config_hash: config.config_hash(),
        config: config.clone(),
        aligned_rows: run.aligned_rows,
        records: run.records,
        fits: run.fits,
        skill,
    })
}
