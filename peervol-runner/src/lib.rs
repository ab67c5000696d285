//! peervol runner: pipeline orchestration on top of `peervol-core`.
//!
//! This crate provides:
//! - Universe ingestion from a fundamentals CSV
//! - Peer aggregation (lagged cross-sectional mean)
//! - Series loading with an explicit external/synthetic fallback decision
//! - The end-to-end pipeline and its serializable result
//! - JSON/CSV artifact export
//! - TOML configuration

pub mod aggregate;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod pipeline;
pub mod universe;

pub use aggregate::{align_pair, peer_mean, peer_reference};
pub use config::{ConfigError, DataConfig, PipelineConfig};
pub use data_loader::{load_reference_pair, LoadError, LoadOptions, ReferencePair};
pub use export::{export_json, import_json, load_artifacts, save_artifacts};
pub use pipeline::{resolve_target, run_pipeline, PipelineError, PipelineResult, SCHEMA_VERSION};
pub use universe::{load_universe_csv, load_universe_file, UniverseError, UniverseLoad};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn pipeline_types_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<PipelineResult>();
        assert_sync::<PipelineResult>();
        assert_send::<ReferencePair>();
        assert_sync::<ReferencePair>();
        assert_send::<UniverseLoad>();
        assert_sync::<UniverseLoad>();
    }

    #[test]
    fn error_types_are_send_sync() {
        assert_send::<PipelineError>();
        assert_sync::<PipelineError>();
        assert_send::<LoadError>();
        assert_sync::<LoadError>();
        assert_send::<UniverseError>();
        assert_sync::<UniverseError>();
    }
}
