//! peervol core: point-in-time peer selection, walk-forward forecasting, skill.
//!
//! This crate contains:
//! - Domain types (entity records, time-indexed series, forecast records)
//! - Peer selection with listing-date and reporting-lag filters
//! - OLS with intercept via a pseudo-inverse of the normal equations
//! - Walk-forward retraining forecaster
//! - Skill evaluation against a persistence baseline
//! - The series-provider trait with external (CSV) and synthetic variants
//!
//! Nothing computed at time `t` may use information unavailable at `t`.

pub mod data;
pub mod domain;
pub mod peers;
pub mod regression;
pub mod skill;
pub mod walk_forward;

pub use data::{CsvReturnsProvider, DataError, DataSource, SeriesProvider, SyntheticProvider};
pub use domain::{EntityRecord, ForecastRecord, Series, SeriesError};
pub use peers::{
    build_peer_map, report_cutoff, select_peers, target_list, DuplicatePolicy, PeerAssignment,
    SelectionConfig, SelectionError, MAX_REPORTING_LAG_DAYS,
};
pub use regression::{OlsFit, RegressionError};
pub use skill::{evaluate, SkillError, SkillReport};
pub use walk_forward::{
    forecast, DegeneratePolicy, ForecastConfig, ForecastError, StepFit, WalkForwardForecaster,
    WalkForwardRun,
};
