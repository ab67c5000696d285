//! Series loading and data-source resolution for the runner.
//!
//! Given a target and its peers, produces the aligned `(actual, peer_reference)`
//! pair the forecaster consumes. Implements the fallback policy:
//! 1. If an external provider is given → fetch target and peers from it
//! 2. If that fails and `synthetic` is set → generate synthetic series (tagged)
//! 3. Otherwise → fail with a clear error
//!
//! The fallback is a decision the caller opts into. Results produced on
//! synthetic data carry `DataSource::Synthetic`.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use peervol_core::{DataError, DataSource, Series, SeriesError, SeriesProvider, SyntheticProvider};

use crate::aggregate::{align_pair, peer_reference};

/// Mean of the synthetic peer draws; slightly calmer than the target's 0.02.
const SYNTHETIC_PEER_SCALE: f64 = 0.018;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no external data source and synthetic fallback disabled (use --synthetic for synthetic data)")]
    NoSource,

    #[error("no peers to aggregate for target '{target}'")]
    NoPeerData { target: String },

    #[error("external source failed for '{target}': {reason} (use --synthetic for synthetic data)")]
    ExternalFailed { target: String, reason: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("series error: {0}")]
    Series(#[from] SeriesError),
}

/// Options controlling how series are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// First day of data (inclusive).
    pub start: NaiveDate,
    /// Last day of data (inclusive).
    pub end: NaiveDate,
    /// Generate synthetic series when the external source cannot serve the request.
    pub synthetic: bool,
    /// Master seed for synthetic series.
    pub synthetic_seed: u64,
}

/// Aligned model input for one target, with provenance.
#[derive(Debug, Clone)]
pub struct ReferencePair {
    pub target: String,
    /// Target realized volatility on rows where the peer reference is present.
    pub actual: Series,
    /// Lagged peer mean on the same rows.
    pub peer_reference: Series,
    /// Peers that contributed at least one observation.
    pub peers_used: Vec<String>,
    pub source: DataSource,
    /// BLAKE3 over the aligned pair.
    pub dataset_hash: String,
}

/// Load the aligned reference pair for `target`, falling back to synthetic
/// series only when `opts.synthetic` is set.
pub fn load_reference_pair(
    target: &str,
    peers: &[String],
    provider: Option<&dyn SeriesProvider>,
    opts: &LoadOptions,
) -> Result<ReferencePair, LoadError> {
    if peers.is_empty() {
        return Err(LoadError::NoPeerData {
            target: target.to_string(),
        });
    }

    // Step 1: external source
    let mut failure = None;
    if let Some(prov) = provider {
        match fetch_pair(prov, prov, target, peers, opts) {
            Ok(pair) => return Ok(pair),
            Err(e) => {
                debug!(ticker = target, provider = prov.name(), error = %e, "external load failed");
                failure = Some(LoadError::ExternalFailed {
                    target: target.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    // Step 2: synthetic fallback (if enabled)
    if opts.synthetic {
        warn!(
            ticker = target,
            seed = opts.synthetic_seed,
            "generating synthetic series; results will be tagged as synthetic"
        );
        let target_gen = SyntheticProvider::new(opts.synthetic_seed);
        let peer_gen = SyntheticProvider::new(opts.synthetic_seed).with_scale(SYNTHETIC_PEER_SCALE);
        return fetch_pair(&target_gen, &peer_gen, target, peers, opts);
    }

    // Step 3: fail
    Err(failure.unwrap_or(LoadError::NoSource))
}

fn fetch_pair(
    target_provider: &dyn SeriesProvider,
    peer_provider: &dyn SeriesProvider,
    target: &str,
    peers: &[String],
    opts: &LoadOptions,
) -> Result<ReferencePair, LoadError> {
    let actual = target_provider.fetch_series(target, opts.start, opts.end)?;

    let mut peer_series = Vec::with_capacity(peers.len());
    let mut peers_used = Vec::with_capacity(peers.len());
    for peer in peers {
        match peer_provider.fetch_series(peer, opts.start, opts.end) {
            Ok(series) => {
                peer_series.push(series);
                peers_used.push(peer.clone());
            }
            // A peer missing from the source is skipped, not fatal.
            Err(DataError::TickerNotFound { .. } | DataError::NoData { .. }) => {
                debug!(peer = peer.as_str(), "no series for peer, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }
    if peer_series.is_empty() {
        return Err(LoadError::NoPeerData {
            target: target.to_string(),
        });
    }

    let reference = peer_reference(&peer_series)?;
    let (actual, peer_reference) = align_pair(&actual, &reference)?;
    let dataset_hash = compute_dataset_hash(target, &actual, &peer_reference);

    debug!(
        ticker = target,
        source = ?target_provider.source(),
        peers = peers_used.len(),
        rows = actual.len(),
        "loaded reference pair"
    );

    Ok(ReferencePair {
        target: target.to_string(),
        actual,
        peer_reference,
        peers_used,
        source: target_provider.source(),
        dataset_hash,
    })
}

/// Deterministic BLAKE3 hash over the aligned pair.
fn compute_dataset_hash(target: &str, actual: &Series, reference: &Series) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(target.as_bytes());
    for ((date, a), (_, r)) in actual.iter().zip(reference.iter()) {
        hasher.update(date.to_string().as_bytes());
        hasher.update(&a.to_le_bytes());
        hasher.update(&r.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use peervol_core::CsvReturnsProvider;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn opts(synthetic: bool) -> LoadOptions {
        LoadOptions {
            start: d(2024, 1, 1),
            end: d(2024, 1, 31),
            synthetic,
            synthetic_seed: 42,
        }
    }

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const PANEL: &str = "\
ticker,date,ret
TGT,2024-01-02,0.01
TGT,2024-01-03,-0.02
TGT,2024-01-04,0.03
TGT,2024-01-05,-0.01
P1,2024-01-02,0.02
P1,2024-01-03,0.04
P1,2024-01-04,-0.02
P2,2024-01-03,0.06
P2,2024-01-04,0.02
";

    #[test]
    fn external_pair_is_lagged_and_aligned() {
        let provider = CsvReturnsProvider::from_reader(PANEL.as_bytes()).unwrap();
        let pair =
            load_reference_pair("TGT", &peers(&["P1", "P2", "MISSING"]), Some(&provider), &opts(false))
                .unwrap();

        assert_eq!(pair.source, DataSource::External);
        assert_eq!(pair.peers_used, peers(&["P1", "P2"]));
        // Peer mean: 01-02 0.02, 01-03 0.05, 01-04 0.02. Lagged: 01-03 0.02, 01-04 0.05.
        assert_eq!(pair.actual.index(), &[d(2024, 1, 3), d(2024, 1, 4)]);
        assert_eq!(pair.actual.values(), &[0.02, 0.03]);
        assert!((pair.peer_reference.values()[0] - 0.02).abs() < 1e-15);
        assert!((pair.peer_reference.values()[1] - 0.05).abs() < 1e-15);
    }

    #[test]
    fn missing_target_fails_without_synthetic() {
        let provider = CsvReturnsProvider::from_reader(PANEL.as_bytes()).unwrap();
        let err = load_reference_pair("NOPE", &peers(&["P1"]), Some(&provider), &opts(false))
            .unwrap_err();
        assert!(matches!(err, LoadError::ExternalFailed { .. }));
    }

    #[test]
    fn missing_target_falls_back_when_enabled() {
        let provider = CsvReturnsProvider::from_reader(PANEL.as_bytes()).unwrap();
        let pair =
            load_reference_pair("NOPE", &peers(&["P1"]), Some(&provider), &opts(true)).unwrap();
        assert_eq!(pair.source, DataSource::Synthetic);
        // 31 calendar days, the first lost to the peer lag.
        assert_eq!(pair.actual.len(), 30);
    }

    #[test]
    fn no_provider_and_no_fallback_is_an_error() {
        let err = load_reference_pair("TGT", &peers(&["P1"]), None, &opts(false)).unwrap_err();
        assert!(matches!(err, LoadError::NoSource));
    }

    #[test]
    fn empty_peer_list_is_an_error_even_with_fallback() {
        let err = load_reference_pair("TGT", &[], None, &opts(true)).unwrap_err();
        assert!(matches!(err, LoadError::NoPeerData { .. }));
    }

    #[test]
    fn synthetic_pair_is_deterministic() {
        let a = load_reference_pair("TGT", &peers(&["P1", "P2"]), None, &opts(true)).unwrap();
        let b = load_reference_pair("TGT", &peers(&["P1", "P2"]), None, &opts(true)).unwrap();
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_eq!(a.actual, b.actual);
        assert_eq!(a.dataset_hash.len(), 64);
    }
}
