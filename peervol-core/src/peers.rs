//! Point-in-time peer selection.
//!
//! Given a universe of listed entities and a target, returns the historically
//! valid peers closest to the target by valuation. A candidate is valid only if,
//! as of the target's listing date, it was already listed and its latest
//! fundamentals were already public:
//!
//! - same sector, different ticker
//! - `listing_date < target.listing_date` (strict: same-day listings are excluded)
//! - latest report date `< target.listing_date - reporting_lag_days` (strict)
//!
//! Survivors are ranked by `|valuation - target.valuation|` with a stable sort,
//! so ties keep universe order and the result is deterministic.
//!
//! A ticker may appear in several records (one per fiscal quarter). The lag
//! filter then uses the latest report date across all of them, and a ticker is
//! returned at most once, through its closest eligible record.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::EntityRecord;

/// Upper bound on `SelectionConfig::reporting_lag_days` (ten years).
pub const MAX_REPORTING_LAG_DAYS: i64 = 3650;

/// What to do when the target ticker appears more than once in the universe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Use the first matching record in universe order.
    #[default]
    FirstMatch,
    /// Fail with `SelectionError::AmbiguousTarget`.
    Reject,
}

/// Configuration for peer selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Disclosure delay between a fiscal period end and its public report (default 45).
    pub reporting_lag_days: i64,
    /// Duplicate target resolution (default first match).
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            reporting_lag_days: 45,
            duplicate_policy: DuplicatePolicy::FirstMatch,
        }
    }
}

/// Errors from peer selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("target '{ticker}' not found in universe")]
    NotFound { ticker: String },

    #[error("target '{ticker}' appears {count} times in universe")]
    AmbiguousTarget { ticker: String, count: usize },

    #[error("peer count must be positive")]
    InvalidPeerCount,

    #[error("reporting lag of {days} days is outside 0..={max}", max = MAX_REPORTING_LAG_DAYS)]
    InvalidReportingLag { days: i64 },
}

/// Peers assigned to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAssignment {
    pub target: String,
    pub peers: Vec<String>,
}

/// Select up to `peer_count` historically valid peers for `target_id`.
///
/// Returns an empty list (not an error) when no candidate survives the
/// temporal filters, e.g. for the first listing in a sector.
pub fn select_peers(
    universe: &[EntityRecord],
    target_id: &str,
    peer_count: usize,
    config: &SelectionConfig,
) -> Result<Vec<String>, SelectionError> {
    if peer_count == 0 {
        return Err(SelectionError::InvalidPeerCount);
    }

    let target = resolve_target(universe, target_id, config.duplicate_policy)?;
    let cutoff = report_cutoff(target.listing_date, config.reporting_lag_days)?;
    let latest = latest_reports(universe);

    let mut candidates: Vec<(f64, &EntityRecord)> = universe
        .iter()
        .filter(|e| {
            e.sector == target.sector
                && e.ticker != target_id
                && e.listing_date < target.listing_date
        })
        .filter(|e| {
            latest
                .get(e.ticker.as_str())
                .copied()
                .flatten()
                .is_some_and(|d| d < cutoff)
        })
        .map(|e| ((e.valuation - target.valuation).abs(), e))
        .collect();

    if candidates.is_empty() {
        debug!(ticker = target_id, "no eligible peers");
        return Ok(Vec::new());
    }

    // Stable; a NaN distance sorts after every finite one.
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut seen = HashSet::new();
    let peers: Vec<String> = candidates
        .into_iter()
        .filter(|&(_, e)| seen.insert(e.ticker.as_str()))
        .take(peer_count)
        .map(|(_, e)| e.ticker.clone())
        .collect();

    debug!(ticker = target_id, peers = peers.len(), "selected peers");
    Ok(peers)
}

/// Latest report date a peer may have and still count as public at `listing_date`.
///
/// Reports must be strictly earlier than the returned date. Fails for a lag
/// outside `0..=MAX_REPORTING_LAG_DAYS` or one that leaves the calendar range.
pub fn report_cutoff(
    listing_date: NaiveDate,
    reporting_lag_days: i64,
) -> Result<NaiveDate, SelectionError> {
    let invalid = || SelectionError::InvalidReportingLag {
        days: reporting_lag_days,
    };
    if !(0..=MAX_REPORTING_LAG_DAYS).contains(&reporting_lag_days) {
        return Err(invalid());
    }
    TimeDelta::try_days(reporting_lag_days)
        .and_then(|lag| listing_date.checked_sub_signed(lag))
        .ok_or_else(invalid)
}

/// Latest report date per ticker across every record carrying that ticker.
fn latest_reports(universe: &[EntityRecord]) -> HashMap<&str, Option<NaiveDate>> {
    let mut latest: HashMap<&str, Option<NaiveDate>> = HashMap::new();
    for e in universe {
        let slot = latest.entry(e.ticker.as_str()).or_insert(None);
        *slot = (*slot).max(e.latest_report_date());
    }
    latest
}

fn resolve_target<'a>(
    universe: &'a [EntityRecord],
    target_id: &str,
    policy: DuplicatePolicy,
) -> Result<&'a EntityRecord, SelectionError> {
    let mut matches = universe.iter().filter(|e| e.ticker == target_id);
    let first = matches.next().ok_or_else(|| SelectionError::NotFound {
        ticker: target_id.to_string(),
    })?;

    if policy == DuplicatePolicy::Reject {
        let extra = matches.count();
        if extra > 0 {
            return Err(SelectionError::AmbiguousTarget {
                ticker: target_id.to_string(),
                count: extra + 1,
            });
        }
    }

    Ok(first)
}

/// Unique tickers in `sector` listed on or after `listed_on_or_after`, in
/// first-appearance order.
pub fn target_list(
    universe: &[EntityRecord],
    sector: &str,
    listed_on_or_after: NaiveDate,
) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for e in universe {
        if e.sector == sector
            && e.listing_date >= listed_on_or_after
            && !targets.contains(&e.ticker)
        {
            targets.push(e.ticker.clone());
        }
    }
    targets
}

/// Select peers for every target, in target order.
pub fn build_peer_map(
    universe: &[EntityRecord],
    targets: &[String],
    peer_count: usize,
    config: &SelectionConfig,
) -> Result<Vec<PeerAssignment>, SelectionError> {
    targets
        .iter()
        .map(|target| {
            Ok(PeerAssignment {
                target: target.clone(),
                peers: select_peers(universe, target, peer_count, config)?,
            })
        })
        .collect()
}
