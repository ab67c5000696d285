//! Peer aggregate construction.
//!
//! The peer reference at time t is the cross-sectional mean of the peers'
//! values at t-1, so a forecast at t only sees peer information already
//! observed. The one-step lag is applied here and nowhere else.

use std::collections::BTreeMap;

use peervol_core::{Series, SeriesError};

/// Per-timestamp mean over peers with a finite value there.
///
/// The index is the union of the peers' indices. Timestamps where no peer has
/// a finite value are omitted.
pub fn peer_mean<K: Ord + Copy>(peers: &[Series<K>]) -> Result<Series<K>, SeriesError> {
    let mut sums: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for peer in peers {
        for (key, value) in peer.iter().filter(|(_, v)| v.is_finite()) {
            let slot = sums.entry(key).or_insert((0.0, 0));
            slot.0 += value;
            slot.1 += 1;
        }
    }
    Series::from_points(
        sums.into_iter()
            .map(|(key, (sum, count))| (key, sum / count as f64)),
    )
}

/// Lagged peer mean: the value at position i is the mean at position i - 1.
pub fn peer_reference<K: Ord + Copy>(peers: &[Series<K>]) -> Result<Series<K>, SeriesError> {
    Ok(peer_mean(peers)?.lag(1))
}

/// Inner-join `actual` and `reference` on timestamp, keeping rows where both
/// are finite.
pub fn align_pair<K: Ord + Copy>(
    actual: &Series<K>,
    reference: &Series<K>,
) -> Result<(Series<K>, Series<K>), SeriesError> {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (key, a) in actual.iter().filter(|(_, v)| v.is_finite()) {
        if let Some(r) = reference.get(key).filter(|r| r.is_finite()) {
            left.push((key, a));
            right.push((key, r));
        }
    }
    Ok((Series::from_points(left)?, Series::from_points(right)?))
}
