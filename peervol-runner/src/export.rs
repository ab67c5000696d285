//! Reporting and export: JSON and CSV artifact generation.
//!
//! - **JSON**: full round-trip serialization of `PipelineResult` with schema versioning
//! - **CSV**: forecast records and per-step coefficients for external analysis tools
//!
//! All persisted artifacts include a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use peervol_core::walk_forward::StepFit;
use peervol_core::ForecastRecord;

use crate::pipeline::{PipelineResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `PipelineResult` to pretty JSON.
pub fn export_json(result: &PipelineResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize PipelineResult to JSON")
}

/// Deserialize a `PipelineResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<PipelineResult> {
    let result: PipelineResult =
        serde_json::from_str(json).context("failed to deserialize PipelineResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export forecast records as CSV.
///
/// Columns: date, actual, forecast, error
pub fn export_forecasts_csv(records: &[ForecastRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "actual", "forecast", "error"])?;
    for r in records {
        wtr.write_record([
            &r.timestamp.to_string(),
            &format!("{:.8}", r.actual),
            &format!("{:.8}", r.forecast),
            &format!("{:.8}", r.error()),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export per-step OLS coefficients as CSV.
///
/// Columns: step, date, intercept, lag_actual, peer_reference, rank
pub fn export_fits_csv(fits: &[StepFit<NaiveDate>]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "step",
        "date",
        "intercept",
        "lag_actual",
        "peer_reference",
        "rank",
    ])?;
    for f in fits {
        let coef = |i: usize| {
            f.coefficients
                .get(i)
                .map(|c| format!("{c:.8}"))
                .unwrap_or_default()
        };
        wtr.write_record([
            &f.step.to_string(),
            &f.timestamp.to_string(),
            &coef(0),
            &coef(1),
            &coef(2),
            &f.rank.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a pipeline run.
///
/// Creates a directory named `{target}_{config hash prefix}/` (target sanitized) under
/// `output_dir` containing:
/// - `manifest.json`: the full `PipelineResult`
/// - `forecasts.csv`: one row per walk-forward step
/// - `fits.csv`: per-step coefficients and rank
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &PipelineResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(result));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(
        run_dir.join("forecasts.csv"),
        export_forecasts_csv(&result.records)?,
    )?;
    std::fs::write(run_dir.join("fits.csv"), export_fits_csv(&result.fits)?)?;

    Ok(run_dir)
}

/// `{target}_{config hash prefix}`, with every character of the target other
/// than ASCII alphanumerics, `-` and `_` replaced by `_`, so the name is always a
/// single path component.
fn artifact_dir_name(result: &PipelineResult) -> String {
    let target: String = result
        .target
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let prefix_len = result.config_hash.len().min(12);
    format!("{target}_{}", &result.config_hash[..prefix_len])
}

/// Load a `PipelineResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<PipelineResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}
