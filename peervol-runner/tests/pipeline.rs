//! End-to-end pipeline tests: universe CSV and returns CSV on disk, through
//! selection, forecasting, evaluation, and artifact round-trip.

use std::io::Write;

use chrono::{Duration, NaiveDate};
use peervol_core::{select_peers, CsvReturnsProvider, DataSource, SelectionConfig, SeriesProvider};
use peervol_runner::export::{export_json, import_json};
use peervol_runner::{
    load_artifacts, load_universe_csv, load_universe_file, run_pipeline, save_artifacts, LoadError, PipelineConfig,
    PipelineError, SCHEMA_VERSION,
};

const UNIVERSE: &str = "\
gvkey,tic,datadate,ipodate,gsector,mkvaltq,rdq
1,OLDA,2023-09-30,2018-04-10,45,90,2023-10-30
2,OLDB,2023-09-30,2019-07-01,45,150,2023-11-02
3,OLDC,2023-09-30,2021-11-01,45,95,2023-11-01
4,OTHR,2023-09-30,2020-02-01,20,100,2023-10-15
5,NEWT,2024-03-31,2024-01-01,45,100,2024-05-15
6,NOIPO,2023-09-30,,45,100,2023-10-15
";

fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// Deterministic daily returns for the given tickers over Q1 2024.
fn returns_csv(tickers: &[&str]) -> String {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut out = String::from("ticker,date,ret\n");
    for (k, ticker) in tickers.iter().enumerate() {
        for i in 0..91i64 {
            let phase = i as f64 * 0.41 + k as f64;
            let ret = 0.015 * phase.sin() + 0.004 * (phase * 2.3).cos();
            out.push_str(&format!(
                "{ticker},{},{ret:.6}\n",
                start + Duration::days(i)
            ));
        }
    }
    out
}

fn q1_config() -> PipelineConfig {
    PipelineConfig {
        end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        peer_count: 2,
        ..Default::default()
    }
}

#[test]
fn end_to_end_on_external_data() {
    let dir = tempfile::tempdir().unwrap();
    let universe_path = write_temp(&dir, "universe.csv", UNIVERSE);
    let returns_path = write_temp(&dir, "returns.csv", &returns_csv(&["NEWT", "OLDA", "OLDC"]));

    let load = load_universe_file(&universe_path).unwrap();
    assert_eq!(load.excluded_without_listing, 1);

    let provider = CsvReturnsProvider::from_path(&returns_path).unwrap();
    let result = run_pipeline(&q1_config(), &load.records, Some(&provider as &dyn SeriesProvider))
        .unwrap();

    assert_eq!(result.target, "NEWT");
    assert_eq!(result.peers, vec!["OLDC".to_string(), "OLDA".to_string()]);
    assert_eq!(result.data_source, DataSource::External);
    assert!(!result.is_synthetic());
    // 91 days, one lost to the peer lag, one to the target lag, six to the window.
    assert_eq!(result.records.len(), 91 - 1 - 1 - 6);
    assert!(result.skill.model_error.is_finite());
    assert!(result.skill.baseline_error > 0.0);
}

#[test]
fn missing_external_data_requires_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let universe_path = write_temp(&dir, "universe.csv", UNIVERSE);
    let returns_path = write_temp(&dir, "returns.csv", &returns_csv(&["OLDA"]));

    let records = load_universe_file(&universe_path).unwrap().records;
    let provider = CsvReturnsProvider::from_path(&returns_path).unwrap();

    let err = run_pipeline(&q1_config(), &records, Some(&provider as &dyn SeriesProvider))
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Load(LoadError::ExternalFailed { .. })
    ));

    let mut config = q1_config();
    config.data.synthetic_fallback = true;
    let result = run_pipeline(&config, &records, Some(&provider as &dyn SeriesProvider)).unwrap();
    assert_eq!(result.data_source, DataSource::Synthetic);
}

#[test]
fn artifacts_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let universe_path = write_temp(&dir, "universe.csv", UNIVERSE);
    let records = load_universe_file(&universe_path).unwrap().records;

    let mut config = q1_config();
    config.data.synthetic_fallback = true;
    let result = run_pipeline(&config, &records, None).unwrap();

    let out = dir.path().join("out");
    let run_dir = save_artifacts(&result, &out).unwrap();
    assert!(run_dir.join("manifest.json").exists());
    assert!(run_dir.join("forecasts.csv").exists());
    assert!(run_dir.join("fits.csv").exists());
    assert!(run_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("NEWT_"));

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.target, result.target);
    assert_eq!(loaded.records.len(), result.records.len());
    assert_eq!(loaded.dataset_hash, result.dataset_hash);
    assert_eq!(loaded.config, result.config);

    let forecasts = std::fs::read_to_string(run_dir.join("forecasts.csv")).unwrap();
    assert_eq!(forecasts.lines().count(), result.records.len() + 1);
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let universe_path = write_temp(&dir, "universe.csv", UNIVERSE);
    let records = load_universe_file(&universe_path).unwrap().records;
    let mut config = q1_config();
    config.data.synthetic_fallback = true;

    let mut result = run_pipeline(&config, &records, None).unwrap();
    result.schema_version = SCHEMA_VERSION + 1;
    let json = export_json(&result).unwrap();
    let err = import_json(&json).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version"));
}

#[test]
fn quarterly_universe_selects_each_peer_once_by_latest_report() {
    // Cutoff for a 2024-01-01 listing is 2023-11-17.
    let csv = "\
gvkey,tic,datadate,ipodate,gsector,mkvaltq,rdq
1,PEER,2023-03-31,2018-02-01,45,100,2023-05-01
1,PEER,2023-06-30,2018-02-01,45,100,2023-08-01
1,PEER,2023-09-30,2018-02-01,45,100,2023-12-10
2,DUAL,2023-03-31,2019-02-01,45,105,2023-05-02
2,DUAL,2023-06-30,2019-02-01,45,104,2023-08-02
3,OTHER,2023-06-30,2020-02-01,45,150,2023-08-03
4,TGT,2023-12-31,2024-01-01,45,100,2024-02-15
";
    let load = load_universe_csv(csv.as_bytes()).unwrap();
    assert_eq!(load.records.len(), 4);

    let peers = select_peers(&load.records, "TGT", 3, &SelectionConfig::default()).unwrap();
    assert_eq!(peers, vec!["DUAL".to_string(), "OTHER".to_string()]);
}

#[test]
fn artifact_dir_stays_inside_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let universe_path = write_temp(&dir, "universe.csv", UNIVERSE);
    let records = load_universe_file(&universe_path).unwrap().records;
    let mut config = q1_config();
    config.data.synthetic_fallback = true;

    let mut result = run_pipeline(&config, &records, None).unwrap();
    result.target = "../../ESC/APE.B".to_string();

    let out = dir.path().join("out");
    let run_dir = save_artifacts(&result, &out).unwrap();
    assert_eq!(run_dir.parent(), Some(out.as_path()));
    let name = run_dir.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("______ESC_APE_B_"));
    assert!(run_dir.join("manifest.json").exists());
}
