//! End-to-end runs of the ingestion pipeline against in-memory sources.
//!
//! Each test writes into its own temp directory and drives `run_once` with a
//! `StaticSource`, so no network is involved.

use chrono::NaiveDate;
use normseries_core::data::StaticSource;
use normseries_core::{
    run_once, IngestConfig, IngestError, MergeOutcome, ResumePolicy, SeriesDocument, SeriesStore,
    StoreError,
};
use std::path::Path;

const HEADER: &str = "Date,Open,High,Low,Close,Volume\n";

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn csv(rows: &[(&str, &str)]) -> String {
    let mut text = String::from(HEADER);
    for (d, close) in rows {
        text.push_str(&format!("{d},1,1,1,{close},100\n"));
    }
    text
}

fn config_in(dir: &Path) -> IngestConfig {
    IngestConfig {
        output: dir.join("data/series.json"),
        ..IngestConfig::default()
    }
}

fn source(voo: &[(&str, &str)], qqq: &[(&str, &str)]) -> StaticSource {
    StaticSource::new()
        .with("voo.us", csv(voo))
        .with("qqq.us", csv(qqq))
}

fn load(config: &IngestConfig) -> SeriesDocument {
    SeriesStore::from_config(config).load().unwrap()
}

#[test]
fn first_run_appends_from_base_date() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let src = source(
        &[("2025-10-14", "279.0"), ("2025-10-15", "280.00"), ("2025-10-16", "288.60")],
        &[("2025-10-15", "600.0"), ("2025-10-16", "612.0"), ("2025-10-14", "598.0")],
    );

    let summary = run_once(&config, &src, false).unwrap();

    assert_eq!(
        summary.outcome,
        MergeOutcome::Appended {
            count: 2,
            last: date("2025-10-16")
        }
    );
    assert!(summary.persisted);
    assert_eq!(summary.total_rows, 2);

    let doc = load(&config);
    assert_eq!(doc.base_date, date("2025-10-15"));
    assert_eq!(doc.voo_base_close, Some(280.0));
    assert_eq!(doc.qqq_base_close, Some(600.0));
    assert_eq!(doc.series[1].voo_n, 1.030714);
    assert_eq!(doc.series[1].qqq_n, 1.02);
}

#[test]
fn repeated_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let src = source(
        &[("2025-10-15", "100"), ("2025-10-16", "110")],
        &[("2025-10-15", "100"), ("2025-10-16", "110")],
    );

    run_once(&config, &src, false).unwrap();
    let first = std::fs::read_to_string(&config.output).unwrap();

    let summary = run_once(&config, &src, false).unwrap();
    assert_eq!(summary.outcome, MergeOutcome::NoNewRows);
    assert!(!summary.persisted);
    assert_eq!(std::fs::read_to_string(&config.output).unwrap(), first);
    assert_eq!(load(&config).series[1].voo_n, 1.1);
}

#[test]
fn base_pending_creates_document_and_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let src = source(&[("2025-10-14", "279.0")], &[("2025-10-14", "598.0")]);

    let summary = run_once(&config, &src, false).unwrap();

    assert!(matches!(summary.outcome, MergeOutcome::BasePending { .. }));
    assert!(summary.persisted);
    let doc = load(&config);
    assert!(doc.voo_base_close.is_none());
    assert!(doc.qqq_base_close.is_none());
    assert!(doc.series.is_empty());
}

#[test]
fn base_close_filled_later_then_rows_follow() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    // Only QQQ has published the base date so far.
    let early = source(&[("2025-10-14", "279.0")], &[("2025-10-15", "600.0")]);
    run_once(&config, &early, false).unwrap();
    let doc = load(&config);
    assert!(doc.voo_base_close.is_none());
    assert_eq!(doc.qqq_base_close, Some(600.0));

    let later = source(
        &[("2025-10-15", "280.0"), ("2025-10-16", "284.0")],
        &[("2025-10-15", "999.0"), ("2025-10-16", "606.0")],
    );
    let summary = run_once(&config, &later, false).unwrap();
    assert!(matches!(summary.outcome, MergeOutcome::Appended { count: 2, .. }));

    let doc = load(&config);
    // QQQ base was set on the earlier run and must not change.
    assert_eq!(doc.qqq_base_close, Some(600.0));
    assert_eq!(doc.series[1].qqq_n, 1.01);
}

#[test]
fn fetch_failure_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let src = StaticSource::new().with("voo.us", csv(&[("2025-10-15", "280.0")]));

    let err = run_once(&config, &src, false).unwrap_err();

    assert!(matches!(err, IngestError::Fetch(_)));
    assert!(!config.output.exists());
}

#[test]
fn corrupt_state_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::create_dir_all(config.output.parent().unwrap()).unwrap();
    std::fs::write(&config.output, "[1, 2").unwrap();
    let src = source(&[("2025-10-15", "100")], &[("2025-10-15", "100")]);

    let err = run_once(&config, &src, false).unwrap_err();

    assert!(matches!(err, IngestError::Store(StoreError::Corrupt { .. })));
    assert_eq!(std::fs::read_to_string(&config.output).unwrap(), "[1, 2");
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let src = source(&[("2025-10-15", "100")], &[("2025-10-15", "100")]);

    let summary = run_once(&config, &src, true).unwrap();

    assert!(matches!(summary.outcome, MergeOutcome::Appended { count: 1, .. }));
    assert!(!summary.persisted);
    assert!(!config.output.exists());
}

#[test]
fn strict_policy_aborts_on_trimmed_history() {
    let dir = tempfile::tempdir().unwrap();
    let config = IngestConfig {
        resume: ResumePolicy::Strict,
        ..config_in(dir.path())
    };
    let full = source(
        &[("2025-10-15", "100"), ("2025-10-16", "101")],
        &[("2025-10-15", "100"), ("2025-10-16", "101")],
    );
    run_once(&config, &full, false).unwrap();
    let before = std::fs::read_to_string(&config.output).unwrap();

    let trimmed = source(&[("2025-10-17", "102")], &[("2025-10-17", "102")]);
    let err = run_once(&config, &trimmed, false).unwrap_err();

    assert!(matches!(err, IngestError::Merge(_)));
    assert_eq!(std::fs::read_to_string(&config.output).unwrap(), before);
}

#[test]
fn stored_base_date_wins_over_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let src = source(
        &[("2025-10-15", "100"), ("2025-10-16", "110")],
        &[("2025-10-15", "100"), ("2025-10-16", "110")],
    );
    run_once(&config, &src, false).unwrap();

    let moved = IngestConfig {
        base_date: date("2025-10-16"),
        ..config.clone()
    };
    let summary = run_once(&moved, &src, false).unwrap();

    assert_eq!(summary.outcome, MergeOutcome::NoNewRows);
    assert_eq!(load(&moved).base_date, date("2025-10-15"));
}

#[test]
fn no_data_body_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let src = StaticSource::new()
        .with("voo.us", "No data")
        .with("qqq.us", csv(&[("2025-10-15", "100")]));

    let err = run_once(&config, &src, false).unwrap_err();
    assert!(matches!(err, IngestError::Parse(_)));
    assert!(!config.output.exists());
}
