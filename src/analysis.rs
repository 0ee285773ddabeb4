// ===============================
// src/analysis.rs
// ===============================
//
// Satu run analisis: tabel yang sudah di-load -> tracker + risk (paralel,
// tidak berbagi state) -> ringkasan -> report. Output file ditulis terpisah
// lewat `write_outputs`.
//
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Args;
use crate::feed::{self, FeedError, LoadedTables};
use crate::metrics;
use crate::positions::{self, OversellPolicy, TrackerError, TrackerOutput};
use crate::posttrade;
use crate::recorder::{self, Record, RecorderError};
use crate::report::{AnalysisReport, TrackerSection};
use crate::risk::{self, RiskReport, ROLLING_SHARPE_WINDOW};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no CSV files found in {0}")]
    NoInputs(String),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error("report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
    #[error("output write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("pipeline task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Explicit files if given, otherwise discovery in `input_dir`.
pub fn resolve_inputs(args: &Args) -> Result<Vec<PathBuf>, AnalysisError> {
    let files = if args.files.is_empty() {
        feed::discover(&args.input_dir, &args.name_filter)?
    } else {
        args.files.clone()
    };
    if files.is_empty() {
        return Err(AnalysisError::NoInputs(args.input_dir.display().to_string()));
    }
    for f in &files {
        info!(file = %f.display(), "input");
    }
    Ok(files)
}

pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub tracker: TrackerOutput,
    pub risk: RiskReport,
}

pub struct Analyzer {
    tables: LoadedTables,
    policy: OversellPolicy,
}

impl Analyzer {
    pub fn new(tables: LoadedTables, policy: OversellPolicy) -> Self {
        Self { tables, policy }
    }

    pub async fn run(self) -> Result<AnalysisOutcome, AnalysisError> {
        let Analyzer { tables, policy } = self;

        let fill_summary = posttrade::summarize_fills(&tables.fills);
        let order_summary = tables.orders.as_deref().map(posttrade::summarize_orders);
        let ledger_summary = tables.ledger.as_deref().and_then(posttrade::summarize_ledger);
        posttrade::log_summaries(&fill_summary, order_summary.as_ref(), ledger_summary.as_ref());

        let fills = tables.fills;
        let ledger = tables.ledger.unwrap_or_default();
        if ledger.is_empty() {
            warn!("no pnl ledger data, risk metrics will be placeholders");
        }

        // dua pipeline independen, jalan di blocking pool
        let tracker_task = tokio::task::spawn_blocking(move || positions::process(&fills, policy));
        let risk_task = tokio::task::spawn_blocking(move || {
            let report = risk::compute(&ledger);
            let rolling = risk::rolling_sharpe(&report.series, ROLLING_SHARPE_WINDOW);
            (report, rolling)
        });
        let (tracker_res, risk_res) = tokio::join!(tracker_task, risk_task);
        let tracker = tracker_res??;
        let (risk_report, rolling) = risk_res?;

        let report = AnalysisReport::build(
            Utc::now().naive_utc(),
            fill_summary,
            order_summary,
            ledger_summary,
            &risk_report,
            rolling,
            TrackerSection::from_output(&tracker, policy),
        );
        Ok(AnalysisOutcome { report, tracker, risk: risk_report })
    }
}

/// Write the JSON report, optional JSONL records and optional metrics textfile.
pub async fn write_outputs(
    outcome: &AnalysisOutcome,
    report_path: &Path,
    record_file: Option<&Path>,
    metrics_file: Option<&Path>,
) -> Result<(), AnalysisError> {
    let body = serde_json::to_vec_pretty(&outcome.report)?;
    if let Some(parent) = report_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(report_path, body).await?;
    info!(path = %report_path.display(), "report saved");

    if let Some(path) = record_file {
        let (tx, rx) = mpsc::channel::<Record>(8192);
        let handle = tokio::spawn(recorder::run(rx, path.display().to_string()));
        for ev in &outcome.tracker.realized {
            if tx.send(Record::Realized(ev.clone())).await.is_err() {
                break;
            }
        }
        for (symbol, state) in outcome.tracker.sorted_positions() {
            if tx.send(Record::Position { symbol, state }).await.is_err() {
                break;
            }
        }
        for pt in &outcome.risk.series {
            if tx.send(Record::Series(pt.clone())).await.is_err() {
                break;
            }
        }
        drop(tx);
        handle.await??;
    }

    if let Some(path) = metrics_file {
        metrics::write_textfile(path)?;
        info!(path = %path.display(), "metrics textfile written");
    }
    Ok(())
}

/// Full run as the binary performs it: resolve, load, analyze, write.
pub async fn run_from_args(args: &Args) -> Result<AnalysisOutcome, AnalysisError> {
    let inputs = resolve_inputs(args)?;
    let tables = feed::load(&inputs)?;
    let outcome = Analyzer::new(tables, args.oversell_policy).run().await?;
    write_outputs(
        &outcome,
        &args.report_path(&inputs),
        args.record_file.as_deref(),
        args.metrics_file.as_deref(),
    )
    .await?;
    Ok(outcome)
}
