// ===============================
// src/main.rs
// ===============================
/*
 # analisa semua *BACK*.csv di direktori data
 INPUT_DIR=./data cargo run --release

 # file eksplisit + JSONL + textfile prometheus
 cargo run -- data/BACK_fill.csv data/BACK_pnl.csv \
     --record-file out/records.jsonl --metrics-file out/pnl.prom
*/
/*
=============================================================================
Project : backtest_pnl_rust — P&L and risk analytics for backtest fills
Module  : main.rs
Version : 0.5.0
License : MIT

Summary : Loads fill / order / pnl CSV tables from a backtest, replays fills
          into per-symbol positions (average cost, realized PnL), computes
          risk metrics from the cumulative PnL ledger, and writes a JSON
          report, JSONL records and a Prometheus textfile.
=============================================================================
*/
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use backtest_pnl_rust::{analysis, config, metrics, report};

#[tokio::main]
async fn main() -> ExitCode {
    // ---- Load config ----
    let args = config::load();

    // ---- Logging ----
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ---- Metrics ----
    metrics::init();

    info!(
        files = ?args.files,
        input_dir = %args.input_dir.display(),
        name_filter = %args.name_filter,
        oversell_policy = ?args.oversell_policy,
        "startup config"
    );

    match analysis::run_from_args(&args).await {
        Ok(outcome) => {
            println!("{}", report::render_summary(&outcome.report));
            info!("analysis complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(%e, "analysis failed");
            ExitCode::FAILURE
        }
    }
}
