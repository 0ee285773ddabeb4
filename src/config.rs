// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : backtest_pnl_rust — P&L and risk analytics for backtest fills
Module  : config.rs
Version : 0.5.0
License : MIT

Summary : Loads fill / order / pnl CSV tables from a backtest, replays fills
          into per-symbol positions (average cost, realized PnL), computes
          risk metrics from the cumulative PnL ledger, and writes a JSON
          report, JSONL records and a Prometheus textfile.
=============================================================================
*/
use clap::Parser;
use dotenvy::dotenv;
use std::path::{Path, PathBuf};

use crate::positions::OversellPolicy;

pub const DEFAULT_REPORT_NAME: &str = "hft_backtest_report.json";

#[derive(Parser, Clone, Debug)]
#[command(name = "backtest_pnl_rust", version, about = "P&L and risk metrics for backtest fills")]
pub struct Args {
    /// CSV files to analyze (fill / order / pnl, classified by file name).
    /// When empty, files are discovered in --input-dir.
    pub files: Vec<PathBuf>,

    #[arg(long, env = "INPUT_DIR", default_value = ".")]
    pub input_dir: PathBuf,

    /// Only discovered files whose name contains this (case-insensitive).
    #[arg(long, env = "NAME_FILTER", default_value = "BACK")]
    pub name_filter: String,

    /// JSON report path (default: next to the first input file).
    #[arg(long, env = "REPORT_FILE")]
    pub report_file: Option<PathBuf>,

    /// JSONL output for realized events, positions and ledger series.
    #[arg(long, env = "RECORD_FILE")]
    pub record_file: Option<PathBuf>,

    /// Prometheus textfile output.
    #[arg(long, env = "METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,

    #[arg(long, env = "OVERSELL_POLICY", value_enum, default_value_t = OversellPolicy::Truncate)]
    pub oversell_policy: OversellPolicy,

    /// tracing EnvFilter directive, e.g. `info` or `backtest_pnl_rust=debug`.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Report path: explicit, else beside the first input.
    pub fn report_path(&self, inputs: &[PathBuf]) -> PathBuf {
        if let Some(p) = &self.report_file {
            return p.clone();
        }
        inputs
            .first()
            .and_then(|p| p.parent())
            .unwrap_or_else(|| Path::new("."))
            .join(DEFAULT_REPORT_NAME)
    }
}

pub fn load() -> Args {
    // Pastikan .env dibaca sebelum clap membaca ENV
    let _ = dotenv();
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_flags() {
        let a = Args::try_parse_from(["backtest_pnl_rust"]).unwrap();
        assert!(a.files.is_empty());
        assert_eq!(a.oversell_policy, OversellPolicy::Truncate);

        let a = Args::try_parse_from([
            "backtest_pnl_rust",
            "--oversell-policy",
            "flip-short",
            "--record-file",
            "out/records.jsonl",
            "data/BACK_fill.csv",
        ])
        .unwrap();
        assert_eq!(a.oversell_policy, OversellPolicy::FlipShort);
        assert_eq!(a.files, vec![PathBuf::from("data/BACK_fill.csv")]);
        assert_eq!(a.report_path(&a.files), PathBuf::from("data").join(DEFAULT_REPORT_NAME));
    }

    #[test]
    fn explicit_report_path_wins() {
        let a = Args::try_parse_from(["x", "--report-file", "r.json", "d/BACK_fill.csv"]).unwrap();
        assert_eq!(a.report_path(&a.files), PathBuf::from("r.json"));
    }
}
