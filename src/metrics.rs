// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Gauge, GaugeVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::path::Path;

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Ingestion --------
pub static ROWS_LOADED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("rows_loaded_total", "rows loaded per table"), &["table"]).unwrap()
});

pub static ROWS_DROPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rows_dropped_total", "malformed rows dropped per table"),
        &["table"],
    )
    .unwrap()
});

// -------- Tracker --------
pub static FILLS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("fills_processed_total", "fills replayed by the tracker").unwrap());

pub static FILLS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("fills_rejected_total", "zero-quantity fills skipped by the tracker").unwrap()
});

pub static REALIZED_EVENTS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("realized_events_total", "realized pnl events").unwrap());

pub static POSITION_QTY: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("position_qty", "net qty per symbol"), &["symbol"]).unwrap()
});

pub static PNL_REALIZED: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(Opts::new("pnl_realized", "realized PnL per symbol"), &["symbol"]).unwrap()
});

// -------- Risk --------
pub static LEDGER_POINTS: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("ledger_points", "cumulative pnl ledger points").unwrap());

pub static LEDGER_FINAL_PNL: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("ledger_final_pnl", "final cumulative pnl from the ledger").unwrap());

pub static SHARPE: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("risk_sharpe_ratio", "annualized sharpe ratio").unwrap());

pub static MAX_DRAWDOWN: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("risk_max_drawdown", "most negative drawdown").unwrap());

pub static VOLATILITY: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("risk_volatility", "annualized volatility of returns").unwrap());

pub static WIN_RATE: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("risk_win_rate_pct", "winning periods / decided periods * 100").unwrap());

pub static PROFIT_FACTOR: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("risk_profit_factor", "gross profit / gross loss (0 if no loss)").unwrap());

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(ROWS_LOADED.clone())),
        REGISTRY.register(Box::new(ROWS_DROPPED.clone())),
        REGISTRY.register(Box::new(FILLS.clone())),
        REGISTRY.register(Box::new(FILLS_REJECTED.clone())),
        REGISTRY.register(Box::new(REALIZED_EVENTS.clone())),
        REGISTRY.register(Box::new(POSITION_QTY.clone())),
        REGISTRY.register(Box::new(PNL_REALIZED.clone())),
        REGISTRY.register(Box::new(LEDGER_POINTS.clone())),
        REGISTRY.register(Box::new(LEDGER_FINAL_PNL.clone())),
        REGISTRY.register(Box::new(SHARPE.clone())),
        REGISTRY.register(Box::new(MAX_DRAWDOWN.clone())),
        REGISTRY.register(Box::new(VOLATILITY.clone())),
        REGISTRY.register(Box::new(WIN_RATE.clone())),
        REGISTRY.register(Box::new(PROFIT_FACTOR.clone())),
    ] {
        // AlreadyReg is fine when init() runs twice (tests)
        let _ = m;
    }
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

/// Write the exposition to `path` for a node-exporter textfile collector.
/// Written to a sibling temp file first so the collector never reads a partial file.
pub fn write_textfile(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, encode_metrics())?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textfile_contains_registered_metrics() {
        init();
        init();
        FILLS.inc();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("pnl.prom");
        write_textfile(&path).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("fills_processed_total"));
        assert!(!path.with_extension("prom.tmp").exists());
    }
}
