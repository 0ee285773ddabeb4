// ===============================
// src/risk.rs
// ===============================
//
// Risk metrics dari ledger cumulative PnL (eksternal, bukan dari tracker).
// Semua pembagian dengan nol di-resolve eksplisit ke 0.0 lewat guard,
// tidak mengandalkan NaN/inf dari f64.
//
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::LedgerPoint;
use crate::metrics::{
    LEDGER_FINAL_PNL, LEDGER_POINTS, MAX_DRAWDOWN, PROFIT_FACTOR, SHARPE, VOLATILITY, WIN_RATE,
};
use crate::stats;

/// Fixed annualization: ~252 ticks per "year" regardless of tick resolution.
pub const PERIODS_PER_YEAR: f64 = 252.0;
pub const ROLLING_SHARPE_WINDOW: usize = 20;

/// Named fallback for every degenerate ratio.
const DEGENERATE: f64 = 0.0;

fn annualization() -> f64 {
    PERIODS_PER_YEAR.sqrt()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub total_points: usize,
    pub initial_pnl: f64,
    pub final_pnl: f64,
    pub net_pnl: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub avg_drawdown: f64,
    pub sharpe_ratio: f64,
    pub volatility: f64,
    pub mean_return: f64,
    pub std_return: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub winning_periods: usize,
    pub losing_periods: usize,
    pub total_periods: usize,
}

impl RiskMetrics {
    /// True for the zero snapshot of an empty ledger; reporting shows N/A.
    pub fn is_empty(&self) -> bool {
        self.total_points == 0
    }
}

/// One ledger point decorated for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time: NaiveDateTime,
    pub cumulative_pnl: f64,
    /// None on the first point.
    pub pnl_change: Option<f64>,
    #[serde(rename = "return")]
    pub ret: f64,
    pub running_max: f64,
    pub drawdown: f64,
    /// None while the running max is zero.
    pub drawdown_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub metrics: RiskMetrics,
    pub series: Vec<SeriesPoint>,
}

fn period_return(change: f64, prev: f64) -> f64 {
    if prev == 0.0 {
        return DEGENERATE;
    }
    change / prev.abs()
}

fn drawdown_pct(drawdown: f64, running_max: f64) -> Option<f64> {
    if running_max == 0.0 {
        return None;
    }
    Some(100.0 * drawdown / running_max)
}

fn ratio_or_zero(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return DEGENERATE;
    }
    num / den
}

/// Sort (stable) and decorate the ledger: changes, returns, running max, drawdown.
pub fn decorate(ledger: &[LedgerPoint]) -> Vec<SeriesPoint> {
    let mut sorted = ledger.to_vec();
    sorted.sort_by_key(|p| p.time);

    let mut out = Vec::with_capacity(sorted.len());
    let mut running_max = f64::NEG_INFINITY;
    let mut prev: Option<f64> = None;
    for p in &sorted {
        running_max = running_max.max(p.cumulative_pnl);
        let pnl_change = prev.map(|pv| p.cumulative_pnl - pv);
        let ret = match (pnl_change, prev) {
            (Some(ch), Some(pv)) => period_return(ch, pv),
            _ => DEGENERATE,
        };
        let drawdown = p.cumulative_pnl - running_max;
        out.push(SeriesPoint {
            time: p.time,
            cumulative_pnl: p.cumulative_pnl,
            pnl_change,
            ret,
            running_max,
            drawdown,
            drawdown_pct: drawdown_pct(drawdown, running_max),
        });
        prev = Some(p.cumulative_pnl);
    }
    out
}

/// Compute the risk snapshot. An empty ledger yields the all-zero snapshot.
pub fn compute(ledger: &[LedgerPoint]) -> RiskReport {
    if ledger.is_empty() {
        warn!("risk: empty pnl ledger, metrics default to zero");
        return RiskReport::default();
    }

    let series = decorate(ledger);
    let metrics = summarize(&series);
    info!(
        points = metrics.total_points,
        sharpe = metrics.sharpe_ratio,
        max_dd = metrics.max_drawdown,
        win_rate = metrics.win_rate,
        profit_factor = metrics.profit_factor,
        "risk: metrics computed"
    );
    export(&metrics);
    RiskReport { metrics, series }
}

fn summarize(series: &[SeriesPoint]) -> RiskMetrics {
    let (first, last) = match (series.first(), series.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return RiskMetrics::default(),
    };

    let returns: Vec<f64> = series.iter().map(|p| p.ret).collect();
    let mean_return = stats::mean(&returns);
    let std_return = stats::std_dev(&returns);
    let (sharpe_ratio, volatility) = if std_return == 0.0 {
        (DEGENERATE, DEGENERATE)
    } else {
        (mean_return / std_return * annualization(), std_return * annualization())
    };

    let drawdowns: Vec<f64> = series.iter().map(|p| p.drawdown).collect();
    let max_drawdown = stats::min(&drawdowns);
    let pcts: Vec<f64> = series.iter().filter_map(|p| p.drawdown_pct).collect();
    let max_drawdown_pct = stats::min(&pcts);
    let underwater: Vec<f64> = drawdowns.iter().copied().filter(|d| *d < 0.0).collect();
    let avg_drawdown = stats::mean(&underwater);

    let changes: Vec<f64> = series.iter().filter_map(|p| p.pnl_change).collect();
    let winning_periods = changes.iter().filter(|c| **c > 0.0).count();
    let losing_periods = changes.iter().filter(|c| **c < 0.0).count();
    let total_periods = winning_periods + losing_periods;
    let win_rate = ratio_or_zero(winning_periods as f64, total_periods as f64) * 100.0;

    let gross_profit: f64 = changes.iter().filter(|c| **c > 0.0).sum();
    let gross_loss: f64 = changes.iter().filter(|c| **c < 0.0).sum::<f64>().abs();
    // no losses -> 0, not infinity
    let profit_factor = ratio_or_zero(gross_profit, gross_loss);

    RiskMetrics {
        total_points: series.len(),
        initial_pnl: first.cumulative_pnl,
        final_pnl: last.cumulative_pnl,
        net_pnl: last.cumulative_pnl - first.cumulative_pnl,
        max_drawdown,
        max_drawdown_pct,
        avg_drawdown,
        sharpe_ratio,
        volatility,
        mean_return,
        std_return,
        win_rate,
        profit_factor,
        gross_profit,
        gross_loss,
        winning_periods,
        losing_periods,
        total_periods,
    }
}

fn export(m: &RiskMetrics) {
    LEDGER_POINTS.set(m.total_points as i64);
    LEDGER_FINAL_PNL.set(m.final_pnl);
    SHARPE.set(m.sharpe_ratio);
    MAX_DRAWDOWN.set(m.max_drawdown);
    VOLATILITY.set(m.volatility);
    WIN_RATE.set(m.win_rate);
    PROFIT_FACTOR.set(m.profit_factor);
}

/// Simple return against the signed previous value, the way the rolling
/// chart measures it. None when the previous value is 0.
fn signed_return(prev: &SeriesPoint, cur: &SeriesPoint) -> Option<f64> {
    let r = (cur.cumulative_pnl - prev.cumulative_pnl) / prev.cumulative_pnl;
    r.is_finite().then_some(r)
}

/// Trailing-window annualized Sharpe over the period returns (first point excluded).
///
/// Unlike the headline Sharpe, returns here divide by the signed previous value,
/// so a ledger below zero flips the sign. Windows touching an undefined return
/// or with zero std are omitted.
pub fn rolling_sharpe(series: &[SeriesPoint], max_window: usize) -> Vec<(NaiveDateTime, f64)> {
    let periods: Vec<(NaiveDateTime, Option<f64>)> =
        series.windows(2).map(|w| (w[1].time, signed_return(&w[0], &w[1]))).collect();
    let window = max_window.min(periods.len());
    if window <= 1 || periods.len() <= window {
        return Vec::new();
    }

    periods
        .windows(window)
        .filter_map(|w| {
            let rets: Vec<f64> = w.iter().map(|(_, r)| *r).collect::<Option<_>>()?;
            let sd = stats::std_dev(&rets);
            if sd == 0.0 {
                return None;
            }
            let (end, _) = w.last()?;
            Some((*end, stats::mean(&rets) / sd * annualization()))
        })
        .collect()
}
