// ===============================
// src/report.rs
// ===============================
//
// Menyusun hasil run jadi satu struktur data polos (JSON) + ringkasan konsol.
// Final PnL headline selalu dari ledger eksternal, bukan dari tracker;
// selisih keduanya dilaporkan apa adanya sebagai `reconciliation_gap`.
//
use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write;

use crate::domain::{PositionState, RealizedPnlEvent};
use crate::posttrade::{FillSummary, LedgerSummary, OrderSummary};
use crate::positions::{OversellPolicy, TrackerOutput};
use crate::risk::{RiskMetrics, RiskReport};

#[derive(Debug, Clone, Serialize)]
pub struct OpenPosition {
    pub symbol: String,
    #[serde(flatten)]
    pub state: PositionState,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerSection {
    pub oversell_policy: OversellPolicy,
    pub realized_events: Vec<RealizedPnlEvent>,
    pub realized_total: Decimal,
    pub positions: Vec<OpenPosition>,
    pub rejected_fills: usize,
}

impl TrackerSection {
    pub fn from_output(out: &TrackerOutput, policy: OversellPolicy) -> Self {
        Self {
            oversell_policy: policy,
            realized_events: out.realized.clone(),
            realized_total: out.realized_total(),
            positions: out
                .sorted_positions()
                .into_iter()
                .map(|(symbol, state)| OpenPosition { symbol, state })
                .collect(),
            rejected_fills: out.rejected_fills,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub ledger_net_pnl: f64,
    pub tracker_realized_total: f64,
    /// ledger net minus tracker realized; not an error, just unreconciled.
    pub reconciliation_gap: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Headline {
    pub final_pnl: f64,
    pub net_pnl: f64,
    pub has_ledger: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: NaiveDateTime,
    pub headline: Headline,
    pub fills: FillSummary,
    pub orders: Option<OrderSummary>,
    pub ledger: Option<LedgerSummary>,
    pub risk: RiskMetrics,
    pub rolling_sharpe: Vec<(NaiveDateTime, f64)>,
    pub tracker: TrackerSection,
    pub reconciliation: Reconciliation,
}

impl AnalysisReport {
    pub fn build(
        generated_at: NaiveDateTime,
        fills: FillSummary,
        orders: Option<OrderSummary>,
        ledger: Option<LedgerSummary>,
        risk: &RiskReport,
        rolling_sharpe: Vec<(NaiveDateTime, f64)>,
        tracker: TrackerSection,
    ) -> Self {
        let has_ledger = !risk.metrics.is_empty();
        // tanpa ledger: fallback ke ringkasan pnl, lalu 0
        let (final_pnl, net_pnl) = if has_ledger {
            (risk.metrics.final_pnl, risk.metrics.net_pnl)
        } else {
            ledger.as_ref().map_or((0.0, 0.0), |l| (l.final_pnl, l.net_pnl))
        };
        let tracker_realized_total = tracker.realized_total.to_f64().unwrap_or(0.0);

        Self {
            generated_at,
            headline: Headline { final_pnl, net_pnl, has_ledger },
            fills,
            orders,
            ledger,
            risk: risk.metrics.clone(),
            rolling_sharpe,
            reconciliation: Reconciliation {
                ledger_net_pnl: net_pnl,
                tracker_realized_total,
                reconciliation_gap: net_pnl - tracker_realized_total,
            },
            tracker,
        }
    }
}

fn na_or(has: bool, v: String) -> String {
    if has { v } else { "N/A".to_string() }
}

/// Console executive summary.
pub fn render_summary(r: &AnalysisReport) -> String {
    let has = r.headline.has_ledger;
    let m = &r.risk;
    let line = "=".repeat(80);
    let mut s = String::new();
    let _ = writeln!(s, "{line}\nEXECUTIVE SUMMARY\n{line}");
    let _ = writeln!(s, "Final P&L: ${:.2}", r.headline.final_pnl);
    let _ = writeln!(s, "Net P&L: ${:.2}", r.headline.net_pnl);
    let _ = writeln!(s, "Total Trades: {}", r.fills.total_trades);
    let _ = writeln!(s, "Sharpe Ratio: {}", na_or(has, format!("{:.4}", m.sharpe_ratio)));
    let _ = writeln!(
        s,
        "Max Drawdown: {}",
        na_or(has, format!("${:.2} ({:.2}%)", m.max_drawdown, m.max_drawdown_pct))
    );
    let _ = writeln!(s, "Win Rate: {}", na_or(has, format!("{:.2}%", m.win_rate)));
    let pf = if has && m.gross_loss == 0.0 && m.gross_profit > 0.0 {
        format!("{:.4} (no losing periods)", m.profit_factor)
    } else {
        na_or(has, format!("{:.4}", m.profit_factor))
    };
    let _ = writeln!(s, "Profit Factor: {pf}");
    let _ = writeln!(
        s,
        "Tracker Realized P&L: ${:.2} (gap vs ledger: ${:.2})",
        r.reconciliation.tracker_realized_total, r.reconciliation.reconciliation_gap
    );
    let open: Vec<String> = r
        .tracker
        .positions
        .iter()
        .filter(|p| !p.state.is_flat())
        .map(|p| format!("{} {}@{}", p.symbol, p.state.quantity, p.state.avg_price))
        .collect();
    let _ = writeln!(s, "Open Positions: {}", if open.is_empty() { "none".to_string() } else { open.join(", ") });
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LedgerPoint;
    use crate::risk;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ts(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn tracker_with(pnl: Decimal) -> TrackerSection {
        let mut out = TrackerOutput::default();
        out.realized.push(RealizedPnlEvent {
            time: ts(1),
            symbol: "AAPL".into(),
            kind: crate::domain::PnlKind::Realized,
            pnl,
            closed_qty: -1,
            price: dec!(1),
        });
        out.positions.insert("AAPL".into(), PositionState { quantity: 5, avg_price: dec!(10), total_cost: dec!(0) });
        TrackerSection::from_output(&out, OversellPolicy::Truncate)
    }

    #[test]
    fn headline_comes_from_ledger_and_gap_is_reported() {
        let rr = risk::compute(&[
            LedgerPoint { time: ts(1), cumulative_pnl: 100.0 },
            LedgerPoint { time: ts(2), cumulative_pnl: 130.0 },
        ]);
        let r = AnalysisReport::build(ts(3), FillSummary::default(), None, None, &rr, vec![], tracker_with(dec!(12.5)));
        assert_eq!(r.headline.final_pnl, 130.0);
        assert_eq!(r.headline.net_pnl, 30.0);
        assert_eq!(r.reconciliation.tracker_realized_total, 12.5);
        assert_eq!(r.reconciliation.reconciliation_gap, 17.5);

        let text = render_summary(&r);
        assert!(text.contains("Final P&L: $130.00"));
        assert!(text.contains("AAPL 5@10"));
    }

    #[test]
    fn empty_ledger_renders_na() {
        let rr = risk::compute(&[]);
        let r = AnalysisReport::build(ts(3), FillSummary::default(), None, None, &rr, vec![], tracker_with(dec!(0)));
        assert!(!r.headline.has_ledger);
        assert_eq!(r.headline.final_pnl, 0.0);
        let text = render_summary(&r);
        assert!(text.contains("Sharpe Ratio: N/A"));
        assert!(text.contains("Win Rate: N/A"));

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["risk"]["sharpe_ratio"], 0.0);
        assert_eq!(json["tracker"]["positions"][0]["symbol"], "AAPL");
        assert_eq!(json["tracker"]["positions"][0]["quantity"], 5);
    }
}
