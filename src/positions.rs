// ===============================
// src/positions.rs (realized PnL & inventory tracker)
// ===============================
//
// Replay fill secara kronologis, satu PositionState per symbol, average-cost basis.
// Kebijakan yang dipertahankan:
// - buy saat flat/short -> buka long baru (qty = qty buy), short leg tidak di-realize
// - sell saat flat/short -> short extension, avg_price ditimpa harga terakhir
// - sell melebihi long  -> lihat `OversellPolicy`
//
use ahash::AHashMap as HashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{Fill, PnlKind, PositionState, RealizedPnlEvent};
use crate::metrics::{FILLS, FILLS_REJECTED, PNL_REALIZED, POSITION_QTY, REALIZED_EVENTS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("no fill data to replay")]
    MissingInput,
}

/// What happens to the part of a sell that exceeds the current long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OversellPolicy {
    /// Only the covered part is closed; the excess is dropped.
    #[default]
    Truncate,
    /// The excess opens a new short at the fill price.
    FlipShort,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackerOutput {
    pub realized: Vec<RealizedPnlEvent>,
    pub positions: HashMap<String, PositionState>,
    pub rejected_fills: usize,
}

impl TrackerOutput {
    pub fn realized_total(&self) -> Decimal {
        self.realized.iter().map(|e| e.pnl).sum()
    }

    pub fn realized_by_symbol(&self) -> HashMap<String, Decimal> {
        let mut out: HashMap<String, Decimal> = HashMap::new();
        for ev in &self.realized {
            *out.entry(ev.symbol.clone()).or_default() += ev.pnl;
        }
        out
    }

    /// Open positions sorted by symbol, flat ones included.
    pub fn sorted_positions(&self) -> Vec<(String, PositionState)> {
        let mut v: Vec<_> = self.positions.iter().map(|(k, p)| (k.clone(), p.clone())).collect();
        v.sort_by(|a, b| a.0.cmp(&b.0));
        v
    }
}

pub struct PositionTracker {
    policy: OversellPolicy,
    positions: HashMap<String, PositionState>,
    realized: Vec<RealizedPnlEvent>,
    rejected: usize,
}

impl PositionTracker {
    pub fn new(policy: OversellPolicy) -> Self {
        Self { policy, positions: HashMap::new(), realized: Vec::new(), rejected: 0 }
    }

    pub fn position(&self, symbol: &str) -> Option<&PositionState> {
        self.positions.get(symbol)
    }

    pub fn realized(&self) -> &[RealizedPnlEvent] {
        &self.realized
    }

    /// Apply one fill. Returns the realized event it produced, if any.
    pub fn on_fill(&mut self, fill: &Fill) -> Option<RealizedPnlEvent> {
        if fill.signed_qty == 0 {
            warn!(symbol = %fill.symbol, time = %fill.time, "zero-quantity fill skipped");
            self.rejected += 1;
            FILLS_REJECTED.inc();
            return None;
        }
        FILLS.inc();

        let pos = self.positions.entry(fill.symbol.clone()).or_default();
        let event = if fill.signed_qty < 0 {
            Self::apply_sell(pos, fill, self.policy)
        } else {
            Self::apply_buy(pos, fill);
            None
        };

        POSITION_QTY.with_label_values(&[&fill.symbol]).set(pos.quantity);
        if let Some(ev) = &event {
            debug!(symbol = %ev.symbol, pnl = %ev.pnl, closed = ev.closed_qty, "realized");
            REALIZED_EVENTS.inc();
            PNL_REALIZED
                .with_label_values(&[&ev.symbol])
                .add(rust_decimal::prelude::ToPrimitive::to_f64(&ev.pnl).unwrap_or(0.0));
            self.realized.push(ev.clone());
        }
        event
    }

    fn apply_sell(pos: &mut PositionState, fill: &Fill, policy: OversellPolicy) -> Option<RealizedPnlEvent> {
        let sell_qty = fill.signed_qty.abs();

        if pos.quantity <= 0 {
            // short extension: tidak ada PnL, avg ditimpa (bukan weighted)
            pos.quantity -= sell_qty;
            pos.avg_price = fill.price;
            pos.total_cost += fill.execution_cost;
            return None;
        }

        let closed = sell_qty.min(pos.quantity);
        let pnl = (fill.price - pos.avg_price) * Decimal::from(closed) - fill.execution_cost;
        pos.quantity -= closed;
        if pos.quantity == 0 {
            pos.reset();
        }

        let excess = sell_qty - closed;
        if excess > 0 && policy == OversellPolicy::FlipShort {
            // cost sudah masuk ke realized pnl di atas
            pos.quantity = -excess;
            pos.avg_price = fill.price;
            pos.total_cost = Decimal::ZERO;
        }

        Some(RealizedPnlEvent {
            time: fill.time,
            symbol: fill.symbol.clone(),
            kind: PnlKind::Realized,
            pnl,
            closed_qty: -closed,
            price: fill.price,
        })
    }

    fn apply_buy(pos: &mut PositionState, fill: &Fill) {
        if pos.quantity <= 0 {
            // flat atau cover short -> long baru
            pos.quantity = fill.signed_qty;
            pos.avg_price = fill.price;
            pos.total_cost = fill.execution_cost;
        } else {
            let held = Decimal::from(pos.quantity);
            let added = Decimal::from(fill.signed_qty);
            pos.avg_price = (held * pos.avg_price + added * fill.price) / (held + added);
            pos.quantity += fill.signed_qty;
            pos.total_cost += fill.execution_cost;
        }
    }

    pub fn finish(self) -> TrackerOutput {
        TrackerOutput { realized: self.realized, positions: self.positions, rejected_fills: self.rejected }
    }
}

/// Replay `fills` and return realized events plus the final position per symbol.
///
/// Input is stable-sorted by time first, so callers may pass unordered fills.
pub fn process(fills: &[Fill], policy: OversellPolicy) -> Result<TrackerOutput, TrackerError> {
    if fills.is_empty() {
        return Err(TrackerError::MissingInput);
    }

    let mut ordered: Vec<&Fill> = fills.iter().collect();
    ordered.sort_by_key(|f| f.time);

    let mut tracker = PositionTracker::new(policy);
    for fill in ordered {
        tracker.on_fill(fill);
    }
    let out = tracker.finish();
    info!(
        fills = fills.len(),
        symbols = out.positions.len(),
        realized_events = out.realized.len(),
        rejected = out.rejected_fills,
        realized_total = %out.realized_total(),
        "tracker: replay done"
    );
    Ok(out)
}
