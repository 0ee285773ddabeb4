// ===============================
// src/domain.rs
// ===============================
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side { Buy, Sell }
impl Side {
    pub fn sign(&self) -> i64 { match self { Side::Buy => 1, Side::Sell => -1 } }
    pub fn of_qty(signed_qty: i64) -> Self { if signed_qty > 0 { Side::Buy } else { Side::Sell } }
    pub fn label(&self) -> &'static str { match self { Side::Buy => "BUY", Side::Sell => "SELL" } }
}

/// Satu eksekusi dari backtest. `signed_qty` positif = buy, negatif = sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: String,
    pub time: NaiveDateTime,
    pub signed_qty: i64,
    pub price: Decimal,
    pub execution_cost: Decimal,
}

impl Fill {
    pub fn side(&self) -> Side { Side::of_qty(self.signed_qty) }
    pub fn trade_value(&self) -> Decimal { (Decimal::from(self.signed_qty) * self.price).abs() }
}

/// Per-symbol accumulator. Reset to all-zero whenever the quantity goes flat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub quantity: i64,
    pub avg_price: Decimal,
    pub total_cost: Decimal,
}

impl PositionState {
    pub fn is_flat(&self) -> bool { self.quantity == 0 }

    pub(crate) fn reset(&mut self) {
        self.quantity = 0;
        self.avg_price = Decimal::ZERO;
        self.total_cost = Decimal::ZERO;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PnlKind { Realized }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedPnlEvent {
    pub time: NaiveDateTime,
    pub symbol: String,
    pub kind: PnlKind,
    pub pnl: Decimal,
    /// Always negative; magnitude is the quantity closed.
    pub closed_qty: i64,
    pub price: Decimal,
}

/// One tick of the externally supplied cumulative P&L ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerPoint {
    pub time: NaiveDateTime,
    pub cumulative_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub symbol: String,
    pub entry_time: NaiveDateTime,
    pub last_mod_time: NaiveDateTime,
    pub state: String,
    pub order_type: String,
    pub side: String,
    /// None when the order never filled (blank cell in the order table).
    pub avg_fill_price: Option<f64>,
    pub filled_qty: i64,
}

impl OrderRecord {
    pub fn execution_secs(&self) -> f64 {
        (self.last_mod_time - self.entry_time).num_milliseconds() as f64 / 1000.0
    }
}
