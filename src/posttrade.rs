// ===============================
// src/posttrade.rs
// ===============================
//
// Ringkasan deskriptif untuk tabel fill / order / pnl. Murni reduksi,
// tidak menyentuh state tracker.
//
use ahash::AHashMap as HashMap;
use chrono::{NaiveDateTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::domain::{Fill, LedgerPoint, OrderRecord, Side};
use crate::stats;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistStats {
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
    pub std: f64,
}

impl DistStats {
    pub fn of(values: &[f64]) -> Self {
        Self {
            mean: stats::mean(values),
            median: stats::median(values),
            max: stats::max(values),
            min: stats::min(values),
            std: stats::std_dev(values),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FillSummary {
    pub total_trades: usize,
    pub first_trade: Option<NaiveDateTime>,
    pub last_trade: Option<NaiveDateTime>,
    pub duration_secs: i64,
    pub buy_orders: usize,
    pub sell_orders: usize,
    pub symbols: Vec<String>,
    pub symbol_counts: Vec<(String, usize)>,
    pub total_execution_cost: Decimal,
    pub avg_execution_cost: Decimal,
    pub total_trade_value: Decimal,
    pub avg_trade_value: Decimal,
    pub cost_by_symbol: Vec<(String, Decimal)>,
    pub cost_by_direction: Vec<(Side, Decimal)>,
    pub quantity_stats: DistStats,
    pub price_stats: DistStats,
    pub trades_by_hour: [usize; 24],
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecTimeStats {
    pub mean: f64,
    pub median: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderSummary {
    pub total_orders: usize,
    pub filled_orders: usize,
    pub order_states: Vec<(String, usize)>,
    pub order_types: Vec<(String, usize)>,
    pub sides: Vec<(String, usize)>,
    pub orders_by_symbol: Vec<(String, usize)>,
    pub avg_fill_price: f64,
    pub total_filled_qty: i64,
    pub execution_time_secs: ExecTimeStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub total_records: usize,
    pub initial_pnl: f64,
    pub final_pnl: f64,
    pub net_pnl: f64,
    pub max_pnl: f64,
    pub min_pnl: f64,
    pub pnl_range: f64,
    pub first_time: Option<NaiveDateTime>,
    pub last_time: Option<NaiveDateTime>,
}

/// Count occurrences, most frequent first (ties by key).
fn value_counts<'a>(items: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for it in items {
        *counts.entry(it).or_default() += 1;
    }
    let mut v: Vec<(String, usize)> = counts.into_iter().map(|(k, c)| (k.to_string(), c)).collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v
}

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

pub fn summarize_fills(fills: &[Fill]) -> FillSummary {
    if fills.is_empty() {
        return FillSummary::default();
    }
    let n = Decimal::from(fills.len() as u64);

    let first_trade = fills.iter().map(|f| f.time).min();
    let last_trade = fills.iter().map(|f| f.time).max();
    let duration_secs = match (first_trade, last_trade) {
        (Some(a), Some(b)) => (b - a).num_seconds(),
        _ => 0,
    };

    let mut symbols: Vec<String> = Vec::new();
    for f in fills {
        if !symbols.contains(&f.symbol) {
            symbols.push(f.symbol.clone());
        }
    }

    let mut cost_by_symbol: HashMap<String, Decimal> = HashMap::new();
    let mut cost_by_direction: HashMap<Side, Decimal> = HashMap::new();
    let mut trades_by_hour = [0usize; 24];
    for f in fills {
        *cost_by_symbol.entry(f.symbol.clone()).or_default() += f.execution_cost;
        *cost_by_direction.entry(f.side()).or_default() += f.execution_cost;
        trades_by_hour[f.time.hour() as usize] += 1;
    }
    let mut cost_by_symbol: Vec<_> = cost_by_symbol.into_iter().collect();
    cost_by_symbol.sort_by(|a, b| a.0.cmp(&b.0));
    let mut cost_by_direction: Vec<_> = cost_by_direction.into_iter().collect();
    cost_by_direction.sort_by_key(|(s, _)| *s);

    let total_execution_cost: Decimal = fills.iter().map(|f| f.execution_cost).sum();
    let total_trade_value: Decimal = fills.iter().map(Fill::trade_value).sum();
    let qtys: Vec<f64> = fills.iter().map(|f| f.signed_qty.unsigned_abs() as f64).collect();
    let prices: Vec<f64> = fills.iter().map(|f| to_f64(f.price)).collect();

    FillSummary {
        total_trades: fills.len(),
        first_trade,
        last_trade,
        duration_secs,
        buy_orders: fills.iter().filter(|f| f.signed_qty > 0).count(),
        sell_orders: fills.iter().filter(|f| f.signed_qty < 0).count(),
        symbols,
        symbol_counts: value_counts(fills.iter().map(|f| f.symbol.as_str())),
        total_execution_cost,
        avg_execution_cost: total_execution_cost / n,
        total_trade_value,
        avg_trade_value: total_trade_value / n,
        cost_by_symbol,
        cost_by_direction,
        quantity_stats: DistStats::of(&qtys),
        price_stats: DistStats::of(&prices),
        trades_by_hour,
    }
}

pub fn summarize_orders(orders: &[OrderRecord]) -> OrderSummary {
    if orders.is_empty() {
        return OrderSummary::default();
    }
    let prices: Vec<f64> = orders.iter().filter_map(|o| o.avg_fill_price).collect();
    let exec: Vec<f64> = orders.iter().map(OrderRecord::execution_secs).collect();

    OrderSummary {
        total_orders: orders.len(),
        filled_orders: orders.iter().filter(|o| o.state == "FILLED").count(),
        order_states: value_counts(orders.iter().map(|o| o.state.as_str())),
        order_types: value_counts(orders.iter().map(|o| o.order_type.as_str())),
        sides: value_counts(orders.iter().map(|o| o.side.as_str())),
        orders_by_symbol: value_counts(orders.iter().map(|o| o.symbol.as_str())),
        avg_fill_price: stats::mean(&prices),
        total_filled_qty: orders.iter().map(|o| o.filled_qty).sum(),
        execution_time_secs: ExecTimeStats {
            mean: stats::mean(&exec),
            median: stats::median(&exec),
            max: stats::max(&exec),
        },
    }
}

pub fn summarize_ledger(ledger: &[LedgerPoint]) -> Option<LedgerSummary> {
    let mut sorted = ledger.to_vec();
    sorted.sort_by_key(|p| p.time);
    let first = sorted.first()?;
    let last = sorted.last()?;
    let values: Vec<f64> = sorted.iter().map(|p| p.cumulative_pnl).collect();
    let (max_pnl, min_pnl) = (stats::max(&values), stats::min(&values));
    Some(LedgerSummary {
        total_records: sorted.len(),
        initial_pnl: first.cumulative_pnl,
        final_pnl: last.cumulative_pnl,
        net_pnl: last.cumulative_pnl - first.cumulative_pnl,
        max_pnl,
        min_pnl,
        pnl_range: max_pnl - min_pnl,
        first_time: Some(first.time),
        last_time: Some(last.time),
    })
}

pub fn log_summaries(fills: &FillSummary, orders: Option<&OrderSummary>, ledger: Option<&LedgerSummary>) {
    info!(
        trades = fills.total_trades,
        buys = fills.buy_orders,
        sells = fills.sell_orders,
        symbols = ?fills.symbols,
        total_cost = %fills.total_execution_cost,
        "fill summary"
    );
    if let Some(o) = orders {
        info!(orders = o.total_orders, filled = o.filled_orders, "order summary");
    }
    if let Some(l) = ledger {
        info!(records = l.total_records, final_pnl = l.final_pnl, net_pnl = l.net_pnl, "pnl summary");
    }
}
