// ===============================
// src/feed.rs
// ===============================
//
// Input adapters untuk tabel hasil backtest (CSV):
// - discover : cari *.csv di direktori, filter nama (default "BACK")
// - classify : fill / order / pnl dari nama file
// - load     : parse semua tabel, baris rusak di-drop (warn + counter)
//
// Timestamp di file pnl sering campur format, jadi semua tabel lewat
// `parse_timestamp` yang mencoba beberapa format sekaligus.
//

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{Fill, LedgerPoint, OrderRecord};
use crate::metrics::{ROWS_DROPPED, ROWS_LOADED};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("failed to parse CSV {0}: {1}")]
    Csv(String, #[source] csv::Error),
    #[error("no fill data loaded successfully")]
    NoFillData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind { Fills, Orders, Ledger }

impl TableKind {
    pub fn label(&self) -> &'static str {
        match self { TableKind::Fills => "fill", TableKind::Orders => "order", TableKind::Ledger => "pnl" }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedTables {
    pub fills: Vec<Fill>,
    pub orders: Option<Vec<OrderRecord>>,
    pub ledger: Option<Vec<LedgerPoint>>,
    pub fill_stats: LoadStats,
    pub order_stats: LoadStats,
    pub ledger_stats: LoadStats,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%d-%b-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%Y%m%d"];

/// Parse one timestamp in any of the accepted formats. Offsets are normalised to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// All `*.csv` in `dir` whose file name contains `name_filter` (case-insensitive).
pub fn discover(dir: &Path, name_filter: &str) -> Result<Vec<PathBuf>, FeedError> {
    let needle = name_filter.to_ascii_uppercase();
    let entries = std::fs::read_dir(dir).map_err(|e| FeedError::Io(dir.display().to_string(), e))?;
    let mut out: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |x| x.eq_ignore_ascii_case("csv")))
        .filter(|p| {
            p.file_name()
                .map_or(false, |n| n.to_string_lossy().to_ascii_uppercase().contains(&needle))
        })
        .collect();
    out.sort();
    Ok(out)
}

pub fn classify(path: &Path) -> Option<TableKind> {
    let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
    if name.contains("fill") {
        Some(TableKind::Fills)
    } else if name.contains("order") {
        Some(TableKind::Orders)
    } else if name.contains("pnl") {
        Some(TableKind::Ledger)
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
struct FillRow {
    #[serde(rename = "TradeTime")]
    trade_time: String,
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Quantity")]
    quantity: i64,
    #[serde(rename = "Price", with = "rust_decimal::serde::str")]
    price: Decimal,
    #[serde(rename = "ExecutionCost", with = "rust_decimal::serde::str")]
    execution_cost: Decimal,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "EntryTime")]
    entry_time: String,
    #[serde(rename = "LastModTime")]
    last_mod_time: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Type")]
    order_type: String,
    #[serde(rename = "Side")]
    side: String,
    // order yang tidak terisi sering punya sel kosong di sini
    #[serde(rename = "AvgFillPrice", default, deserialize_with = "csv::invalid_option")]
    avg_fill_price: Option<f64>,
    #[serde(rename = "FilledQty", default, deserialize_with = "csv::invalid_option")]
    filled_qty: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LedgerRow {
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Cumulative PnL")]
    cumulative_pnl: f64,
}

/// Deserialize every row of `path`, mapping each through `convert`.
/// Rows that fail to deserialize or convert are dropped with a warning.
fn read_table<R, T>(
    path: &Path,
    kind: TableKind,
    convert: impl Fn(R) -> Option<T>,
) -> Result<(Vec<T>, LoadStats), FeedError>
where
    R: for<'de> Deserialize<'de>,
{
    let file_name = path.display().to_string();
    let file = File::open(path).map_err(|e| FeedError::Io(file_name.clone(), e))?;
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    // header wajib terbaca, kalau tidak seluruh file dianggap gagal
    rdr.headers().map_err(|e| FeedError::Csv(file_name.clone(), e))?;

    let mut rows = Vec::new();
    let mut stats = LoadStats::default();
    for (idx, result) in rdr.deserialize::<R>().enumerate() {
        match result.ok().and_then(&convert) {
            Some(row) => rows.push(row),
            None => {
                warn!(file = %file_name, line = idx + 2, table = kind.label(), "dropping malformed row");
                stats.dropped += 1;
            }
        }
    }
    stats.loaded = rows.len();
    ROWS_LOADED.with_label_values(&[kind.label()]).inc_by(stats.loaded as u64);
    ROWS_DROPPED.with_label_values(&[kind.label()]).inc_by(stats.dropped as u64);
    Ok((rows, stats))
}

pub fn read_fills(path: &Path) -> Result<(Vec<Fill>, LoadStats), FeedError> {
    read_table(path, TableKind::Fills, |r: FillRow| {
        if r.quantity == 0 {
            return None;
        }
        Some(Fill {
            time: parse_timestamp(&r.trade_time)?,
            symbol: r.symbol,
            signed_qty: r.quantity,
            price: r.price,
            execution_cost: r.execution_cost,
        })
    })
}

pub fn read_orders(path: &Path) -> Result<(Vec<OrderRecord>, LoadStats), FeedError> {
    read_table(path, TableKind::Orders, |r: OrderRow| {
        Some(OrderRecord {
            entry_time: parse_timestamp(&r.entry_time)?,
            last_mod_time: parse_timestamp(&r.last_mod_time)?,
            symbol: r.symbol,
            state: r.state,
            order_type: r.order_type,
            side: r.side,
            avg_fill_price: r.avg_fill_price.filter(|p| p.is_finite()),
            filled_qty: r.filled_qty.unwrap_or(0),
        })
    })
}

pub fn read_ledger(path: &Path) -> Result<(Vec<LedgerPoint>, LoadStats), FeedError> {
    read_table(path, TableKind::Ledger, |r: LedgerRow| {
        if !r.cumulative_pnl.is_finite() {
            return None;
        }
        Some(LedgerPoint { time: parse_timestamp(&r.time)?, cumulative_pnl: r.cumulative_pnl })
    })
}

/// Load every classified file. A later file of the same kind replaces an earlier one.
/// Fails only when no usable fill table was found.
pub fn load(paths: &[PathBuf]) -> Result<LoadedTables, FeedError> {
    let mut tables = LoadedTables::default();
    let mut have_fills = false;

    for path in paths {
        let Some(kind) = classify(path) else {
            warn!(file = %path.display(), "unrecognised table, skipped");
            continue;
        };
        let res = match kind {
            TableKind::Fills => read_fills(path).map(|(rows, st)| {
                info!(file = %path.display(), trades = rows.len(), dropped = st.dropped, "loaded FILL data");
                have_fills = true;
                tables.fills = rows;
                tables.fill_stats = st;
            }),
            TableKind::Orders => read_orders(path).map(|(rows, st)| {
                info!(file = %path.display(), orders = rows.len(), dropped = st.dropped, "loaded ORDER data");
                tables.orders = Some(rows);
                tables.order_stats = st;
            }),
            TableKind::Ledger => read_ledger(path).map(|(rows, st)| {
                info!(file = %path.display(), records = rows.len(), dropped = st.dropped, "loaded PNL data");
                tables.ledger = Some(rows);
                tables.ledger_stats = st;
            }),
        };
        if let Err(e) = res {
            error!(?e, file = %path.display(), "error loading table");
        }
    }

    if !have_fills || tables.fills.is_empty() {
        return Err(FeedError::NoFillData);
    }
    Ok(tables)
}
