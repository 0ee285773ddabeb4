#![allow(dead_code)]

use backtest_pnl_rust::domain::{Fill, LedgerPoint};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(9, 30, 0).unwrap()
}

pub fn at(secs: i64) -> NaiveDateTime {
    start() + Duration::seconds(secs)
}

pub fn fill(symbol: &str, secs: i64, qty: i64, price: Decimal, cost: Decimal) -> Fill {
    Fill { symbol: symbol.into(), time: at(secs), signed_qty: qty, price, execution_cost: cost }
}

pub fn ledger(values: &[f64]) -> Vec<LedgerPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| LedgerPoint { time: at(i as i64 * 60), cumulative_pnl: *v })
        .collect()
}

pub fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path
}

/// Deterministic Fisher-Yates using a seed, so shuffles are reproducible.
pub fn shuffled<T: Clone>(items: &[T], seed: u64) -> Vec<T> {
    let mut v = items.to_vec();
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    for i in (1..v.len()).rev() {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let j = (state >> 33) as usize % (i + 1);
        v.swap(i, j);
    }
    v
}
