mod common;

use backtest_pnl_rust::analysis::{write_outputs, Analyzer, AnalysisError};
use backtest_pnl_rust::feed::{self, FeedError};
use backtest_pnl_rust::positions::OversellPolicy;
use common::write_csv;
use rust_decimal_macros::dec;

const FILLS: &str = "TradeTime,Symbol,Quantity,Price,ExecutionCost\n\
2024-01-02 09:31:00,AAPL,-40,12.00,0.50\n\
2024-01-02 09:30:00,AAPL,100,10.00,1.00\n\
2024-01-02 09:32:00,MSFT,-10,300.00,0.20\n\
2024-01-02 09:33:00,AAPL,-80,11.00,0.40\n";

const ORDERS: &str = "Symbol,EntryTime,LastModTime,State,Type,Side,AvgFillPrice,FilledQty\n\
AAPL,2024-01-02 09:29:58,2024-01-02 09:30:00,FILLED,LIMIT,BUY,10.00,100\n\
AAPL,2024-01-02 09:30:59,2024-01-02 09:31:00,FILLED,LIMIT,SELL,12.00,40\n\
MSFT,2024-01-02 09:31:00,2024-01-02 09:31:30,CANCELED,LIMIT,SELL,,0\n";

const PNL: &str = "Time,Cumulative PnL\n\
2024-01-02 16:00:00,100\n\
01/03/2024 16:00:00,80\n\
2024-01-04T16:00:00,120\n\
not-a-time,999\n";

#[tokio::test]
async fn full_run_writes_report_records_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![
        write_csv(dir.path(), "BACK_fill.csv", FILLS),
        write_csv(dir.path(), "BACK_order.csv", ORDERS),
        write_csv(dir.path(), "BACK_pnl.csv", PNL),
    ];

    let tables = feed::load(&inputs).unwrap();
    assert_eq!(tables.ledger_stats.dropped, 1);
    let outcome = Analyzer::new(tables, OversellPolicy::Truncate).run().await.unwrap();

    // tracker: 79.50 then (11-10)*60 - 0.40 = 59.60; MSFT is a short extension
    let realized: Vec<_> = outcome.tracker.realized.iter().map(|e| e.pnl).collect();
    assert_eq!(realized, vec![dec!(79.50), dec!(59.60)]);
    assert_eq!(outcome.tracker.positions["AAPL"].quantity, 0);
    assert_eq!(outcome.tracker.positions["MSFT"].quantity, -10);

    // headline from the ledger, not the tracker
    let r = &outcome.report;
    assert_eq!(r.headline.final_pnl, 120.0);
    assert_eq!(r.headline.net_pnl, 20.0);
    assert_eq!(r.risk.max_drawdown, -20.0);
    assert_eq!(r.risk.profit_factor, 2.0);
    assert!((r.reconciliation.reconciliation_gap - (20.0 - 139.10)).abs() < 1e-9);
    assert_eq!(r.fills.total_trades, 4);
    let orders = r.orders.as_ref().unwrap();
    assert_eq!(orders.total_orders, 3);
    assert_eq!(orders.filled_orders, 2);
    assert_eq!(orders.avg_fill_price, 11.0);

    // output directory does not exist yet
    let report_path = dir.path().join("out").join("report.json");
    let records = dir.path().join("out").join("records.jsonl");
    let prom = dir.path().join("out").join("pnl.prom");
    write_outputs(&outcome, &report_path, Some(&records), Some(&prom)).await.unwrap();
    // a second run replaces the previous outputs instead of appending
    write_outputs(&outcome, &report_path, Some(&records), Some(&prom)).await.unwrap();

    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&report_path).unwrap()).unwrap();
    assert_eq!(json["headline"]["final_pnl"], 120.0);
    assert_eq!(json["tracker"]["realized_events"].as_array().unwrap().len(), 2);

    // 2 realized + 2 positions + 3 series rows
    let lines = std::fs::read_to_string(&records).unwrap();
    assert_eq!(lines.lines().count(), 7);
    assert!(prom.exists());
}

#[tokio::test]
async fn run_without_ledger_still_reports() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![write_csv(dir.path(), "BACK_fill.csv", FILLS)];
    let tables = feed::load(&inputs).unwrap();
    let outcome = Analyzer::new(tables, OversellPolicy::FlipShort).run().await.unwrap();
    assert!(!outcome.report.headline.has_ledger);
    assert!(outcome.report.risk.is_empty());
    assert!(outcome.risk.series.is_empty());
    // 100 long - 40 - 80 with flip: 20 short left at 11.00
    assert_eq!(outcome.tracker.positions["AAPL"].quantity, -20);
}

#[test]
fn missing_fill_table_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![write_csv(dir.path(), "BACK_pnl.csv", PNL)];
    let err = feed::load(&inputs).unwrap_err();
    assert!(matches!(err, FeedError::NoFillData));
    let top: AnalysisError = err.into();
    assert!(top.to_string().contains("no fill data"));
}
