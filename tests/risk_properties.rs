mod common;

use approx::assert_relative_eq;
use backtest_pnl_rust::risk::{compute, RiskMetrics};
use common::{ledger, shuffled};
use proptest::prelude::*;

#[test]
fn scenario_three_point_ledger() {
    let m = compute(&ledger(&[100.0, 80.0, 120.0])).metrics;
    assert_relative_eq!(m.win_rate, 50.0);
    assert_relative_eq!(m.max_drawdown, -20.0);
    assert_relative_eq!(m.profit_factor, 2.0);
    assert_eq!(m.winning_periods, 1);
    assert_eq!(m.losing_periods, 1);
}

#[test]
fn empty_ledger_defaults_every_field() {
    let r = compute(&[]);
    assert_eq!(r.metrics, RiskMetrics::default());
    assert!(r.metrics.is_empty());
}

#[test]
fn no_losses_reports_zero_profit_factor_with_gross_profit() {
    let m = compute(&ledger(&[1.0, 2.0, 4.0])).metrics;
    assert_eq!(m.profit_factor, 0.0);
    assert_relative_eq!(m.gross_profit, 3.0);
    assert_eq!(m.gross_loss, 0.0);
    assert_eq!(m.max_drawdown, 0.0);
}

proptest! {
    #[test]
    fn drawdown_never_positive(values in prop::collection::vec(-1e6f64..1e6, 1..200)) {
        let r = compute(&ledger(&values));
        for p in &r.series {
            prop_assert!(p.drawdown <= 0.0);
            prop_assert!(p.running_max >= p.cumulative_pnl);
        }
        prop_assert!(r.metrics.max_drawdown <= 0.0);
        prop_assert!(r.metrics.avg_drawdown <= 0.0);
        prop_assert!((0.0..=100.0).contains(&r.metrics.win_rate));
    }

    #[test]
    fn shuffled_ledger_gives_identical_metrics(
        values in prop::collection::vec(-1e4f64..1e4, 1..100),
        seed in any::<u64>(),
    ) {
        let pts = ledger(&values);
        let a = compute(&pts);
        let b = compute(&shuffled(&pts, seed));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn net_pnl_is_last_minus_first(values in prop::collection::vec(-1e4f64..1e4, 1..50)) {
        let m = compute(&ledger(&values)).metrics;
        prop_assert_eq!(m.initial_pnl, values[0]);
        prop_assert_eq!(m.final_pnl, values[values.len() - 1]);
        prop_assert_eq!(m.net_pnl, values[values.len() - 1] - values[0]);
        prop_assert_eq!(m.total_points, values.len());
    }
}
