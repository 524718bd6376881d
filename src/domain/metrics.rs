//! Performance statistics over a finished run.
//!
//! Pure over the equity curve and trade log. Percentages are expressed in
//! percent (12.5 means 12.5%); drawdown is a positive magnitude.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::ledger::EquityPoint;
use super::position::Trade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub return_pct: f64,
    pub annualized_return_pct: f64,
    pub max_drawdown_pct: f64,
    /// Longest run of bars spent below a prior equity peak.
    pub max_drawdown_duration: usize,
    pub win_rate_pct: f64,
    pub num_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub profit_factor: f64,
    pub avg_trade_bars: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
}

impl Statistics {
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        initial_capital: Decimal,
        risk_free_rate: f64,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > Decimal::ZERO {
            to_f64((final_equity - initial_capital) / initial_capital)
        } else {
            0.0
        };

        let equities: Vec<f64> = equity_curve.iter().map(|p| to_f64(p.equity)).collect();

        let years = equities.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&equities);

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&equities, daily_rf);

        let calmar_ratio = if max_drawdown > 0.0 {
            annualized_return / max_drawdown
        } else {
            0.0
        };

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = Decimal::ZERO;
        let mut total_losses = Decimal::ZERO;
        let mut largest_win = Decimal::ZERO;
        let mut largest_loss = Decimal::ZERO;
        let mut total_bars = 0usize;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > Decimal::ZERO {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < Decimal::ZERO {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
            total_bars += trade.duration_bars();
        }

        let num_trades = trades.len();
        let win_rate_pct = if num_trades > 0 {
            trades_won as f64 / num_trades as f64 * 100.0
        } else {
            0.0
        };

        let profit_factor = if total_losses > Decimal::ZERO {
            to_f64(total_wins / total_losses)
        } else if total_wins > Decimal::ZERO {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / Decimal::from(trades_won)
        } else {
            Decimal::ZERO
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / Decimal::from(trades_lost)
        } else {
            Decimal::ZERO
        };

        let avg_trade_bars = if num_trades > 0 {
            total_bars as f64 / num_trades as f64
        } else {
            0.0
        };

        Statistics {
            return_pct: total_return * 100.0,
            annualized_return_pct: annualized_return * 100.0,
            max_drawdown_pct: max_drawdown * 100.0,
            max_drawdown_duration,
            win_rate_pct,
            num_trades,
            trades_won,
            trades_lost,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            profit_factor,
            avg_trade_bars,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
        }
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Largest peak-to-trough decline as a fraction, and the longest underwater run.
fn compute_drawdown(equities: &[f64]) -> (f64, usize) {
    let Some(&first) = equities.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut current_duration = 0usize;
    let mut max_duration = 0usize;

    for &equity in equities {
        if equity >= peak {
            peak = equity;
            current_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}

fn compute_risk_adjusted(equities: &[f64], daily_rf: f64) -> (f64, f64) {
    if equities.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equities
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - daily_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stddev = (downside_sq / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn base_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn make_curve(values: &[Decimal]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                date: base_date() + chrono::Duration::days(i as i64),
                equity,
            })
            .collect()
    }

    fn make_trade(entry: usize, exit: usize, pnl: Decimal) -> Trade {
        Trade {
            entry_bar_index: entry,
            exit_bar_index: exit,
            entry_date: base_date() + chrono::Duration::days(entry as i64),
            exit_date: base_date() + chrono::Duration::days(exit as i64),
            entry_price: dec!(100),
            exit_price: dec!(100),
            size: dec!(10),
            pnl,
        }
    }

    #[test]
    fn empty_run() {
        let stats = Statistics::compute(&[], &[], dec!(100000), 0.0);
        assert_eq!(stats.return_pct, 0.0);
        assert_eq!(stats.max_drawdown_pct, 0.0);
        assert_eq!(stats.win_rate_pct, 0.0);
        assert_eq!(stats.num_trades, 0);
        assert_eq!(stats.profit_factor, 0.0);
        assert_eq!(stats.sharpe_ratio, 0.0);
    }

    #[test]
    fn win_rate_is_zero_without_trades() {
        let curve = make_curve(&[dec!(100), dec!(110), dec!(105)]);
        let stats = Statistics::compute(&curve, &[], dec!(100), 0.0);
        assert_eq!(stats.win_rate_pct, 0.0);
        assert!(!stats.win_rate_pct.is_nan());
    }

    #[test]
    fn return_pct_from_final_equity() {
        let curve = make_curve(&[dec!(100000), dec!(105000), dec!(112000)]);
        let stats = Statistics::compute(&curve, &[], dec!(100000), 0.0);
        assert_relative_eq!(stats.return_pct, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn flat_curve_has_zero_return_and_drawdown() {
        let curve = make_curve(&[dec!(1000000); 30]);
        let stats = Statistics::compute(&curve, &[], dec!(1000000), 0.0);
        assert_eq!(stats.return_pct, 0.0);
        assert_eq!(stats.max_drawdown_pct, 0.0);
        assert_eq!(stats.sharpe_ratio, 0.0);
        assert_eq!(stats.calmar_ratio, 0.0);
    }

    #[test]
    fn max_drawdown_is_positive_magnitude() {
        let curve = make_curve(&[dec!(100), dec!(120), dec!(90), dec!(110), dec!(130)]);
        let stats = Statistics::compute(&curve, &[], dec!(100), 0.0);
        assert_relative_eq!(stats.max_drawdown_pct, 25.0, epsilon = 1e-9);
        assert_eq!(stats.max_drawdown_duration, 2);
    }

    #[test]
    fn drawdown_tracks_deepest_trough() {
        let (dd, duration) = compute_drawdown(&[100.0, 80.0, 90.0, 60.0, 100.0]);
        assert_relative_eq!(dd, 0.4, epsilon = 1e-12);
        assert_eq!(duration, 3);
    }

    #[test]
    fn trade_breakdown() {
        let trades = vec![
            make_trade(0, 5, dec!(500)),
            make_trade(6, 8, dec!(-200)),
            make_trade(9, 15, dec!(300)),
            make_trade(16, 17, dec!(-100)),
        ];
        let curve = make_curve(&[dec!(10000), dec!(10500)]);
        let stats = Statistics::compute(&curve, &trades, dec!(10000), 0.0);

        assert_eq!(stats.num_trades, 4);
        assert_eq!(stats.trades_won, 2);
        assert_eq!(stats.trades_lost, 2);
        assert_relative_eq!(stats.win_rate_pct, 50.0);
        assert_eq!(stats.avg_win, dec!(400));
        assert_eq!(stats.avg_loss, dec!(150));
        assert_eq!(stats.largest_win, dec!(500));
        assert_eq!(stats.largest_loss, dec!(200));
        assert_relative_eq!(stats.profit_factor, 800.0 / 300.0, epsilon = 1e-12);
        assert_relative_eq!(stats.avg_trade_bars, 14.0 / 4.0);
    }

    #[test]
    fn profit_factor_infinite_without_losses() {
        let trades = vec![make_trade(0, 1, dec!(10))];
        let stats = Statistics::compute(&[], &trades, dec!(100), 0.0);
        assert!(stats.profit_factor.is_infinite());
        assert_relative_eq!(stats.win_rate_pct, 100.0);
    }

    #[test]
    fn breakeven_trade_counts_toward_total_only() {
        let trades = vec![make_trade(0, 1, dec!(10)), make_trade(2, 3, Decimal::ZERO)];
        let stats = Statistics::compute(&[], &trades, dec!(100), 0.0);
        assert_eq!(stats.num_trades, 2);
        assert_eq!(stats.trades_won, 1);
        assert_eq!(stats.trades_lost, 0);
        assert_relative_eq!(stats.win_rate_pct, 50.0);
    }

    #[test]
    fn sharpe_positive_for_rising_noisy_curve() {
        let curve = make_curve(&[
            dec!(100),
            dec!(102),
            dec!(101),
            dec!(104),
            dec!(103),
            dec!(107),
        ]);
        let stats = Statistics::compute(&curve, &[], dec!(100), 0.0);
        assert!(stats.sharpe_ratio > 0.0);
        assert!(stats.sortino_ratio > 0.0);
        assert!(stats.calmar_ratio > 0.0);
    }

    #[test]
    fn sortino_zero_without_downside() {
        let (sharpe, sortino) = compute_risk_adjusted(&[100.0, 101.0, 103.0, 104.0], 0.0);
        assert!(sharpe > 0.0);
        assert_eq!(sortino, 0.0);
    }

    #[test]
    fn risk_adjusted_needs_two_points() {
        assert_eq!(compute_risk_adjusted(&[100.0], 0.0), (0.0, 0.0));
    }
}
