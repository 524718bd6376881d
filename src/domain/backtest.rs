//! Backtest engine and event loop.
//!
//! Bars are processed strictly in order. For each bar the runner reads the
//! indicator values, asks the strategy for a decision given the current
//! position fraction, applies it to the ledger at the bar's close and marks the
//! ledger to market. Indicators are computed up front over the full series;
//! each value only depends on bars at or before its own index.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;

use super::config_validation::{validate_backtest_config, validate_strategy};
use super::error::FlowtraderError;
use super::indicator::{IndicatorSeries, IndicatorType, compute_indicators};
use super::ledger::{EquityPoint, Ledger};
use super::metrics::Statistics;
use super::ohlcv::OhlcvBar;
use super::position::{Position, Trade};
use super::strategy::{Action, IndicatorValues, StrategyKind};

pub const DEFAULT_INITIAL_CAPITAL: Decimal = dec!(1000000);
/// Taiwan brokerage commission rate.
pub const DEFAULT_COMMISSION_RATE: Decimal = dec!(0.001425);

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: Decimal,
    pub commission_rate: Decimal,
    /// Close any open position at the last bar's close.
    pub liquidate_at_end: bool,
    /// Annual rate used by the Sharpe and Sortino ratios.
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            commission_rate: DEFAULT_COMMISSION_RATE,
            liquidate_at_end: false,
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub strategy: String,
    pub final_equity: Decimal,
    pub equity_peak: Decimal,
    pub stats: Statistics,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    /// Position still held after the last bar.
    pub open_position: Option<Position>,
    pub total_bars: usize,
    /// Bars with a tradable close and every indicator the strategy reads defined.
    pub valid_bars: usize,
    pub liquidated: bool,
}

impl BacktestResult {
    pub fn return_pct(&self) -> f64 {
        self.stats.return_pct
    }

    pub fn max_drawdown_pct(&self) -> f64 {
        self.stats.max_drawdown_pct
    }

    pub fn win_rate_pct(&self) -> f64 {
        self.stats.win_rate_pct
    }

    pub fn num_trades(&self) -> usize {
        self.stats.num_trades
    }
}

#[derive(Debug, Clone)]
pub struct Backtester {
    config: BacktestConfig,
    strategy: StrategyKind,
}

impl Backtester {
    pub fn new(config: BacktestConfig, strategy: StrategyKind) -> Result<Self, FlowtraderError> {
        validate_backtest_config(&config)?;
        validate_strategy(&strategy)?;
        Ok(Backtester { config, strategy })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn strategy(&self) -> &StrategyKind {
        &self.strategy
    }

    pub fn run(&self, bars: &[OhlcvBar]) -> Result<BacktestResult, FlowtraderError> {
        validate_bars(bars)?;
        let indicators = compute_indicators(bars, &self.strategy.required_indicators());
        self.run_with_indicators(bars, &indicators)
    }

    /// Run against indicator series computed by the caller, e.g. shared across
    /// a parameter sweep. Bars must already have passed [`validate_bars`].
    pub(crate) fn run_with_indicators(
        &self,
        bars: &[OhlcvBar],
        indicators: &HashMap<IndicatorType, IndicatorSeries>,
    ) -> Result<BacktestResult, FlowtraderError> {
        let required = self.strategy.required_indicators();
        for indicator_type in &required {
            let defined = indicators
                .get(indicator_type)
                .is_some_and(|s| s.valid_count() > 0);
            if !defined {
                return Err(FlowtraderError::InsufficientData {
                    bars: bars.len(),
                    indicator: indicator_type.to_string(),
                });
            }
        }

        tracing::debug!(
            strategy = self.strategy.name(),
            bars = bars.len(),
            "starting backtest"
        );

        let commission = self.config.commission_rate;
        let mut ledger = Ledger::new(self.config.initial_capital);
        let mut last_price: Option<Decimal> = None;
        let mut valid_bars = 0usize;
        let mut liquidated = false;
        let last_index = bars.len() - 1;

        for (i, bar) in bars.iter().enumerate() {
            let close = if bar.has_tradable_close() {
                Decimal::from_f64(bar.close)
            } else {
                None
            };

            match close {
                Some(price) => {
                    last_price = Some(price);
                    let values = IndicatorValues::at(indicators, &required, i);
                    if self.strategy.has_inputs(&values) {
                        valid_bars += 1;
                    }
                    self.step(&mut ledger, i, bar, &values, price);
                }
                None => {
                    tracing::debug!(
                        bar_index = i,
                        date = %bar.date,
                        close = bar.close,
                        "untradable close, bar skipped"
                    );
                }
            }

            // Flat until the first tradable close, so marking at zero leaves equity = cash.
            let mark_price = last_price.unwrap_or(Decimal::ZERO);

            if i == last_index && self.config.liquidate_at_end && ledger.position().is_some() {
                ledger.apply_sell(i, bar.date, Decimal::ONE, mark_price, commission);
                liquidated = true;
            }

            ledger.mark_to_market(bar.date, mark_price);
        }

        let stats = Statistics::compute(
            ledger.equity_curve(),
            ledger.trade_log(),
            self.config.initial_capital,
            self.config.risk_free_rate,
        );
        let final_equity = ledger
            .equity_curve()
            .last()
            .map_or(self.config.initial_capital, |p| p.equity);

        tracing::debug!(
            strategy = self.strategy.name(),
            trades = stats.num_trades,
            return_pct = stats.return_pct,
            max_drawdown_pct = stats.max_drawdown_pct,
            "backtest complete"
        );

        Ok(BacktestResult {
            strategy: self.strategy.name().to_string(),
            final_equity,
            equity_peak: ledger.equity_peak(),
            stats,
            equity_curve: ledger.equity_curve().to_vec(),
            trades: ledger.trade_log().to_vec(),
            open_position: ledger.position().cloned(),
            total_bars: bars.len(),
            valid_bars,
            liquidated,
        })
    }

    fn step(
        &self,
        ledger: &mut Ledger,
        index: usize,
        bar: &OhlcvBar,
        values: &IndicatorValues,
        price: Decimal,
    ) {
        // Only reachable with a ledger built at zero capital: cash never goes
        // negative and prices are positive.
        if ledger.total_equity(price) <= Decimal::ZERO {
            tracing::debug!(bar_index = index, "equity exhausted, no further trading");
            return;
        }

        let fraction = ledger.position_fraction(price);
        let decision = self.strategy.decide(index, values, fraction);
        let commission = self.config.commission_rate;

        match decision.action {
            Action::Buy => {
                ledger.apply_buy(index, bar.date, decision.size_fraction, price, commission);
            }
            Action::Sell => {
                ledger.apply_sell(index, bar.date, decision.size_fraction, price, commission);
            }
            Action::Hold => {}
        }
    }
}

/// Reject empty input and dates that are not strictly increasing.
pub fn validate_bars(bars: &[OhlcvBar]) -> Result<(), FlowtraderError> {
    if bars.is_empty() {
        return Err(FlowtraderError::NoData {
            symbol: "input series".to_string(),
        });
    }
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(FlowtraderError::InvalidBar {
                index: i + 1,
                reason: format!("date {} does not follow {}", pair[1].date, pair[0].date),
            });
        }
    }
    Ok(())
}
