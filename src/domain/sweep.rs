//! Buy/sell threshold grid sweep.
//!
//! Every grid point is an independent backtest with its own ledger. The bars
//! and indicator series are shared read-only across runs, which execute in
//! parallel; results come back in grid order.

use rayon::prelude::*;

use super::backtest::{BacktestConfig, BacktestResult, Backtester, validate_bars};
use super::error::FlowtraderError;
use super::indicator::compute_indicators;
use super::ohlcv::OhlcvBar;
use super::strategy::StrategyKind;

#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    pub buy_thresholds: Vec<f64>,
    pub sell_thresholds: Vec<f64>,
}

impl SweepGrid {
    pub fn new(buy_thresholds: Vec<f64>, sell_thresholds: Vec<f64>) -> Self {
        SweepGrid {
            buy_thresholds,
            sell_thresholds,
        }
    }

    /// Grid from inclusive `start..=end` ranges with a common step.
    pub fn from_ranges(
        buy: (f64, f64),
        sell: (f64, f64),
        step: f64,
    ) -> Result<Self, FlowtraderError> {
        Ok(SweepGrid::new(
            steps(buy.0, buy.1, step)?,
            steps(sell.0, sell.1, step)?,
        ))
    }

    /// Buy-major `(buy, sell)` pairs, skipping pairs where buy >= sell.
    pub fn pairs(&self) -> Vec<(f64, f64)> {
        self.buy_thresholds
            .iter()
            .flat_map(|&buy| {
                self.sell_thresholds
                    .iter()
                    .filter(move |&&sell| buy < sell)
                    .map(move |&sell| (buy, sell))
            })
            .collect()
    }
}

/// Upper bound on the points in one stepped range.
pub const MAX_STEPS: usize = 1000;

/// Inclusive stepped range. Empty when `start > end`.
pub fn steps(start: f64, end: f64, step: f64) -> Result<Vec<f64>, FlowtraderError> {
    if !step.is_finite() || step <= 0.0 {
        return Err(FlowtraderError::invalid(
            "sweep",
            "step",
            format!("{step} is not a positive finite number"),
        ));
    }
    if !start.is_finite() || !end.is_finite() {
        return Err(FlowtraderError::invalid(
            "sweep",
            "range",
            format!("{start}:{end} is not a finite range"),
        ));
    }
    if start > end {
        return Ok(Vec::new());
    }
    let span = (end - start) / step + 1e-9;
    if span >= MAX_STEPS as f64 {
        return Err(FlowtraderError::invalid(
            "sweep",
            "step",
            format!("{start}:{end} by {step} exceeds {MAX_STEPS} points"),
        ));
    }
    let count = span.floor() as usize + 1;
    Ok((0..count).map(|i| start + step * i as f64).collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepEntry {
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub result: BacktestResult,
}

/// Replace the MFI entry/exit levels of `base`.
pub fn with_thresholds(base: &StrategyKind, buy: f64, sell: f64) -> StrategyKind {
    match base {
        StrategyKind::MfiHunter(p) => {
            let mut p = p.clone();
            p.buy_threshold = buy;
            p.sell_threshold = sell;
            // keep the strong tier inside the buy tier
            p.strong_buy_threshold = p.strong_buy_threshold.min(buy);
            StrategyKind::MfiHunter(p)
        }
        StrategyKind::RsiMfiConsensus(p) => {
            let mut p = p.clone();
            p.mfi_oversold = buy;
            p.mfi_overbought = sell;
            StrategyKind::RsiMfiConsensus(p)
        }
    }
}

pub fn sweep(
    bars: &[OhlcvBar],
    config: &BacktestConfig,
    base: &StrategyKind,
    grid: &SweepGrid,
) -> Result<Vec<SweepEntry>, FlowtraderError> {
    validate_bars(bars)?;
    Backtester::new(config.clone(), base.clone())?;

    let mut runs = Vec::new();
    for (buy, sell) in grid.pairs() {
        match Backtester::new(config.clone(), with_thresholds(base, buy, sell)) {
            Ok(backtester) => runs.push((buy, sell, backtester)),
            Err(e) => tracing::debug!(buy, sell, error = %e, "grid point skipped"),
        }
    }

    let indicators = compute_indicators(bars, &base.required_indicators());
    tracing::info!(
        strategy = base.name(),
        runs = runs.len(),
        "starting sweep"
    );

    runs.par_iter()
        .map(|(buy, sell, backtester)| {
            backtester
                .run_with_indicators(bars, &indicators)
                .map(|result| SweepEntry {
                    buy_threshold: *buy,
                    sell_threshold: *sell,
                    result,
                })
        })
        .collect()
}

/// Sort by return, best first. Ties keep grid order.
pub fn rank_by_return(entries: &mut [SweepEntry]) {
    entries.sort_by(|a, b| b.result.return_pct().total_cmp(&a.result.return_pct()));
}
