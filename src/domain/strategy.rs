//! Oscillator strategies and their per-bar decision logic.
//!
//! A strategy is a pure function of (bar index, indicator values, current
//! position fraction). It owns no state between bars, so the same inputs always
//! produce the same [`Decision`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

/// Equity fraction deployed by the heavy "strong buy" tier.
pub const STRONG_BUY_SIZE: Decimal = dec!(0.30);
/// Equity fraction deployed by the regular buy tier.
pub const BUY_SIZE: Decimal = dec!(0.15);
/// No new entries once position value reaches this fraction of equity.
pub const DEFAULT_POSITION_CAP: Decimal = dec!(0.8);

/// Advisory classification of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    StrongBuy,
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::StrongBuy => write!(f, "STRONG BUY"),
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

/// Output of [`StrategyKind::decide`].
///
/// For `Buy`, `size_fraction` is the fraction of total equity to deploy; for
/// `Sell` it is the fraction of the current position to liquidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub size_fraction: Decimal,
    pub signal: Signal,
}

impl Decision {
    pub fn hold() -> Self {
        Decision {
            action: Action::Hold,
            size_fraction: Decimal::ZERO,
            signal: Signal::Hold,
        }
    }

    pub fn buy(size_fraction: Decimal, signal: Signal) -> Self {
        Decision {
            action: Action::Buy,
            size_fraction,
            signal,
        }
    }

    pub fn sell_all() -> Self {
        Decision {
            action: Action::Sell,
            size_fraction: Decimal::ONE,
            signal: Signal::Sell,
        }
    }
}

/// Indicator values for one bar; `None` when the series is undefined there.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorValues {
    pub mfi: Option<f64>,
    pub rsi: Option<f64>,
}

impl IndicatorValues {
    /// Read the series of `types` at bar `index`.
    pub fn at(
        indicators: &HashMap<IndicatorType, IndicatorSeries>,
        types: &[IndicatorType],
        index: usize,
    ) -> Self {
        let mut values = IndicatorValues::default();
        for indicator_type in types {
            let value = indicators
                .get(indicator_type)
                .and_then(|series| series.value_at(index));
            match indicator_type {
                IndicatorType::Mfi(_) => values.mfi = value,
                IndicatorType::Rsi(_) => values.rsi = value,
            }
        }
        values
    }
}

/// Single-indicator strategy with a tiered entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MfiHunterParams {
    pub mfi_period: usize,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub strong_buy_threshold: f64,
    pub strong_buy_size: Decimal,
    pub buy_size: Decimal,
    pub position_cap: Decimal,
}

impl Default for MfiHunterParams {
    fn default() -> Self {
        MfiHunterParams {
            mfi_period: 16,
            buy_threshold: 35.0,
            sell_threshold: 85.0,
            strong_buy_threshold: 20.0,
            strong_buy_size: STRONG_BUY_SIZE,
            buy_size: BUY_SIZE,
            position_cap: DEFAULT_POSITION_CAP,
        }
    }
}

/// Dual-indicator strategy: MFI and RSI must agree before acting.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusParams {
    pub mfi_period: usize,
    pub rsi_period: usize,
    pub mfi_oversold: f64,
    pub mfi_overbought: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub buy_size: Decimal,
    pub position_cap: Decimal,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        ConsensusParams {
            mfi_period: 14,
            rsi_period: 14,
            mfi_oversold: 35.0,
            mfi_overbought: 85.0,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            buy_size: BUY_SIZE,
            position_cap: DEFAULT_POSITION_CAP,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyKind {
    MfiHunter(MfiHunterParams),
    RsiMfiConsensus(ConsensusParams),
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::MfiHunter(_) => "mfi_hunter",
            StrategyKind::RsiMfiConsensus(_) => "rsi_mfi_consensus",
        }
    }

    pub fn position_cap(&self) -> Decimal {
        match self {
            StrategyKind::MfiHunter(p) => p.position_cap,
            StrategyKind::RsiMfiConsensus(p) => p.position_cap,
        }
    }

    /// Indicators this strategy reads on every bar.
    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        match self {
            StrategyKind::MfiHunter(p) => vec![IndicatorType::Mfi(p.mfi_period)],
            StrategyKind::RsiMfiConsensus(p) => vec![
                IndicatorType::Mfi(p.mfi_period),
                IndicatorType::Rsi(p.rsi_period),
            ],
        }
    }

    /// True when every indicator the strategy reads is defined.
    pub fn has_inputs(&self, values: &IndicatorValues) -> bool {
        match self {
            StrategyKind::MfiHunter(_) => values.mfi.is_some(),
            StrategyKind::RsiMfiConsensus(_) => values.mfi.is_some() && values.rsi.is_some(),
        }
    }

    /// Decide the action for one bar.
    ///
    /// Exit is evaluated before entry; an exit returns immediately. Entry tiers
    /// are mutually exclusive, so at most one buy is issued per bar.
    pub fn decide(
        &self,
        bar_index: usize,
        values: &IndicatorValues,
        position_fraction: Decimal,
    ) -> Decision {
        let in_position = position_fraction > Decimal::ZERO;
        let capped = position_fraction >= self.position_cap();

        let decision = match self {
            StrategyKind::MfiHunter(p) => {
                let Some(mfi) = values.mfi else {
                    return Decision::hold();
                };

                if in_position && mfi > p.sell_threshold {
                    Decision::sell_all()
                } else if capped {
                    Decision::hold()
                } else if mfi < p.strong_buy_threshold {
                    Decision::buy(p.strong_buy_size, Signal::StrongBuy)
                } else if mfi < p.buy_threshold {
                    Decision::buy(p.buy_size, Signal::Buy)
                } else {
                    Decision::hold()
                }
            }
            StrategyKind::RsiMfiConsensus(p) => {
                let (Some(mfi), Some(rsi)) = (values.mfi, values.rsi) else {
                    return Decision::hold();
                };

                if in_position && mfi > p.mfi_overbought && rsi > p.rsi_overbought {
                    Decision::sell_all()
                } else if !capped && mfi < p.mfi_oversold && rsi < p.rsi_oversold {
                    Decision::buy(p.buy_size, Signal::Buy)
                } else {
                    Decision::hold()
                }
            }
        };

        tracing::trace!(
            bar_index,
            strategy = self.name(),
            action = ?decision.action,
            size = %decision.size_fraction,
            "decision"
        );
        decision
    }

    /// Classify indicator values without regard to the current position.
    pub fn signal(&self, values: &IndicatorValues) -> Signal {
        match self {
            StrategyKind::MfiHunter(p) => match values.mfi {
                Some(mfi) if mfi < p.strong_buy_threshold => Signal::StrongBuy,
                Some(mfi) if mfi < p.buy_threshold => Signal::Buy,
                Some(mfi) if mfi > p.sell_threshold => Signal::Sell,
                _ => Signal::Hold,
            },
            StrategyKind::RsiMfiConsensus(p) => match (values.mfi, values.rsi) {
                (Some(mfi), Some(rsi)) if mfi < p.mfi_oversold && rsi < p.rsi_oversold => {
                    Signal::Buy
                }
                (Some(mfi), Some(rsi)) if mfi > p.mfi_overbought && rsi > p.rsi_overbought => {
                    Signal::Sell
                }
                _ => Signal::Hold,
            },
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    /// Parse a strategy name into that strategy with default parameters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mfi_hunter" => Ok(StrategyKind::MfiHunter(MfiHunterParams::default())),
            "rsi_mfi_consensus" => Ok(StrategyKind::RsiMfiConsensus(ConsensusParams::default())),
            other => Err(format!(
                "unknown strategy '{other}' (expected mfi_hunter or rsi_mfi_consensus)"
            )),
        }
    }
}
