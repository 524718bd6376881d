//! Configuration validation.
//!
//! Runs when a backtester is constructed, before any bar is processed. Error
//! keys name the INI key the offending value is read from.

use rust_decimal::Decimal;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::FlowtraderError;
use crate::domain::strategy::{ConsensusParams, MfiHunterParams, StrategyKind};

pub fn validate_backtest_config(config: &BacktestConfig) -> Result<(), FlowtraderError> {
    if config.initial_capital <= Decimal::ZERO {
        return Err(FlowtraderError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if config.commission_rate < Decimal::ZERO || config.commission_rate >= Decimal::ONE {
        return Err(FlowtraderError::invalid(
            "backtest",
            "commission_rate",
            "commission_rate must be in [0, 1)",
        ));
    }
    if !(0.0..1.0).contains(&config.risk_free_rate) {
        return Err(FlowtraderError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be in [0, 1)",
        ));
    }
    Ok(())
}

pub fn validate_strategy(strategy: &StrategyKind) -> Result<(), FlowtraderError> {
    match strategy {
        StrategyKind::MfiHunter(p) => validate_hunter(p),
        StrategyKind::RsiMfiConsensus(p) => validate_consensus(p),
    }
}

fn validate_hunter(p: &MfiHunterParams) -> Result<(), FlowtraderError> {
    validate_period("mfi_period", p.mfi_period)?;
    validate_level("strong_buy_threshold", p.strong_buy_threshold)?;
    validate_level("buy_threshold", p.buy_threshold)?;
    validate_level("sell_threshold", p.sell_threshold)?;
    if p.buy_threshold >= p.sell_threshold {
        return Err(FlowtraderError::invalid(
            "strategy",
            "buy_threshold",
            "buy_threshold must be below sell_threshold",
        ));
    }
    if p.strong_buy_threshold > p.buy_threshold {
        return Err(FlowtraderError::invalid(
            "strategy",
            "strong_buy_threshold",
            "strong_buy_threshold must not exceed buy_threshold",
        ));
    }
    validate_fraction("strong_buy_size", p.strong_buy_size)?;
    validate_fraction("buy_size", p.buy_size)?;
    validate_fraction("position_cap_fraction", p.position_cap)?;
    Ok(())
}

fn validate_consensus(p: &ConsensusParams) -> Result<(), FlowtraderError> {
    validate_period("mfi_period", p.mfi_period)?;
    validate_period("rsi_period", p.rsi_period)?;
    validate_level("buy_threshold", p.mfi_oversold)?;
    validate_level("sell_threshold", p.mfi_overbought)?;
    validate_level("rsi_oversold", p.rsi_oversold)?;
    validate_level("rsi_overbought", p.rsi_overbought)?;
    if p.mfi_oversold >= p.mfi_overbought {
        return Err(FlowtraderError::invalid(
            "strategy",
            "buy_threshold",
            "buy_threshold must be below sell_threshold",
        ));
    }
    if p.rsi_oversold >= p.rsi_overbought {
        return Err(FlowtraderError::invalid(
            "strategy",
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought",
        ));
    }
    validate_fraction("buy_size", p.buy_size)?;
    validate_fraction("position_cap_fraction", p.position_cap)?;
    Ok(())
}

fn validate_period(key: &str, period: usize) -> Result<(), FlowtraderError> {
    if period < 2 {
        return Err(FlowtraderError::invalid(
            "strategy",
            key,
            format!("{key} must be at least 2"),
        ));
    }
    Ok(())
}

/// Oscillator levels live on the [0, 100] scale.
fn validate_level(key: &str, value: f64) -> Result<(), FlowtraderError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(FlowtraderError::invalid(
            "strategy",
            key,
            format!("{key} must be between 0 and 100"),
        ));
    }
    Ok(())
}

fn validate_fraction(key: &str, value: Decimal) -> Result<(), FlowtraderError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(FlowtraderError::invalid(
            "strategy",
            key,
            format!("{key} must be between 0 and 1"),
        ));
    }
    Ok(())
}
