#![allow(dead_code)]

use chrono::NaiveDate;
use flowtrader::domain::backtest::BacktestConfig;
use flowtrader::domain::error::FlowtraderError;
pub use flowtrader::domain::ohlcv::OhlcvBar;
use flowtrader::domain::strategy::{MfiHunterParams, StrategyKind};
use flowtrader::ports::data_port::DataPort;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, FlowtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(FlowtraderError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, FlowtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

/// Consecutive daily bars starting 2024-01-01 with the given closes.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Deterministic oscillating series.
pub fn generate_bars(n: usize) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + 12.0 * (i as f64 * 0.3).sin() + (i % 3) as f64)
        .collect();
    let mut bars = bars_from_closes(&closes);
    for (i, bar) in bars.iter_mut().enumerate() {
        bar.volume = 1000.0 + (i % 5) as f64 * 300.0;
    }
    bars
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        initial_capital: dec!(100000),
        commission_rate: Decimal::ZERO,
        ..BacktestConfig::default()
    }
}

pub fn short_hunter(period: usize) -> StrategyKind {
    StrategyKind::MfiHunter(MfiHunterParams {
        mfi_period: period,
        ..MfiHunterParams::default()
    })
}
