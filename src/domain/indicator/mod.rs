//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values, aligned 1:1 with the bars
//!
//! Every series has one point per input bar. Points inside the warm-up window, or
//! whose lookback touches a non-finite bar, are marked invalid.

pub mod mfi;
pub mod rsi;

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;

use crate::domain::ohlcv::OhlcvBar;

pub use mfi::calculate_mfi;
pub use rsi::calculate_rsi;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn invalid(date: NaiveDate) -> Self {
        IndicatorPoint {
            date,
            valid: false,
            value: 0.0,
        }
    }

    pub fn valid(date: NaiveDate, value: f64) -> Self {
        IndicatorPoint {
            date,
            valid: true,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Mfi(usize),
    Rsi(usize),
}

impl IndicatorType {
    pub fn period(&self) -> usize {
        match self {
            IndicatorType::Mfi(period) | IndicatorType::Rsi(period) => *period,
        }
    }

    pub fn calculate(&self, bars: &[OhlcvBar]) -> IndicatorSeries {
        match *self {
            IndicatorType::Mfi(period) => calculate_mfi(bars, period),
            IndicatorType::Rsi(period) => calculate_rsi(bars, period),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Mfi(period) => write!(f, "MFI({period})"),
            IndicatorType::Rsi(period) => write!(f, "RSI({period})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// One invalid point per bar.
    pub(crate) fn all_invalid(indicator_type: IndicatorType, bars: &[OhlcvBar]) -> Self {
        IndicatorSeries {
            indicator_type,
            values: bars.iter().map(|b| IndicatorPoint::invalid(b.date)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at bar `index`, or `None` if undefined or out of range.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|p| p.valid).count()
    }

    /// Number of undefined points before the first defined one.
    pub fn leading_invalid(&self) -> usize {
        self.values.iter().take_while(|p| !p.valid).count()
    }

    pub fn last_valid(&self) -> Option<&IndicatorPoint> {
        self.values.iter().rev().find(|p| p.valid)
    }
}

/// Compute every requested indicator over `bars`.
///
/// Indicator types are independent of each other and are computed in parallel;
/// each individual series is still computed sequentially.
pub fn compute_indicators(
    bars: &[OhlcvBar],
    types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut unique: Vec<IndicatorType> = Vec::with_capacity(types.len());
    for t in types {
        if !unique.contains(t) {
            unique.push(*t);
        }
    }

    unique
        .par_iter()
        .map(|t| (*t, t.calculate(bars)))
        .collect()
}
