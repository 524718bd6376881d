//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// typical_price * volume
    pub fn raw_money_flow(&self) -> f64 {
        self.typical_price() * self.volume
    }

    /// All five numeric fields are finite.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// Close usable as an execution price.
    pub fn has_tradable_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn typical_price() {
        let bar = sample_bar();
        // (110 + 90 + 105) / 3 = 101.666...
        let expected = (110.0 + 90.0 + 105.0) / 3.0;
        assert!((bar.typical_price() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn raw_money_flow_scales_by_volume() {
        let bar = sample_bar();
        let expected = (110.0 + 90.0 + 105.0) / 3.0 * 50_000.0;
        assert!((bar.raw_money_flow() - expected).abs() < 1e-6);
    }

    #[test]
    fn finite_bar() {
        assert!(sample_bar().is_finite());
        assert!(sample_bar().has_tradable_close());
    }

    #[test]
    fn nan_volume_is_not_finite() {
        let bar = OhlcvBar {
            volume: f64::NAN,
            ..sample_bar()
        };
        assert!(!bar.is_finite());
        assert!(bar.has_tradable_close());
    }

    #[test]
    fn infinite_close_is_not_tradable() {
        let bar = OhlcvBar {
            close: f64::INFINITY,
            ..sample_bar()
        };
        assert!(!bar.is_finite());
        assert!(!bar.has_tradable_close());
    }

    #[test]
    fn zero_close_is_not_tradable() {
        let bar = OhlcvBar {
            close: 0.0,
            ..sample_bar()
        };
        assert!(bar.is_finite());
        assert!(!bar.has_tradable_close());
    }
}
