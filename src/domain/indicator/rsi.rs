//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - A window of n bars holds n-1 close-to-close changes
//! - First average: simple mean of the gains/losses in the first full window
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n-1 bars are invalid. A non-finite close breaks the chain of
//! changes; the averages re-seed once a full clean window follows it.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        (100.0 - (100.0 / (1.0 + avg_gain / avg_loss))).clamp(0.0, 100.0)
    }
}

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Rsi(period);
    if period < 2 || bars.len() < period {
        return IndicatorSeries::all_invalid(indicator_type, bars);
    }

    let changes: Vec<Option<f64>> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                return None;
            }
            let prev = bars[i - 1].close;
            if prev.is_finite() && bar.close.is_finite() {
                Some(bar.close - prev)
            } else {
                None
            }
        })
        .collect();

    let seed_len = period - 1;
    let mut values = Vec::with_capacity(bars.len());
    let mut run = 0usize;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let Some(change) = changes[i] else {
            run = 0;
            values.push(IndicatorPoint::invalid(bar.date));
            continue;
        };
        run += 1;

        if run < seed_len {
            values.push(IndicatorPoint::invalid(bar.date));
            continue;
        }

        if run == seed_len {
            let window = &changes[i + 1 - seed_len..=i];
            let gain_sum: f64 = window.iter().flatten().map(|c| c.max(0.0)).sum();
            let loss_sum: f64 = window.iter().flatten().map(|c| (-c).max(0.0)).sum();
            avg_gain = gain_sum / seed_len as f64;
            avg_loss = loss_sum / seed_len as f64;
        } else {
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        }

        values.push(IndicatorPoint::valid(
            bar.date,
            rsi_from_averages(avg_gain, avg_loss),
        ));
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
