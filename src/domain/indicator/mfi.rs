//! MFI (Money Flow Index) indicator implementation.
//!
//! - Typical price: (high + low + close) / 3
//! - Raw money flow: typical_price * volume
//! - A bar's flow is positive if its typical price rose against the previous
//!   bar, negative if it fell, and counted in neither sum if unchanged. The
//!   first bar has no previous bar and contributes no flow.
//!
//! Formula over the trailing `period` bars:
//! MFI = 100 * positive_sum / (positive_sum + negative_sum)
//! If negative_sum == 0 and positive_sum > 0: MFI = 100
//! If both sums are 0 (no directional flow): MFI = 50
//!
//! Warmup: first period-1 bars are invalid. A window containing a bar with a
//! non-finite field, or whose flow needs a non-finite previous bar, is invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

/// Value reported when a window has no directional flow at all.
pub const NEUTRAL_MFI: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Flow {
    positive: f64,
    negative: f64,
}

fn usable(bar: &OhlcvBar) -> bool {
    bar.is_finite() && bar.volume >= 0.0
}

fn directional_flows(bars: &[OhlcvBar]) -> Vec<Option<Flow>> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if !usable(bar) {
                return None;
            }
            if i == 0 {
                return Some(Flow {
                    positive: 0.0,
                    negative: 0.0,
                });
            }
            let prev = &bars[i - 1];
            if !usable(prev) {
                return None;
            }

            let tp = bar.typical_price();
            let prev_tp = prev.typical_price();
            let raw = bar.raw_money_flow();
            let flow = if tp > prev_tp {
                Flow {
                    positive: raw,
                    negative: 0.0,
                }
            } else if tp < prev_tp {
                Flow {
                    positive: 0.0,
                    negative: raw,
                }
            } else {
                Flow {
                    positive: 0.0,
                    negative: 0.0,
                }
            };
            Some(flow)
        })
        .collect()
}

/// Money flow ratio scaled to [0, 100].
pub fn mfi_from_sums(positive_sum: f64, negative_sum: f64) -> f64 {
    let total = positive_sum + negative_sum;
    if total <= 0.0 {
        NEUTRAL_MFI
    } else if negative_sum <= 0.0 {
        100.0
    } else {
        (100.0 * positive_sum / total).clamp(0.0, 100.0)
    }
}

pub fn calculate_mfi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Mfi(period);
    if period < 2 || bars.len() < period {
        return IndicatorSeries::all_invalid(indicator_type, bars);
    }

    let flows = directional_flows(bars);
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if i + 1 < period {
            values.push(IndicatorPoint::invalid(bar.date));
            continue;
        }

        let window = &flows[i + 1 - period..=i];
        let sums = window.iter().try_fold((0.0, 0.0), |(pos, neg), flow| {
            flow.map(|f| (pos + f.positive, neg + f.negative))
        });

        match sums {
            Some((pos, neg)) => values.push(IndicatorPoint::valid(bar.date, mfi_from_sums(pos, neg))),
            None => values.push(IndicatorPoint::invalid(bar.date)),
        }
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
