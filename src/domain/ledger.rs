//! Cash, position and equity accounting for a single backtest run.
//!
//! All amounts are `Decimal`. Buys are sized as a fraction of current total
//! equity; sells liquidate a fraction of the shares held. Commission is a rate
//! charged on both sides:
//! - buy: the gross amount leaves cash, `gross * (1 - rate)` buys shares
//! - sell: `shares * price * (1 - rate)` returns to cash

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::position::{Position, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: Decimal,
}

/// Result of a buy attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BuyOutcome {
    Filled {
        shares: Decimal,
        gross_cost: Decimal,
        commission: Decimal,
    },
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },
}

impl BuyOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, BuyOutcome::Filled { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    initial_capital: Decimal,
    cash: Decimal,
    position: Option<Position>,
    equity_peak: Decimal,
    trade_log: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl Ledger {
    pub fn new(initial_capital: Decimal) -> Self {
        Ledger {
            initial_capital,
            cash: initial_capital,
            position: None,
            equity_peak: initial_capital,
            trade_log: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn shares(&self) -> Decimal {
        self.position.as_ref().map_or(Decimal::ZERO, |p| p.shares)
    }

    pub fn equity_peak(&self) -> Decimal {
        self.equity_peak
    }

    pub fn trade_log(&self) -> &[Trade] {
        &self.trade_log
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    fn holdings_value(&self, price: Decimal) -> Decimal {
        self.position
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.market_value(price))
    }

    pub fn total_equity(&self, price: Decimal) -> Decimal {
        self.cash + self.holdings_value(price)
    }

    /// Position market value divided by total equity; zero when flat or when
    /// equity is not positive.
    pub fn position_fraction(&self, price: Decimal) -> Decimal {
        let equity = self.total_equity(price);
        if equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.holdings_value(price) / equity
    }

    /// Deploy `size_fraction` of total equity at `price`.
    ///
    /// A buy that needs more cash than is available (or a non-positive amount)
    /// is a logged no-op, never an error.
    pub fn apply_buy(
        &mut self,
        bar_index: usize,
        date: NaiveDate,
        size_fraction: Decimal,
        price: Decimal,
        commission_rate: Decimal,
    ) -> BuyOutcome {
        let gross = if price > Decimal::ZERO {
            size_fraction * self.total_equity(price)
        } else {
            Decimal::ZERO
        };

        if gross <= Decimal::ZERO || gross > self.cash {
            tracing::warn!(
                bar_index,
                %date,
                required = %gross,
                available = %self.cash,
                "buy skipped: insufficient funds"
            );
            return BuyOutcome::InsufficientFunds {
                required: gross,
                available: self.cash,
            };
        }

        let commission = gross * commission_rate;
        let shares = (gross - commission) / price;
        self.cash -= gross;

        match self.position.as_mut() {
            Some(pos) => pos.add(shares, price, gross),
            None => {
                self.position = Some(Position {
                    shares,
                    cost_basis: gross,
                    avg_entry_price: price,
                    entry_bar_index: bar_index,
                    entry_date: date,
                });
            }
        }

        tracing::debug!(bar_index, %date, %price, %shares, %gross, "buy filled");

        BuyOutcome::Filled {
            shares,
            gross_cost: gross,
            commission,
        }
    }

    /// Liquidate `size_fraction` of the shares held at `price`.
    ///
    /// Returns the recorded trade, or `None` when flat or nothing is sold.
    /// Partial closes carry a pro-rated share of the cost basis.
    pub fn apply_sell(
        &mut self,
        bar_index: usize,
        date: NaiveDate,
        size_fraction: Decimal,
        price: Decimal,
        commission_rate: Decimal,
    ) -> Option<Trade> {
        let fraction = size_fraction.min(Decimal::ONE);
        if fraction <= Decimal::ZERO || price <= Decimal::ZERO {
            return None;
        }
        let pos = self.position.as_mut()?;

        let full_close = fraction == Decimal::ONE;
        let (sold, cost) = if full_close {
            (pos.shares, pos.cost_basis)
        } else {
            (pos.shares * fraction, pos.cost_basis * fraction)
        };

        let proceeds = sold * price * (Decimal::ONE - commission_rate);
        let trade = Trade {
            entry_bar_index: pos.entry_bar_index,
            exit_bar_index: bar_index,
            entry_date: pos.entry_date,
            exit_date: date,
            entry_price: pos.avg_entry_price,
            exit_price: price,
            size: sold,
            pnl: proceeds - cost,
        };

        self.cash += proceeds;
        if full_close {
            self.position = None;
        } else {
            pos.shares -= sold;
            pos.cost_basis -= cost;
        }

        tracing::debug!(bar_index, %date, %price, size = %sold, pnl = %trade.pnl, "sell filled");

        self.trade_log.push(trade.clone());
        Some(trade)
    }

    /// Value the ledger at `price`, update the peak and record the snapshot.
    pub fn mark_to_market(&mut self, date: NaiveDate, price: Decimal) -> Decimal {
        let equity = self.total_equity(price);
        if equity > self.equity_peak {
            self.equity_peak = equity;
        }
        self.equity_curve.push(EquityPoint { date, equity });
        equity
    }
}
