//! Long-only position and closed trade records.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Open long position. Shares are fractional: sizing is equity-based, not lot-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub shares: Decimal,
    /// Gross cash paid for the shares still held, commission included.
    pub cost_basis: Decimal,
    /// Share-weighted average fill price.
    pub avg_entry_price: Decimal,
    pub entry_bar_index: usize,
    pub entry_date: NaiveDate,
}

impl Position {
    pub fn market_value(&self, price: Decimal) -> Decimal {
        self.shares * price
    }

    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        self.market_value(price) - self.cost_basis
    }

    /// Add a fill, keeping the original entry bar.
    pub(crate) fn add(&mut self, shares: Decimal, price: Decimal, gross_cost: Decimal) {
        let total = self.shares + shares;
        if !total.is_zero() {
            self.avg_entry_price = (self.shares * self.avg_entry_price + shares * price) / total;
        }
        self.shares = total;
        self.cost_basis += gross_cost;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_bar_index: usize,
    pub exit_bar_index: usize,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    pub pnl: Decimal,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    /// Bars between entry and exit.
    pub fn duration_bars(&self) -> usize {
        self.exit_bar_index.saturating_sub(self.entry_bar_index)
    }
}
