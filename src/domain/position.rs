//! Single-asset position state and trade records.

use chrono::NaiveDate;
use std::fmt;

/// Cash, whole shares, and the date of the last buy. Transitions return a
/// new value; a `Position` is never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub cash: f64,
    pub shares: u64,
    pub last_buy_date: Option<NaiveDate>,
}

impl Position {
    pub fn new(initial_capital: f64) -> Self {
        Position {
            cash: initial_capital,
            shares: 0,
            last_buy_date: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.shares == 0
    }

    pub fn is_invested(&self) -> bool {
        self.shares > 0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    pub fn total_value(&self, price: f64) -> f64 {
        self.cash + self.market_value(price)
    }

    /// Whole calendar days since the last buy.
    pub fn holding_days(&self, date: NaiveDate) -> Option<i64> {
        self.last_buy_date.map(|d| (date - d).num_days())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "Buy"),
            TradeSide::Sell => write!(f, "Sell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub side: TradeSide,
    pub price: f64,
    pub shares: u64,
    pub commission: f64,
    /// Cash balance after the trade settles.
    pub balance: f64,
    /// Set on sells only.
    pub holding_days: Option<i64>,
    pub reason: String,
}
