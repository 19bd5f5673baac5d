//! Single-position trading simulation.
//!
//! The run is a left fold of [`step`] over indicator rows. Each step takes
//! the previous [`Position`] and one row and returns the next position, the
//! trade executed that day (if any), and the day's equity snapshot.
//!
//! Transitions:
//! - Flat + Buy: spend `floor(cash / close)` whole shares; nothing happens
//!   when that is zero.
//! - Invested + Sell: liquidate everything; sells held fewer than
//!   `short_term_days` calendar days pay `revenue * commission_rate_short`.
//! - Anything else leaves the position unchanged.

use chrono::NaiveDate;

use crate::domain::error::SlopetraderError;
use crate::domain::indicator::IndicatorRow;
use crate::domain::ohlcv::validate_bars;
use crate::domain::position::{Position, Trade, TradeSide};
use crate::domain::signal::Signal;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_COMMISSION_RATE_SHORT: f64 = 0.015;
pub const DEFAULT_SHORT_TERM_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    /// Fraction of sale revenue, e.g. 0.015 for 1.5%.
    pub commission_rate_short: f64,
    pub short_term_days: i64,
    /// When false every day is recorded but nothing is traded.
    pub enable_trading: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            commission_rate_short: DEFAULT_COMMISSION_RATE_SHORT,
            short_term_days: DEFAULT_SHORT_TERM_DAYS,
            enable_trading: true,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SlopetraderError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(SlopetraderError::invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.commission_rate_short) {
            return Err(SlopetraderError::invalid(
                "backtest",
                "commission_rate_short",
                "commission_rate_short must be in [0, 1)",
            ));
        }
        if self.short_term_days < 0 {
            return Err(SlopetraderError::invalid(
                "backtest",
                "short_term_days",
                "short_term_days must be non-negative",
            ));
        }
        Ok(())
    }

    /// Commission owed on a sell of `revenue` after `holding_days`.
    pub fn commission(&self, revenue: f64, holding_days: i64) -> f64 {
        if holding_days < self.short_term_days {
            revenue * self.commission_rate_short
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquitySnapshot {
    pub date: NaiveDate,
    pub total: f64,
    pub close: f64,
    pub ma: Option<f64>,
    pub signal: Signal,
    pub action: Option<TradeSide>,
    pub shares: u64,
    pub cash: f64,
}

/// Outcome of one simulated day.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub position: Position,
    pub trade: Option<Trade>,
    pub snapshot: EquitySnapshot,
}

fn buy(position: &Position, row: &IndicatorRow) -> Option<(Position, Trade)> {
    let price = row.close();
    if position.cash <= 0.0 {
        return None;
    }

    let mut shares = (position.cash / price).floor() as u64;
    if shares > 0 && shares as f64 * price > position.cash {
        shares -= 1;
    }
    if shares == 0 {
        tracing::debug!(
            date = %row.date(),
            price,
            cash = position.cash,
            "buy signal ignored: price exceeds available cash"
        );
        return None;
    }

    let cash = position.cash - shares as f64 * price;
    let next = Position {
        cash,
        shares,
        last_buy_date: Some(row.date()),
    };
    let trade = Trade {
        date: row.date(),
        side: TradeSide::Buy,
        price,
        shares,
        commission: 0.0,
        balance: cash,
        holding_days: None,
        reason: "moving average turned up".to_string(),
    };
    Some((next, trade))
}

fn sell(position: &Position, row: &IndicatorRow, config: &SimulationConfig) -> (Position, Trade) {
    let price = row.close();
    let revenue = position.market_value(price);
    let holding_days = position.holding_days(row.date()).unwrap_or(i64::MAX);
    let commission = config.commission(revenue, holding_days);
    let cash = position.cash + revenue - commission;

    let cause = match row.slope {
        Some(s) if s < 0.0 => "moving average turned down",
        _ => "price stretched above average",
    };
    let next = Position {
        cash,
        shares: 0,
        last_buy_date: position.last_buy_date,
    };
    let trade = Trade {
        date: row.date(),
        side: TradeSide::Sell,
        price,
        shares: position.shares,
        commission,
        balance: cash,
        holding_days: Some(holding_days),
        reason: format!("{cause} (held {holding_days} days)"),
    };
    (next, trade)
}

/// Advance the simulation by one day.
pub fn step(position: &Position, row: &IndicatorRow, config: &SimulationConfig) -> Step {
    let transition = if !config.enable_trading {
        None
    } else {
        match row.signal {
            Signal::Buy if position.is_flat() => buy(position, row),
            Signal::Sell if position.is_invested() => Some(sell(position, row, config)),
            Signal::Sell => {
                tracing::debug!(date = %row.date(), "sell signal ignored: no open position");
                None
            }
            Signal::Buy | Signal::Hold => None,
        }
    };

    let (next, trade) = match transition {
        Some((next, trade)) => (next, Some(trade)),
        None => (*position, None),
    };

    if let Some(t) = &trade {
        tracing::info!(
            date = %t.date,
            side = %t.side,
            price = t.price,
            shares = t.shares,
            commission = t.commission,
            balance = t.balance,
            "{}",
            t.reason
        );
    }

    let snapshot = EquitySnapshot {
        date: row.date(),
        total: next.total_value(row.close()),
        close: row.close(),
        ma: row.signal_ma,
        signal: row.signal,
        action: trade.as_ref().map(|t| t.side),
        shares: next.shares,
        cash: next.cash,
    };

    Step {
        position: next,
        trade,
        snapshot,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub initial_capital: f64,
    pub history: Vec<EquitySnapshot>,
    pub trades: Vec<Trade>,
    /// Open or flat position after the last row.
    pub final_position: Position,
}

impl SimulationResult {
    pub fn final_total(&self) -> f64 {
        self.history
            .last()
            .map(|s| s.total)
            .unwrap_or(self.initial_capital)
    }

    /// Simple percentage return on starting capital.
    pub fn total_return_pct(&self) -> f64 {
        (self.final_total() - self.initial_capital) / self.initial_capital * 100.0
    }

    pub fn total_commission(&self) -> f64 {
        self.trades.iter().map(|t| t.commission).sum()
    }

    pub fn buy_count(&self) -> usize {
        self.trades
            .iter()
            .filter(|t| t.side == TradeSide::Buy)
            .count()
    }

    pub fn sell_count(&self) -> usize {
        self.trades
            .iter()
            .filter(|t| t.side == TradeSide::Sell)
            .count()
    }
}

/// Run the simulation over `rows`. Rejects invalid config, empty input,
/// unordered dates and prices that are not finite and positive.
pub fn run_simulation(
    rows: &[IndicatorRow],
    config: &SimulationConfig,
) -> Result<SimulationResult, SlopetraderError> {
    config.validate()?;
    validate_bars(rows.iter().map(|r| &r.bar))?;

    let start = Position::new(config.initial_capital);
    let (final_position, trades, history) = rows.iter().fold(
        (start, Vec::new(), Vec::with_capacity(rows.len())),
        |(position, mut trades, mut history), row| {
            let Step {
                position,
                trade,
                snapshot,
            } = step(&position, row, config);
            trades.extend(trade);
            history.push(snapshot);
            (position, trades, history)
        },
    );

    let result = SimulationResult {
        initial_capital: config.initial_capital,
        history,
        trades,
        final_position,
    };

    if config.enable_trading {
        tracing::info!(
            final_total = result.final_total(),
            return_pct = result.total_return_pct(),
            trades = result.trades.len(),
            "simulation finished"
        );
    } else {
        tracing::info!(days = result.history.len(), "signals processed without trading");
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::PriceBar;
    use std::collections::BTreeMap;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn row(d: u32, close: f64, signal: Signal) -> IndicatorRow {
        IndicatorRow {
            bar: PriceBar {
                date: date(d),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0,
            },
            ma: BTreeMap::new(),
            bias: BTreeMap::new(),
            signal_ma: Some(close),
            slope: match signal {
                Signal::Buy => Some(1.0),
                Signal::Sell => Some(-1.0),
                Signal::Hold => Some(0.0),
            },
            prev_slope: None,
            signal,
        }
    }

    fn config(capital: f64) -> SimulationConfig {
        SimulationConfig {
            initial_capital: capital,
            ..Default::default()
        }
    }

    #[test]
    fn flat_buy_invests_whole_shares() {
        let cfg = config(1_000.0);
        let s = step(&Position::new(1_000.0), &row(1, 300.0, Signal::Buy), &cfg);
        assert_eq!(s.position.shares, 3);
        assert!((s.position.cash - 100.0).abs() < f64::EPSILON);
        assert_eq!(s.position.last_buy_date, Some(date(1)));
        let trade = s.trade.unwrap();
        assert_eq!(trade.side, TradeSide::Buy);
        assert_eq!(trade.shares, 3);
        assert_eq!(trade.commission, 0.0);
        assert!((trade.balance - 100.0).abs() < f64::EPSILON);
        assert_eq!(s.snapshot.action, Some(TradeSide::Buy));
        assert!((s.snapshot.total - 1_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unaffordable_buy_is_noop() {
        let cfg = config(100.0);
        let start = Position::new(100.0);
        let s = step(&start, &row(1, 150.0, Signal::Buy), &cfg);
        assert_eq!(s.position, start);
        assert!(s.trade.is_none());
        assert_eq!(s.snapshot.action, None);
    }

    #[test]
    fn buy_while_invested_is_noop() {
        let cfg = config(1_000.0);
        let invested = Position {
            cash: 10.0,
            shares: 9,
            last_buy_date: Some(date(1)),
        };
        let s = step(&invested, &row(2, 1.0, Signal::Buy), &cfg);
        assert_eq!(s.position, invested);
        assert!(s.trade.is_none());
    }

    #[test]
    fn sell_while_flat_is_noop() {
        let cfg = config(1_000.0);
        let flat = Position::new(1_000.0);
        let s = step(&flat, &row(2, 10.0, Signal::Sell), &cfg);
        assert_eq!(s.position, flat);
        assert!(s.trade.is_none());
    }

    #[test]
    fn short_term_sell_pays_commission() {
        let cfg = config(1_000.0);
        let invested = Position {
            cash: 100.0,
            shares: 3,
            last_buy_date: Some(date(1)),
        };
        let s = step(&invested, &row(4, 320.0, Signal::Sell), &cfg);
        let trade = s.trade.unwrap();
        let revenue = 960.0;
        assert_eq!(trade.holding_days, Some(3));
        assert!((trade.commission - revenue * 0.015).abs() < 1e-9);
        assert!((s.position.cash - (100.0 + revenue - revenue * 0.015)).abs() < 1e-9);
        assert_eq!(s.position.shares, 0);
        assert!(trade.reason.contains("held 3 days"));
    }

    #[test]
    fn long_hold_sell_is_free() {
        let cfg = config(1_000.0);
        let invested = Position {
            cash: 100.0,
            shares: 3,
            last_buy_date: Some(date(1)),
        };
        let s = step(&invested, &row(8, 320.0, Signal::Sell), &cfg);
        let trade = s.trade.unwrap();
        assert_eq!(trade.holding_days, Some(7));
        assert_eq!(trade.commission, 0.0);
        assert!((s.position.cash - 1_060.0).abs() < 1e-9);
    }

    #[test]
    fn disabled_trading_never_transacts() {
        let cfg = SimulationConfig {
            enable_trading: false,
            ..config(1_000.0)
        };
        let rows = vec![
            row(1, 10.0, Signal::Buy),
            row(2, 12.0, Signal::Hold),
            row(3, 9.0, Signal::Sell),
        ];
        let result = run_simulation(&rows, &cfg).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.history.len(), 3);
        for snap in &result.history {
            assert_eq!(snap.total, 1_000.0);
            assert_eq!(snap.shares, 0);
            assert_eq!(snap.action, None);
        }
        assert_eq!(result.history[0].signal, Signal::Buy);
    }

    #[test]
    fn open_position_marked_to_market_at_end() {
        let cfg = config(1_000.0);
        let rows = vec![row(1, 100.0, Signal::Buy), row(2, 110.0, Signal::Hold)];
        let result = run_simulation(&rows, &cfg).unwrap();
        assert!(result.final_position.is_invested());
        assert!((result.final_total() - 1_100.0).abs() < 1e-9);
        assert!((result.total_return_pct() - 10.0).abs() < 1e-9);
        assert_eq!(result.buy_count(), 1);
        assert_eq!(result.sell_count(), 0);
    }

    #[test]
    fn round_trip_summary() {
        let cfg = config(1_000.0);
        let rows = vec![
            row(1, 100.0, Signal::Buy),
            row(2, 110.0, Signal::Buy),
            row(3, 90.0, Signal::Sell),
            row(4, 95.0, Signal::Sell),
        ];
        let result = run_simulation(&rows, &cfg).unwrap();
        assert_eq!(result.trades.len(), 2);
        let expected_fee = 900.0 * 0.015;
        assert!((result.total_commission() - expected_fee).abs() < 1e-9);
        assert!((result.final_total() - (900.0 - expected_fee)).abs() < 1e-9);
        assert!(result.final_position.is_flat());
    }

    #[test]
    fn empty_rows_rejected() {
        let err = run_simulation(&[], &SimulationConfig::default()).unwrap_err();
        assert!(matches!(err, SlopetraderError::EmptySeries));
    }

    #[test]
    fn zero_close_rejected_before_any_trade() {
        let mut rows = vec![row(1, 10.0, Signal::Hold), row(2, 12.0, Signal::Buy)];
        rows[1].bar.close = 0.0;
        let err = run_simulation(&rows, &config(1_000.0)).unwrap_err();
        assert!(matches!(
            err,
            SlopetraderError::NonPositivePrice { field: "close", .. }
        ));
    }

    #[test]
    fn unordered_rows_rejected() {
        let rows = vec![
            row(5, 10.0, Signal::Buy),
            row(2, 9.0, Signal::Sell),
        ];
        let err = run_simulation(&rows, &config(1_000.0)).unwrap_err();
        assert!(matches!(
            err,
            SlopetraderError::NonMonotonicDates { index: 1, .. }
        ));
    }

    #[test]
    fn invalid_config_rejected() {
        let rows = vec![row(1, 10.0, Signal::Hold)];
        let cfg = SimulationConfig {
            initial_capital: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            run_simulation(&rows, &cfg),
            Err(SlopetraderError::ConfigInvalid { .. })
        ));

        let cfg = SimulationConfig {
            commission_rate_short: 1.5,
            ..Default::default()
        };
        assert!(run_simulation(&rows, &cfg).is_err());
    }

    #[test]
    fn commission_boundary() {
        let cfg = SimulationConfig::default();
        assert!((cfg.commission(1_000.0, 6) - 15.0).abs() < 1e-9);
        assert_eq!(cfg.commission(1_000.0, 7), 0.0);
    }
}
