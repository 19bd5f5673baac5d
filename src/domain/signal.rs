//! Slope-inflection trading signal.
//!
//! Sell as soon as the primary average turns down (or, when configured, the
//! close runs too far above its bias average). Buy only once the slope has
//! stayed positive for the whole confirmation window. Sell wins a tie.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::indicator::IndicatorRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// Bias series and threshold for the optional extra sell trigger.
#[derive(Debug, Clone, Copy)]
pub struct BiasTrigger<'a> {
    pub bias: &'a [Option<f64>],
    pub threshold: f64,
}

/// Slope positive on every one of the last `confirmation_days` bars.
fn is_confirmed_rise(slopes: &[Option<f64>], i: usize, confirmation_days: usize) -> bool {
    if i + 1 < confirmation_days {
        return false;
    }
    slopes[i + 1 - confirmation_days..=i]
        .iter()
        .all(|s| matches!(s, Some(v) if *v > 0.0))
}

fn is_sell(slopes: &[Option<f64>], i: usize, bias_trigger: Option<BiasTrigger<'_>>) -> bool {
    let turned_down = matches!(slopes[i], Some(v) if v < 0.0);
    let overextended = bias_trigger
        .and_then(|t| t.bias.get(i).copied().flatten().map(|b| b > t.threshold))
        .unwrap_or(false);
    turned_down || overextended
}

pub fn derive_signals(
    slopes: &[Option<f64>],
    confirmation_days: usize,
    bias_trigger: Option<BiasTrigger<'_>>,
) -> Vec<Signal> {
    let confirmation_days = confirmation_days.max(1);
    (0..slopes.len())
        .map(|i| {
            if is_sell(slopes, i, bias_trigger) {
                Signal::Sell
            } else if is_confirmed_rise(slopes, i, confirmation_days) {
                Signal::Buy
            } else {
                Signal::Hold
            }
        })
        .collect()
}

/// A day where the signal switched to Buy or Sell.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalChange {
    pub date: NaiveDate,
    pub signal: Signal,
    pub slope: Option<f64>,
    pub close: f64,
    /// Close `primary_window` bars earlier, when the rows reach that far back.
    pub close_prev_n: Option<f64>,
}

/// Turning points on or after `from`: rows whose signal differs from the
/// previous row's and is not Hold. The row before the first one reported
/// counts as Hold. Earlier rows only supply `close_prev_n`.
pub fn signal_changes(
    rows: &[IndicatorRow],
    primary_window: usize,
    from: NaiveDate,
) -> Vec<SignalChange> {
    let mut previous = Signal::Hold;
    let mut changes = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        if row.date() < from {
            continue;
        }
        if row.signal != previous && row.signal != Signal::Hold {
            changes.push(SignalChange {
                date: row.date(),
                signal: row.signal,
                slope: row.slope,
                close: row.close(),
                close_prev_n: i.checked_sub(primary_window).map(|j| rows[j].close()),
            });
        }
        previous = row.signal;
    }

    changes
}
