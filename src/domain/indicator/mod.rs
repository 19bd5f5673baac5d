//! Moving-average indicator types.
//!
//! - `IndicatorConfig`: windows, primary (signal) window, confirmation days
//! - `IndicatorRow`: one price bar extended with averages, bias, slope and signal
//!
//! The engine that fills rows lives in [`crate::domain::indicator_helpers`].

pub mod bias;
pub mod slope;
pub mod sma;

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::SlopetraderError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::Signal;

pub const DEFAULT_PRIMARY_WINDOW: usize = 20;
pub const DEFAULT_WINDOWS: [usize; 3] = [20, 60, 120];
pub const DEFAULT_CONFIRMATION_DAYS: usize = 2;

/// Extra sell trigger: close deviates above the `window` average by more
/// than `threshold` percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasExit {
    pub window: usize,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub primary_window: usize,
    pub windows: Vec<usize>,
    pub confirmation_days: usize,
    pub bias_exit: Option<BiasExit>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            primary_window: DEFAULT_PRIMARY_WINDOW,
            windows: DEFAULT_WINDOWS.to_vec(),
            confirmation_days: DEFAULT_CONFIRMATION_DAYS,
            bias_exit: None,
        }
    }
}

impl IndicatorConfig {
    /// Sorted, deduplicated window set that always contains the primary
    /// window and the bias-exit window.
    pub fn normalized(&self) -> Result<IndicatorConfig, SlopetraderError> {
        if self.primary_window == 0 {
            return Err(SlopetraderError::invalid(
                "strategy",
                "ma_window",
                "ma_window must be positive",
            ));
        }
        if self.windows.contains(&0) {
            return Err(SlopetraderError::invalid(
                "strategy",
                "ma_list",
                "moving-average windows must be positive",
            ));
        }
        if self.confirmation_days == 0 {
            return Err(SlopetraderError::invalid(
                "strategy",
                "slope_confirmation_days",
                "slope_confirmation_days must be at least 1",
            ));
        }

        let mut windows = self.windows.clone();
        windows.push(self.primary_window);
        if let Some(exit) = self.bias_exit {
            if exit.window == 0 {
                return Err(SlopetraderError::invalid(
                    "strategy",
                    "bias_exit_window",
                    "bias_exit_window must be positive",
                ));
            }
            if !exit.threshold.is_finite() {
                return Err(SlopetraderError::invalid(
                    "strategy",
                    "bias_exit_threshold",
                    "bias_exit_threshold must be a finite number",
                ));
            }
            windows.push(exit.window);
        }
        windows.sort_unstable();
        windows.dedup();

        Ok(IndicatorConfig {
            windows,
            ..self.clone()
        })
    }

    pub fn max_window(&self) -> usize {
        self.windows
            .iter()
            .copied()
            .chain(std::iter::once(self.primary_window))
            .max()
            .unwrap_or(self.primary_window)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub bar: PriceBar,
    pub ma: BTreeMap<usize, Option<f64>>,
    pub bias: BTreeMap<usize, Option<f64>>,
    /// Primary (signal) moving average.
    pub signal_ma: Option<f64>,
    pub slope: Option<f64>,
    pub prev_slope: Option<f64>,
    pub signal: Signal,
}

impl IndicatorRow {
    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }

    pub fn ma(&self, window: usize) -> Option<f64> {
        self.ma.get(&window).copied().flatten()
    }

    pub fn bias(&self, window: usize) -> Option<f64> {
        self.bias.get(&window).copied().flatten()
    }
}

/// Column label for a moving-average window, e.g. `MA20`.
pub struct MaLabel(pub usize);

impl fmt::Display for MaLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MA{}", self.0)
    }
}

/// Column label for a bias window, e.g. `BIAS20`.
pub struct BiasLabel(pub usize);

impl fmt::Display for BiasLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BIAS{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = IndicatorConfig::default();
        assert_eq!(c.primary_window, 20);
        assert_eq!(c.windows, vec![20, 60, 120]);
        assert_eq!(c.confirmation_days, 2);
        assert!(c.bias_exit.is_none());
    }

    #[test]
    fn normalized_adds_primary_and_dedups() {
        let c = IndicatorConfig {
            primary_window: 10,
            windows: vec![60, 20, 60],
            ..Default::default()
        };
        assert_eq!(c.normalized().unwrap().windows, vec![10, 20, 60]);
    }

    #[test]
    fn normalized_adds_bias_exit_window() {
        let c = IndicatorConfig {
            windows: vec![20],
            bias_exit: Some(BiasExit {
                window: 10,
                threshold: 8.0,
            }),
            ..Default::default()
        };
        assert_eq!(c.normalized().unwrap().windows, vec![10, 20]);
    }

    #[test]
    fn normalized_rejects_zero_confirmation() {
        let c = IndicatorConfig {
            confirmation_days: 0,
            ..Default::default()
        };
        let err = c.normalized().unwrap_err();
        assert!(
            matches!(err, SlopetraderError::ConfigInvalid { key, .. } if key == "slope_confirmation_days")
        );
    }

    #[test]
    fn normalized_rejects_zero_window() {
        let c = IndicatorConfig {
            windows: vec![0, 20],
            ..Default::default()
        };
        assert!(c.normalized().is_err());

        let c = IndicatorConfig {
            primary_window: 0,
            ..Default::default()
        };
        assert!(c.normalized().is_err());
    }

    #[test]
    fn max_window_includes_primary() {
        let c = IndicatorConfig {
            primary_window: 250,
            windows: vec![20],
            ..Default::default()
        };
        assert_eq!(c.max_window(), 250);
        assert_eq!(IndicatorConfig::default().max_window(), 120);
    }

    #[test]
    fn labels() {
        assert_eq!(MaLabel(20).to_string(), "MA20");
        assert_eq!(BiasLabel(60).to_string(), "BIAS60");
    }
}
