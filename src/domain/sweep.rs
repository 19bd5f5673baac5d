//! Bias-exit threshold sweep.
//!
//! Runs the full pipeline once without the bias exit and once per threshold,
//! then reports each threshold's return against that baseline.

use rayon::prelude::*;

use crate::domain::backtest::{run_series, BacktestConfig};
use crate::domain::error::SlopetraderError;
use crate::domain::indicator::BiasExit;
use crate::domain::ohlcv::PriceBar;

/// Thresholds tried when none are configured: 3% to 20% in 1% steps.
pub fn default_thresholds() -> Vec<f64> {
    (3..=20).map(f64::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub threshold: f64,
    pub return_pct: f64,
    /// Percentage points over the baseline.
    pub improvement: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BiasSweep {
    pub window: usize,
    pub baseline_return_pct: f64,
    pub points: Vec<SweepPoint>,
}

impl BiasSweep {
    /// Highest-returning threshold, first one on ties, if it beats the
    /// baseline.
    pub fn best(&self) -> Option<&SweepPoint> {
        self.points
            .iter()
            .fold(None::<&SweepPoint>, |best, p| match best {
                Some(b) if b.return_pct >= p.return_pct => Some(b),
                _ => Some(p),
            })
            .filter(|p| p.improvement > 0.0)
    }
}

fn return_with(
    bars: &[PriceBar],
    config: &BacktestConfig,
    bias_exit: Option<BiasExit>,
) -> Result<f64, SlopetraderError> {
    let mut config = config.clone();
    config.indicators.bias_exit = bias_exit;
    config.simulation.enable_trading = true;
    let (_, result) = run_series(bars, &config)?;
    Ok(result.total_return_pct())
}

pub fn sweep_bias_thresholds(
    bars: &[PriceBar],
    config: &BacktestConfig,
    window: usize,
    thresholds: &[f64],
) -> Result<BiasSweep, SlopetraderError> {
    if window == 0 {
        return Err(SlopetraderError::invalid(
            "strategy",
            "bias_exit_window",
            "bias_exit_window must be positive",
        ));
    }
    let baseline = return_with(bars, config, None)?;
    tracing::info!(window, baseline_pct = baseline, "bias sweep baseline");

    let points = thresholds
        .par_iter()
        .map(|&threshold| {
            let return_pct = return_with(bars, config, Some(BiasExit { window, threshold }))?;
            tracing::debug!(threshold, return_pct, "bias sweep point");
            Ok(SweepPoint {
                threshold,
                return_pct,
                improvement: return_pct - baseline,
            })
        })
        .collect::<Result<Vec<_>, SlopetraderError>>()?;

    Ok(BiasSweep {
        window,
        baseline_return_pct: baseline,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorConfig;
    use chrono::NaiveDate;

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0,
            })
            .collect()
    }

    fn config() -> BacktestConfig {
        let mut config = BacktestConfig::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        config.indicators = IndicatorConfig {
            primary_window: 1,
            windows: vec![1],
            confirmation_days: 1,
            bias_exit: None,
        };
        config
    }

    fn point(threshold: f64, return_pct: f64, improvement: f64) -> SweepPoint {
        SweepPoint {
            threshold,
            return_pct,
            improvement,
        }
    }

    #[test]
    fn default_threshold_range() {
        let t = default_thresholds();
        assert_eq!(t.len(), 18);
        assert_eq!(t[0], 3.0);
        assert_eq!(t[17], 20.0);
    }

    #[test]
    fn best_picks_first_maximum_above_baseline() {
        let sweep = BiasSweep {
            window: 10,
            baseline_return_pct: 5.0,
            points: vec![
                point(3.0, 4.0, -1.0),
                point(4.0, 9.0, 4.0),
                point(5.0, 9.0, 4.0),
            ],
        };
        assert_eq!(sweep.best().unwrap().threshold, 4.0);
    }

    #[test]
    fn best_is_none_without_improvement() {
        let sweep = BiasSweep {
            window: 10,
            baseline_return_pct: 5.0,
            points: vec![point(3.0, 5.0, 0.0), point(4.0, 1.0, -4.0)],
        };
        assert!(sweep.best().is_none());
    }

    #[test]
    fn take_profit_on_spike_beats_baseline() {
        // Buy at 10.5, spike to 30, then the average turns down at 12.
        let closes = [10.0, 10.0, 10.0, 10.5, 30.0, 12.0];
        let sweep = sweep_bias_thresholds(&bars(&closes), &config(), 3, &[20.0, 500.0]).unwrap();

        // Baseline sells on the way down at 12.
        let shares = (100_000.0_f64 / 10.5).floor();
        let cash = 100_000.0 - shares * 10.5;
        let baseline_total = cash + shares * 12.0 * (1.0 - 0.015);
        let expected = (baseline_total - 100_000.0) / 100_000.0 * 100.0;
        assert!((sweep.baseline_return_pct - expected).abs() < 1e-9);

        assert_eq!(sweep.points.len(), 2);
        assert!(sweep.points[0].improvement > 0.0);
        assert!(sweep.points[1].improvement.abs() < 1e-9);
        assert_eq!(sweep.best().unwrap().threshold, 20.0);
    }

    #[test]
    fn zero_window_rejected() {
        let err = sweep_bias_thresholds(&bars(&[1.0, 2.0]), &config(), 0, &[5.0]).unwrap_err();
        assert!(matches!(err, SlopetraderError::ConfigInvalid { .. }));
    }
}
