//! Indicator engine: price bars in, signal rows out.

use std::collections::BTreeMap;

use crate::domain::error::SlopetraderError;
use crate::domain::indicator::bias::calculate_bias;
use crate::domain::indicator::slope::{calculate_slope, shift_one};
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{IndicatorConfig, IndicatorRow};
use crate::domain::ohlcv::{validate_series, PriceBar};
use crate::domain::signal::{derive_signals, BiasTrigger};

/// Compute every configured average and bias, the primary slope, and the
/// per-day signal. Pure function of `bars` and `config`.
pub fn compute_indicators(
    bars: &[PriceBar],
    config: &IndicatorConfig,
) -> Result<Vec<IndicatorRow>, SlopetraderError> {
    let config = config.normalized()?;
    validate_series(bars)?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let mut ma_series: BTreeMap<usize, Vec<Option<f64>>> = BTreeMap::new();
    let mut bias_series: BTreeMap<usize, Vec<Option<f64>>> = BTreeMap::new();
    for &window in &config.windows {
        let ma = calculate_sma(&closes, window);
        bias_series.insert(window, calculate_bias(&closes, &ma));
        ma_series.insert(window, ma);
    }

    let primary = &ma_series[&config.primary_window];
    let slopes = calculate_slope(primary);
    let prev_slopes = shift_one(&slopes);

    let bias_trigger = config.bias_exit.map(|exit| BiasTrigger {
        bias: &bias_series[&exit.window],
        threshold: exit.threshold,
    });
    let signals = derive_signals(&slopes, config.confirmation_days, bias_trigger);

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            bar: bar.clone(),
            ma: ma_series.iter().map(|(&w, s)| (w, s[i])).collect(),
            bias: bias_series.iter().map(|(&w, s)| (w, s[i])).collect(),
            signal_ma: primary[i],
            slope: slopes[i],
            prev_slope: prev_slopes[i],
            signal: signals[i],
        })
        .collect();

    Ok(rows)
}
