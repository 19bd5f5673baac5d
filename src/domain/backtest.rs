//! Per-symbol pipeline: fetch with warm-up, indicators, trim, simulate.
//!
//! `run_universe` runs every symbol independently; one symbol's failure is
//! returned alongside the others' results and never aborts the batch.

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::domain::error::SlopetraderError;
use crate::domain::indicator::{IndicatorConfig, IndicatorRow};
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{signal_changes, Signal, SignalChange};
use crate::domain::simulation::{run_simulation, SimulationConfig, SimulationResult};
use crate::domain::universe::IndexEntry;
use crate::ports::data_port::DataPort;

/// Calendar days of history fetched per bar of the longest window.
pub const WARMUP_DAYS_PER_BAR: i64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub indicators: IndicatorConfig,
    pub simulation: SimulationConfig,
    pub show_signal_logs: bool,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate) -> Self {
        BacktestConfig {
            start_date,
            end_date: None,
            indicators: IndicatorConfig::default(),
            simulation: SimulationConfig::default(),
            show_signal_logs: true,
        }
    }

    /// First date to fetch so the longest average is defined on `start_date`.
    pub fn warmup_start(&self) -> Result<NaiveDate, SlopetraderError> {
        self.warmup_start_for(self.indicators.max_window())
    }

    /// As `warmup_start`, with history long enough for a `window`-bar
    /// average as well.
    pub fn warmup_start_for(&self, window: usize) -> Result<NaiveDate, SlopetraderError> {
        let longest = window.max(self.indicators.max_window());
        i64::try_from(longest)
            .ok()
            .and_then(|w| w.checked_mul(WARMUP_DAYS_PER_BAR))
            .and_then(chrono::Duration::try_days)
            .and_then(|days| self.start_date.checked_sub_signed(days))
            .ok_or_else(|| {
                SlopetraderError::invalid(
                    "strategy",
                    "ma_window",
                    format!("a {longest}-bar window needs history before the earliest supported date"),
                )
            })
    }
}

#[derive(Debug, Clone)]
pub struct SymbolReport {
    pub entry: IndexEntry,
    pub rows: Vec<IndicatorRow>,
    pub result: SimulationResult,
    pub signal_changes: Vec<SignalChange>,
}

fn trim_to_start(rows: Vec<IndicatorRow>, start_date: NaiveDate) -> Vec<IndicatorRow> {
    rows.into_iter().filter(|r| r.date() >= start_date).collect()
}

/// Indicators over all of `bars`, simulation over the rows on or after
/// `start_date`.
pub fn run_series(
    bars: &[PriceBar],
    config: &BacktestConfig,
) -> Result<(Vec<IndicatorRow>, SimulationResult), SlopetraderError> {
    let rows = trim_to_start(compute_indicators(bars, &config.indicators)?, config.start_date);
    let result = run_simulation(&rows, &config.simulation)?;
    Ok((rows, result))
}

fn log_signal_changes(changes: &[SignalChange]) {
    if changes.is_empty() {
        return;
    }
    tracing::info!(count = changes.len(), "signal turning points");
    for change in changes {
        let slope = change.slope.unwrap_or(f64::NAN);
        match (change.signal, change.close_prev_n) {
            (Signal::Buy, Some(prev)) => tracing::info!(
                date = %change.date,
                "  BUY  slope={slope:.4}, close {:.2} vs {prev:.2} one window ago",
                change.close
            ),
            (signal, _) => tracing::info!(
                date = %change.date,
                "  {signal:<4} slope={slope:.4}, close {:.2}",
                change.close
            ),
        }
    }
}

pub fn run_symbol(
    data_port: &dyn DataPort,
    entry: &IndexEntry,
    config: &BacktestConfig,
) -> Result<SymbolReport, SlopetraderError> {
    let span = tracing::info_span!("symbol", code = %entry.code, name = %entry.name);
    let _guard = span.enter();

    let from = config.warmup_start()?;
    tracing::info!(
        from = %from,
        trading = config.simulation.enable_trading,
        "processing"
    );
    let bars = data_port.fetch_bars(&entry.code, Some(from), config.end_date)?;
    if bars.is_empty() {
        return Err(SlopetraderError::NoData {
            code: entry.code.clone(),
        });
    }

    let all_rows = compute_indicators(&bars, &config.indicators)?;
    // Warm-up rows still supply the close one window back.
    let changes = signal_changes(&all_rows, config.indicators.primary_window, config.start_date);
    let rows = trim_to_start(all_rows, config.start_date);
    if rows.is_empty() {
        return Err(SlopetraderError::NoData {
            code: entry.code.clone(),
        });
    }
    tracing::info!(
        rows = rows.len(),
        first = %rows[0].date(),
        last = %rows[rows.len() - 1].date(),
        "indicators ready"
    );

    if config.show_signal_logs {
        log_signal_changes(&changes);
    }

    let result = run_simulation(&rows, &config.simulation)?;

    Ok(SymbolReport {
        entry: entry.clone(),
        rows,
        result,
        signal_changes: changes,
    })
}

/// Run every entry in parallel; results keep the input order.
pub fn run_universe(
    data_port: &(dyn DataPort + Sync),
    entries: &[IndexEntry],
    config: &BacktestConfig,
) -> Vec<(IndexEntry, Result<SymbolReport, SlopetraderError>)> {
    entries
        .par_iter()
        .map(|entry| {
            let outcome = run_symbol(data_port, entry, config);
            match &outcome {
                Err(e) if e.is_input_violation() => {
                    tracing::warn!(code = %entry.code, error = %e, "rejected price series")
                }
                Err(e) => tracing::error!(code = %entry.code, error = %e, "skipping symbol"),
                Ok(_) => {}
            }
            (entry.clone(), outcome)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorConfig;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bars(start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
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

    #[test]
    fn warmup_start_uses_longest_window() {
        let config = BacktestConfig::new(date(2024, 1, 1));
        // 120 * 3 days before 2024-01-01
        assert_eq!(config.warmup_start().unwrap(), date(2023, 1, 6));
    }

    #[test]
    fn warmup_start_for_covers_extra_window() {
        let config = BacktestConfig::new(date(2024, 1, 1));
        assert_eq!(config.warmup_start_for(10).unwrap(), date(2023, 1, 6));
        // 200 * 3 days before 2024-01-01
        assert_eq!(config.warmup_start_for(200).unwrap(), date(2022, 5, 11));
    }

    #[test]
    fn warmup_start_out_of_range_is_config_error() {
        let mut config = BacktestConfig::new(date(2024, 1, 1));
        config.indicators.primary_window = 100_000_000;
        let err = config.warmup_start().unwrap_err();
        assert!(matches!(err, SlopetraderError::ConfigInvalid { ref key, .. } if key == "ma_window"));
        assert!(config.warmup_start_for(usize::MAX).is_err());
    }

    #[test]
    fn run_series_trims_to_start_date() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let mut config = BacktestConfig::new(date(2024, 1, 6));
        config.indicators = IndicatorConfig {
            primary_window: 3,
            windows: vec![3],
            confirmation_days: 1,
            bias_exit: None,
        };
        let (rows, result) = run_series(&bars(date(2024, 1, 1), &closes), &config).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].date(), date(2024, 1, 6));
        // Warm-up history makes the average defined on the first kept row.
        assert!(rows[0].signal_ma.is_some());
        assert_eq!(result.history.len(), 5);
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].date, date(2024, 1, 6));
    }

    #[test]
    fn run_series_rejects_start_after_data() {
        let config = BacktestConfig::new(date(2030, 1, 1));
        let err = run_series(&bars(date(2024, 1, 1), &[1.0, 2.0]), &config).unwrap_err();
        assert!(matches!(err, SlopetraderError::EmptySeries));
    }
}
