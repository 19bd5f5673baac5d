//! Configuration validation.
//!
//! Validates all config fields before any symbol is fetched. The typed
//! readers here are shared with the CLI config builders so a value that
//! passes validation parses the same way when it is used.

use crate::domain::error::SlopetraderError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    validate_dates(config)?;
    validate_initial_capital(config)?;
    validate_commission(config)?;
    validate_short_term_days(config)?;
    validate_universe_source(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    let primary = read_usize(config, "strategy", "ma_window", 1)?;
    if primary == 0 {
        return Err(SlopetraderError::invalid(
            "strategy",
            "ma_window",
            "ma_window must be positive",
        ));
    }
    if let Some(list) = config.get_string("strategy", "ma_list") {
        parse_window_list(&list)?;
    }
    let confirmation = read_usize(config, "strategy", "slope_confirmation_days", 1)?;
    if confirmation == 0 {
        return Err(SlopetraderError::invalid(
            "strategy",
            "slope_confirmation_days",
            "slope_confirmation_days must be at least 1",
        ));
    }
    read_bias_exit(config)?;
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    let start_str = config.get_string("settings", "start_date");
    let start_date = parse_date(start_str.as_deref(), "start_date")?;

    if let Some(end_str) = config.get_string("settings", "end_date") {
        let end_date = parse_date(Some(&end_str), "end_date")?;
        if start_date >= end_date {
            return Err(SlopetraderError::invalid(
                "settings",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    let value = read_f64(config, "backtest", "initial_capital", 1.0)?;
    if value <= 0.0 {
        return Err(SlopetraderError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    let value = read_f64(config, "backtest", "commission_rate_short", 0.0)?;
    if !(0.0..1.0).contains(&value) {
        return Err(SlopetraderError::invalid(
            "backtest",
            "commission_rate_short",
            "commission_rate_short must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_short_term_days(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    read_usize(config, "backtest", "short_term_days", 0).map(|_| ())
}

fn validate_universe_source(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    let universe = config.get_string("settings", "universe");
    let codes = config.get_string("settings", "codes");

    match (universe, codes) {
        (Some(u), _) if !u.trim().is_empty() => Ok(()),
        (_, Some(c)) if !c.trim().is_empty() => Ok(()),
        _ => Err(SlopetraderError::ConfigMissing {
            section: "settings".to_string(),
            key: "universe".to_string(),
        }),
    }
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, SlopetraderError> {
    match value.map(str::trim) {
        None | Some("") => Err(SlopetraderError::ConfigMissing {
            section: "settings".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            SlopetraderError::invalid(
                "settings",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

/// Optional date key: absent or blank is `None`.
pub fn parse_optional_date(
    config: &dyn ConfigPort,
    field: &str,
) -> Result<Option<NaiveDate>, SlopetraderError> {
    match config.get_string("settings", field) {
        Some(s) if !s.trim().is_empty() => parse_date(Some(&s), field).map(Some),
        _ => Ok(None),
    }
}

/// Comma-separated positive window lengths, e.g. `20,60,120`.
pub fn parse_window_list(value: &str) -> Result<Vec<usize>, SlopetraderError> {
    let windows = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<usize>() {
            Ok(w) if w > 0 => Ok(w),
            _ => Err(SlopetraderError::invalid(
                "strategy",
                "ma_list",
                format!("'{s}' is not a positive window length"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if windows.is_empty() {
        return Err(SlopetraderError::invalid(
            "strategy",
            "ma_list",
            "ma_list must name at least one window",
        ));
    }
    Ok(windows)
}

/// Non-negative integer key; absent falls back to `default`.
pub fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, SlopetraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s.trim().parse::<usize>().map_err(|_| {
            SlopetraderError::invalid(section, key, format!("'{s}' is not a non-negative integer"))
        }),
    }
}

/// Finite number key; absent falls back to `default`.
pub fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, SlopetraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(SlopetraderError::invalid(
                section,
                key,
                format!("'{s}' is not a number"),
            )),
        },
    }
}

/// `bias_exit_window` and `bias_exit_threshold` must be given together.
pub fn read_bias_exit(config: &dyn ConfigPort) -> Result<Option<(usize, f64)>, SlopetraderError> {
    let window = config.get_string("strategy", "bias_exit_window");
    let threshold = config.get_string("strategy", "bias_exit_threshold");
    match (window.is_some(), threshold.is_some()) {
        (false, false) => Ok(None),
        (true, true) => {
            let window = read_usize(config, "strategy", "bias_exit_window", 0)?;
            if window == 0 {
                return Err(SlopetraderError::invalid(
                    "strategy",
                    "bias_exit_window",
                    "bias_exit_window must be positive",
                ));
            }
            let threshold = read_f64(config, "strategy", "bias_exit_threshold", 0.0)?;
            Ok(Some((window, threshold)))
        }
        (true, false) => Err(SlopetraderError::ConfigMissing {
            section: "strategy".to_string(),
            key: "bias_exit_threshold".to_string(),
        }),
        (false, true) => Err(SlopetraderError::ConfigMissing {
            section: "strategy".to_string(),
            key: "bias_exit_window".to_string(),
        }),
    }
}
