//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use crate::adapters::csv_adapter::{load_universe, CsvAdapter};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::html_report_adapter::HtmlReportAdapter;
use crate::domain::backtest::{run_universe, BacktestConfig, SymbolReport};
use crate::domain::config_validation::{
    parse_date, parse_optional_date, parse_window_list, read_bias_exit, read_f64, read_usize,
    validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::SlopetraderError;
use crate::domain::indicator::{BiasExit, IndicatorConfig, MaLabel, DEFAULT_WINDOWS};
use crate::domain::indicator::{DEFAULT_CONFIRMATION_DAYS, DEFAULT_PRIMARY_WINDOW};
use crate::domain::simulation::{
    SimulationConfig, DEFAULT_COMMISSION_RATE_SHORT, DEFAULT_INITIAL_CAPITAL,
    DEFAULT_SHORT_TERM_DAYS,
};
use crate::domain::sweep::{default_thresholds, sweep_bias_thresholds};
use crate::domain::universe::{parse_codes, IndexEntry};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "slopetrader",
    about = "Moving-average slope signals and backtests for market indices"
)]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the backtest and write reports
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated codes, replacing the configured universe
        #[arg(long)]
        code: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Compute signals and reports without simulating trades
        #[arg(long)]
        no_trade: bool,
    },
    /// Print the latest signal for each index
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Compare bias take-profit thresholds for one index
    SweepBias {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(long, default_value_t = 10)]
        window: usize,
        /// Comma-separated percentages; defaults to 3..=20
        #[arg(long, value_delimiter = ',')]
        thresholds: Vec<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Csv,
    Both,
}

impl FromStr for ReportFormat {
    type Err = SlopetraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "csv" => Ok(ReportFormat::Csv),
            "both" => Ok(ReportFormat::Both),
            other => Err(SlopetraderError::invalid(
                "report",
                "format",
                format!("unknown report format '{other}' (expected html, csv or both)"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    pub format: ReportFormat,
    pub show_bias: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            code,
            output,
            no_trade,
        } => run_backtest(&config, code.as_deref(), output.as_deref(), no_trade),
        Command::Signals { config, code } => run_signals(&config, code.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::SweepBias {
            config,
            code,
            window,
            thresholds,
        } => run_sweep_bias(&config, &code, window, &thresholds),
    }
}

fn fail(e: &SlopetraderError) -> ExitCode {
    eprintln!("error: {e}");
    e.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SlopetraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        fail(&err)
    })
}

/// Load and validate in one step; every subcommand starts here.
fn load_validated(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    let adapter = load_config(path)?;
    validate_backtest_config(&adapter).map_err(|e| fail(&e))?;
    validate_strategy_config(&adapter).map_err(|e| fail(&e))?;
    Ok(adapter)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SlopetraderError> {
    let start_str = adapter.get_string("settings", "start_date");
    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_optional_date(adapter, "end_date")?;

    let windows = match adapter.get_string("strategy", "ma_list") {
        Some(list) => parse_window_list(&list)?,
        None => DEFAULT_WINDOWS.to_vec(),
    };
    let bias_exit = read_bias_exit(adapter)?.map(|(window, threshold)| BiasExit { window, threshold });
    let indicators = IndicatorConfig {
        primary_window: read_usize(adapter, "strategy", "ma_window", DEFAULT_PRIMARY_WINDOW)?,
        windows,
        confirmation_days: read_usize(
            adapter,
            "strategy",
            "slope_confirmation_days",
            DEFAULT_CONFIRMATION_DAYS,
        )?,
        bias_exit,
    }
    .normalized()?;

    let simulation = SimulationConfig {
        initial_capital: read_f64(adapter, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?,
        commission_rate_short: read_f64(
            adapter,
            "backtest",
            "commission_rate_short",
            DEFAULT_COMMISSION_RATE_SHORT,
        )?,
        short_term_days: read_usize(
            adapter,
            "backtest",
            "short_term_days",
            DEFAULT_SHORT_TERM_DAYS as usize,
        )? as i64,
        enable_trading: adapter.get_bool("settings", "enable_backtest", true),
    };
    simulation.validate()?;

    let config = BacktestConfig {
        start_date,
        end_date,
        indicators,
        simulation,
        show_signal_logs: adapter.get_bool("strategy", "show_signal_logs", true),
    };
    config.warmup_start()?;
    Ok(config)
}

/// Directory that relative paths in the config file are resolved against.
pub fn config_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or(Path::new(""))
}

fn config_path_value(
    adapter: &dyn ConfigPort,
    key: &str,
    default: &str,
    base_dir: &Path,
) -> PathBuf {
    let value = adapter
        .get_string("settings", key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string());
    base_dir.join(value.trim())
}

pub fn build_report_settings(
    adapter: &dyn ConfigPort,
    base_dir: &Path,
) -> Result<ReportSettings, SlopetraderError> {
    let format = match adapter.get_string("report", "format") {
        Some(f) => f.parse()?,
        None => ReportFormat::Html,
    };
    Ok(ReportSettings {
        output_dir: config_path_value(adapter, "output_dir", "output", base_dir),
        format,
        show_bias: adapter.get_bool("report", "show_bias", true),
    })
}

pub fn data_dir(adapter: &dyn ConfigPort, base_dir: &Path) -> PathBuf {
    config_path_value(adapter, "data_dir", "data", base_dir)
}

/// `--code` wins, then `[settings] codes`, then the universe file.
pub fn resolve_entries(
    code_override: Option<&str>,
    adapter: &dyn ConfigPort,
    base_dir: &Path,
) -> Result<Vec<IndexEntry>, SlopetraderError> {
    let entries = if let Some(codes) = code_override {
        parse_codes(codes)
    } else if let Some(codes) = adapter
        .get_string("settings", "codes")
        .filter(|s| !s.trim().is_empty())
    {
        parse_codes(&codes)
    } else {
        let path = adapter
            .get_string("settings", "universe")
            .ok_or_else(|| SlopetraderError::ConfigMissing {
                section: "settings".to_string(),
                key: "universe".to_string(),
            })?;
        load_universe(&base_dir.join(path.trim()))?
    };

    if entries.is_empty() {
        return Err(SlopetraderError::invalid(
            "settings",
            "universe",
            "no enabled indices to process",
        ));
    }
    Ok(entries)
}

pub fn report_writers(settings: &ReportSettings, trading: bool) -> Vec<Box<dyn ReportPort>> {
    let mut writers: Vec<Box<dyn ReportPort>> = Vec::new();
    if matches!(settings.format, ReportFormat::Html | ReportFormat::Both) {
        writers.push(Box::new(HtmlReportAdapter::new(settings.show_bias, trading)));
    }
    if matches!(settings.format, ReportFormat::Csv | ReportFormat::Both) {
        writers.push(Box::new(CsvReportAdapter::new()));
    }
    writers
}

fn run_backtest(
    config_path: &Path,
    code_override: Option<&str>,
    output_override: Option<&Path>,
    no_trade: bool,
) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if no_trade {
        bt_config.simulation.enable_trading = false;
    }

    let base_dir = config_dir(config_path);
    let mut report_settings = match build_report_settings(&adapter, base_dir) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    if let Some(dir) = output_override {
        report_settings.output_dir = dir.to_path_buf();
    }

    let entries = match resolve_entries(code_override, &adapter, base_dir) {
        Ok(e) => e,
        Err(e) => return fail(&e),
    };

    let data_port = CsvAdapter::new(data_dir(&adapter, base_dir));
    run_backtest_pipeline(&data_port, &entries, &bt_config, &report_settings)
}

fn print_symbol_summary(report: &SymbolReport, trading: bool) {
    let r = &report.result;
    eprintln!("\n=== {} ===", report.entry.label());
    if let (Some(first), Some(last)) = (r.history.first(), r.history.last()) {
        eprintln!("Period:           {} to {}", first.date, last.date);
        eprintln!("Latest signal:    {}", last.signal);
    }
    if !trading {
        return;
    }
    eprintln!("Initial Capital:  {:.2}", r.initial_capital);
    eprintln!("Final Value:      {:.2}", r.final_total());
    eprintln!("Total Return:     {:.2}%", r.total_return_pct());
    eprintln!(
        "Trades:           {} ({} buys, {} sells)",
        r.trades.len(),
        r.buy_count(),
        r.sell_count()
    );
    eprintln!("Commission:       {:.2}", r.total_commission());
    if r.final_position.is_invested() {
        eprintln!("Open position:    {} shares", r.final_position.shares);
    }
}

/// Run every entry, print summaries and write reports. Exit code is success
/// when at least one symbol completed and every report was written.
pub fn run_backtest_pipeline(
    data_port: &(dyn DataPort + Sync),
    entries: &[IndexEntry],
    bt_config: &BacktestConfig,
    report_settings: &ReportSettings,
) -> ExitCode {
    let trading = bt_config.simulation.enable_trading;
    eprintln!(
        "Running {} for {} indices from {}",
        if trading { "backtest" } else { "signal analysis" },
        entries.len(),
        bt_config.start_date,
    );

    let outcomes = run_universe(data_port, entries, bt_config);
    let writers = report_writers(report_settings, trading);

    let mut completed = 0usize;
    let mut report_error: Option<SlopetraderError> = None;

    for (entry, outcome) in &outcomes {
        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", entry.label(), e);
                continue;
            }
        };
        completed += 1;
        print_symbol_summary(report, trading);
        for writer in &writers {
            match writer.write(report, &report_settings.output_dir) {
                Ok(paths) => {
                    for p in paths {
                        eprintln!("Report written to: {}", p.display());
                    }
                }
                Err(e) => {
                    eprintln!("error: failed to write report for {}: {e}", entry.label());
                    report_error = Some(e);
                }
            }
        }
    }

    if completed == 0 {
        eprintln!("error: no indices with data to process");
        return ExitCode::from(5);
    }
    match report_error {
        Some(e) => (&e).into(),
        None => ExitCode::SUCCESS,
    }
}

fn run_signals(config_path: &Path, code_override: Option<&str>) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let mut bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    bt_config.simulation.enable_trading = false;

    let base_dir = config_dir(config_path);
    let entries = match resolve_entries(code_override, &adapter, base_dir) {
        Ok(e) => e,
        Err(e) => return fail(&e),
    };
    let data_port = CsvAdapter::new(data_dir(&adapter, base_dir));
    let outcomes = run_universe(&data_port, &entries, &bt_config);

    let primary = bt_config.indicators.primary_window;
    let mut completed = 0usize;
    for (entry, outcome) in &outcomes {
        match outcome {
            Ok(report) => {
                let Some(row) = report.rows.last() else {
                    continue;
                };
                completed += 1;
                let ma = row
                    .signal_ma
                    .map(|v| format!("{v:.2}"))
                    .unwrap_or_else(|| "-".to_string());
                let slope = row
                    .slope
                    .map(|v| format!("{v:+.4}"))
                    .unwrap_or_else(|| "-".to_string());
                let last_change = report
                    .signal_changes
                    .last()
                    .map(|c| format!("{} on {}", c.signal, c.date))
                    .unwrap_or_else(|| "none".to_string());
                eprintln!(
                    "{}: {} close {:.2} {} {} slope {} -> {} (last change: {})",
                    entry.label(),
                    row.date(),
                    row.close(),
                    MaLabel(primary),
                    ma,
                    slope,
                    row.signal,
                    last_change
                );
            }
            Err(e) => eprintln!("warning: skipping {} ({})", entry.label(), e),
        }
    }

    if completed == 0 {
        eprintln!("error: no indices with data to process");
        return ExitCode::from(5);
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let base_dir = config_dir(config_path);
    let report_settings = match build_report_settings(&adapter, base_dir) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let entries = match resolve_entries(None, &adapter, base_dir) {
        Ok(e) => e,
        Err(e) => return fail(&e),
    };
    eprintln!("Config validated successfully");

    let ind = &bt_config.indicators;
    let sim = &bt_config.simulation;
    eprintln!("\nStrategy:");
    eprintln!("  signal average:    {}", MaLabel(ind.primary_window));
    let windows: Vec<String> = ind.windows.iter().map(|&w| MaLabel(w).to_string()).collect();
    eprintln!("  averages:          {}", windows.join(", "));
    eprintln!("  confirmation days: {}", ind.confirmation_days);
    if let Some(exit) = ind.bias_exit {
        eprintln!(
            "  bias exit:         BIAS{} > {:.2}%",
            exit.window, exit.threshold
        );
    }
    eprintln!("\nBacktest:");
    eprintln!("  enabled:           {}", sim.enable_trading);
    eprintln!("  initial capital:   {:.2}", sim.initial_capital);
    eprintln!(
        "  short-term fee:    {:.2}% under {} days",
        sim.commission_rate_short * 100.0,
        sim.short_term_days
    );
    if let Ok(from) = bt_config.warmup_start() {
        eprintln!("  data from:         {from} (warm-up)");
    }
    eprintln!("  data dir:          {}", data_dir(&adapter, base_dir).display());
    eprintln!("\nReports: {:?} in {}", report_settings.format, report_settings.output_dir.display());
    eprintln!("\nUniverse:");
    for entry in &entries {
        eprintln!("  {}", entry.label());
    }
    ExitCode::SUCCESS
}

fn run_sweep_bias(config_path: &Path, code: &str, window: usize, thresholds: &[f64]) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(exit) => return exit,
    };
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let Some(entry) = parse_codes(code).into_iter().next() else {
        eprintln!("error: --code must name an index");
        return ExitCode::from(2);
    };
    let thresholds = if thresholds.is_empty() {
        default_thresholds()
    } else {
        thresholds.to_vec()
    };

    let data_port = CsvAdapter::new(data_dir(&adapter, config_dir(config_path)));
    match sweep_for(&data_port, &entry, &bt_config, window, &thresholds) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn sweep_for(
    data_port: &dyn DataPort,
    entry: &IndexEntry,
    bt_config: &BacktestConfig,
    window: usize,
    thresholds: &[f64],
) -> Result<(), SlopetraderError> {
    let from = bt_config.warmup_start_for(window)?;
    let bars = data_port.fetch_bars(&entry.code, Some(from), bt_config.end_date)?;
    if bars.is_empty() {
        return Err(SlopetraderError::NoData {
            code: entry.code.clone(),
        });
    }
    let sweep = sweep_bias_thresholds(&bars, bt_config, window, thresholds)?;

    eprintln!("\n=== BIAS{} take-profit sweep: {} ===", sweep.window, entry.label());
    eprintln!("Baseline (no bias exit): {:.2}%", sweep.baseline_return_pct);
    eprintln!("{:>10} {:>10} {:>12}", "threshold", "return", "vs baseline");
    for p in &sweep.points {
        eprintln!(
            "{:>9.1}% {:>9.2}% {:>+11.2}%",
            p.threshold, p.return_pct, p.improvement
        );
    }
    match sweep.best() {
        Some(best) => eprintln!(
            "\nBest threshold: {:.1}% ({:.2}%, {:+.2} points)",
            best.threshold, best.return_pct, best.improvement
        ),
        None => eprintln!("\nNo threshold beats the baseline."),
    }
    Ok(())
}
