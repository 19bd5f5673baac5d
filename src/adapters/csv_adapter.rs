//! CSV file data adapter.
//!
//! Price files live at `<data_dir>/<code>.csv`. Headers vary by source, so
//! columns are matched by name (English or Chinese) rather than position.

use crate::domain::error::SlopetraderError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::universe::{is_enabled, IndexEntry};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{code}.csv"))
    }
}

/// Column positions after header normalisation.
#[derive(Debug, Default, PartialEq)]
struct Columns {
    date: Option<usize>,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    /// First header matching each field wins. Order matters: a header is
    /// tested against date, open, close, high, low, volume in turn.
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut cols = Columns::default();
        for (i, raw) in headers.iter().enumerate() {
            let header = raw.trim_start_matches('\u{feff}').trim();
            let lower = header.to_lowercase();
            let slot = if lower.contains("date") || header.contains("日期") {
                &mut cols.date
            } else if lower.contains("open") || header.contains("开盘") {
                &mut cols.open
            } else if lower.contains("close") || header.contains("收盘") {
                &mut cols.close
            } else if lower.contains("high") || header.contains("最高") {
                &mut cols.high
            } else if lower.contains("low") || header.contains("最低") {
                &mut cols.low
            } else if lower.contains("volume") || header.contains("成交") {
                &mut cols.volume
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(i);
            }
        }
        cols
    }

    fn require(index: Option<usize>, name: &str) -> Result<usize, SlopetraderError> {
        index.ok_or_else(|| SlopetraderError::Data {
            reason: format!("missing {name} column"),
        })
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYYMMDD`, optionally followed by a
/// time of day.
pub fn parse_bar_date(value: &str) -> Option<NaiveDate> {
    let day = value
        .trim()
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

fn parse_price(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<f64, SlopetraderError> {
    let raw = record.get(index).unwrap_or("").trim();
    raw.parse().map_err(|e| SlopetraderError::Data {
        reason: format!("invalid {name} value '{raw}': {e}"),
    })
}

fn parse_volume(record: &csv::StringRecord, index: Option<usize>) -> u64 {
    index
        .and_then(|i| record.get(i))
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round() as u64)
        .unwrap_or(0)
}

fn in_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, SlopetraderError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| SlopetraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| SlopetraderError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let cols = Columns::from_headers(headers);
        let date_col = Columns::require(cols.date, "date")?;
        let open_col = Columns::require(cols.open, "open")?;
        let high_col = Columns::require(cols.high, "high")?;
        let low_col = Columns::require(cols.low, "low")?;
        let close_col = Columns::require(cols.close, "close")?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| SlopetraderError::Data {
                reason: format!("CSV parse error: {e}"),
            })?;

            let date_str = record.get(date_col).unwrap_or("");
            let date = parse_bar_date(date_str).ok_or_else(|| SlopetraderError::Data {
                reason: format!("invalid date '{date_str}'"),
            })?;
            if !in_range(date, start_date, end_date) {
                continue;
            }

            bars.push(PriceBar {
                date,
                open: parse_price(&record, open_col, "open")?,
                high: parse_price(&record, high_col, "high")?,
                low: parse_price(&record, low_col, "low")?,
                close: parse_price(&record, close_col, "close")?,
                volume: parse_volume(&record, cols.volume),
            });
        }

        bars.sort_by_key(|b| b.date);
        tracing::debug!(code, bars = bars.len(), path = %path.display(), "loaded price file");
        Ok(bars)
    }
}

/// Read the universe file: `code,name,enabled` columns, header names
/// case-insensitive. Rows with a blank code, disabled rows and repeated
/// codes are dropped.
pub fn load_universe(path: &Path) -> Result<Vec<IndexEntry>, SlopetraderError> {
    let content = fs::read_to_string(path).map_err(|e| SlopetraderError::Data {
        reason: format!("failed to read universe {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());
    let headers = rdr.headers().map_err(|e| SlopetraderError::Data {
        reason: format!("universe header error: {e}"),
    })?;
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let code_col = position("code").ok_or_else(|| SlopetraderError::Data {
        reason: format!("universe {} has no code column", path.display()),
    })?;
    let name_col = position("name");
    let enabled_col = position("enabled");

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| SlopetraderError::Data {
            reason: format!("universe parse error: {e}"),
        })?;
        if !is_enabled(enabled_col.and_then(|i| record.get(i))) {
            continue;
        }
        let code = record.get(code_col).unwrap_or("");
        let Some(entry) = IndexEntry::new(code, name_col.and_then(|i| record.get(i))) else {
            continue;
        };
        if seen.insert(entry.code.clone()) {
            entries.push(entry);
        }
    }
    Ok(entries)
}
