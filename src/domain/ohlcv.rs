//! Daily price bar representation and series checks.

use chrono::NaiveDate;

use super::error::SlopetraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    fn prices(&self) -> [(&'static str, f64); 4] {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
    }
}

/// Reject series the engines cannot price: empty input, dates that do not
/// strictly increase, and prices that are not finite and positive.
pub fn validate_series(bars: &[PriceBar]) -> Result<(), SlopetraderError> {
    validate_bars(bars)
}

/// `validate_series` over borrowed bars, e.g. the bars inside indicator rows.
pub fn validate_bars<'a>(
    bars: impl IntoIterator<Item = &'a PriceBar>,
) -> Result<(), SlopetraderError> {
    let mut previous: Option<NaiveDate> = None;

    for (i, bar) in bars.into_iter().enumerate() {
        for (field, value) in bar.prices() {
            if !value.is_finite() || value <= 0.0 {
                return Err(SlopetraderError::NonPositivePrice {
                    date: bar.date,
                    field,
                    value,
                });
            }
        }
        if let Some(prev) = previous.filter(|&p| bar.date <= p) {
            return Err(SlopetraderError::NonMonotonicDates {
                index: i,
                previous: prev,
                date: bar.date,
            });
        }
        previous = Some(bar.date);
    }

    match previous {
        Some(_) => Ok(()),
        None => Err(SlopetraderError::EmptySeries),
    }
}
