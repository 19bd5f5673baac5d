//! Price data access port trait.

use crate::domain::error::SlopetraderError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `code`, ascending by date, within the inclusive
    /// range. An open bound means no limit on that side.
    fn fetch_bars(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, SlopetraderError>;
}
