//! Day-over-day slope of a moving average.
//!
//! SLOPE[i] = MA[i] - MA[i-1]; no value unless both averages exist.

pub fn calculate_slope(ma: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..ma.len())
        .map(|i| {
            if i == 0 {
                return None;
            }
            match (ma[i], ma[i - 1]) {
                (Some(today), Some(yesterday)) => Some(today - yesterday),
                _ => None,
            }
        })
        .collect()
}

/// Series shifted one bar later: value at `i` is the input at `i - 1`.
pub fn shift_one(values: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| if i == 0 { None } else { values[i - 1] })
        .collect()
}
