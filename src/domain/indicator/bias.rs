//! BIAS: percentage deviation of the close from a moving average.
//!
//! BIAS(n)[i] = (C[i] - SMA(n)[i]) / SMA(n)[i] * 100
//! No value where the average is missing or exactly zero.

pub fn calculate_bias(closes: &[f64], ma: &[Option<f64>]) -> Vec<Option<f64>> {
    closes
        .iter()
        .zip(ma.iter())
        .map(|(&close, &avg)| match avg {
            Some(m) if m != 0.0 => Some((close - m) / m * 100.0),
            _ => None,
        })
        .collect()
}
