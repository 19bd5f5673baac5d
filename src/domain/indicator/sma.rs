//! Simple Moving Average.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars have no value. Missing history never pre-fills
//! the window.

pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }

    (0..closes.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &closes[i + 1 - period..=i];
            Some(window.iter().sum::<f64>() / period as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_warmup() {
        let values = calculate_sma(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert_eq!(values.len(), 5);
        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert!(values[2].is_some());
    }

    #[test]
    fn sma_basic_calculation() {
        let values = calculate_sma(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!((values[2].unwrap() - 20.0).abs() < f64::EPSILON);
        assert!((values[3].unwrap() - 30.0).abs() < f64::EPSILON);
        assert!((values[4].unwrap() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sma_period_one_is_close() {
        let closes = [3.0, 4.5, 2.25];
        let values = calculate_sma(&closes, 1);
        for (v, c) in values.iter().zip(closes.iter()) {
            assert_eq!(*v, Some(*c));
        }
    }

    #[test]
    fn sma_period_longer_than_history() {
        let values = calculate_sma(&[1.0, 2.0, 3.0], 5);
        assert!(values.iter().all(Option::is_none));
    }

    #[test]
    fn sma_zero_period_has_no_values() {
        let values = calculate_sma(&[1.0, 2.0], 0);
        assert_eq!(values, vec![None, None]);
    }
}
