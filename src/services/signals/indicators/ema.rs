//! Exponential Moving Average (EMA) indicator.

use crate::error::{EngineError, Result};
use crate::services::signals::Indicator;
use crate::types::Candle;

/// EMA over closes.
///
/// Seeded with the SMA of the first `period` values, then
/// `ema = (value - ema) * k + ema` with `k = 2 / (period + 1)`.
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("EMA ({})", period),
        }
    }
}

/// EMA of `values`. Output has `values.len() - period + 1` elements.
pub fn ema(values: &[f64], period: usize) -> Result<Vec<f64>> {
    if period == 0 || period > values.len() {
        return Err(EngineError::InvalidPeriod {
            period,
            len: values.len(),
        });
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len() - period + 1);

    // First EMA is SMA
    let mut current = values.iter().take(period).sum::<f64>() / period as f64;
    result.push(current);

    for value in &values[period..] {
        current = (value - current) * multiplier + current;
        result.push(current);
    }

    Ok(result)
}

impl Indicator for Ema {
    type Output = Vec<f64>;

    fn id(&self) -> &str {
        "ema"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<Vec<f64>> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close()).collect();
        ema(&closes, self.period).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::create_uptrend_candles;

    #[test]
    fn test_ema_seeded_with_sma() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let result = ema(&values, 3).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0], 2.0);
        // k = 0.5
        assert_eq!(result[1], 3.0);
    }

    #[test]
    fn test_ema_period_too_long() {
        let err = ema(&[1.0, 2.0], 3).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPeriod { period: 3, len: 2 }));
    }

    #[test]
    fn test_ema_zero_period() {
        assert!(ema(&[1.0], 0).is_err());
    }

    #[test]
    fn test_ema_insufficient_data() {
        let candles = create_uptrend_candles(5);
        assert!(Ema::new(9).calculate(&candles).is_none());
    }

    #[test]
    fn test_ema_tracks_uptrend() {
        let candles = create_uptrend_candles(30);
        let fast = Ema::new(9).calculate(&candles).unwrap();
        let slow = Ema::new(21).calculate(&candles).unwrap();
        assert!(fast.last().unwrap() > slow.last().unwrap());
        assert_eq!(Ema::new(9).name(), "EMA (9)");
    }
}
