//! Simple Moving Average (SMA) indicator.

use crate::error::{EngineError, Result};
use crate::services::signals::Indicator;
use crate::types::Candle;

/// SMA over closes: the plain mean of each trailing `period` window.
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("SMA ({})", period),
        }
    }
}

/// Windowed mean of `values`. Output has `values.len() - period + 1` elements.
pub fn sma(values: &[f64], period: usize) -> Result<Vec<f64>> {
    if period == 0 || period > values.len() {
        return Err(EngineError::InvalidPeriod {
            period,
            len: values.len(),
        });
    }

    Ok(values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect())
}

impl Indicator for Sma {
    type Output = Vec<f64>;

    fn id(&self) -> &str {
        "sma"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<Vec<f64>> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close()).collect();
        sma(&closes, self.period).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::create_uptrend_candles;

    #[test]
    fn test_sma_values() {
        let result = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(result, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_sma_period_exceeds_len() {
        assert!(matches!(
            sma(&[1.0, 2.0], 5),
            Err(EngineError::InvalidPeriod { period: 5, len: 2 })
        ));
    }

    #[test]
    fn test_sma_indicator() {
        let sma20 = Sma::new(20);
        assert_eq!(sma20.min_periods(), 20);
        assert!(sma20.calculate(&create_uptrend_candles(10)).is_none());
        let values = sma20.calculate(&create_uptrend_candles(25)).unwrap();
        assert_eq!(values.len(), 6);
    }
}
