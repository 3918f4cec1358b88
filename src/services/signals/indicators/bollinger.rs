//! Bollinger Bands indicator.

use super::sma::sma;
use crate::services::signals::Indicator;
use crate::types::Candle;

/// Bollinger Bands indicator.
///
/// Consists of:
/// - Middle band: SMA(20)
/// - Upper band: SMA + 2 * StdDev
/// - Lower band: SMA - 2 * StdDev
///
/// StdDev is the population standard deviation of the window.
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

impl BollingerBands {
    /// Calculate standard deviation.
    fn std_dev(values: &[f64], mean: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let variance: f64 =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        variance.sqrt()
    }
}

/// Tail-aligned band series plus %B (close position within the bands).
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerOutput {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
    pub percent_b: Vec<f64>,
}

impl Indicator for BollingerBands {
    type Output = BollingerOutput;

    fn id(&self) -> &str {
        "bollinger"
    }

    fn name(&self) -> &str {
        "Bollinger Bands (20, 2)"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<BollingerOutput> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close()).collect();
        let middle = sma(&closes, self.period).ok()?;

        let mut upper = Vec::with_capacity(middle.len());
        let mut lower = Vec::with_capacity(middle.len());
        let mut percent_b = Vec::with_capacity(middle.len());

        for (window, mid) in closes.windows(self.period).zip(middle.iter()) {
            let offset = self.std_dev_multiplier * Self::std_dev(window, *mid);
            let (up, low) = (mid + offset, mid - offset);
            let close = window[window.len() - 1];
            upper.push(up);
            lower.push(low);
            percent_b.push(if up > low {
                (close - low) / (up - low)
            } else {
                0.5
            });
        }

        Some(BollingerOutput {
            upper,
            middle,
            lower,
            percent_b,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::{create_flat_candles, create_uptrend_candles};

    #[test]
    fn test_bollinger_insufficient_data() {
        assert!(BollingerBands::default()
            .calculate(&create_uptrend_candles(19))
            .is_none());
    }

    #[test]
    fn test_bollinger_band_ordering() {
        let output = BollingerBands::default()
            .calculate(&create_uptrend_candles(40))
            .unwrap();
        for i in 0..output.middle.len() {
            assert!(output.upper[i] >= output.middle[i]);
            assert!(output.middle[i] >= output.lower[i]);
        }
        // Steady climb keeps the close in the upper half
        assert!(*output.percent_b.last().unwrap() > 0.5);
    }

    #[test]
    fn test_bollinger_flat_is_collapsed() {
        let output = BollingerBands::default()
            .calculate(&create_flat_candles(25))
            .unwrap();
        assert_eq!(output.upper, output.lower);
        assert_eq!(*output.percent_b.last().unwrap(), 0.5);
    }
}
