//! Stochastic Oscillator indicator.

use super::sma::sma;
use crate::services::signals::Indicator;
use crate::types::Candle;

/// Stochastic Oscillator.
///
/// Compares closing price to price range over a period:
/// %K = (Current Close - Lowest Low) / (Highest High - Lowest Low) * 100
/// %D = SMA(3) of %K
///
/// A window with no range reads 50.
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticOutput {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

impl Indicator for Stochastic {
    type Output = StochasticOutput;

    fn id(&self) -> &str {
        "stochastic"
    }

    fn name(&self) -> &str {
        "Stochastic (14, 3)"
    }

    fn min_periods(&self) -> usize {
        self.k_period + self.d_period - 1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<StochasticOutput> {
        if self.k_period == 0 || candles.len() < self.min_periods() {
            return None;
        }

        let k: Vec<f64> = candles
            .windows(self.k_period)
            .map(|window| {
                let lowest_low = window.iter().map(|c| c.low()).fold(f64::INFINITY, f64::min);
                let highest_high = window
                    .iter()
                    .map(|c| c.high())
                    .fold(f64::NEG_INFINITY, f64::max);
                let current_close = window[window.len() - 1].close();

                if highest_high != lowest_low {
                    ((current_close - lowest_low) / (highest_high - lowest_low)) * 100.0
                } else {
                    50.0
                }
            })
            .collect();

        let d = sma(&k, self.d_period).ok()?;
        Some(StochasticOutput { k, d })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::{
        create_downtrend_candles, create_flat_candles, create_uptrend_candles,
    };

    #[test]
    fn test_stochastic_insufficient_data() {
        assert!(Stochastic::default()
            .calculate(&create_uptrend_candles(15))
            .is_none());
        assert!(Stochastic::default()
            .calculate(&create_uptrend_candles(16))
            .is_some());
    }

    #[test]
    fn test_stochastic_extremes() {
        let up = Stochastic::default()
            .calculate(&create_uptrend_candles(30))
            .unwrap();
        assert!(*up.k.last().unwrap() > 80.0);

        let down = Stochastic::default()
            .calculate(&create_downtrend_candles(30))
            .unwrap();
        assert!(*down.k.last().unwrap() < 20.0);
    }

    #[test]
    fn test_stochastic_flat_reads_50() {
        let output = Stochastic::default()
            .calculate(&create_flat_candles(20))
            .unwrap();
        assert!(output.k.iter().all(|k| *k == 50.0));
        assert_eq!(output.d.len(), output.k.len() - 2);
    }
}
