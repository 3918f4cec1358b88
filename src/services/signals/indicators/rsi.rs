//! Relative Strength Index (RSI) indicator.

use crate::services::signals::Indicator;
use crate::types::Candle;

/// RSI (Relative Strength Index) indicator.
///
/// Measures momentum by comparing the magnitude of recent gains to recent losses.
/// Averages are seeded with the simple mean of the first `period` changes and
/// then Wilder-smoothed. Values range from 0-100:
/// - Below 30: Oversold
/// - Above 70: Overbought
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            return 100.0;
        }
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }

    /// RSI series, one value per candle from index `period` onward.
    fn calculate_rsi(candles: &[Candle], period: usize) -> Option<Vec<f64>> {
        if period == 0 || candles.len() < period + 1 {
            return None;
        }

        let mut gains = Vec::with_capacity(candles.len() - 1);
        let mut losses = Vec::with_capacity(candles.len() - 1);

        for pair in candles.windows(2) {
            let change = pair[1].close() - pair[0].close();
            if change > 0.0 {
                gains.push(change);
                losses.push(0.0);
            } else {
                gains.push(0.0);
                losses.push(-change);
            }
        }

        // Calculate initial averages
        let mut avg_gain = gains.iter().take(period).sum::<f64>() / period as f64;
        let mut avg_loss = losses.iter().take(period).sum::<f64>() / period as f64;

        let mut values = Vec::with_capacity(gains.len() - period + 1);
        values.push(Self::rsi_from(avg_gain, avg_loss));

        // Use smoothed averages for remaining data
        for i in period..gains.len() {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
            values.push(Self::rsi_from(avg_gain, avg_loss));
        }

        Some(values)
    }
}

impl Indicator for Rsi {
    type Output = Vec<f64>;

    fn id(&self) -> &str {
        "rsi"
    }

    fn name(&self) -> &str {
        "RSI (14)"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<Vec<f64>> {
        Self::calculate_rsi(candles, self.period)
    }
}
