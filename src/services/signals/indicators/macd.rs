//! MACD (Moving Average Convergence Divergence) indicator.

use super::ema::ema;
use crate::services::signals::Indicator;
use crate::types::Candle;

/// MACD indicator.
///
/// Shows the relationship between two EMAs:
/// - MACD Line = EMA(12) - EMA(26)
/// - Signal Line = EMA(9) of MACD Line
/// - Histogram = MACD Line - Signal Line
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

/// Tail-aligned MACD series. `histogram` and `signal_line` share a length;
/// `macd_line` is longer by `signal_period - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdOutput {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl MacdOutput {
    /// Last and previous `(macd, signal)` pairs, if two exist.
    pub fn last_two_pairs(&self) -> Option<((f64, f64), (f64, f64))> {
        let n = self.signal_line.len();
        let m = self.macd_line.len();
        if n < 2 || m < 2 {
            return None;
        }
        Some((
            (self.macd_line[m - 2], self.signal_line[n - 2]),
            (self.macd_line[m - 1], self.signal_line[n - 1]),
        ))
    }
}

impl Indicator for Macd {
    type Output = MacdOutput;

    fn id(&self) -> &str {
        "macd"
    }

    fn name(&self) -> &str {
        "MACD"
    }

    fn min_periods(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<MacdOutput> {
        if candles.len() < self.min_periods() || self.fast_period > self.slow_period {
            return None;
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close()).collect();
        let fast_ema = ema(&closes, self.fast_period).ok()?;
        let slow_ema = ema(&closes, self.slow_period).ok()?;

        // Align the EMAs (fast starts earlier)
        let offset = self.slow_period - self.fast_period;
        let macd_line: Vec<f64> = fast_ema
            .iter()
            .skip(offset)
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();

        let signal_line = ema(&macd_line, self.signal_period).ok()?;
        let lead = macd_line.len() - signal_line.len();
        let histogram = macd_line[lead..]
            .iter()
            .zip(signal_line.iter())
            .map(|(m, s)| m - s)
            .collect();

        Some(MacdOutput {
            macd_line,
            signal_line,
            histogram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::{create_downtrend_candles, create_uptrend_candles};

    #[test]
    fn test_macd_insufficient_data() {
        let macd = Macd::default();
        assert_eq!(macd.min_periods(), 34);
        assert!(macd.calculate(&create_uptrend_candles(33)).is_none());
        assert!(macd.calculate(&create_uptrend_candles(34)).is_some());
    }

    #[test]
    fn test_macd_alignment() {
        let output = Macd::default()
            .calculate(&create_uptrend_candles(60))
            .unwrap();
        assert_eq!(output.macd_line.len(), 60 - 25);
        assert_eq!(output.signal_line.len(), 60 - 25 - 8);
        assert_eq!(output.histogram.len(), output.signal_line.len());
    }

    #[test]
    fn test_macd_line_sign_follows_trend() {
        let up = Macd::default()
            .calculate(&create_uptrend_candles(60))
            .unwrap();
        assert!(*up.macd_line.last().unwrap() > 0.0);

        let down = Macd::default()
            .calculate(&create_downtrend_candles(60))
            .unwrap();
        assert!(*down.macd_line.last().unwrap() < 0.0);
    }
}
