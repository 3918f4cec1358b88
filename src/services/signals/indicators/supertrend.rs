//! Supertrend indicator.

use super::atr::Atr;
use crate::services::signals::Indicator;
use crate::types::Candle;

/// Supertrend (ATR band trailing stop).
///
/// Basic bands are `hl2 ± multiplier * ATR`. The final upper band only moves
/// down (and the lower band only up) until price closes through it, at which
/// point the trend flips. Direction is `+1` while price holds above the lower
/// band and `-1` while it stays below the upper band.
pub struct Supertrend {
    period: usize,
    multiplier: f64,
}

impl Default for Supertrend {
    fn default() -> Self {
        Self {
            period: 10,
            multiplier: 3.0,
        }
    }
}

impl Supertrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self { period, multiplier }
    }
}

/// Tail-aligned Supertrend line and direction flags.
#[derive(Debug, Clone, PartialEq)]
pub struct SupertrendOutput {
    pub values: Vec<f64>,
    pub directions: Vec<i8>,
}

impl Indicator for Supertrend {
    type Output = SupertrendOutput;

    fn id(&self) -> &str {
        "supertrend"
    }

    fn name(&self) -> &str {
        "Supertrend (10, 3)"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<SupertrendOutput> {
        let atr = Atr::new(self.period).calculate(candles)?;
        let start = candles.len() - atr.len();

        let mut values = Vec::with_capacity(atr.len());
        let mut directions = Vec::with_capacity(atr.len());

        let mut final_upper = 0.0;
        let mut final_lower = 0.0;
        let mut direction: i8 = 1;

        for (offset, atr_value) in atr.iter().enumerate() {
            let i = start + offset;
            let candle = &candles[i];
            let hl2 = (candle.high() + candle.low()) / 2.0;
            let basic_upper = hl2 + self.multiplier * atr_value;
            let basic_lower = hl2 - self.multiplier * atr_value;

            if offset == 0 {
                final_upper = basic_upper;
                final_lower = basic_lower;
                direction = if candle.close() >= hl2 { 1 } else { -1 };
            } else {
                let prev_close = candles[i - 1].close();
                final_upper = if basic_upper < final_upper || prev_close > final_upper {
                    basic_upper
                } else {
                    final_upper
                };
                final_lower = if basic_lower > final_lower || prev_close < final_lower {
                    basic_lower
                } else {
                    final_lower
                };

                direction = match direction {
                    1 if candle.close() < final_lower => -1,
                    -1 if candle.close() > final_upper => 1,
                    d => d,
                };
            }

            values.push(if direction == 1 { final_lower } else { final_upper });
            directions.push(direction);
        }

        Some(SupertrendOutput { values, directions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::{create_downtrend_candles, create_uptrend_candles};

    #[test]
    fn test_supertrend_insufficient_data() {
        assert!(Supertrend::default()
            .calculate(&create_uptrend_candles(5))
            .is_none());
    }

    #[test]
    fn test_supertrend_uptrend_is_green() {
        let output = Supertrend::default()
            .calculate(&create_uptrend_candles(40))
            .unwrap();
        assert_eq!(*output.directions.last().unwrap(), 1);
        let last_close = 100.0 + 39.0 * 1.5 + 1.0;
        assert!(*output.values.last().unwrap() < last_close);
    }

    #[test]
    fn test_supertrend_downtrend_is_red() {
        let output = Supertrend::default()
            .calculate(&create_downtrend_candles(40))
            .unwrap();
        assert_eq!(*output.directions.last().unwrap(), -1);
    }

    #[test]
    fn test_supertrend_flips_on_reversal() {
        let mut candles = create_uptrend_candles(30);
        let top = candles.last().unwrap().close();
        for i in 0..15 {
            let base = top - 6.0 * (i as f64 + 1.0);
            candles.push(
                Candle::new(10_000_000 + i as i64 * 60_000, base + 2.0, base + 3.0, base - 1.0, base, 1000.0)
                    .unwrap(),
            );
        }
        let output = Supertrend::default().calculate(&candles).unwrap();
        assert!(output.directions.contains(&1));
        assert_eq!(*output.directions.last().unwrap(), -1);
    }
}
