//! On-Balance Volume (OBV) indicator.

use crate::services::signals::Indicator;
use crate::types::Candle;

/// OBV (On-Balance Volume) indicator.
///
/// Cumulative volume starting at 0 on the first candle:
/// - If close > previous close: OBV += volume
/// - If close < previous close: OBV -= volume
#[derive(Default)]
pub struct Obv;

impl Indicator for Obv {
    type Output = Vec<f64>;

    fn id(&self) -> &str {
        "obv"
    }

    fn name(&self) -> &str {
        "OBV"
    }

    fn min_periods(&self) -> usize {
        1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<Vec<f64>> {
        let first = candles.first()?;
        let mut obv = 0.0;
        let mut prev_close = first.close();

        let values = candles
            .iter()
            .map(|candle| {
                if candle.close() > prev_close {
                    obv += candle.volume();
                } else if candle.close() < prev_close {
                    obv -= candle.volume();
                }
                prev_close = candle.close();
                obv
            })
            .collect();

        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obv_accumulates() {
        let candles = vec![
            Candle::new(0, 10.0, 10.0, 10.0, 10.0, 100.0).unwrap(),
            Candle::new(1, 11.0, 11.0, 11.0, 11.0, 200.0).unwrap(),
            Candle::new(2, 11.0, 11.0, 11.0, 11.0, 300.0).unwrap(),
            Candle::new(3, 9.0, 9.0, 9.0, 9.0, 50.0).unwrap(),
        ];
        let obv = Obv.calculate(&candles).unwrap();
        assert_eq!(obv, vec![0.0, 200.0, 200.0, 150.0]);
    }

    #[test]
    fn test_obv_empty() {
        assert!(Obv.calculate(&[]).is_none());
    }
}
