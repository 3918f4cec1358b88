//! Volume Weighted Average Price (VWAP) indicator.

use crate::services::signals::Indicator;
use crate::types::Candle;

/// VWAP (Volume Weighted Average Price) indicator.
///
/// Session-long, no window:
/// VWAP = Cumulative(TP * Volume) / Cumulative(Volume)
///
/// While no volume has traded yet the candle's typical price stands in.
#[derive(Default)]
pub struct Vwap;

impl Indicator for Vwap {
    type Output = Vec<f64>;

    fn id(&self) -> &str {
        "vwap"
    }

    fn name(&self) -> &str {
        "VWAP"
    }

    fn min_periods(&self) -> usize {
        1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<Vec<f64>> {
        if candles.is_empty() {
            return None;
        }

        let mut cum_tp_vol = 0.0;
        let mut cum_vol = 0.0;

        let values = candles
            .iter()
            .map(|candle| {
                let tp = candle.typical_price();
                cum_tp_vol += tp * candle.volume();
                cum_vol += candle.volume();
                if cum_vol > 0.0 {
                    cum_tp_vol / cum_vol
                } else {
                    tp
                }
            })
            .collect();

        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vwap_weighted() {
        let candles = vec![
            Candle::new(0, 10.0, 10.0, 10.0, 10.0, 100.0).unwrap(),
            Candle::new(1, 20.0, 20.0, 20.0, 20.0, 300.0).unwrap(),
        ];
        let vwap = Vwap.calculate(&candles).unwrap();
        assert_eq!(vwap, vec![10.0, 17.5]);
    }

    #[test]
    fn test_vwap_zero_volume_uses_typical_price() {
        let candles = vec![Candle::new(0, 10.0, 12.0, 9.0, 11.0, 0.0).unwrap()];
        let vwap = Vwap.calculate(&candles).unwrap();
        assert!((vwap[0] - 32.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_vwap_empty() {
        assert!(Vwap.calculate(&[]).is_none());
    }
}
