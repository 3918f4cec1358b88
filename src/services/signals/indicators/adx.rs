//! Average Directional Index (ADX) indicator.

use super::atr::{true_range, wilders_smooth};
use crate::services::signals::Indicator;
use crate::types::Candle;

/// ADX (Average Directional Index) indicator.
///
/// Measures trend strength (not direction):
/// - Below 20: Weak trend / ranging market
/// - 20-40: Trending
/// - Above 40: Strong trend
///
/// Combined with +DI and -DI for direction.
pub struct Adx {
    period: usize,
}

impl Default for Adx {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// Tail-aligned ADX plus the DI lines it was derived from. The DI series are
/// longer than `adx` by `period - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdxOutput {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

impl Indicator for Adx {
    type Output = AdxOutput;

    fn id(&self) -> &str {
        "adx"
    }

    fn name(&self) -> &str {
        "ADX (14)"
    }

    fn min_periods(&self) -> usize {
        self.period * 2
    }

    fn calculate(&self, candles: &[Candle]) -> Option<AdxOutput> {
        if self.period == 0 || candles.len() < self.min_periods() {
            return None;
        }

        let mut plus_dm = Vec::with_capacity(candles.len() - 1);
        let mut minus_dm = Vec::with_capacity(candles.len() - 1);
        let mut tr = Vec::with_capacity(candles.len() - 1);

        // Calculate DM and TR
        for pair in candles.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            let up_move = current.high() - previous.high();
            let down_move = previous.low() - current.low();

            plus_dm.push(if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            });
            minus_dm.push(if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            });

            tr.push(true_range(current, Some(previous)));
        }

        // Smooth the values
        let smoothed_plus_dm = wilders_smooth(&plus_dm, self.period);
        let smoothed_minus_dm = wilders_smooth(&minus_dm, self.period);
        let smoothed_tr = wilders_smooth(&tr, self.period);

        let mut plus_di = Vec::with_capacity(smoothed_tr.len());
        let mut minus_di = Vec::with_capacity(smoothed_tr.len());
        let mut dx_values = Vec::with_capacity(smoothed_tr.len());

        for ((atr, pdm), mdm) in smoothed_tr
            .iter()
            .zip(smoothed_plus_dm.iter())
            .zip(smoothed_minus_dm.iter())
        {
            let (pdi, mdi) = if *atr > 0.0 {
                (pdm / atr * 100.0, mdm / atr * 100.0)
            } else {
                (0.0, 0.0)
            };

            let di_sum = pdi + mdi;
            dx_values.push(if di_sum > 0.0 {
                (pdi - mdi).abs() / di_sum * 100.0
            } else {
                0.0
            });
            plus_di.push(pdi);
            minus_di.push(mdi);
        }

        // ADX is the smoothed DX
        let adx = wilders_smooth(&dx_values, self.period);
        if adx.is_empty() {
            return None;
        }

        Some(AdxOutput {
            adx,
            plus_di,
            minus_di,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::{
        create_downtrend_candles, create_flat_candles, create_uptrend_candles,
    };

    #[test]
    fn test_adx_min_periods() {
        let adx = Adx::default();
        assert_eq!(adx.min_periods(), 28);
        assert!(adx.calculate(&create_uptrend_candles(27)).is_none());
        assert!(adx.calculate(&create_uptrend_candles(28)).is_some());
    }

    #[test]
    fn test_adx_uptrend_strong_plus_di() {
        let output = Adx::default()
            .calculate(&create_uptrend_candles(50))
            .unwrap();
        assert!(output.plus_di.last().unwrap() > output.minus_di.last().unwrap());
        assert!(*output.adx.last().unwrap() > 25.0);
    }

    #[test]
    fn test_adx_downtrend_strong_minus_di() {
        let output = Adx::default()
            .calculate(&create_downtrend_candles(50))
            .unwrap();
        assert!(output.minus_di.last().unwrap() > output.plus_di.last().unwrap());
    }

    #[test]
    fn test_adx_flat_is_zero() {
        let output = Adx::default().calculate(&create_flat_candles(40)).unwrap();
        assert_eq!(*output.adx.last().unwrap(), 0.0);
    }

    #[test]
    fn test_adx_value_range() {
        let output = Adx::default()
            .calculate(&create_uptrend_candles(60))
            .unwrap();
        assert!(output.adx.iter().all(|v| (0.0..=100.0).contains(v)));
    }
}
