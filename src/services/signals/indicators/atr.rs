//! Average True Range (ATR) indicator.

use crate::services::signals::Indicator;
use crate::types::Candle;

/// ATR (Average True Range) indicator.
///
/// Measures volatility by averaging true ranges:
/// TR = max(High-Low, |High-PrevClose|, |Low-PrevClose|)
///
/// The first candle has no previous close, so its TR is its own range.
/// The average is seeded with the mean of the first `period` TRs and then
/// Wilder-smoothed.
pub struct Atr {
    period: usize,
}

impl Default for Atr {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

/// Calculate True Range.
pub fn true_range(current: &Candle, previous: Option<&Candle>) -> f64 {
    let hl = current.high() - current.low();
    match previous {
        Some(prev) => {
            let hc = (current.high() - prev.close()).abs();
            let lc = (current.low() - prev.close()).abs();
            hl.max(hc).max(lc)
        }
        None => hl,
    }
}

/// True range for every candle.
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| true_range(c, i.checked_sub(1).map(|p| &candles[p])))
        .collect()
}

/// Wilder's smoothing: mean of the first `period` values, then
/// `avg = (avg * (period - 1) + value) / period`.
pub fn wilders_smooth(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(values.len() - period + 1);
    let mut smoothed = values.iter().take(period).sum::<f64>() / period as f64;
    result.push(smoothed);

    for value in values.iter().skip(period) {
        smoothed = (smoothed * (period - 1) as f64 + value) / period as f64;
        result.push(smoothed);
    }

    result
}

impl Indicator for Atr {
    type Output = Vec<f64>;

    fn id(&self) -> &str {
        "atr"
    }

    fn name(&self) -> &str {
        "ATR (14)"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<Vec<f64>> {
        let atr = wilders_smooth(&true_ranges(candles), self.period);
        if atr.is_empty() {
            None
        } else {
            Some(atr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::create_uptrend_candles;

    #[test]
    fn test_true_range_gap() {
        let prev = Candle::new(0, 100.0, 101.0, 99.0, 100.0, 0.0).unwrap();
        let gap_up = Candle::new(1, 105.0, 106.0, 104.0, 105.5, 0.0).unwrap();
        assert_eq!(true_range(&gap_up, Some(&prev)), 6.0);
        assert_eq!(true_range(&gap_up, None), 2.0);
    }

    #[test]
    fn test_wilders_smooth() {
        let smoothed = wilders_smooth(&[2.0, 4.0, 6.0, 8.0], 2);
        assert_eq!(smoothed, vec![3.0, 4.5, 6.25]);
        assert!(wilders_smooth(&[1.0], 2).is_empty());
    }

    #[test]
    fn test_atr_insufficient_data() {
        assert!(Atr::default().calculate(&create_uptrend_candles(10)).is_none());
    }

    #[test]
    fn test_atr_uptrend_constant() {
        // Each candle: range 3, gap from previous close 1.5 up -> TR = 3.0
        let atr = Atr::default()
            .calculate(&create_uptrend_candles(30))
            .unwrap();
        assert_eq!(atr.len(), 17);
        assert!((atr.last().unwrap() - 3.0).abs() < 1e-9);
    }
}
