//! Technical indicator implementations and the trend-momentum layer built
//! on top of them.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod supertrend;
pub mod vwap;

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use ema::{ema, Ema};
pub use macd::Macd;
pub use obv::Obv;
pub use rsi::Rsi;
pub use sma::{sma, Sma};
pub use stochastic::Stochastic;
pub use supertrend::Supertrend;
pub use vwap::Vwap;

use tracing::debug;

use super::{clamp_score, round2, CandleLayer, Indicator};
use crate::error::Result;
use crate::types::{
    CandleSeries, Direction, IndicatorSignal, LayerDetails, LayerKind, LayerResult,
    TechnicalDetails,
};

const SCORE_BOUND: f64 = 5.0;
const DIRECTION_THRESHOLD: f64 = 0.5;

/// Layer 1: folds every indicator into one trend-momentum score in ±5.
///
/// | Input | Contribution |
/// |-------|--------------|
/// | EMA 9 > 21 > 50 (or reverse) | ±1.0 |
/// | EMA 9/21 cross on the last candle | ±0.5 |
/// | RSI >70 / >60 / <30 / <40 | −0.3 / +0.5 / +0.3 / −0.5 |
/// | MACD histogram signed and extending, else a line cross | ±1.0 / ±0.5 |
/// | Supertrend direction, scaled by ADX (×1.2 above 25, ×0.8 below 20) | ±1.0 |
/// | Close vs VWAP | ±0.5 |
/// | Stochastic %K <20 / >80 | ±0.3 |
pub struct IndicatorEngine {
    min_candles: usize,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self { min_candles: 20 }
    }
}

fn last(values: &Option<Vec<f64>>) -> Option<f64> {
    values.as_ref().and_then(|v| v.last().copied())
}

fn last_two(values: &Option<Vec<f64>>) -> Option<(f64, f64)> {
    let v = values.as_ref()?;
    if v.len() < 2 {
        return None;
    }
    Some((v[v.len() - 2], v[v.len() - 1]))
}

impl IndicatorEngine {
    pub fn new(min_candles: usize) -> Self {
        Self { min_candles }
    }

    fn insufficient(&self, series: &CandleSeries) -> LayerResult {
        let signal = IndicatorSignal::new(
            "Insufficient Data",
            format!("{} candles, need {}", series.len(), self.min_candles),
            Direction::Neutral,
            0.0,
        );
        let details = TechnicalDetails {
            current_price: series.last().map(|c| c.close()).unwrap_or_default(),
            indicators: vec![signal.clone()],
            ..Default::default()
        };
        LayerResult::new(
            LayerKind::Technical,
            0.0,
            Direction::Neutral,
            vec![signal.describe()],
            LayerDetails::Technical(Box::new(details)),
        )
    }

    /// Compute the composite trend-momentum score.
    pub fn trend_momentum_score(&self, series: &CandleSeries) -> LayerResult {
        let Some(latest) = series.last() else {
            return self.insufficient(series);
        };
        if series.len() < self.min_candles {
            debug!(candles = series.len(), "technical layer: insufficient data");
            return self.insufficient(series);
        }

        let candles = series.as_slice();
        let closes = series.closes();
        let price = latest.close();

        let ema_9 = ema(&closes, 9).ok();
        let ema_21 = ema(&closes, 21).ok();
        let ema_50 = ema(&closes, 50).ok();
        let rsi = Rsi::default().calculate(candles);
        let macd = Macd::default().calculate(candles);
        let adx = Adx::default().calculate(candles);
        let atr = Atr::default().calculate(candles);
        let supertrend = Supertrend::default().calculate(candles);
        let vwap = Vwap.calculate(candles);
        let bollinger = BollingerBands::default().calculate(candles);
        let stochastic = Stochastic::default().calculate(candles);
        let obv = Obv.calculate(candles);

        let mut score = 0.0;
        let mut signals = Vec::new();

        // 1. EMA alignment
        if let (Some(e9), Some(e21), Some(e50)) = (last(&ema_9), last(&ema_21), last(&ema_50)) {
            if e9 > e21 && e21 > e50 {
                score += 1.0;
                signals.push(IndicatorSignal::new(
                    "EMA Alignment",
                    format!("{:.2} > {:.2} > {:.2}", e9, e21, e50),
                    Direction::Bullish,
                    1.0,
                ));
            } else if e9 < e21 && e21 < e50 {
                score -= 1.0;
                signals.push(IndicatorSignal::new(
                    "EMA Alignment",
                    format!("{:.2} < {:.2} < {:.2}", e9, e21, e50),
                    Direction::Bearish,
                    1.0,
                ));
            } else {
                signals.push(IndicatorSignal::new(
                    "EMA Alignment",
                    "Mixed".to_string(),
                    Direction::Neutral,
                    0.5,
                ));
            }
        }

        // 2. EMA 9/21 crossover on the latest candle
        if let (Some((f_prev, f_now)), Some((s_prev, s_now))) = (last_two(&ema_9), last_two(&ema_21)) {
            if f_prev < s_prev && f_now > s_now {
                score += 0.5;
                signals.push(IndicatorSignal::new(
                    "EMA 9/21 Crossover",
                    "Golden Cross".to_string(),
                    Direction::Bullish,
                    0.5,
                ));
            } else if f_prev > s_prev && f_now < s_now {
                score -= 0.5;
                signals.push(IndicatorSignal::new(
                    "EMA 9/21 Crossover",
                    "Death Cross".to_string(),
                    Direction::Bearish,
                    0.5,
                ));
            }
        }

        // 3. RSI buckets
        if let Some(value) = last(&rsi) {
            let bucket = if value > 70.0 {
                Some(("Overbought", Direction::Bearish, 0.3))
            } else if value > 60.0 {
                Some(("Strong", Direction::Bullish, 0.5))
            } else if value < 30.0 {
                Some(("Oversold", Direction::Bullish, 0.3))
            } else if value < 40.0 {
                Some(("Weak", Direction::Bearish, 0.5))
            } else {
                None
            };
            if let Some((label, direction, weight)) = bucket {
                score += direction.sign() * weight;
                signals.push(IndicatorSignal::new(
                    "RSI",
                    format!("{:.2} ({})", value, label),
                    direction,
                    weight,
                ));
            }
        }

        // 4. MACD histogram momentum, else a line crossover
        if let Some(output) = &macd {
            let hist = &output.histogram;
            if hist.len() > 1 {
                let (prev, now) = (hist[hist.len() - 2], hist[hist.len() - 1]);
                if now > 0.0 && now > prev {
                    score += 1.0;
                    signals.push(IndicatorSignal::new(
                        "MACD",
                        format!("Histogram positive & rising ({:.4})", now),
                        Direction::Bullish,
                        1.0,
                    ));
                } else if now < 0.0 && now < prev {
                    score -= 1.0;
                    signals.push(IndicatorSignal::new(
                        "MACD",
                        format!("Histogram negative & falling ({:.4})", now),
                        Direction::Bearish,
                        1.0,
                    ));
                } else if let Some(((m_prev, s_prev), (m_now, s_now))) = output.last_two_pairs() {
                    if m_prev < s_prev && m_now > s_now {
                        score += 0.5;
                        signals.push(IndicatorSignal::new(
                            "MACD Crossover",
                            "MACD crossed above signal".to_string(),
                            Direction::Bullish,
                            0.5,
                        ));
                    } else if m_prev > s_prev && m_now < s_now {
                        score -= 0.5;
                        signals.push(IndicatorSignal::new(
                            "MACD Crossover",
                            "MACD crossed below signal".to_string(),
                            Direction::Bearish,
                            0.5,
                        ));
                    }
                }
            }
        }

        // 5. ADX sets the amplification applied to the Supertrend vote
        let adx_last = adx.as_ref().and_then(|o| o.adx.last().copied());
        let amplification = match adx_last {
            Some(value) if value > 25.0 => {
                signals.push(IndicatorSignal::new(
                    "ADX Strength",
                    format!("{:.2} (Strong Trend)", value),
                    Direction::Neutral,
                    0.0,
                ));
                1.2
            }
            Some(value) if value < 20.0 => {
                signals.push(IndicatorSignal::new(
                    "ADX Strength",
                    format!("{:.2} (Weak Trend)", value),
                    Direction::Neutral,
                    0.0,
                ));
                0.8
            }
            _ => 1.0,
        };

        // 6. Supertrend
        let st_direction = supertrend.as_ref().and_then(|o| o.directions.last().copied());
        match st_direction {
            Some(1) => {
                score += amplification;
                signals.push(IndicatorSignal::new(
                    "Supertrend",
                    "Bullish (Green)".to_string(),
                    Direction::Bullish,
                    1.0,
                ));
            }
            Some(_) => {
                score -= amplification;
                signals.push(IndicatorSignal::new(
                    "Supertrend",
                    "Bearish (Red)".to_string(),
                    Direction::Bearish,
                    1.0,
                ));
            }
            None => {}
        }

        // 7. VWAP position
        if let Some(vwap_last) = last(&vwap) {
            if price > vwap_last {
                score += 0.5;
                signals.push(IndicatorSignal::new(
                    "VWAP",
                    format!("{:.2} > {:.2}", price, vwap_last),
                    Direction::Bullish,
                    0.5,
                ));
            } else if price < vwap_last {
                score -= 0.5;
                signals.push(IndicatorSignal::new(
                    "VWAP",
                    format!("{:.2} < {:.2}", price, vwap_last),
                    Direction::Bearish,
                    0.5,
                ));
            }
        }

        // 8. Stochastic extremes
        let k_last = stochastic.as_ref().and_then(|o| o.k.last().copied());
        if let Some(k) = k_last {
            if k < 20.0 {
                score += 0.3;
                signals.push(IndicatorSignal::new(
                    "Stochastic %K",
                    format!("{:.2} (Oversold)", k),
                    Direction::Bullish,
                    0.3,
                ));
            } else if k > 80.0 {
                score -= 0.3;
                signals.push(IndicatorSignal::new(
                    "Stochastic %K",
                    format!("{:.2} (Overbought)", k),
                    Direction::Bearish,
                    0.3,
                ));
            }
        }

        let score = round2(clamp_score(score, SCORE_BOUND));
        let direction = Direction::from_score(score, DIRECTION_THRESHOLD);

        let details = TechnicalDetails {
            current_price: price,
            ema_9: last(&ema_9),
            ema_21: last(&ema_21),
            ema_50: last(&ema_50),
            rsi: last(&rsi),
            macd_line: macd.as_ref().and_then(|o| o.macd_line.last().copied()),
            macd_signal: macd.as_ref().and_then(|o| o.signal_line.last().copied()),
            macd_histogram: macd.as_ref().and_then(|o| o.histogram.last().copied()),
            adx: adx_last,
            plus_di: adx.as_ref().and_then(|o| o.plus_di.last().copied()),
            minus_di: adx.as_ref().and_then(|o| o.minus_di.last().copied()),
            atr: last(&atr),
            supertrend: supertrend.as_ref().and_then(|o| o.values.last().copied()),
            supertrend_direction: st_direction,
            vwap: last(&vwap),
            bollinger_upper: bollinger.as_ref().and_then(|o| o.upper.last().copied()),
            bollinger_middle: bollinger.as_ref().and_then(|o| o.middle.last().copied()),
            bollinger_lower: bollinger.as_ref().and_then(|o| o.lower.last().copied()),
            bollinger_percent_b: bollinger.as_ref().and_then(|o| o.percent_b.last().copied()),
            stochastic_k: k_last,
            stochastic_d: stochastic.as_ref().and_then(|o| o.d.last().copied()),
            obv: last(&obv),
            indicators: signals,
        };

        debug!(score, ?direction, "technical layer scored");

        LayerResult::new(
            LayerKind::Technical,
            score,
            direction,
            details.indicators.iter().map(IndicatorSignal::describe).collect(),
            LayerDetails::Technical(Box::new(details)),
        )
    }
}

impl CandleLayer for IndicatorEngine {
    fn min_candles(&self) -> usize {
        self.min_candles
    }

    fn analyze(&self, series: &CandleSeries) -> Result<LayerResult> {
        Ok(self.trend_momentum_score(series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::{
        create_downtrend_candles, create_flat_candles, create_uptrend_candles, series,
    };
    use crate::types::Candle;

    #[test]
    fn test_insufficient_data_is_neutral() {
        let result = IndicatorEngine::default().trend_momentum_score(&series(create_uptrend_candles(19)));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.direction, Direction::Neutral);
        assert!(result.signals[0].to_lowercase().contains("insufficient data"));
    }

    #[test]
    fn test_empty_series_is_neutral() {
        let result = IndicatorEngine::default().trend_momentum_score(&CandleSeries::default());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_uptrend_is_bullish() {
        let result = IndicatorEngine::default().trend_momentum_score(&series(create_uptrend_candles(60)));
        assert_eq!(result.direction, Direction::Bullish);
        let details = result.technical().unwrap();
        assert!(details.ema_9 > details.ema_21);
        assert_eq!(details.supertrend_direction, Some(1));
    }

    #[test]
    fn test_downtrend_is_bearish() {
        let result = IndicatorEngine::default().trend_momentum_score(&series(create_downtrend_candles(60)));
        assert_eq!(result.direction, Direction::Bearish);
        let details = result.technical().unwrap();
        assert_eq!(details.supertrend_direction, Some(-1));
    }

    #[test]
    fn test_short_series_skips_long_indicators() {
        let result = IndicatorEngine::default().trend_momentum_score(&series(create_uptrend_candles(25)));
        let details = result.technical().unwrap();
        assert!(details.ema_50.is_none());
        assert!(details.macd_histogram.is_none());
        assert!(details.adx.is_none());
        assert!(details.rsi.is_some());
        assert!(!details.indicators.iter().any(|s| s.name == "EMA Alignment"));
    }

    #[test]
    fn test_flat_series_stays_bounded() {
        let result = IndicatorEngine::default().trend_momentum_score(&series(create_flat_candles(60)));
        assert!(result.score.abs() <= SCORE_BOUND);
        assert_eq!(result.direction, Direction::Neutral);
    }

    #[test]
    fn test_extreme_prices_stay_bounded() {
        let candles: Vec<Candle> = (0..80)
            .map(|i| {
                let base = if i % 2 == 0 { 1e12 } else { 1e-6 };
                Candle::new(i, base, base * 2.0, base / 2.0, base, 1e15).unwrap()
            })
            .collect();
        let result = IndicatorEngine::default().trend_momentum_score(&series(candles));
        assert!(result.score.is_finite());
        assert!(result.score.abs() <= SCORE_BOUND);
    }
}
