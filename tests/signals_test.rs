//! Signal layer tests
//!
//! Exercises each analyzer through its public API:
//! - Indicator math on trending and degenerate series
//! - Candlestick pattern recognition
//! - Options chain positioning
//! - Price-action structure

use conviction_engine::services::signals::indicators::{ema, sma, Rsi};
use conviction_engine::services::signals::{
    CandleLayer, Indicator, IndicatorEngine, OptionsAnalyzer, OptionsLayer, PatternDetector,
    PriceActionAnalyzer,
};
use conviction_engine::types::*;
use conviction_engine::EngineError;

mod common {
    use conviction_engine::types::{Candle, CandleSeries};

    /// Candles whose close compounds by `growth` per bar, each opening at the
    /// previous close.
    pub fn geometric(count: usize, start: f64, growth: f64) -> CandleSeries {
        let mut prev = start / growth;
        let candles = (0..count)
            .map(|i| {
                let close = start * growth.powi(i as i32);
                let open = prev;
                prev = close;
                Candle::new(
                    1_704_153_600_000 + i as i64 * 86_400_000,
                    open,
                    open.max(close) * 1.002,
                    open.min(close) * 0.998,
                    close,
                    1000.0,
                )
                .unwrap()
            })
            .collect();
        CandleSeries::new(candles).unwrap()
    }

    /// Daily candles with strictly rising closes and volume growing in step
    /// with the bar index. The slight curvature keeps MACD momentum away
    /// from zero.
    pub fn rising_with_volume(count: usize) -> CandleSeries {
        let candles = (0..count)
            .map(|i| {
                let x = i as f64;
                let base = 100.0 + x + 0.02 * x * x;
                Candle::new(
                    1_704_153_600_000 + i as i64 * 86_400_000,
                    base - 0.5,
                    base + 1.0,
                    base - 1.0,
                    base + 0.5,
                    1000.0 * (1.0 + x),
                )
                .unwrap()
            })
            .collect();
        CandleSeries::new(candles).unwrap()
    }

    pub fn bars(bars: &[(f64, f64, f64, f64, f64)]) -> CandleSeries {
        let candles = bars
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c, v))| Candle::new(i as i64 * 60_000, o, h, l, c, v).unwrap())
            .collect();
        CandleSeries::new(candles).unwrap()
    }
}

// =============================================================================
// Indicators
// =============================================================================

#[test]
fn test_sma_simple() {
    let values = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
    assert_eq!(values, vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_ema_period_too_long() {
    let err = ema(&[1.0, 2.0], 5).unwrap_err();
    assert!(matches!(err, EngineError::InvalidPeriod { period: 5, len: 2 }));
}

#[test]
fn test_rsi_stays_in_range() {
    let series = common::geometric(60, 100.0, 0.99);
    let rsi = Rsi::default().calculate(&series).unwrap();
    assert!(rsi.iter().all(|v| (0.0..=100.0).contains(v)));
    assert!(*rsi.last().unwrap() < 30.0);
}

#[test]
fn test_technical_layer_bullish_on_compounding_uptrend() {
    let series = common::geometric(60, 100.0, 1.01);
    let result = IndicatorEngine::default().analyze(&series).unwrap();

    assert_eq!(result.layer, LayerKind::Technical);
    assert_eq!(result.direction, Direction::Bullish);
    assert!(result.score >= 2.0, "score was {}", result.score);

    let details = result.technical().unwrap();
    assert!(details.ema_9.unwrap() > details.ema_21.unwrap());
    assert!(details.ema_21.unwrap() > details.ema_50.unwrap());
    assert_eq!(details.supertrend_direction, Some(1));
}

#[test]
fn test_technical_layer_bullish_on_rising_closes_and_volume() {
    let series = common::rising_with_volume(60);
    let result = IndicatorEngine::default().analyze(&series).unwrap();

    assert_eq!(result.direction, Direction::Bullish);
    assert!(result.score >= 2.0, "score was {}", result.score);

    // Heavier recent volume pulls VWAP above the plain typical-price mean,
    // but a steady climb keeps price above it.
    let details = result.technical().unwrap();
    let vwap = details.vwap.unwrap();
    let plain_mean = series
        .as_slice()
        .iter()
        .map(|c| (c.high() + c.low() + c.close()) / 3.0)
        .sum::<f64>()
        / series.len() as f64;
    assert!(vwap > plain_mean, "vwap {} vs mean {}", vwap, plain_mean);
    assert!(details.current_price > vwap);
    assert!(result.signals.iter().any(|s| s.starts_with("VWAP")));
}

#[test]
fn test_technical_layer_bearish_on_compounding_downtrend() {
    let series = common::geometric(60, 100.0, 0.99);
    let result = IndicatorEngine::default().analyze(&series).unwrap();

    assert_eq!(result.direction, Direction::Bearish);
    assert!(result.score <= -1.5, "score was {}", result.score);
}

#[test]
fn test_technical_layer_needs_twenty_candles() {
    let series = common::geometric(19, 100.0, 1.01);
    let engine = IndicatorEngine::default();
    assert_eq!(engine.min_candles(), 20);

    let result = engine.analyze(&series).unwrap();
    assert_eq!(result.score, 0.0);
    assert_eq!(result.direction, Direction::Neutral);
}

// =============================================================================
// Candlestick patterns
// =============================================================================

#[test]
fn test_bullish_engulfing_detected() {
    let series = common::bars(&[(100.0, 101.0, 97.0, 98.0, 1000.0), (97.5, 102.0, 97.0, 101.5, 1000.0)]);
    let detector = PatternDetector::default();
    assert_eq!(
        detector.detect(&series, CandlePattern::BullishEngulfing, 1),
        Some(1.0)
    );
    assert_eq!(detector.detect(&series, CandlePattern::BearishEngulfing, 1), None);
}

#[test]
fn test_dragonfly_doji_detected() {
    let series = common::bars(&[(100.0, 100.2, 95.0, 100.1, 1000.0)]);
    let confidence = PatternDetector::default()
        .detect(&series, CandlePattern::DragonflyDoji, 0)
        .unwrap();
    assert!(confidence > 0.0 && confidence <= 0.9);
}

#[test]
fn test_candlestick_layer_bounded() {
    let series = common::geometric(40, 100.0, 1.03);
    let result = PatternDetector::default().analyze(&series).unwrap();
    assert_eq!(result.layer, LayerKind::Candlestick);
    assert!(result.score.abs() <= 3.0);
}

// =============================================================================
// Options
// =============================================================================

fn chain() -> OptionsSnapshot {
    OptionsSnapshot::new(
        22000.0,
        None,
        vec![
            OptionLeg::new(21900.0, OptionType::Put, 400_000.0),
            OptionLeg::new(22000.0, OptionType::Put, 200_000.0),
            OptionLeg::new(22100.0, OptionType::Put, 100_000.0),
            OptionLeg::new(21900.0, OptionType::Call, 50_000.0),
            OptionLeg::new(22000.0, OptionType::Call, 100_000.0),
            OptionLeg::new(22100.0, OptionType::Call, 200_000.0),
        ],
    )
    .unwrap()
}

#[test]
fn test_put_call_ratio() {
    let pcr = OptionsAnalyzer::default().put_call_ratio(&chain());
    assert_eq!(pcr.oi, Some(2.0));
    assert_eq!(pcr.volume, None);
    assert_eq!(pcr.sentiment(), OptionsSentiment::Bullish);
}

#[test]
fn test_options_layer_reads_walls() {
    let result = OptionsAnalyzer::default()
        .analyze(22000.0, Some(&chain()))
        .unwrap();
    let details = result.options().unwrap();

    assert_eq!(details.support_level, Some(21900.0));
    assert_eq!(details.resistance_level, Some(22100.0));
    assert_eq!(details.atm_strike, 22000.0);
    assert_eq!(details.pcr, Some(2.0));
    assert!(result.score.abs() <= 3.0);
}

#[test]
fn test_options_layer_reads_volume_and_atm_quotes() {
    let traded = OptionsSnapshot::new(
        22010.0,
        Some("2024-01-04".to_string()),
        vec![
            OptionLeg::new(21900.0, OptionType::Put, 400_000.0)
                .with_volume(40_000.0)
                .with_quote(35.5, 35.0, 36.0),
            OptionLeg::new(22000.0, OptionType::Put, 200_000.0)
                .with_volume(50_000.0)
                .with_quote(80.25, 80.0, 80.5),
            OptionLeg::new(22000.0, OptionType::Call, 100_000.0)
                .with_volume(40_000.0)
                .with_quote(95.0, 94.5, 95.5),
            OptionLeg::new(22100.0, OptionType::Call, 200_000.0)
                .with_volume(20_000.0)
                .with_quote(45.0, 44.5, 45.5),
        ],
    )
    .unwrap();

    let analyzer = OptionsAnalyzer::default();
    let pcr = analyzer.put_call_ratio(&traded);
    assert_eq!(pcr.oi, Some(2.0));
    assert_eq!(pcr.volume, Some(1.5));

    let result = analyzer.analyze(22010.0, Some(&traded)).unwrap();
    let details = result.options().unwrap();
    assert_eq!(details.volume_pcr, Some(1.5));
    assert_eq!(details.atm_strike, 22000.0);
    assert_eq!(details.atm_call_price, Some(95.0));
    assert_eq!(details.atm_put_price, Some(80.25));
}

#[test]
fn test_options_layer_without_snapshot_is_neutral() {
    let result = OptionsAnalyzer::default().analyze(22000.0, None).unwrap();
    assert_eq!(result.score, 0.0);
    assert_eq!(result.direction, Direction::Neutral);
}

// =============================================================================
// Price action
// =============================================================================

#[test]
fn test_pivot_points_from_latest_candle() {
    let series = common::bars(&[(100.0, 110.0, 90.0, 105.0, 1.0), (105.0, 106.0, 104.0, 105.0, 1.0)]);
    let pivots = PriceActionAnalyzer::default().pivot_points(&series).unwrap();
    assert_eq!(pivots.pivot, 105.0);
    assert_eq!(pivots.r1, 106.0);
    assert_eq!(pivots.s1, 104.0);
    assert_eq!(pivots.r2, 107.0);
    assert_eq!(pivots.s2, 103.0);
}

#[test]
fn test_price_action_layer_bounded() {
    let series = common::geometric(80, 100.0, 1.02);
    let result = PriceActionAnalyzer::default().analyze(&series).unwrap();
    assert_eq!(result.layer, LayerKind::PriceAction);
    assert!(result.score.abs() <= 2.0);
    assert!(result.price_action().is_some());
}
