//! Signal layers of the conviction engine.
//!
//! Each layer is a pure function of its inputs: candle layers score one
//! timeframe's series, the options layer scores a single chain snapshot.

pub mod indicators;
pub mod options;
pub mod patterns;
pub mod price_action;

pub use indicators::IndicatorEngine;
pub use options::OptionsAnalyzer;
pub use patterns::PatternDetector;
pub use price_action::PriceActionAnalyzer;

use crate::error::Result;
use crate::types::{Candle, CandleSeries, LayerResult, OptionsSnapshot};

/// A layer scored from a single timeframe's candles (technical, candlestick,
/// price action).
pub trait CandleLayer: Send + Sync {
    /// Candles needed before the layer produces anything but a neutral result.
    fn min_candles(&self) -> usize;

    /// Score the series.
    fn analyze(&self, series: &CandleSeries) -> Result<LayerResult>;
}

/// The options layer, scored once per call from the chain snapshot.
pub trait OptionsLayer: Send + Sync {
    fn analyze(&self, spot: f64, snapshot: Option<&OptionsSnapshot>) -> Result<LayerResult>;
}

/// Trait for technical indicators.
///
/// Series outputs are tail-aligned: the last element always corresponds to
/// the last input candle.
pub trait Indicator: Send + Sync {
    type Output;

    /// Unique identifier for this indicator.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Minimum number of candles required for calculation.
    fn min_periods(&self) -> usize;

    /// Returns None if there is not enough data.
    fn calculate(&self, candles: &[Candle]) -> Option<Self::Output>;
}

/// Clamp a layer score to `[-bound, bound]`. Non-finite values collapse to 0.
pub fn clamp_score(value: f64, bound: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-bound, bound)
    } else {
        0.0
    }
}

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of a slice, 0 when empty.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
