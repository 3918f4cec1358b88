//! Candlestick pattern recognition (Layer 2).

use tracing::debug;

use super::{clamp_score, mean, round2, CandleLayer};
use crate::error::Result;
use crate::types::{
    Candle, CandlePattern, CandleSeries, CandlestickDetails, Direction, LayerDetails, LayerKind,
    LayerResult, PatternMatch,
};

const SCORE_BOUND: f64 = 3.0;
const DIRECTION_THRESHOLD: f64 = 0.2;

/// Weighted patterns checked on every scanned candle, in evaluation order.
/// Plain doji is handled separately as a nudge.
const CATALOG: [CandlePattern; 13] = [
    CandlePattern::BullishEngulfing,
    CandlePattern::BearishEngulfing,
    CandlePattern::Hammer,
    CandlePattern::InvertedHammer,
    CandlePattern::DragonflyDoji,
    CandlePattern::GravestoneDoji,
    CandlePattern::MorningStar,
    CandlePattern::EveningStar,
    CandlePattern::ThreeWhiteSoldiers,
    CandlePattern::ThreeBlackCrows,
    CandlePattern::PiercingPattern,
    CandlePattern::DarkCloudCover,
    CandlePattern::ShootingStar,
];

/// Scans the trailing candles of a series for classic reversal and
/// continuation patterns.
///
/// Each detector yields a confidence in `[0, 1]`; a match contributes
/// `base_weight * confidence`, boosted ×1.3 (or ×1.15 for contributions under
/// 1.0) when the pattern candle traded above the 20-candle average volume.
pub struct PatternDetector {
    scan_window: usize,
    body_lookback: usize,
    volume_lookback: usize,
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self {
            scan_window: 3,
            body_lookback: 10,
            volume_lookback: 20,
        }
    }
}

/// Detection context shared by every detector for one series.
struct Scan<'a> {
    candles: &'a [Candle],
    avg_body: f64,
}

impl<'a> Scan<'a> {
    fn pair(&self, idx: usize) -> Option<(&'a Candle, &'a Candle)> {
        let prev = self.candles.get(idx.checked_sub(1)?)?;
        Some((prev, self.candles.get(idx)?))
    }

    fn triple(&self, idx: usize) -> Option<(&'a Candle, &'a Candle, &'a Candle)> {
        let first = self.candles.get(idx.checked_sub(2)?)?;
        let (second, third) = self.pair(idx)?;
        Some((first, second, third))
    }

    fn detect(&self, pattern: CandlePattern, idx: usize) -> Option<f64> {
        match pattern {
            CandlePattern::BullishEngulfing => self.bullish_engulfing(idx),
            CandlePattern::BearishEngulfing => self.bearish_engulfing(idx),
            CandlePattern::Hammer => self.hammer(idx),
            CandlePattern::InvertedHammer => self.inverted_hammer(idx),
            CandlePattern::Doji => self.doji(idx),
            CandlePattern::DragonflyDoji => self.dragonfly_doji(idx),
            CandlePattern::GravestoneDoji => self.gravestone_doji(idx),
            CandlePattern::MorningStar => self.morning_star(idx),
            CandlePattern::EveningStar => self.evening_star(idx),
            CandlePattern::ThreeWhiteSoldiers => self.three_white_soldiers(idx),
            CandlePattern::ThreeBlackCrows => self.three_black_crows(idx),
            CandlePattern::PiercingPattern => self.piercing(idx),
            CandlePattern::DarkCloudCover => self.dark_cloud_cover(idx),
            CandlePattern::ShootingStar => self.shooting_star(idx),
        }
    }

    fn bullish_engulfing(&self, idx: usize) -> Option<f64> {
        let (prev, curr) = self.pair(idx)?;
        if !prev.is_bearish() || !curr.is_bullish() {
            return None;
        }
        if curr.close() > prev.open() && curr.open() < prev.close() {
            let ratio = curr.body() / prev.body();
            return Some((ratio * 0.5 + 0.5).min(1.0));
        }
        None
    }

    fn bearish_engulfing(&self, idx: usize) -> Option<f64> {
        let (prev, curr) = self.pair(idx)?;
        if !prev.is_bullish() || !curr.is_bearish() {
            return None;
        }
        if curr.open() > prev.close() && curr.close() < prev.open() {
            let ratio = prev.body() / curr.body();
            return Some((ratio * 0.5 + 0.5).min(1.0));
        }
        None
    }

    /// Small body, one long shadow at least twice the body, the opposite
    /// shadow at most half the body.
    fn long_shadow(&self, candle: &Candle, long: f64, short: f64) -> Option<f64> {
        let body = candle.body();
        if candle.range() <= 0.0 {
            return None;
        }
        if self.avg_body > 0.0 && body > self.avg_body * 1.5 {
            return None;
        }
        if long < body * 2.0 || short > body * 0.5 {
            return None;
        }
        if body > 0.0 {
            Some((long / body / 5.0).min(1.0))
        } else {
            Some(0.5)
        }
    }

    fn hammer(&self, idx: usize) -> Option<f64> {
        let candle = self.candles.get(idx)?;
        self.long_shadow(candle, candle.lower_shadow(), candle.upper_shadow())
    }

    fn inverted_hammer(&self, idx: usize) -> Option<f64> {
        let candle = self.candles.get(idx)?;
        self.long_shadow(candle, candle.upper_shadow(), candle.lower_shadow())
    }

    fn shooting_star(&self, idx: usize) -> Option<f64> {
        let candle = self.candles.get(idx)?;
        let confidence = self.long_shadow(candle, candle.upper_shadow(), candle.lower_shadow())?;
        // Without a prior up candle the star is less convincing
        if let Some((prev, _)) = self.pair(idx) {
            if !prev.is_bullish() {
                return Some(0.6);
            }
        }
        if candle.body() > 0.0 {
            Some(confidence)
        } else {
            Some(0.7)
        }
    }

    fn doji(&self, idx: usize) -> Option<f64> {
        let candle = self.candles.get(idx)?;
        let range = candle.range();
        if range <= 0.0 {
            return None;
        }
        let ratio = candle.body() / range;
        if ratio <= 0.1 {
            Some(1.0 - ratio * 10.0)
        } else {
            None
        }
    }

    /// Shadows of a doji are measured against at least a tenth of its range,
    /// so near-zero bodies do not make every shadow look long or short.
    fn doji_reference(candle: &Candle) -> f64 {
        candle.body().max(candle.range() * 0.1)
    }

    fn dragonfly_doji(&self, idx: usize) -> Option<f64> {
        let doji = self.doji(idx)?;
        let candle = &self.candles[idx];
        let reference = Self::doji_reference(candle);
        if candle.lower_shadow() > reference * 2.0 && candle.upper_shadow() < reference * 0.5 {
            Some(doji.min(0.9))
        } else {
            None
        }
    }

    fn gravestone_doji(&self, idx: usize) -> Option<f64> {
        let doji = self.doji(idx)?;
        let candle = &self.candles[idx];
        let reference = Self::doji_reference(candle);
        if candle.upper_shadow() > reference * 2.0 && candle.lower_shadow() < reference * 0.5 {
            Some(doji.min(0.9))
        } else {
            None
        }
    }

    fn star_confidence(&self, third_body: f64) -> f64 {
        if self.avg_body > 0.0 {
            (third_body / (self.avg_body * 2.0)).min(1.0)
        } else {
            1.0
        }
    }

    fn morning_star(&self, idx: usize) -> Option<f64> {
        let (c1, c2, c3) = self.triple(idx)?;
        if !c1.is_bearish() || (self.avg_body > 0.0 && c1.body() < self.avg_body) {
            return None;
        }
        if c2.body() > self.avg_body {
            return None;
        }
        if !c3.is_bullish() || c3.body() < self.avg_body {
            return None;
        }
        (c3.close() > c1.midpoint()).then(|| self.star_confidence(c3.body()))
    }

    fn evening_star(&self, idx: usize) -> Option<f64> {
        let (c1, c2, c3) = self.triple(idx)?;
        if !c1.is_bullish() || (self.avg_body > 0.0 && c1.body() < self.avg_body) {
            return None;
        }
        if c2.body() > self.avg_body {
            return None;
        }
        if !c3.is_bearish() || c3.body() < self.avg_body {
            return None;
        }
        (c3.close() < c1.midpoint()).then(|| self.star_confidence(c3.body()))
    }

    fn gap_ratio(gap: f64, reference: &Candle) -> f64 {
        if reference.range() > 0.0 {
            gap.max(0.0) / reference.range()
        } else {
            0.0
        }
    }

    fn three_white_soldiers(&self, idx: usize) -> Option<f64> {
        let (c1, c2, c3) = self.triple(idx)?;
        if !(c1.is_bullish() && c2.is_bullish() && c3.is_bullish()) {
            return None;
        }
        if !(c2.close() > c1.close() && c3.close() > c2.close()) {
            return None;
        }
        let gap1 = Self::gap_ratio(c2.open() - c1.close(), c1);
        let gap2 = Self::gap_ratio(c3.open() - c2.close(), c2);
        Some((0.5 + (gap1 + gap2) / 2.0).min(1.0))
    }

    fn three_black_crows(&self, idx: usize) -> Option<f64> {
        let (c1, c2, c3) = self.triple(idx)?;
        if !(c1.is_bearish() && c2.is_bearish() && c3.is_bearish()) {
            return None;
        }
        if !(c2.close() < c1.close() && c3.close() < c2.close()) {
            return None;
        }
        let gap1 = Self::gap_ratio(c1.close() - c2.open(), c1);
        let gap2 = Self::gap_ratio(c2.close() - c3.open(), c2);
        Some((0.5 + (gap1 + gap2) / 2.0).min(1.0))
    }

    fn piercing(&self, idx: usize) -> Option<f64> {
        let (prev, curr) = self.pair(idx)?;
        if !prev.is_bearish() || !curr.is_bullish() || curr.open() >= prev.close() {
            return None;
        }
        if curr.close() > prev.midpoint() {
            let penetration = (curr.close() - prev.close()) / (prev.open() - prev.close());
            return Some(penetration.min(1.0));
        }
        None
    }

    fn dark_cloud_cover(&self, idx: usize) -> Option<f64> {
        let (prev, curr) = self.pair(idx)?;
        if !prev.is_bullish() || !curr.is_bearish() || curr.open() <= prev.close() {
            return None;
        }
        if curr.close() < prev.midpoint() {
            let penetration = (prev.close() - curr.close()) / (prev.close() - prev.open());
            return Some(penetration.min(1.0));
        }
        None
    }
}

impl PatternDetector {
    fn scan<'a>(&self, candles: &'a [Candle]) -> Scan<'a> {
        let start = candles.len().saturating_sub(self.body_lookback);
        let bodies: Vec<f64> = candles[start..].iter().map(Candle::body).collect();
        Scan {
            candles,
            avg_body: mean(&bodies),
        }
    }

    fn average_volume(&self, candles: &[Candle]) -> f64 {
        let start = candles.len().saturating_sub(self.volume_lookback);
        let volumes: Vec<f64> = candles[start..].iter().map(Candle::volume).collect();
        mean(&volumes)
    }

    /// Run a single detector against the candle at `idx`. Returns the
    /// confidence when the pattern is present.
    pub fn detect(&self, candles: &[Candle], pattern: CandlePattern, idx: usize) -> Option<f64> {
        self.scan(candles).detect(pattern, idx)
    }

    /// Score the trailing candles of the series.
    pub fn candlestick_score(&self, series: &CandleSeries) -> LayerResult {
        let candles = series.as_slice();
        let Some(latest) = candles.last() else {
            debug!("candlestick layer: no candles");
            return LayerResult::neutral(LayerKind::Candlestick, "Insufficient data: no candles");
        };

        let scan = self.scan(candles);
        let avg_volume = self.average_volume(candles);
        let above_average = |c: &Candle| {
            if avg_volume > 0.0 {
                c.volume() > avg_volume
            } else {
                true
            }
        };

        let mut total = 0.0;
        let mut patterns = Vec::new();

        let start = candles.len().saturating_sub(self.scan_window);
        for idx in start..candles.len() {
            let volume_confirmed = above_average(&candles[idx]);

            for pattern in CATALOG {
                let Some(confidence) = scan.detect(pattern, idx) else {
                    continue;
                };
                let mut contribution = pattern.base_weight() * confidence;
                if volume_confirmed && contribution != 0.0 {
                    contribution *= if contribution.abs() >= 1.0 { 1.3 } else { 1.15 };
                }
                total += contribution;
                patterns.push(PatternMatch {
                    pattern,
                    name: pattern.name().to_string(),
                    bias: pattern.bias(),
                    confidence,
                    index: idx,
                    volume_confirmed,
                    contribution,
                });
            }

            // Indecision leans toward the preceding candle
            if let Some(confidence) = scan.doji(idx) {
                let lean = match idx.checked_sub(1).map(|p| &candles[p]) {
                    Some(prev) if prev.is_bullish() => 0.1,
                    Some(_) => -0.1,
                    None => 0.0,
                };
                let contribution = lean * confidence;
                total += contribution;
                patterns.push(PatternMatch {
                    pattern: CandlePattern::Doji,
                    name: CandlePattern::Doji.name().to_string(),
                    bias: Direction::Neutral,
                    confidence,
                    index: idx,
                    volume_confirmed: false,
                    contribution,
                });
            }
        }

        let score = round2(clamp_score(total, SCORE_BOUND));
        let direction = Direction::from_score(score, DIRECTION_THRESHOLD);

        let signals = if patterns.is_empty() {
            vec!["No candlestick patterns".to_string()]
        } else {
            patterns
                .iter()
                .map(|p| {
                    format!(
                        "{} ({:.0}% confidence{})",
                        p.name,
                        p.confidence * 100.0,
                        if p.volume_confirmed { ", volume confirmed" } else { "" }
                    )
                })
                .collect()
        };

        debug!(score, patterns = patterns.len(), "candlestick layer scored");

        let details = CandlestickDetails {
            patterns,
            volume_confirmation: above_average(latest),
            average_body: scan.avg_body,
            average_volume: avg_volume,
        };

        LayerResult::new(
            LayerKind::Candlestick,
            score,
            direction,
            signals,
            LayerDetails::Candlestick(details),
        )
    }
}

impl CandleLayer for PatternDetector {
    fn min_candles(&self) -> usize {
        1
    }

    fn analyze(&self, series: &CandleSeries) -> Result<LayerResult> {
        Ok(self.candlestick_score(series))
    }
}
