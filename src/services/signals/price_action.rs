//! Price action, volume and structure analysis (Layer 4).

use tracing::debug;

use super::indicators::Obv;
use super::{clamp_score, mean, round2, CandleLayer, Indicator};
use crate::error::Result;
use crate::types::{
    Breakout, Candle, CandleSeries, Direction, Divergence, LayerDetails, LayerKind, LayerResult,
    LevelKind, LevelStrength, PivotPoints, PriceActionDetails, PriceLevel, TrendAnalysis,
    TrendStructure, VolumeProfile, VolumeTrend,
};

const SCORE_BOUND: f64 = 2.0;
const DIRECTION_THRESHOLD: f64 = 0.3;
/// Swing prices within this fraction of a group's first price share a level.
const LEVEL_TOLERANCE: f64 = 0.003;
const SWING_RADIUS: usize = 2;
const BREAKOUT_VOLUME_MULTIPLE: f64 = 1.5;
const BREAKOUT_WINDOW: usize = 10;

/// Support/resistance, swing structure, breakouts, volume behaviour,
/// OBV divergence and floor pivots for a single series.
pub struct PriceActionAnalyzer {
    level_lookback: usize,
    trend_lookback: usize,
    volume_lookback: usize,
    divergence_lookback: usize,
}

impl Default for PriceActionAnalyzer {
    fn default() -> Self {
        Self {
            level_lookback: 50,
            trend_lookback: 20,
            volume_lookback: 20,
            divergence_lookback: 20,
        }
    }
}

fn tail(candles: &[Candle], n: usize) -> &[Candle] {
    &candles[candles.len().saturating_sub(n)..]
}

/// Prices of candles whose value equals the extreme of the surrounding
/// five-candle window.
fn swing_points(candles: &[Candle], value: fn(&Candle) -> f64, highs: bool) -> Vec<f64> {
    if candles.len() < SWING_RADIUS * 2 + 1 {
        return Vec::new();
    }
    (SWING_RADIUS..candles.len() - SWING_RADIUS)
        .filter_map(|i| {
            let window = candles[i - SWING_RADIUS..=i + SWING_RADIUS].iter().map(value);
            let extreme = if highs {
                window.fold(f64::NEG_INFINITY, f64::max)
            } else {
                window.fold(f64::INFINITY, f64::min)
            };
            let current = value(&candles[i]);
            (current == extreme).then_some(current)
        })
        .collect()
}

/// Values strictly beyond both neighbours.
fn strict_extremes(values: &[f64], highs: bool) -> Vec<f64> {
    values
        .windows(3)
        .filter(|w| {
            if highs {
                w[1] > w[0] && w[1] > w[2]
            } else {
                w[1] < w[0] && w[1] < w[2]
            }
        })
        .map(|w| w[1])
        .collect()
}

/// Last two entries as (previous, latest).
fn last_pair(values: &[f64]) -> Option<(f64, f64)> {
    match values {
        [.., prev, last] => Some((*prev, *last)),
        _ => None,
    }
}

/// Cluster sorted prices; each group is anchored on its lowest price.
fn group_levels(mut prices: Vec<f64>) -> Vec<Vec<f64>> {
    prices.sort_by(f64::total_cmp);
    let mut groups: Vec<Vec<f64>> = Vec::new();
    for price in prices {
        match groups.last_mut() {
            Some(group) if price <= group[0] * (1.0 + LEVEL_TOLERANCE) => group.push(price),
            _ => groups.push(vec![price]),
        }
    }
    groups
}

impl PriceActionAnalyzer {
    /// Clustered swing levels over the trailing window, sorted ascending.
    pub fn support_resistance(&self, candles: &[Candle]) -> Vec<PriceLevel> {
        let window = tail(candles, self.level_lookback);
        if window.len() < SWING_RADIUS * 2 + 1 {
            return Vec::new();
        }

        let mut levels = Vec::new();
        for (kind, value, highs) in [
            (LevelKind::Resistance, Candle::high as fn(&Candle) -> f64, true),
            (LevelKind::Support, Candle::low as fn(&Candle) -> f64, false),
        ] {
            for group in group_levels(swing_points(window, value, highs)) {
                let level = mean(&group);
                let (lower, upper) = (level * (1.0 - LEVEL_TOLERANCE), level * (1.0 + LEVEL_TOLERANCE));
                let touches = window
                    .iter()
                    .map(value)
                    .filter(|v| (lower..=upper).contains(v))
                    .count();
                levels.push(PriceLevel {
                    level: round2(level),
                    kind,
                    touches,
                    strength: LevelStrength::from_touches(touches),
                });
            }
        }

        levels.sort_by(|a, b| a.level.total_cmp(&b.level));
        levels
    }

    /// Higher highs and higher lows, or lower highs and lower lows, from the
    /// last two swings of each kind.
    pub fn trend_structure(&self, candles: &[Candle]) -> TrendAnalysis {
        let window = tail(candles, self.trend_lookback);
        let swing_highs = swing_points(window, Candle::high, true);
        let swing_lows = swing_points(window, Candle::low, false);

        let trend = match (last_pair(&swing_highs), last_pair(&swing_lows)) {
            (Some((h1, h2)), Some((l1, l2))) if h2 > h1 && l2 > l1 => TrendStructure::Uptrend,
            (Some((h1, h2)), Some((l1, l2))) if h2 < h1 && l2 < l1 => TrendStructure::Downtrend,
            _ => TrendStructure::Sideways,
        };

        TrendAnalysis {
            trend,
            swing_highs,
            swing_lows,
        }
    }

    /// Close beyond the nearest level: the highest resistance under the close
    /// or the lowest support over it. When both exist the closer one wins.
    pub fn breakout(&self, candles: &[Candle], levels: &[PriceLevel]) -> Option<Breakout> {
        if candles.len() < 2 {
            return None;
        }
        let current = candles.last()?;
        let close = current.close();

        let above = levels
            .iter()
            .filter(|l| l.kind == LevelKind::Resistance && close > l.level)
            .map(|l| l.level)
            .fold(None, |best: Option<f64>, l| Some(best.map_or(l, |b| b.max(l))));
        let below = levels
            .iter()
            .filter(|l| l.kind == LevelKind::Support && close < l.level)
            .map(|l| l.level)
            .fold(None, |best: Option<f64>, l| Some(best.map_or(l, |b| b.min(l))));

        let (direction, level) = match (above, below) {
            (Some(r), Some(s)) if (s - close) < (close - r) => (Direction::Bearish, s),
            (Some(r), _) => (Direction::Bullish, r),
            (None, Some(s)) => (Direction::Bearish, s),
            (None, None) => return None,
        };

        let volumes: Vec<f64> = tail(candles, self.volume_lookback)
            .iter()
            .map(Candle::volume)
            .collect();
        let volume_confirmed = current.volume() > mean(&volumes) * BREAKOUT_VOLUME_MULTIPLE;

        let candles_beyond = tail(candles, BREAKOUT_WINDOW)
            .iter()
            .filter(|c| match direction {
                Direction::Bullish => c.close() > level,
                _ => c.close() < level,
            })
            .count();

        Some(Breakout {
            direction,
            level,
            volume_confirmed,
            candles_beyond,
        })
    }

    pub fn volume_profile(&self, candles: &[Candle]) -> VolumeProfile {
        let window = tail(candles, self.volume_lookback);
        let Some(current) = window.last().filter(|_| window.len() >= 2) else {
            return VolumeProfile::default();
        };

        let volumes: Vec<f64> = window.iter().map(Candle::volume).collect();
        let average = mean(&volumes);
        let ratio = if average > 0.0 {
            current.volume() / average
        } else {
            0.0
        };

        let (first, second) = volumes.split_at(volumes.len() / 2);
        let (first, second) = (mean(first), mean(second));
        let trend = if second > first * 1.1 {
            VolumeTrend::Increasing
        } else if second < first * 0.9 {
            VolumeTrend::Decreasing
        } else {
            VolumeTrend::Stable
        };

        let recent = mean(&volumes[volumes.len().saturating_sub(5)..]);

        VolumeProfile {
            average_volume: round2(average),
            current_volume: current.volume(),
            volume_ratio: round2(ratio),
            trend,
            confirms_price: current.volume() > recent,
        }
    }

    /// OBV divergence over the trailing window. A bearish reading overrides a
    /// bullish one when both appear.
    pub fn divergence(&self, candles: &[Candle]) -> Option<Divergence> {
        let window = tail(candles, self.divergence_lookback);
        if window.len() < 5 {
            return None;
        }
        let obv = Obv.calculate(window)?;
        let lows: Vec<f64> = window.iter().map(Candle::low).collect();
        let highs: Vec<f64> = window.iter().map(Candle::high).collect();

        let mut found = None;

        if let (Some((p1, p2)), Some((o1, o2))) = (
            last_pair(&strict_extremes(&lows, false)),
            last_pair(&strict_extremes(&obv, false)),
        ) {
            if p2 < p1 && o2 > o1 {
                found = Some(Divergence {
                    direction: Direction::Bullish,
                    description: "Price making lower lows while OBV makes higher lows".to_string(),
                });
            }
        }

        if let (Some((p1, p2)), Some((o1, o2))) = (
            last_pair(&strict_extremes(&highs, true)),
            last_pair(&strict_extremes(&obv, true)),
        ) {
            if p2 > p1 && o2 < o1 {
                found = Some(Divergence {
                    direction: Direction::Bearish,
                    description: "Price making higher highs while OBV makes lower highs"
                        .to_string(),
                });
            }
        }

        found
    }

    /// Classic pivots from the most recent candle.
    pub fn pivot_points(&self, candles: &[Candle]) -> Option<PivotPoints> {
        let last = candles.last()?;
        let (high, low) = (last.high(), last.low());
        let pivot = (high + low + last.close()) / 3.0;
        let range = high - low;

        Some(PivotPoints {
            pivot: round2(pivot),
            r1: round2(2.0 * pivot - low),
            r2: round2(pivot + range),
            r3: round2(pivot + 2.0 * range),
            s1: round2(2.0 * pivot - high),
            s2: round2(pivot - range),
            s3: round2(pivot - 2.0 * range),
        })
    }

    pub fn price_action_score(&self, series: &CandleSeries) -> LayerResult {
        let candles = series.as_slice();
        let Some(current) = candles.last() else {
            debug!("price action layer: no candles");
            return LayerResult::neutral(LayerKind::PriceAction, "Insufficient data: no candles");
        };

        let mut score = 0.0;
        let mut signals = Vec::new();

        let trend = self.trend_structure(candles);
        match trend.trend {
            TrendStructure::Uptrend => {
                score += 0.5;
                signals.push("Uptrend structure (higher highs and higher lows)".to_string());
            }
            TrendStructure::Downtrend => {
                score -= 0.5;
                signals.push("Downtrend structure (lower highs and lower lows)".to_string());
            }
            TrendStructure::Sideways => signals.push("Sideways structure".to_string()),
        }

        let levels = self.support_resistance(candles);
        let breakout = self.breakout(candles, &levels);
        if let Some(b) = &breakout {
            let strength = if b.volume_confirmed {
                "with volume confirmation"
            } else {
                "(weak volume)"
            };
            match b.direction {
                Direction::Bullish => {
                    score += 0.7;
                    signals.push(format!("Bullish breakout above {} {}", b.level, strength));
                }
                _ => {
                    score -= 0.7;
                    signals.push(format!("Bearish breakout below {} {}", b.level, strength));
                }
            }
        }

        let volume = self.volume_profile(candles);
        if volume.confirms_price {
            if current.is_bullish() {
                score += 0.3;
                signals.push("Volume confirms rising price".to_string());
            } else if current.is_bearish() {
                score -= 0.3;
                signals.push("Volume confirms falling price".to_string());
            }
        }

        let divergence = self.divergence(candles);
        if let Some(d) = &divergence {
            score += 0.3 * d.direction.sign();
            signals.push(format!("{} divergence: {}", d.direction.label(), d.description));
        }

        let pivots = self.pivot_points(candles);
        if let Some(p) = &pivots {
            if current.close() > p.pivot {
                score += 0.2;
                signals.push(format!("Price above pivot ({})", p.pivot));
            } else if current.close() < p.pivot {
                score -= 0.2;
                signals.push(format!("Price below pivot ({})", p.pivot));
            }
        }

        let score = round2(clamp_score(score, SCORE_BOUND));
        let direction = Direction::from_score(score, DIRECTION_THRESHOLD);

        debug!(
            score,
            trend = trend.trend.label(),
            levels = levels.len(),
            "price action layer scored"
        );

        let details = PriceActionDetails {
            levels,
            trend,
            breakout,
            volume,
            divergence,
            pivots,
        };

        LayerResult::new(
            LayerKind::PriceAction,
            score,
            direction,
            signals,
            LayerDetails::PriceAction(Box::new(details)),
        )
    }
}

impl CandleLayer for PriceActionAnalyzer {
    fn min_candles(&self) -> usize {
        1
    }

    fn analyze(&self, series: &CandleSeries) -> Result<LayerResult> {
        Ok(self.price_action_score(series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::{create_flat_candles, series};

    const HIGHS: [f64; 6] = [101.0, 103.0, 110.0, 103.0, 101.0, 100.0];

    /// Repeating swing pattern: peaks at 110, troughs at 95, shifted by
    /// `drift` per candle.
    fn zigzag(count: usize, drift: f64) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let shift = i as f64 * drift;
                let high = HIGHS[i % 6] + shift;
                let low = HIGHS[i % 6] - 5.0 + shift;
                Candle::new(i as i64 * 60_000, low + 1.0, high, low, high - 1.0, 1000.0).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_support_resistance_clusters() {
        let levels = PriceActionAnalyzer::default().support_resistance(&zigzag(30, 0.0));
        assert_eq!(levels.len(), 2);

        assert_eq!(levels[0].kind, LevelKind::Support);
        assert_eq!(levels[0].level, 95.0);
        assert_eq!(levels[0].touches, 5);
        assert_eq!(levels[0].strength, LevelStrength::Strong);

        assert_eq!(levels[1].kind, LevelKind::Resistance);
        assert_eq!(levels[1].level, 110.0);
        assert_eq!(levels[1].strength, LevelStrength::Strong);
    }

    #[test]
    fn test_support_resistance_short_series() {
        assert!(PriceActionAnalyzer::default()
            .support_resistance(&zigzag(4, 0.0))
            .is_empty());
    }

    #[test]
    fn test_trend_structure() {
        let analyzer = PriceActionAnalyzer::default();
        assert_eq!(analyzer.trend_structure(&zigzag(30, 0.5)).trend, TrendStructure::Uptrend);
        assert_eq!(analyzer.trend_structure(&zigzag(30, -0.5)).trend, TrendStructure::Downtrend);
        assert_eq!(analyzer.trend_structure(&zigzag(30, 0.0)).trend, TrendStructure::Sideways);
    }

    #[test]
    fn test_breakout_with_volume() {
        let mut candles = zigzag(29, 0.0);
        candles.push(Candle::new(29 * 60_000, 110.0, 116.0, 109.0, 115.0, 5000.0).unwrap());
        let analyzer = PriceActionAnalyzer::default();
        let levels = analyzer.support_resistance(&candles);
        let breakout = analyzer.breakout(&candles, &levels).unwrap();

        assert_eq!(breakout.direction, Direction::Bullish);
        assert_eq!(breakout.level, 110.0);
        assert!(breakout.volume_confirmed);
        assert_eq!(breakout.candles_beyond, 1);
    }

    #[test]
    fn test_no_breakout_inside_range() {
        let candles = zigzag(30, 0.0);
        let analyzer = PriceActionAnalyzer::default();
        let levels = analyzer.support_resistance(&candles);
        assert!(analyzer.breakout(&candles, &levels).is_none());
    }

    #[test]
    fn test_volume_profile_trend() {
        let candles: Vec<Candle> = (0..20)
            .map(|i| {
                let volume = if i < 10 { 1000.0 } else { 2000.0 };
                Candle::new(i, 100.0, 101.0, 99.0, 100.5, volume).unwrap()
            })
            .collect();
        let profile = PriceActionAnalyzer::default().volume_profile(&candles);
        assert_eq!(profile.trend, VolumeTrend::Increasing);
        assert_eq!(profile.average_volume, 1500.0);
        assert!((profile.volume_ratio - 1.33).abs() < 1e-9);
        assert!(!profile.confirms_price);
    }

    #[test]
    fn test_bullish_divergence() {
        let rows = [
            (100.0, 0.0),
            (98.0, 100.0),
            (95.0, 100.0),
            (97.0, 500.0),
            (94.0, 10.0),
            (99.0, 100.0),
            (100.0, 100.0),
        ];
        let candles: Vec<Candle> = rows
            .iter()
            .enumerate()
            .map(|(i, (close, volume))| {
                Candle::new(i as i64, *close, close + 1.0, close - 1.0, *close, *volume).unwrap()
            })
            .collect();
        let divergence = PriceActionAnalyzer::default().divergence(&candles).unwrap();
        assert_eq!(divergence.direction, Direction::Bullish);
    }

    #[test]
    fn test_pivot_points() {
        let candles = vec![Candle::new(0, 95.0, 110.0, 90.0, 100.0, 0.0).unwrap()];
        let p = PriceActionAnalyzer::default().pivot_points(&candles).unwrap();
        assert_eq!(p.pivot, 100.0);
        assert_eq!((p.r1, p.r2, p.r3), (110.0, 120.0, 140.0));
        assert_eq!((p.s1, p.s2, p.s3), (90.0, 80.0, 60.0));
    }

    #[test]
    fn test_score_uptrend_bullish() {
        let result = PriceActionAnalyzer::default().price_action_score(&series(zigzag(30, 0.5)));
        assert_eq!(result.direction, Direction::Bullish);
        assert!(result.score <= SCORE_BOUND);
        let details = result.price_action().unwrap();
        assert_eq!(details.trend.trend, TrendStructure::Uptrend);
        assert!(details.breakout.is_some());
    }

    #[test]
    fn test_flat_series_neutral() {
        let result = PriceActionAnalyzer::default().price_action_score(&series(create_flat_candles(30)));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.direction, Direction::Neutral);
    }

    #[test]
    fn test_empty_series_neutral() {
        let result = PriceActionAnalyzer::default().price_action_score(&CandleSeries::default());
        assert_eq!(result.direction, Direction::Neutral);
        assert!(result.price_action().is_none());
    }
}
