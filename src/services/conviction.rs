//! Multi-timeframe conviction scorer.
//!
//! Runs the three candle layers on every timeframe (in parallel), the options
//! layer once, and folds everything into a single score in ±10 with a trade
//! recommendation. Scoring never fails: a layer that errors or panics is
//! scored neutral and reported as a risk factor, and anything escaping that
//! produces a NO_TRADE fallback result.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::ScoringConfig;
use crate::error::{EngineError, Result};
use crate::input::ConvictionInput;
use crate::services::signals::{
    clamp_score, round2, CandleLayer, IndicatorEngine, OptionsAnalyzer, OptionsLayer,
    PatternDetector, PriceActionAnalyzer,
};
use crate::types::{
    CandleSeries, CandlestickSummary, ConvictionLevel, ConvictionResult, KeyLevels, LayerKind,
    LayerResult, LayerSummaries, MarketDirection, OptionsSummary, PriceActionSummary,
    Recommendation, TechnicalSummary, Timeframe, TimeframeResult, TimeframeScore, TradeAction,
};

const FINAL_BOUND: f64 = 10.0;
/// Every layer is rescaled to this range before blending.
const NORMALIZED_BOUND: f64 = 5.0;
const MAX_REASONING_SIGNALS: usize = 5;
const MAX_SETUP_SIGNALS: usize = 4;
const MAX_KEY_SIGNALS: usize = 3;
const FALLBACK_LOOKBACK: usize = 20;

/// Rescale a layer score from its native bound to ±5.
fn normalized(result: &LayerResult) -> f64 {
    result.score / result.layer.score_bound() * NORMALIZED_BOUND
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Run one layer, turning an error or a panic into a neutral failed result.
fn guarded(kind: LayerKind, context: &str, run: impl FnOnce() -> Result<LayerResult>) -> LayerResult {
    let message = match catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(result)) => return result,
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };

    let error = EngineError::Layer {
        layer: context.to_string(),
        message: message.clone(),
    };
    warn!(error = %error, "Layer failed, scoring it neutral");
    LayerResult::failed(kind, message)
}

/// Aggregated layer scores across timeframes, each on ±5.
#[derive(Debug, Clone, Copy, Default)]
struct LayerTotals {
    technical: f64,
    candlestick: f64,
    price_action: f64,
}

/// Master scorer combining the four layers.
pub struct ConvictionScorer {
    config: ScoringConfig,
    technical: Box<dyn CandleLayer>,
    candlestick: Box<dyn CandleLayer>,
    price_action: Box<dyn CandleLayer>,
    options: Box<dyn OptionsLayer>,
}

impl Default for ConvictionScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl ConvictionScorer {
    /// Scorer with the built-in layers.
    pub fn new(config: ScoringConfig) -> Self {
        let options = OptionsAnalyzer::new(config.strike_step, config.wall_proximity);
        Self::with_layers(
            config,
            Box::new(IndicatorEngine::default()),
            Box::new(PatternDetector::default()),
            Box::new(PriceActionAnalyzer::default()),
            Box::new(options),
        )
    }

    /// Scorer with caller-supplied layer implementations.
    pub fn with_layers(
        config: ScoringConfig,
        technical: Box<dyn CandleLayer>,
        candlestick: Box<dyn CandleLayer>,
        price_action: Box<dyn CandleLayer>,
        options: Box<dyn OptionsLayer>,
    ) -> Self {
        Self {
            config,
            technical,
            candlestick,
            price_action,
            options,
        }
    }

    fn atm_strike(&self, spot: f64) -> f64 {
        let step = self.config.strike_step;
        if step > 0.0 {
            (spot / step).round() * step
        } else {
            spot
        }
    }

    /// Score the input. Always returns a well-formed result.
    pub fn score(&self, input: &ConvictionInput) -> ConvictionResult {
        self.contained(input, || self.evaluate(input))
    }

    /// Run the pipeline, replacing a panic with the NO_TRADE fallback.
    fn contained(
        &self,
        input: &ConvictionInput,
        run: impl FnOnce() -> ConvictionResult,
    ) -> ConvictionResult {
        match catch_unwind(AssertUnwindSafe(run)) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(error = %message, "Conviction pipeline failed, returning NO_TRADE");
                ConvictionResult::fallback(self.atm_strike(input.spot()), input.as_of(), &message)
            }
        }
    }

    /// Run a candle layer under `guarded`, length check included, so nothing
    /// the layer does escapes into the other layers.
    fn run_candle_layer(
        kind: LayerKind,
        layer: &dyn CandleLayer,
        series: &CandleSeries,
        timeframe: Timeframe,
    ) -> LayerResult {
        let context = format!("{} ({})", kind.name(), timeframe);
        guarded(kind, &context, || {
            let needed = layer.min_candles();
            if series.len() < needed {
                return Ok(LayerResult::neutral(
                    kind,
                    format!("Insufficient data: {} candles, need {}", series.len(), needed),
                ));
            }
            layer.analyze(series)
        })
    }

    fn analyze_timeframe(&self, timeframe: Timeframe, series: Option<&CandleSeries>) -> TimeframeResult {
        let candles = series.map_or(0, |s| s.len());
        let Some(series) = series.filter(|_| candles >= self.config.min_timeframe_candles) else {
            debug!(%timeframe, candles, "Too few candles, timeframe scored neutral");
            let note = format!("Insufficient data: {} candles on {}", candles, timeframe);
            return TimeframeResult {
                timeframe,
                candles,
                technical: LayerResult::neutral(LayerKind::Technical, note.clone()),
                candlestick: LayerResult::neutral(LayerKind::Candlestick, note.clone()),
                price_action: LayerResult::neutral(LayerKind::PriceAction, note),
                combined_score: 0.0,
                direction: MarketDirection::Neutral,
            };
        };

        let technical =
            Self::run_candle_layer(LayerKind::Technical, self.technical.as_ref(), series, timeframe);
        let candlestick = Self::run_candle_layer(
            LayerKind::Candlestick,
            self.candlestick.as_ref(),
            series,
            timeframe,
        );
        let price_action = Self::run_candle_layer(
            LayerKind::PriceAction,
            self.price_action.as_ref(),
            series,
            timeframe,
        );

        let blend = &self.config.timeframe_blend;
        let combined = round2(
            normalized(&technical) * blend.technical
                + normalized(&candlestick) * blend.candlestick
                + normalized(&price_action) * blend.price_action,
        );

        debug!(
            %timeframe,
            technical = technical.score,
            candlestick = candlestick.score,
            price_action = price_action.score,
            combined,
            "Timeframe scored"
        );

        TimeframeResult {
            timeframe,
            candles,
            technical,
            candlestick,
            price_action,
            combined_score: combined,
            direction: MarketDirection::from_score(combined),
        }
    }

    /// +1.5/−1.5 when three or more timeframes agree, ±0.5 for two.
    fn alignment_bonus(timeframes: &[TimeframeResult]) -> f64 {
        let bullish = timeframes.iter().filter(|t| t.direction.is_bullish()).count();
        let bearish = timeframes.iter().filter(|t| t.direction.is_bearish()).count();

        if bullish >= 3 {
            1.5
        } else if bearish >= 3 {
            -1.5
        } else if bullish >= 2 {
            0.5
        } else if bearish >= 2 {
            -0.5
        } else {
            0.0
        }
    }

    fn layer_totals(&self, timeframes: &[TimeframeResult]) -> LayerTotals {
        timeframes.iter().fold(LayerTotals::default(), |acc, tf| {
            let weight = self.config.timeframe_weights.get(tf.timeframe);
            LayerTotals {
                technical: acc.technical + normalized(&tf.technical) * weight,
                candlestick: acc.candlestick + normalized(&tf.candlestick) * weight,
                price_action: acc.price_action + normalized(&tf.price_action) * weight,
            }
        })
    }

    fn evaluate(&self, input: &ConvictionInput) -> ConvictionResult {
        let spot = input.spot();

        let timeframes: Vec<TimeframeResult> = Timeframe::ALL
            .par_iter()
            .map(|tf| self.analyze_timeframe(*tf, input.series(*tf)))
            .collect();

        let options = input.options().map(|snapshot| {
            guarded(LayerKind::Options, "Options", || {
                self.options.analyze(spot, Some(snapshot))
            })
        });
        let options_present = matches!(
            (input.options(), &options),
            (Some(snapshot), Some(result)) if !snapshot.is_empty() && !result.is_failed()
        );

        let weighted_timeframe_score = round2(
            timeframes
                .iter()
                .map(|t| t.combined_score * self.config.timeframe_weights.get(t.timeframe))
                .sum(),
        );
        let alignment_bonus = Self::alignment_bonus(&timeframes);
        let totals = self.layer_totals(&timeframes);

        let options_score = match &options {
            Some(result) if options_present => normalized(result),
            _ => 0.0,
        };
        let weights = self.config.layer_weights(options_present);
        let raw = totals.technical * weights.technical
            + totals.candlestick * weights.candlestick
            + options_score * weights.options
            + totals.price_action * weights.price_action
            + alignment_bonus;
        let score = clamp_score(round2(raw), FINAL_BOUND);

        let direction = MarketDirection::from_score(score);
        let level = ConvictionLevel::from_score(score);

        let key_levels = self.key_levels(input, &timeframes, options.as_ref().filter(|_| options_present));
        let support = key_levels
            .support
            .unwrap_or(spot - self.config.fallback_level_distance);
        let resistance = key_levels
            .resistance
            .unwrap_or(spot + self.config.fallback_level_distance);

        let buffer = self.config.stop_buffer;
        let (action, stop_loss, target) = if score >= self.config.trade_threshold {
            (TradeAction::BuyCall, support - buffer, resistance)
        } else if score <= -self.config.trade_threshold {
            (TradeAction::BuyPut, resistance + buffer, support)
        } else {
            (TradeAction::NoTrade, support - buffer, resistance)
        };

        let risk = (spot - stop_loss).abs();
        let reward = (target - spot).abs();
        let risk_reward = if risk > 0.0 { round2(reward / risk) } else { 0.0 };
        let confidence = ((score.abs() * 10.0).min(100.0) * 10.0).round() / 10.0;

        let top_signals = Self::top_signals(&timeframes, options.as_ref().filter(|_| options_present));
        let reasoning = format!(
            "{} setup. Score {}/10. {}",
            direction.label(),
            score,
            top_signals
                .iter()
                .take(MAX_REASONING_SIGNALS)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ")
        )
        .trim_end()
        .to_string();

        let atm_strike = self.atm_strike(spot);
        let trade_setup_text = match action.option_suffix() {
            None => format!(
                "NO TRADE ({}/10 {}): Conviction too low. Sit on hands. Support {:.0}, Resistance {:.0}.",
                score,
                level.label(),
                support,
                resistance
            ),
            Some(suffix) => format!(
                "{} SETUP ({}/10 {}): Buy {} {:.0} {}. Support {:.0}, Resistance {:.0}. SL at {:.0}. Target {:.0}. R/R 1:{}. Key: {}",
                direction.label(),
                score,
                level.label(),
                self.config.instrument,
                atm_strike,
                suffix,
                support,
                resistance,
                stop_loss,
                target,
                risk_reward,
                top_signals
                    .iter()
                    .take(MAX_SETUP_SIGNALS)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
        };

        let risk_factors = Self::risk_factors(&timeframes, options.as_ref());

        let timeframe_scores: BTreeMap<Timeframe, TimeframeScore> = timeframes
            .iter()
            .map(|t| {
                (
                    t.timeframe,
                    TimeframeScore {
                        score: t.combined_score,
                        direction: t.direction,
                    },
                )
            })
            .collect();

        let layers = Self::summaries(
            &timeframes,
            totals,
            options.as_ref().filter(|_| options_present),
            options_score,
            &top_signals,
        );

        debug!(
            score,
            direction = direction.label(),
            level = level.label(),
            action = ?action,
            options_present,
            "Conviction scored"
        );

        ConvictionResult {
            score,
            level,
            direction,
            recommendation: Recommendation {
                action,
                atm_strike,
                stop_loss: stop_loss.round(),
                target: target.round(),
                risk_reward,
                confidence,
                reasoning,
            },
            layers,
            timeframe_scores,
            key_levels,
            risk_factors,
            trade_setup_text,
            weighted_timeframe_score,
            alignment_bonus,
            as_of: input.as_of(),
            timeframes,
            options,
        }
    }

    /// Support, resistance, pivot and VWAP from the 15-minute, 60-minute and
    /// daily charts in that order of preference, then option walls.
    fn key_levels(
        &self,
        input: &ConvictionInput,
        timeframes: &[TimeframeResult],
        options: Option<&LayerResult>,
    ) -> KeyLevels {
        let spot = input.spot();
        let mut levels = KeyLevels::default();

        for tf in [Timeframe::FifteenMinute, Timeframe::SixtyMinute, Timeframe::Daily] {
            let Some(result) = timeframes.iter().find(|t| t.timeframe == tf) else {
                continue;
            };

            if let Some(pa) = result.price_action.price_action() {
                if levels.support.is_none() {
                    let supports: Vec<f64> = pa.supports().map(|l| l.level).collect();
                    levels.support = supports
                        .iter()
                        .copied()
                        .filter(|l| *l < spot)
                        .reduce(f64::max)
                        .or_else(|| supports.first().copied());
                }
                if levels.resistance.is_none() {
                    let resistances: Vec<f64> = pa.resistances().map(|l| l.level).collect();
                    levels.resistance = resistances
                        .iter()
                        .copied()
                        .filter(|l| *l > spot)
                        .reduce(f64::min)
                        .or_else(|| resistances.first().copied());
                }
                if levels.pivot.is_none() {
                    levels.pivot = pa.pivots.map(|p| p.pivot);
                }
            }

            if levels.vwap.is_none() {
                levels.vwap = result
                    .technical
                    .technical()
                    .and_then(|t| t.vwap)
                    .filter(|v| *v != 0.0);
            }
        }

        if let Some(daily) = input.series(Timeframe::Daily).filter(|s| !s.is_empty()) {
            let recent = daily.tail(FALLBACK_LOOKBACK);
            if levels.support.is_none() {
                levels.support = recent.iter().map(|c| c.low()).reduce(f64::min);
            }
            if levels.resistance.is_none() {
                levels.resistance = recent.iter().map(|c| c.high()).reduce(f64::max);
            }
        }
        if levels.vwap.is_none() {
            levels.vwap = Some(spot);
        }

        if let Some(details) = options.and_then(LayerResult::options) {
            levels.max_pain = details.max_pain_strike;
            let closer = |candidate: Option<f64>, current: Option<f64>| match (candidate, current) {
                (Some(c), Some(cur)) if (c - spot).abs() < (cur - spot).abs() => Some(c),
                (Some(c), None) => Some(c),
                (_, cur) => cur,
            };
            levels.support = closer(details.support_level, levels.support);
            levels.resistance = closer(details.resistance_level, levels.resistance);
        }

        levels
    }

    /// Headline signals from the 15- and 60-minute charts plus PCR.
    fn top_signals(timeframes: &[TimeframeResult], options: Option<&LayerResult>) -> Vec<String> {
        let mut signals = Vec::new();

        for tf in [Timeframe::FifteenMinute, Timeframe::SixtyMinute] {
            let Some(result) = timeframes.iter().find(|t| t.timeframe == tf) else {
                continue;
            };
            if let Some(technical) = result.technical.technical() {
                for signal in technical.indicators.iter().take(2) {
                    signals.push(format!("{} {} ({})", signal.name, signal.direction.label(), tf));
                }
            }
            if let Some(pattern) = result
                .candlestick
                .candlestick()
                .and_then(|c| c.patterns.first())
            {
                signals.push(format!("{} ({})", pattern.name, tf));
            }
        }

        if let Some(pcr) = options
            .and_then(LayerResult::options)
            .and_then(|d| d.pcr)
            .filter(|p| *p != 0.0)
        {
            signals.push(format!("PCR {:.2}", pcr));
        }

        signals
    }

    fn risk_factors(timeframes: &[TimeframeResult], options: Option<&LayerResult>) -> Vec<String> {
        let mut risks = Vec::new();

        let fifteen = timeframes
            .iter()
            .find(|t| t.timeframe == Timeframe::FifteenMinute)
            .and_then(|t| t.technical.technical());
        if let Some(details) = fifteen {
            match details.rsi {
                Some(rsi) if rsi > 75.0 => risks.push(format!(
                    "RSI overbought at {:.1} on 15min: reversal risk",
                    rsi
                )),
                Some(rsi) if rsi < 25.0 => risks.push(format!(
                    "RSI oversold at {:.1} on 15min: bounce likely but risky",
                    rsi
                )),
                _ => {}
            }
            if let Some(adx) = details.adx.filter(|a| *a < 20.0) {
                risks.push(format!(
                    "ADX weak at {:.1} on 15min: no clear trend, avoid breakout trades",
                    adx
                ));
            }
        }

        let bullish = timeframes.iter().any(|t| t.direction.is_bullish());
        let bearish = timeframes.iter().any(|t| t.direction.is_bearish());
        if bullish && bearish {
            let conflicts: Vec<String> = timeframes
                .iter()
                .filter(|t| t.direction != MarketDirection::Neutral)
                .map(|t| format!("{}={}", t.timeframe, t.direction.label()))
                .collect();
            risks.push(format!("Conflicting timeframes: {}", conflicts.join(", ")));
        }

        if let Some(pcr) = options.and_then(LayerResult::options).and_then(|d| d.pcr) {
            if pcr > 1.5 {
                risks.push(format!(
                    "PCR very high ({:.2}): extreme bearish positioning, contrarian bounce possible",
                    pcr
                ));
            } else if pcr < 0.7 {
                risks.push(format!(
                    "PCR very low ({:.2}): extreme bullish positioning, contrarian selloff possible",
                    pcr
                ));
            }
        }

        for tf in timeframes {
            for layer in [&tf.technical, &tf.candlestick, &tf.price_action] {
                if let Some(error) = &layer.error {
                    risks.push(format!(
                        "{} layer failed on {}: {}",
                        layer.layer.name(),
                        tf.timeframe,
                        error
                    ));
                }
            }
        }
        if let Some(error) = options.and_then(|o| o.error.as_ref()) {
            risks.push(format!("Options layer failed: {}", error));
        }

        risks
    }

    fn summaries(
        timeframes: &[TimeframeResult],
        totals: LayerTotals,
        options: Option<&LayerResult>,
        options_score: f64,
        top_signals: &[String],
    ) -> LayerSummaries {
        let find = |tf: Timeframe| timeframes.iter().find(|t| t.timeframe == tf);

        let patterns = find(Timeframe::FifteenMinute)
            .and_then(|t| t.candlestick.candlestick())
            .map(|c| c.patterns.iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default();

        let trend = find(Timeframe::SixtyMinute)
            .and_then(|t| t.price_action.price_action())
            .map(|pa| pa.trend.trend);

        LayerSummaries {
            technical: Some(TechnicalSummary {
                score: round2(totals.technical),
                direction: MarketDirection::from_score(totals.technical),
                key_signals: top_signals.iter().take(MAX_KEY_SIGNALS).cloned().collect(),
            }),
            candlestick: Some(CandlestickSummary {
                score: round2(totals.candlestick),
                direction: MarketDirection::from_score(totals.candlestick),
                patterns,
            }),
            options: options.map(|result| {
                let details = result.options();
                OptionsSummary {
                    score: round2(options_score),
                    direction: result.direction,
                    pcr: details.and_then(|d| d.pcr),
                    support: details.and_then(|d| d.support_level),
                    resistance: details.and_then(|d| d.resistance_level),
                    max_pain: details.and_then(|d| d.max_pain_strike),
                }
            }),
            price_action: Some(PriceActionSummary {
                score: round2(totals.price_action),
                direction: MarketDirection::from_score(totals.price_action),
                trend,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::fixtures::{create_flat_candles, create_uptrend_candles, series};
    use crate::types::{Direction, OptionLeg, OptionType, OptionsSnapshot};

    struct Failing;

    impl CandleLayer for Failing {
        fn min_candles(&self) -> usize {
            1
        }

        fn analyze(&self, _series: &CandleSeries) -> Result<LayerResult> {
            Err(EngineError::InvalidInput("boom".to_string()))
        }
    }

    struct Panicking;

    impl OptionsLayer for Panicking {
        fn analyze(&self, _spot: f64, _snapshot: Option<&OptionsSnapshot>) -> Result<LayerResult> {
            panic!("options exploded")
        }
    }

    fn input_with(series_by_tf: Vec<(Timeframe, CandleSeries)>, spot: f64) -> ConvictionInput {
        ConvictionInput::new(spot, series_by_tf.into_iter().collect(), None).unwrap()
    }

    fn timeframe_result(timeframe: Timeframe, direction: MarketDirection) -> TimeframeResult {
        TimeframeResult {
            timeframe,
            candles: 0,
            technical: LayerResult::neutral(LayerKind::Technical, "-"),
            candlestick: LayerResult::neutral(LayerKind::Candlestick, "-"),
            price_action: LayerResult::neutral(LayerKind::PriceAction, "-"),
            combined_score: 0.0,
            direction,
        }
    }

    #[test]
    fn test_alignment_bonus() {
        use MarketDirection::*;
        let results = |dirs: [MarketDirection; 4]| -> Vec<TimeframeResult> {
            Timeframe::ALL
                .iter()
                .zip(dirs)
                .map(|(tf, d)| timeframe_result(*tf, d))
                .collect()
        };

        assert_eq!(ConvictionScorer::alignment_bonus(&results([Bullish, StrongBullish, Bullish, Neutral])), 1.5);
        assert_eq!(ConvictionScorer::alignment_bonus(&results([Bearish, Bearish, Bearish, Bullish])), -1.5);
        assert_eq!(ConvictionScorer::alignment_bonus(&results([Bullish, Bullish, Bearish, Bearish])), 0.5);
        assert_eq!(ConvictionScorer::alignment_bonus(&results([Bearish, Bearish, Neutral, Neutral])), -0.5);
        assert_eq!(ConvictionScorer::alignment_bonus(&results([Bullish, Neutral, Bearish, Neutral])), 0.0);
    }

    #[test]
    fn test_empty_input_is_no_trade() {
        let result = ConvictionScorer::default().score(&input_with(Vec::new(), 22010.0));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.recommendation.action, TradeAction::NoTrade);
        assert_eq!(result.recommendation.atm_strike, 22000.0);
        assert_eq!(result.key_levels.vwap, Some(22010.0));
        assert_eq!(result.timeframe_scores.len(), 4);
        assert!(result.trade_setup_text.starts_with("NO TRADE"));
    }

    #[test]
    fn test_short_timeframe_scored_neutral() {
        let input = input_with(
            vec![(Timeframe::FifteenMinute, series(create_uptrend_candles(4)))],
            22000.0,
        );
        let result = ConvictionScorer::default().score(&input);
        let tf = result.timeframe(Timeframe::FifteenMinute).unwrap();
        assert_eq!(tf.candles, 4);
        assert_eq!(tf.combined_score, 0.0);
        assert!(tf.technical.signals[0].starts_with("Insufficient data"));
    }

    #[test]
    fn test_failing_layer_reported() {
        let scorer = ConvictionScorer::with_layers(
            ScoringConfig::default(),
            Box::new(IndicatorEngine::default()),
            Box::new(Failing),
            Box::new(PriceActionAnalyzer::default()),
            Box::new(OptionsAnalyzer::default()),
        );
        let input = input_with(vec![(Timeframe::Daily, series(create_flat_candles(30)))], 100.0);
        let result = scorer.score(&input);

        let daily = result.timeframe(Timeframe::Daily).unwrap();
        assert!(daily.candlestick.is_failed());
        assert_eq!(daily.candlestick.direction, Direction::Neutral);
        assert!(result
            .risk_factors
            .iter()
            .any(|r| r.starts_with("Candlestick layer failed on daily")));
    }

    #[test]
    fn test_panicking_options_layer_contained() {
        let scorer = ConvictionScorer::with_layers(
            ScoringConfig::default(),
            Box::new(IndicatorEngine::default()),
            Box::new(PatternDetector::default()),
            Box::new(PriceActionAnalyzer::default()),
            Box::new(Panicking),
        );
        let snapshot = OptionsSnapshot::new(
            22000.0,
            None,
            vec![OptionLeg::new(22000.0, OptionType::Call, 10.0)],
        )
        .unwrap();
        let input = ConvictionInput::new(22000.0, BTreeMap::new(), Some(snapshot)).unwrap();
        let result = scorer.score(&input);

        assert!(result.options.as_ref().unwrap().is_failed());
        assert!(result.layers.options.is_none());
        assert!(result
            .risk_factors
            .iter()
            .any(|r| r.contains("options exploded")));
    }

    #[test]
    fn test_option_walls_tighten_levels() {
        let snapshot = OptionsSnapshot::new(
            22000.0,
            None,
            vec![
                OptionLeg::new(22100.0, OptionType::Call, 500_000.0),
                OptionLeg::new(21900.0, OptionType::Put, 400_000.0),
            ],
        )
        .unwrap();
        let input = ConvictionInput::new(22000.0, BTreeMap::new(), Some(snapshot)).unwrap();
        let result = ConvictionScorer::default().score(&input);

        assert_eq!(result.key_levels.support, Some(21900.0));
        assert_eq!(result.key_levels.resistance, Some(22100.0));
        assert!(result.key_levels.max_pain.is_some());
        assert!(result.layers.options.is_some());
    }

    #[test]
    fn test_pipeline_panic_falls_back_to_no_trade() {
        let candles = create_uptrend_candles(30);
        let last = candles[candles.len() - 1].timestamp();
        let input = input_with(vec![(Timeframe::Daily, series(candles))], 22040.0);

        let scorer = ConvictionScorer::default();
        let result = scorer.contained(&input, || panic!("aggregation blew up"));

        assert_eq!(result.score, 0.0);
        assert_eq!(result.recommendation.action, TradeAction::NoTrade);
        assert_eq!(result.recommendation.atm_strike, 22050.0);
        assert_eq!(result.as_of, Some(last));
        assert!(result.timeframes.is_empty());
        assert_eq!(result.risk_factors, vec!["Engine error: aggregation blew up".to_string()]);
    }

    #[test]
    fn test_contained_passes_result_through() {
        let input = input_with(Vec::new(), 22000.0);
        let scorer = ConvictionScorer::default();
        let result = scorer.contained(&input, || scorer.evaluate(&input));
        assert_eq!(result, scorer.score(&input));
    }

    #[test]
    fn test_panic_message_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "panic with non-string payload");
    }
}
