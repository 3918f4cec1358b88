use std::env;

use crate::types::Timeframe;

/// Weight of each timeframe in the multi-timeframe blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeframeWeights {
    pub five_minute: f64,
    pub fifteen_minute: f64,
    pub sixty_minute: f64,
    pub daily: f64,
}

impl Default for TimeframeWeights {
    fn default() -> Self {
        Self {
            five_minute: 0.15,
            fifteen_minute: 0.30,
            sixty_minute: 0.35,
            daily: 0.20,
        }
    }
}

impl TimeframeWeights {
    pub fn get(&self, timeframe: Timeframe) -> f64 {
        match timeframe {
            Timeframe::FiveMinute => self.five_minute,
            Timeframe::FifteenMinute => self.fifteen_minute,
            Timeframe::SixtyMinute => self.sixty_minute,
            Timeframe::Daily => self.daily,
        }
    }
}

/// How the layers are blended into the final score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerWeights {
    pub technical: f64,
    pub candlestick: f64,
    pub options: f64,
    pub price_action: f64,
}

impl LayerWeights {
    /// Weights used when an options snapshot contributed.
    pub fn with_options() -> Self {
        Self {
            technical: 0.35,
            candlestick: 0.15,
            options: 0.25,
            price_action: 0.25,
        }
    }

    /// Weights used when there is no usable options layer.
    pub fn without_options() -> Self {
        Self {
            technical: 0.45,
            candlestick: 0.20,
            options: 0.0,
            price_action: 0.35,
        }
    }
}

/// Blend of the three candle layers inside one timeframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeframeBlend {
    pub technical: f64,
    pub candlestick: f64,
    pub price_action: f64,
}

impl Default for TimeframeBlend {
    fn default() -> Self {
        Self {
            technical: 0.50,
            candlestick: 0.25,
            price_action: 0.25,
        }
    }
}

/// Scoring parameters for the conviction engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub timeframe_weights: TimeframeWeights,
    pub timeframe_blend: TimeframeBlend,
    pub layers_with_options: LayerWeights,
    pub layers_without_options: LayerWeights,
    /// Timeframes with fewer candles are scored neutral.
    pub min_timeframe_candles: usize,
    /// Absolute score needed before a trade is recommended.
    pub trade_threshold: f64,
    /// Points between the stop and the protecting level.
    pub stop_buffer: f64,
    /// Strike spacing for ATM rounding.
    pub strike_step: f64,
    /// Distance from spot used for support/resistance when no level is found.
    pub fallback_level_distance: f64,
    /// Spot within this many points of an OI wall counts as at the wall.
    pub wall_proximity: f64,
    /// Underlying name used in trade-setup text.
    pub instrument: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            timeframe_weights: TimeframeWeights::default(),
            timeframe_blend: TimeframeBlend::default(),
            layers_with_options: LayerWeights::with_options(),
            layers_without_options: LayerWeights::without_options(),
            min_timeframe_candles: 5,
            trade_threshold: 1.5,
            stop_buffer: 50.0,
            strike_step: 50.0,
            fallback_level_distance: 200.0,
            wall_proximity: 100.0,
            instrument: "NIFTY".to_string(),
        }
    }
}

impl ScoringConfig {
    pub fn layer_weights(&self, options_present: bool) -> LayerWeights {
        if options_present {
            self.layers_with_options
        } else {
            self.layers_without_options
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the input document.
    pub input_path: Option<String>,
    /// Where to write the result (stdout when unset).
    pub output_path: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: bool,
    /// Scoring parameters.
    pub scoring: ScoringConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = ScoringConfig::default();

        Self {
            input_path: env::var("CONVICTION_INPUT").ok(),
            output_path: env::var("CONVICTION_OUTPUT").ok(),
            pretty: env::var("CONVICTION_PRETTY")
                .ok()
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            scoring: ScoringConfig {
                trade_threshold: env::var("CONVICTION_TRADE_THRESHOLD")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.trade_threshold),
                stop_buffer: env::var("CONVICTION_STOP_BUFFER")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.stop_buffer),
                strike_step: env::var("CONVICTION_STRIKE_STEP")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.strike_step),
                wall_proximity: env::var("CONVICTION_WALL_PROXIMITY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.wall_proximity),
                min_timeframe_candles: env::var("CONVICTION_MIN_TIMEFRAME_CANDLES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.min_timeframe_candles),
                instrument: env::var("CONVICTION_INSTRUMENT").unwrap_or(defaults.instrument),
                ..defaults
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
