use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::candle::Timeframe;
use super::signals::{Direction, LayerResult, TrendStructure};

/// Five-level market direction label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketDirection {
    StrongBullish,
    Bullish,
    #[default]
    Neutral,
    Bearish,
    StrongBearish,
}

impl MarketDirection {
    /// Label a score on the ±10 scale.
    pub fn from_score(score: f64) -> Self {
        if score >= 4.0 {
            MarketDirection::StrongBullish
        } else if score >= 1.0 {
            MarketDirection::Bullish
        } else if score <= -4.0 {
            MarketDirection::StrongBearish
        } else if score <= -1.0 {
            MarketDirection::Bearish
        } else {
            MarketDirection::Neutral
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, Self::StrongBullish | Self::Bullish)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, Self::StrongBearish | Self::Bearish)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StrongBullish => "STRONG_BULLISH",
            Self::Bullish => "BULLISH",
            Self::Neutral => "NEUTRAL",
            Self::Bearish => "BEARISH",
            Self::StrongBearish => "STRONG_BEARISH",
        }
    }
}

/// Conviction bucket on `|score|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConvictionLevel {
    VeryHigh,
    High,
    Moderate,
    Low,
    #[default]
    Neutral,
}

impl ConvictionLevel {
    pub fn from_score(score: f64) -> Self {
        let magnitude = score.abs();
        if magnitude >= 5.0 {
            ConvictionLevel::VeryHigh
        } else if magnitude >= 3.0 {
            ConvictionLevel::High
        } else if magnitude >= 2.0 {
            ConvictionLevel::Moderate
        } else if magnitude >= 0.8 {
            ConvictionLevel::Low
        } else {
            ConvictionLevel::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryHigh => "VERY_HIGH",
            Self::High => "HIGH",
            Self::Moderate => "MODERATE",
            Self::Low => "LOW",
            Self::Neutral => "NEUTRAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    BuyCall,
    BuyPut,
    #[default]
    NoTrade,
}

impl TradeAction {
    /// Exchange suffix of the option to buy.
    pub fn option_suffix(&self) -> Option<&'static str> {
        match self {
            TradeAction::BuyCall => Some("CE"),
            TradeAction::BuyPut => Some("PE"),
            TradeAction::NoTrade => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub action: TradeAction,
    pub atm_strike: f64,
    /// Index level at which the trade is abandoned.
    pub stop_loss: f64,
    /// Index level targeted.
    pub target: f64,
    pub risk_reward: f64,
    /// 0..=100
    pub confidence: f64,
    pub reasoning: String,
}

/// All layer outputs for one timeframe plus their blend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeResult {
    pub timeframe: Timeframe,
    pub candles: usize,
    pub technical: LayerResult,
    pub candlestick: LayerResult,
    pub price_action: LayerResult,
    pub combined_score: f64,
    pub direction: MarketDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeScore {
    pub score: f64,
    pub direction: MarketDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalSummary {
    pub score: f64,
    pub direction: MarketDirection,
    pub key_signals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlestickSummary {
    pub score: f64,
    pub direction: MarketDirection,
    /// Patterns found on the 15-minute chart.
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsSummary {
    pub score: f64,
    pub direction: Direction,
    pub pcr: Option<f64>,
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    pub max_pain: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceActionSummary {
    pub score: f64,
    pub direction: MarketDirection,
    /// Swing structure on the 60-minute chart.
    pub trend: Option<TrendStructure>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSummaries {
    pub technical: Option<TechnicalSummary>,
    pub candlestick: Option<CandlestickSummary>,
    pub options: Option<OptionsSummary>,
    pub price_action: Option<PriceActionSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyLevels {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    pub pivot: Option<f64>,
    pub max_pain: Option<f64>,
    pub vwap: Option<f64>,
}

/// Final output of a scoring call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvictionResult {
    /// −10..=+10
    pub score: f64,
    pub level: ConvictionLevel,
    pub direction: MarketDirection,
    pub recommendation: Recommendation,
    pub layers: LayerSummaries,
    pub timeframe_scores: BTreeMap<Timeframe, TimeframeScore>,
    pub key_levels: KeyLevels,
    pub risk_factors: Vec<String>,
    pub trade_setup_text: String,
    pub weighted_timeframe_score: f64,
    pub alignment_bonus: f64,
    /// Latest candle timestamp in the input (epoch ms).
    pub as_of: Option<i64>,
    #[serde(skip)]
    pub timeframes: Vec<TimeframeResult>,
    #[serde(skip)]
    pub options: Option<LayerResult>,
}

impl ConvictionResult {
    /// NO_TRADE result used when the pipeline itself fails.
    pub fn fallback(atm_strike: f64, as_of: Option<i64>, message: &str) -> Self {
        Self {
            score: 0.0,
            level: ConvictionLevel::Neutral,
            direction: MarketDirection::Neutral,
            recommendation: Recommendation {
                action: TradeAction::NoTrade,
                atm_strike,
                stop_loss: 0.0,
                target: 0.0,
                risk_reward: 0.0,
                confidence: 0.0,
                reasoning: format!("Analysis failed: {}", message),
            },
            layers: LayerSummaries::default(),
            timeframe_scores: BTreeMap::new(),
            key_levels: KeyLevels::default(),
            risk_factors: vec![format!("Engine error: {}", message)],
            trade_setup_text: format!("NO TRADE: Engine error: {}", message),
            weighted_timeframe_score: 0.0,
            alignment_bonus: 0.0,
            as_of,
            timeframes: Vec::new(),
            options: None,
        }
    }

    pub fn timeframe(&self, timeframe: Timeframe) -> Option<&TimeframeResult> {
        self.timeframes.iter().find(|t| t.timeframe == timeframe)
    }
}
