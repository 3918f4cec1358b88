use serde::{Deserialize, Serialize};

use super::options::OptionType;

/// Directional bias of a single layer or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Direction {
    /// Classify a score against a symmetric dead band: strictly above
    /// `threshold` is bullish, strictly below `-threshold` bearish.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score > threshold {
            Direction::Bullish
        } else if score < -threshold {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    /// +1, -1 or 0.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
            Direction::Neutral => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Bullish => "BULLISH",
            Direction::Bearish => "BEARISH",
            Direction::Neutral => "NEUTRAL",
        }
    }
}

/// The four analysis layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Technical,
    Candlestick,
    Options,
    PriceAction,
}

impl LayerKind {
    /// Get display name for this layer.
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Technical => "Technical",
            LayerKind::Candlestick => "Candlestick",
            LayerKind::Options => "Options",
            LayerKind::PriceAction => "Price Action",
        }
    }

    /// Native score bound of the layer (scores live in `[-bound, +bound]`).
    pub fn score_bound(&self) -> f64 {
        match self {
            LayerKind::Technical => 5.0,
            LayerKind::Candlestick => 3.0,
            LayerKind::Options => 3.0,
            LayerKind::PriceAction => 2.0,
        }
    }
}

/// Output of one analyzer invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerResult {
    pub layer: LayerKind,
    pub score: f64,
    pub direction: Direction,
    pub signals: Vec<String>,
    pub details: LayerDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LayerResult {
    pub fn new(
        layer: LayerKind,
        score: f64,
        direction: Direction,
        signals: Vec<String>,
        details: LayerDetails,
    ) -> Self {
        Self {
            layer,
            score,
            direction,
            signals,
            details,
            error: None,
        }
    }

    /// Zero-score neutral result carrying a single explanatory signal.
    pub fn neutral(layer: LayerKind, signal: impl Into<String>) -> Self {
        Self::new(
            layer,
            0.0,
            Direction::Neutral,
            vec![signal.into()],
            LayerDetails::None,
        )
    }

    /// Neutral result standing in for a layer that failed.
    pub fn failed(layer: LayerKind, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            error: Some(error.clone()),
            ..Self::neutral(layer, format!("{} layer failed: {}", layer.name(), error))
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn technical(&self) -> Option<&TechnicalDetails> {
        match &self.details {
            LayerDetails::Technical(d) => Some(d),
            _ => None,
        }
    }

    pub fn candlestick(&self) -> Option<&CandlestickDetails> {
        match &self.details {
            LayerDetails::Candlestick(d) => Some(d),
            _ => None,
        }
    }

    pub fn options(&self) -> Option<&OptionsDetails> {
        match &self.details {
            LayerDetails::Options(d) => Some(d),
            _ => None,
        }
    }

    pub fn price_action(&self) -> Option<&PriceActionDetails> {
        match &self.details {
            LayerDetails::PriceAction(d) => Some(d),
            _ => None,
        }
    }
}

/// Typed per-layer facts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LayerDetails {
    Technical(Box<TechnicalDetails>),
    Candlestick(CandlestickDetails),
    Options(Box<OptionsDetails>),
    PriceAction(Box<PriceActionDetails>),
    None,
}

// ============================================================================
// Technical
// ============================================================================

/// One explainable contribution to the trend-momentum score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSignal {
    pub name: String,
    pub value: String,
    pub direction: Direction,
    pub weight: f64,
}

impl IndicatorSignal {
    pub fn new(name: &str, value: String, direction: Direction, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            direction,
            weight,
        }
    }

    pub fn describe(&self) -> String {
        format!("{}: {} ({})", self.name, self.value, self.direction.label())
    }
}

/// Last values of every indicator the engine computes.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalDetails {
    pub current_price: f64,
    pub ema_9: Option<f64>,
    pub ema_21: Option<f64>,
    pub ema_50: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub atr: Option<f64>,
    pub supertrend: Option<f64>,
    pub supertrend_direction: Option<i8>,
    pub vwap: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub bollinger_percent_b: Option<f64>,
    pub stochastic_k: Option<f64>,
    pub stochastic_d: Option<f64>,
    pub obv: Option<f64>,
    pub indicators: Vec<IndicatorSignal>,
}

// ============================================================================
// Candlestick
// ============================================================================

/// Candlestick patterns the detector recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    InvertedHammer,
    Doji,
    DragonflyDoji,
    GravestoneDoji,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    PiercingPattern,
    DarkCloudCover,
    ShootingStar,
}

impl CandlePattern {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BullishEngulfing => "Bullish Engulfing",
            Self::BearishEngulfing => "Bearish Engulfing",
            Self::Hammer => "Hammer",
            Self::InvertedHammer => "Inverted Hammer",
            Self::Doji => "Doji",
            Self::DragonflyDoji => "Dragonfly Doji",
            Self::GravestoneDoji => "Gravestone Doji",
            Self::MorningStar => "Morning Star",
            Self::EveningStar => "Evening Star",
            Self::ThreeWhiteSoldiers => "Three White Soldiers",
            Self::ThreeBlackCrows => "Three Black Crows",
            Self::PiercingPattern => "Piercing Pattern",
            Self::DarkCloudCover => "Dark Cloud Cover",
            Self::ShootingStar => "Shooting Star",
        }
    }

    /// Signed weight applied to the pattern's confidence. Plain doji has no
    /// base weight; it only nudges the score.
    pub fn base_weight(&self) -> f64 {
        match self {
            Self::BullishEngulfing => 1.0,
            Self::BearishEngulfing => -1.0,
            Self::Hammer => 0.7,
            Self::InvertedHammer => 0.5,
            Self::Doji => 0.0,
            Self::DragonflyDoji => 0.6,
            Self::GravestoneDoji => -0.6,
            Self::MorningStar => 1.2,
            Self::EveningStar => -1.2,
            Self::ThreeWhiteSoldiers => 1.5,
            Self::ThreeBlackCrows => -1.5,
            Self::PiercingPattern => 0.6,
            Self::DarkCloudCover => -0.6,
            Self::ShootingStar => -0.7,
        }
    }

    pub fn bias(&self) -> Direction {
        let weight = self.base_weight();
        if weight > 0.0 {
            Direction::Bullish
        } else if weight < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }
}

/// A detected pattern at a specific candle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub pattern: CandlePattern,
    pub name: String,
    pub bias: Direction,
    pub confidence: f64,
    /// Index of the pattern's final candle within the series.
    pub index: usize,
    pub volume_confirmed: bool,
    /// Signed amount this match added to the layer score.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlestickDetails {
    pub patterns: Vec<PatternMatch>,
    /// Latest candle volume above its trailing 20-candle average.
    pub volume_confirmation: bool,
    pub average_body: f64,
    pub average_volume: f64,
}

// ============================================================================
// Options
// ============================================================================

/// Put/call-ratio sentiment bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionsSentiment {
    Bullish,
    Bearish,
    #[default]
    RangeBound,
}

/// A strike with notable open-interest change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OiBuildup {
    pub strike: f64,
    pub option_type: OptionType,
    pub open_interest: f64,
    pub open_interest_change: f64,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsDetails {
    /// Put OI / call OI. `None` when either side is missing.
    pub pcr: Option<f64>,
    pub volume_pcr: Option<f64>,
    pub sentiment: OptionsSentiment,
    pub total_call_oi: f64,
    pub total_put_oi: f64,
    pub max_pain_strike: Option<f64>,
    /// Max pain minus spot.
    pub max_pain_distance: Option<f64>,
    /// Strike with the largest put OI.
    pub support_level: Option<f64>,
    /// Strike with the largest call OI.
    pub resistance_level: Option<f64>,
    pub atm_strike: f64,
    pub atm_call_price: Option<f64>,
    pub atm_put_price: Option<f64>,
    pub call_buildup: Vec<OiBuildup>,
    pub put_buildup: Vec<OiBuildup>,
    /// Where fresh positioning is concentrated relative to spot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildup_bias: Option<String>,
}

// ============================================================================
// Price action
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStrength {
    Weak,
    Moderate,
    Strong,
}

impl LevelStrength {
    pub fn from_touches(touches: usize) -> Self {
        match touches {
            0 | 1 => LevelStrength::Weak,
            2 => LevelStrength::Moderate,
            _ => LevelStrength::Strong,
        }
    }
}

/// A clustered support or resistance level.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLevel {
    pub level: f64,
    pub kind: LevelKind,
    pub touches: usize,
    pub strength: LevelStrength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendStructure {
    Uptrend,
    Downtrend,
    #[default]
    Sideways,
}

impl TrendStructure {
    pub fn label(&self) -> &'static str {
        match self {
            TrendStructure::Uptrend => "UPTREND",
            TrendStructure::Downtrend => "DOWNTREND",
            TrendStructure::Sideways => "SIDEWAYS",
        }
    }
}

/// Swing-structure classification with the swings it was derived from.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub trend: TrendStructure,
    pub swing_highs: Vec<f64>,
    pub swing_lows: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakout {
    pub direction: Direction,
    pub level: f64,
    pub volume_confirmed: bool,
    /// How many of the last 10 candles closed beyond the level.
    pub candles_beyond: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeProfile {
    pub average_volume: f64,
    pub current_volume: f64,
    pub volume_ratio: f64,
    pub trend: VolumeTrend,
    pub confirms_price: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Divergence {
    pub direction: Direction,
    pub description: String,
}

/// Classic floor-trader pivots.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotPoints {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceActionDetails {
    /// All levels sorted ascending by price.
    pub levels: Vec<PriceLevel>,
    pub trend: TrendAnalysis,
    pub breakout: Option<Breakout>,
    pub volume: VolumeProfile,
    pub divergence: Option<Divergence>,
    pub pivots: Option<PivotPoints>,
}

impl PriceActionDetails {
    pub fn supports(&self) -> impl Iterator<Item = &PriceLevel> {
        self.levels.iter().filter(|l| l.kind == LevelKind::Support)
    }

    pub fn resistances(&self) -> impl Iterator<Item = &PriceLevel> {
        self.levels
            .iter()
            .filter(|l| l.kind == LevelKind::Resistance)
    }
}
