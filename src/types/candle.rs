use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

use crate::error::{EngineError, Result};

/// Chart timeframe the engine scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "5min", alias = "5m")]
    FiveMinute,
    #[serde(rename = "15min", alias = "15m")]
    FifteenMinute,
    #[serde(rename = "60min", alias = "60m", alias = "1h")]
    SixtyMinute,
    #[serde(rename = "daily", alias = "1d", alias = "day")]
    Daily,
}

impl Timeframe {
    /// All timeframes in scoring order.
    pub const ALL: [Timeframe; 4] = [
        Timeframe::FiveMinute,
        Timeframe::FifteenMinute,
        Timeframe::SixtyMinute,
        Timeframe::Daily,
    ];

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "5min" | "5m" | "5minute" => Some(Self::FiveMinute),
            "15min" | "15m" | "15minute" => Some(Self::FifteenMinute),
            "60min" | "60m" | "1h" | "60minute" | "hour" => Some(Self::SixtyMinute),
            "daily" | "1d" | "day" => Some(Self::Daily),
            _ => None,
        }
    }

    /// Canonical key used in inputs and outputs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiveMinute => "5min",
            Self::FifteenMinute => "15min",
            Self::SixtyMinute => "60min",
            Self::Daily => "daily",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single OHLCV bar.
///
/// Fields are private so every candle in the engine has passed validation:
/// all prices finite, volume non-negative and `low <= open, close <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCandle")]
pub struct Candle {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self> {
        for (field, value) in [
            ("open", open),
            ("high", high),
            ("low", low),
            ("close", close),
            ("volume", volume),
        ] {
            if !value.is_finite() {
                return Err(EngineError::InvalidCandle(format!(
                    "{} is not finite at {}",
                    field, timestamp
                )));
            }
        }
        if volume < 0.0 {
            return Err(EngineError::InvalidCandle(format!(
                "negative volume {} at {}",
                volume, timestamp
            )));
        }
        if low > open.min(close) || high < open.max(close) {
            return Err(EngineError::InvalidCandle(format!(
                "OHLC out of range at {}: open={} high={} low={} close={}",
                timestamp, open, high, low, close
            )));
        }

        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Absolute body size.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// High-low range.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Body midpoint.
    pub fn midpoint(&self) -> f64 {
        (self.open + self.close) / 2.0
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Wire shape accepted for candles: either an epoch-millisecond `timestamp`
/// or a `date` string.
#[derive(Deserialize)]
struct RawCandle {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default, alias = "datetime")]
    date: Option<String>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

impl TryFrom<RawCandle> for Candle {
    type Error = EngineError;

    fn try_from(raw: RawCandle) -> Result<Self> {
        let timestamp = match (raw.timestamp, raw.date.as_deref()) {
            (Some(ts), _) => ts,
            (None, Some(date)) => parse_timestamp(date)?,
            (None, None) => {
                return Err(EngineError::InvalidCandle(
                    "candle needs a timestamp or date".to_string(),
                ))
            }
        };
        Candle::new(timestamp, raw.open, raw.high, raw.low, raw.close, raw.volume)
    }
}

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DD HH:MM:SS` or a bare date
/// into epoch milliseconds (UTC).
pub fn parse_timestamp(value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| EngineError::InvalidCandle(format!("unparseable date '{}'", value)))
}

/// Time-ascending candles for one timeframe. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Candle>", into = "Vec<Candle>")]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Build a series, rejecting timestamps that are not strictly ascending.
    pub fn new(candles: Vec<Candle>) -> Result<Self> {
        if let Some(pair) = candles
            .windows(2)
            .find(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(EngineError::InvalidSeries(format!(
                "timestamps not ascending: {} followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
        Ok(Self { candles })
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    /// The trailing `n` candles (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(n);
        &self.candles[start..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

impl Deref for CandleSeries {
    type Target = [Candle];

    fn deref(&self) -> &[Candle] {
        &self.candles
    }
}

impl TryFrom<Vec<Candle>> for CandleSeries {
    type Error = EngineError;

    fn try_from(candles: Vec<Candle>) -> Result<Self> {
        Self::new(candles)
    }
}

impl From<CandleSeries> for Vec<Candle> {
    fn from(series: CandleSeries) -> Self {
        series.candles
    }
}
