//! Input document for a scoring run.
//!
//! ```json
//! {
//!   "spot": 22015.5,
//!   "timeframes": { "15min": [{ "date": "2024-01-02T09:15:00+05:30", "open": .. }] },
//!   "options": { "expiry": "2024-01-04", "legs": [{ "strike": 22000, "type": "CE", "oi": .. }] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::types::{CandleSeries, OptionLeg, OptionsSnapshot, Timeframe};

/// Everything the scorer consumes for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvictionInput {
    spot: f64,
    timeframes: BTreeMap<Timeframe, CandleSeries>,
    options: Option<OptionsSnapshot>,
}

#[derive(Deserialize)]
struct RawInput {
    spot: f64,
    #[serde(default)]
    timeframes: BTreeMap<String, CandleSeries>,
    #[serde(default)]
    options: Option<RawOptions>,
}

#[derive(Deserialize)]
struct RawOptions {
    #[serde(default)]
    spot: Option<f64>,
    #[serde(default)]
    expiry: Option<String>,
    #[serde(default)]
    legs: Vec<OptionLeg>,
}

impl ConvictionInput {
    pub fn new(
        spot: f64,
        timeframes: BTreeMap<Timeframe, CandleSeries>,
        options: Option<OptionsSnapshot>,
    ) -> Result<Self> {
        if !spot.is_finite() || spot <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "spot must be positive, got {}",
                spot
            )));
        }
        Ok(Self {
            spot,
            timeframes,
            options,
        })
    }

    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Series for a timeframe, if one was supplied.
    pub fn series(&self, timeframe: Timeframe) -> Option<&CandleSeries> {
        self.timeframes.get(&timeframe)
    }

    pub fn timeframes(&self) -> &BTreeMap<Timeframe, CandleSeries> {
        &self.timeframes
    }

    pub fn options(&self) -> Option<&OptionsSnapshot> {
        self.options.as_ref()
    }

    /// Latest candle timestamp across all series.
    pub fn as_of(&self) -> Option<i64> {
        self.timeframes
            .values()
            .filter_map(|s| s.last().map(|c| c.timestamp()))
            .max()
    }

    /// Parse and validate a JSON input document.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawInput = serde_json::from_str(json)?;

        let mut timeframes = BTreeMap::new();
        for (key, series) in raw.timeframes {
            let timeframe = Timeframe::from_str(&key)
                .ok_or_else(|| EngineError::InvalidInput(format!("unknown timeframe '{}'", key)))?;
            timeframes.insert(timeframe, series);
        }

        let options = raw
            .options
            .map(|o| OptionsSnapshot::new(o.spot.unwrap_or(raw.spot), o.expiry, o.legs))
            .transpose()?;

        Self::new(raw.spot, timeframes, options)
    }
}

/// Read and validate an input document from disk.
pub async fn load_input(path: impl AsRef<Path>) -> Result<ConvictionInput> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await?;
    let input = ConvictionInput::from_json(&json)?;
    debug!(
        path = %path.display(),
        timeframes = input.timeframes.len(),
        has_options = input.options.is_some(),
        "Loaded input"
    );
    Ok(input)
}
