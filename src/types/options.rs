use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Option type. Accepts broker shorthand (`CE`/`PE`) on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    #[serde(alias = "CE", alias = "call", alias = "ce")]
    Call,
    #[serde(alias = "PE", alias = "put", alias = "pe")]
    Put,
}

/// One strike/type row of an options chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionLeg {
    pub strike: f64,
    #[serde(alias = "type", alias = "option_type")]
    pub option_type: OptionType,
    #[serde(default, alias = "oi", alias = "open_interest")]
    pub open_interest: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default, alias = "ltp", alias = "last_price")]
    pub last_price: f64,
    #[serde(default)]
    pub bid: f64,
    #[serde(default)]
    pub ask: f64,
    #[serde(
        default,
        alias = "change_oi",
        alias = "changeOi",
        alias = "oiChange",
        alias = "open_interest_change"
    )]
    pub open_interest_change: f64,
}

impl OptionLeg {
    /// Leg with only strike, type and open interest populated.
    pub fn new(strike: f64, option_type: OptionType, open_interest: f64) -> Self {
        Self {
            strike,
            option_type,
            open_interest,
            volume: 0.0,
            last_price: 0.0,
            bid: 0.0,
            ask: 0.0,
            open_interest_change: 0.0,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_oi_change(mut self, change: f64) -> Self {
        self.open_interest_change = change;
        self
    }

    pub fn with_quote(mut self, last_price: f64, bid: f64, ask: f64) -> Self {
        self.last_price = last_price;
        self.bid = bid;
        self.ask = ask;
        self
    }

    pub fn is_call(&self) -> bool {
        self.option_type == OptionType::Call
    }

    pub fn is_put(&self) -> bool {
        self.option_type == OptionType::Put
    }

    fn validate(&self) -> Result<()> {
        if !self.strike.is_finite() || self.strike <= 0.0 {
            return Err(EngineError::InvalidOption(format!(
                "strike must be positive, got {}",
                self.strike
            )));
        }
        let numeric = [
            ("openInterest", self.open_interest),
            ("volume", self.volume),
            ("lastPrice", self.last_price),
            ("bid", self.bid),
            ("ask", self.ask),
            ("openInterestChange", self.open_interest_change),
        ];
        for (field, value) in numeric {
            if !value.is_finite() {
                return Err(EngineError::InvalidOption(format!(
                    "{} is not finite at strike {}",
                    field, self.strike
                )));
            }
        }
        if self.open_interest < 0.0 || self.volume < 0.0 {
            return Err(EngineError::InvalidOption(format!(
                "negative open interest or volume at strike {}",
                self.strike
            )));
        }
        Ok(())
    }
}

/// Options chain for a single expiry at a given spot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsSnapshot {
    spot: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiry: Option<String>,
    legs: Vec<OptionLeg>,
}

impl OptionsSnapshot {
    pub fn new(spot: f64, expiry: Option<String>, legs: Vec<OptionLeg>) -> Result<Self> {
        if !spot.is_finite() || spot <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "options spot must be positive, got {}",
                spot
            )));
        }
        for leg in &legs {
            leg.validate()?;
        }
        Ok(Self { spot, expiry, legs })
    }

    pub fn spot(&self) -> f64 {
        self.spot
    }

    pub fn expiry(&self) -> Option<&str> {
        self.expiry.as_deref()
    }

    pub fn legs(&self) -> &[OptionLeg] {
        &self.legs
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn calls(&self) -> impl Iterator<Item = &OptionLeg> {
        self.legs.iter().filter(|l| l.is_call())
    }

    pub fn puts(&self) -> impl Iterator<Item = &OptionLeg> {
        self.legs.iter().filter(|l| l.is_put())
    }

    /// Distinct strikes in ascending order.
    pub fn strikes(&self) -> Vec<f64> {
        let mut strikes: Vec<f64> = self.legs.iter().map(|l| l.strike).collect();
        strikes.sort_by(f64::total_cmp);
        strikes.dedup();
        strikes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_leg_broker_aliases() {
        let json = r#"{"strike":22000,"type":"CE","oi":150000,"ltp":85.5,"change_oi":-2000}"#;
        let leg: OptionLeg = serde_json::from_str(json).unwrap();
        assert_eq!(leg.option_type, OptionType::Call);
        assert_eq!(leg.open_interest, 150000.0);
        assert_eq!(leg.last_price, 85.5);
        assert_eq!(leg.open_interest_change, -2000.0);
    }

    #[test]
    fn test_option_type_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&OptionType::Put).unwrap(), "\"PUT\"");
    }

    #[test]
    fn test_snapshot_rejects_bad_strike() {
        let legs = vec![OptionLeg::new(-1.0, OptionType::Call, 10.0)];
        assert!(OptionsSnapshot::new(22000.0, None, legs).is_err());
    }

    #[test]
    fn test_snapshot_rejects_bad_spot() {
        assert!(OptionsSnapshot::new(0.0, None, Vec::new()).is_err());
    }

    #[test]
    fn test_snapshot_strikes_dedup() {
        let legs = vec![
            OptionLeg::new(22100.0, OptionType::Call, 1.0),
            OptionLeg::new(22000.0, OptionType::Call, 1.0),
            OptionLeg::new(22000.0, OptionType::Put, 1.0),
        ];
        let snapshot = OptionsSnapshot::new(22050.0, None, legs).unwrap();
        assert_eq!(snapshot.strikes(), vec![22000.0, 22100.0]);
        assert_eq!(snapshot.calls().count(), 2);
        assert_eq!(snapshot.puts().count(), 1);
    }
}
