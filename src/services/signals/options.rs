//! Options chain intelligence (Layer 3).
//!
//! Reads positioning from a single chain snapshot:
//! - Put/call ratio on open interest and volume
//! - Open-interest walls (largest call and put OI strikes)
//! - Max pain, the expiry price that minimizes writer payout
//! - Fresh OI build-up by strike

use tracing::debug;

use super::{clamp_score, round2, OptionsLayer};
use crate::error::Result;
use crate::types::{
    Direction, LayerDetails, LayerKind, LayerResult, OiBuildup, OptionLeg, OptionType,
    OptionsDetails, OptionsSentiment, OptionsSnapshot,
};

const SCORE_BOUND: f64 = 3.0;
const DIRECTION_THRESHOLD: f64 = 0.5;
const BUILDUP_DEPTH: usize = 3;

/// Options chain analyzer.
pub struct OptionsAnalyzer {
    /// Strike spacing used to find the ATM strike.
    strike_step: f64,
    /// Spot within this many points of an OI wall counts as "at" the wall.
    wall_proximity: f64,
}

impl Default for OptionsAnalyzer {
    fn default() -> Self {
        Self {
            strike_step: 50.0,
            wall_proximity: 100.0,
        }
    }
}

/// Put/call ratios for the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PutCallRatio {
    pub oi: Option<f64>,
    pub volume: Option<f64>,
}

impl PutCallRatio {
    pub fn sentiment(&self) -> OptionsSentiment {
        match self.oi {
            Some(pcr) if pcr > 1.2 => OptionsSentiment::Bullish,
            Some(pcr) if pcr < 0.8 => OptionsSentiment::Bearish,
            _ => OptionsSentiment::RangeBound,
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// First leg with strictly the largest open interest.
fn max_oi_leg<'a>(legs: impl Iterator<Item = &'a OptionLeg>) -> Option<&'a OptionLeg> {
    legs.fold(None, |best: Option<&OptionLeg>, leg| match best {
        Some(b) if b.open_interest >= leg.open_interest => Some(b),
        _ => Some(leg),
    })
}

impl OptionsAnalyzer {
    pub fn new(strike_step: f64, wall_proximity: f64) -> Self {
        Self {
            strike_step,
            wall_proximity,
        }
    }

    /// Nearest tradable strike to spot.
    pub fn atm_strike(&self, spot: f64) -> f64 {
        if self.strike_step > 0.0 {
            (spot / self.strike_step).round() * self.strike_step
        } else {
            spot
        }
    }

    pub fn put_call_ratio(&self, snapshot: &OptionsSnapshot) -> PutCallRatio {
        let calls: Vec<&OptionLeg> = snapshot.calls().collect();
        let puts: Vec<&OptionLeg> = snapshot.puts().collect();
        if calls.is_empty() || puts.is_empty() {
            return PutCallRatio {
                oi: None,
                volume: None,
            };
        }

        let ratio = |put: f64, call: f64| (call > 0.0).then(|| round4(put / call));
        let call_oi: f64 = calls.iter().map(|l| l.open_interest).sum();
        let put_oi: f64 = puts.iter().map(|l| l.open_interest).sum();
        let call_volume: f64 = calls.iter().map(|l| l.volume).sum();
        let put_volume: f64 = puts.iter().map(|l| l.volume).sum();

        PutCallRatio {
            oi: ratio(put_oi, call_oi),
            volume: ratio(put_volume, call_volume),
        }
    }

    /// Expiry price at which option writers pay out the least. Ties resolve
    /// to the lowest strike.
    pub fn max_pain(&self, snapshot: &OptionsSnapshot) -> Option<f64> {
        if snapshot.calls().next().is_none() || snapshot.puts().next().is_none() {
            return None;
        }

        let mut best: Option<(f64, f64)> = None;
        for expiry in snapshot.strikes() {
            let call_payout: f64 = snapshot
                .calls()
                .map(|c| (expiry - c.strike).max(0.0) * c.open_interest)
                .sum();
            let put_payout: f64 = snapshot
                .puts()
                .map(|p| (p.strike - expiry).max(0.0) * p.open_interest)
                .sum();
            let payout = call_payout + put_payout;

            if best.map_or(true, |(_, min)| payout < min) {
                best = Some((expiry, payout));
            }
        }
        best.map(|(strike, _)| strike)
    }

    /// Top strikes by OI change for one side of the chain.
    pub fn oi_buildup(&self, snapshot: &OptionsSnapshot, option_type: OptionType) -> Vec<OiBuildup> {
        let mut legs: Vec<&OptionLeg> = snapshot
            .legs()
            .iter()
            .filter(|l| l.option_type == option_type)
            .collect();
        legs.sort_by(|a, b| b.open_interest_change.total_cmp(&a.open_interest_change));

        legs.into_iter()
            .take(BUILDUP_DEPTH)
            .map(|leg| {
                let interpretation = match (option_type, leg.open_interest_change >= 0.0) {
                    (OptionType::Call, true) => "Call writing",
                    (OptionType::Call, false) => "Call unwinding",
                    (OptionType::Put, true) => "Put writing",
                    (OptionType::Put, false) => "Put unwinding",
                };
                OiBuildup {
                    strike: leg.strike,
                    option_type,
                    open_interest: leg.open_interest,
                    open_interest_change: leg.open_interest_change,
                    interpretation: interpretation.to_string(),
                }
            })
            .collect()
    }

    fn buildup_bias(spot: f64, calls: &[OiBuildup], puts: &[OiBuildup]) -> Option<String> {
        let call = calls.first()?.strike;
        let put = puts.first()?.strike;
        let bias = match (call > spot, put < spot) {
            (true, true) => "Neutral build-up: call writing above and put writing below spot",
            (true, false) => "Call build-up bias: resistance forming at higher strikes",
            (false, true) => "Put build-up bias: support forming at lower strikes",
            (false, false) => return None,
        };
        Some(bias.to_string())
    }

    /// Score the chain on [-3, 3].
    pub fn options_score(&self, spot: f64, snapshot: Option<&OptionsSnapshot>) -> LayerResult {
        let Some(snapshot) = snapshot.filter(|s| !s.is_empty()) else {
            debug!("options layer: no chain supplied");
            return LayerResult::neutral(LayerKind::Options, "No options data");
        };

        let mut score = 0.0;
        let mut signals = Vec::new();

        let pcr = self.put_call_ratio(snapshot);
        match pcr.oi {
            Some(ratio) if ratio > 1.3 => {
                score += 1.0;
                signals.push(format!("Strong PCR {:.2}: heavy put writing, solid support", ratio));
            }
            Some(ratio) if ratio > 1.0 => {
                score += 0.3;
                signals.push(format!("Mild PCR {:.2}: slight put bias", ratio));
            }
            Some(ratio) if ratio < 0.8 => {
                score -= 1.0;
                signals.push(format!("Call-heavy PCR {:.2}: strong resistance overhead", ratio));
            }
            Some(ratio) if ratio < 1.0 => {
                score -= 0.3;
                signals.push(format!("Mild call bias PCR {:.2}", ratio));
            }
            Some(ratio) => signals.push(format!("Neutral PCR {:.2}", ratio)),
            None => signals.push("PCR unavailable: one side of the chain is empty".to_string()),
        }

        let max_pain = self.max_pain(snapshot);
        if let Some(strike) = max_pain {
            if strike > spot {
                score += 0.5;
                signals.push(format!("Max pain {:.0} above spot: drift higher", strike));
            } else if strike < spot {
                score -= 0.5;
                signals.push(format!("Max pain {:.0} below spot: drift lower", strike));
            }
        }

        let call_buildup = self.oi_buildup(snapshot, OptionType::Call);
        let put_buildup = self.oi_buildup(snapshot, OptionType::Put);

        if let Some(top) = put_buildup.first().filter(|b| b.strike <= spot) {
            score += 0.5;
            signals.push(format!("Put build-up at {:.0}: support forming", top.strike));
        }
        if let Some(top) = call_buildup.first().filter(|b| b.strike >= spot) {
            score -= 0.5;
            signals.push(format!("Call build-up at {:.0}: resistance forming", top.strike));
        }

        let resistance = max_oi_leg(snapshot.calls()).map(|l| l.strike);
        let support = max_oi_leg(snapshot.puts()).map(|l| l.strike);

        if let Some(wall) = resistance.filter(|w| (spot - w).abs() <= self.wall_proximity) {
            score -= 0.5;
            signals.push(format!("Spot near max call OI {:.0}: major resistance", wall));
        }
        if let Some(wall) = support.filter(|w| (spot - w).abs() <= self.wall_proximity) {
            score += 0.5;
            signals.push(format!("Spot near max put OI {:.0}: major support", wall));
        }

        let score = round2(clamp_score(score, SCORE_BOUND));
        let direction = Direction::from_score(score, DIRECTION_THRESHOLD);

        let atm_strike = self.atm_strike(spot);
        let atm_price = |option_type: OptionType| {
            snapshot
                .legs()
                .iter()
                .find(|l| l.option_type == option_type && l.strike == atm_strike)
                .map(|l| l.last_price)
        };

        debug!(score, pcr = ?pcr.oi, max_pain = ?max_pain, "options layer scored");

        let details = OptionsDetails {
            pcr: pcr.oi,
            volume_pcr: pcr.volume,
            sentiment: pcr.sentiment(),
            total_call_oi: snapshot.calls().map(|l| l.open_interest).sum(),
            total_put_oi: snapshot.puts().map(|l| l.open_interest).sum(),
            max_pain_strike: max_pain,
            max_pain_distance: max_pain.map(|m| round2(m - spot)),
            support_level: support,
            resistance_level: resistance,
            atm_strike,
            atm_call_price: atm_price(OptionType::Call),
            atm_put_price: atm_price(OptionType::Put),
            buildup_bias: Self::buildup_bias(spot, &call_buildup, &put_buildup),
            call_buildup,
            put_buildup,
        };

        LayerResult::new(
            LayerKind::Options,
            score,
            direction,
            signals,
            LayerDetails::Options(Box::new(details)),
        )
    }
}

impl OptionsLayer for OptionsAnalyzer {
    fn analyze(&self, spot: f64, snapshot: Option<&OptionsSnapshot>) -> Result<LayerResult> {
        Ok(self.options_score(spot, snapshot))
    }
}
