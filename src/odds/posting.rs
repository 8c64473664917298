//! Odds to post on a peer-to-peer exchange so a matched bet clears a target EV
//! after the exchange's commission.

use super::normalizer::{decimal_payout, to_american_odds};
use crate::error::{OddsError, OddsResult};
use crate::types::{AmericanOdds, FairPrice, PostingRecommendation};

pub const DEFAULT_TARGET_EV: f64 = 0.025;
pub const DEFAULT_COMMISSION_RATE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostingOddsRecommender {
    target_ev: f64,
    commission_rate: f64,
}

impl Default for PostingOddsRecommender {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_EV, DEFAULT_COMMISSION_RATE)
    }
}

/// Win probability the fair price must be marked up to once target EV and
/// commission are priced in: `p * (1 + target) / (1 - commission)`.
///
/// [`PostingOddsRecommender::recommend`] refuses to post when this leaves
/// (0, 1). That is a product rule on heavy favourites, not a limit of the odds
/// format: the posted probability `p * (1 - commission) / (1 + target)` would
/// still convert.
pub fn required_probability(fair_probability: f64, target_ev: f64, commission_rate: f64) -> f64 {
    fair_probability * (1.0 + target_ev) / (1.0 - commission_rate)
}

/// EV (fraction of stake) of a matched bet when commission comes off the payout.
pub fn net_expected_value(fair_probability: f64, odds: AmericanOdds, commission_rate: f64) -> f64 {
    fair_probability * decimal_payout(odds) * (1.0 - commission_rate) - 1.0
}

impl PostingOddsRecommender {
    pub fn new(target_ev: f64, commission_rate: f64) -> Self {
        Self {
            target_ev,
            commission_rate,
        }
    }

    pub fn target_ev(&self) -> f64 {
        self.target_ev
    }

    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    pub fn recommend(&self, fair: &FairPrice) -> OddsResult<PostingRecommendation> {
        let p = fair.fair_probability;
        if !p.is_finite() || p <= 0.0 || p >= 1.0 {
            return Err(OddsError::InvalidProbability(p));
        }

        let required = required_probability(p, self.target_ev, self.commission_rate);
        let params_ok = (0.0..1.0).contains(&self.commission_rate) && self.target_ev > -1.0;
        if !params_ok || !required.is_finite() || required <= 0.0 || required >= 1.0 {
            return Err(OddsError::UnachievableTarget {
                required_probability: required,
            });
        }

        // The posted price pays 1 / posted_probability; scaling the fair
        // probability by the same factor the other way makes p * payout * (1 - c)
        // come out at 1 + target.
        let posted_probability = p * p / required;
        let recommended_odds = to_american_odds(posted_probability).map_err(|_| {
            OddsError::UnachievableTarget {
                required_probability: required,
            }
        })?;

        Ok(PostingRecommendation {
            fair_odds: fair.fair_odds,
            target_ev: self.target_ev,
            commission_rate: self.commission_rate,
            recommended_odds,
        })
    }
}
