//! American odds <-> implied probability, and margin removal.

use crate::error::{OddsError, OddsResult};
use crate::types::AmericanOdds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DevigQuote {
    pub fair_a: f64,
    pub fair_b: f64,
    /// Sum of the raw implied probabilities (> 1.0 when the book carries vig)
    pub overround: f64,
}

impl DevigQuote {
    pub fn margin(&self) -> f64 {
        self.overround - 1.0
    }
}

/// Implied win probability of a validated price.
pub fn implied_probability(odds: AmericanOdds) -> f64 {
    let o = odds.value() as f64;
    if o < 0.0 {
        -o / (-o + 100.0)
    } else {
        100.0 / (o + 100.0)
    }
}

/// Implied win probability of a raw American price.
///
/// Fails on zero and on anything strictly between -100 and +100.
pub fn to_implied_probability(american_odds: i32) -> OddsResult<f64> {
    AmericanOdds::new(american_odds).map(implied_probability)
}

/// Nearest American price for a win probability in the open interval (0, 1).
pub fn to_american_odds(probability: f64) -> OddsResult<AmericanOdds> {
    if !probability.is_finite() || probability <= 0.0 || probability >= 1.0 {
        return Err(OddsError::InvalidProbability(probability));
    }

    let raw = if probability >= 0.5 {
        -(probability / (1.0 - probability) * 100.0).round()
    } else {
        ((1.0 - probability) / probability * 100.0).round()
    };

    if raw > i32::MAX as f64 || raw < i32::MIN as f64 {
        return Err(OddsError::InvalidProbability(probability));
    }
    AmericanOdds::new(raw as i32)
}

/// Decimal multiplier including the returned stake.
pub fn decimal_payout(odds: AmericanOdds) -> f64 {
    let o = odds.value() as f64;
    if o >= 100.0 {
        1.0 + o / 100.0
    } else {
        1.0 + 100.0 / -o
    }
}

/// Normalize two implied probabilities so they sum to exactly one.
pub fn devig(p_a: f64, p_b: f64) -> OddsResult<DevigQuote> {
    for p in [p_a, p_b] {
        if !p.is_finite() || p <= 0.0 {
            return Err(OddsError::InvalidProbability(p));
        }
    }
    let overround = p_a + p_b;
    let fair_a = p_a / overround;
    Ok(DevigQuote {
        fair_a,
        fair_b: 1.0 - fair_a,
        overround,
    })
}

/// Devig a two-sided pair of prices.
pub fn devig_odds(a: AmericanOdds, b: AmericanOdds) -> OddsResult<DevigQuote> {
    devig(implied_probability(a), implied_probability(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn odds(v: i32) -> AmericanOdds {
        AmericanOdds::new(v).unwrap()
    }

    #[test]
    fn implied_probability_formulas() {
        assert!((to_implied_probability(-110).unwrap() - 110.0 / 210.0).abs() < 1e-12);
        assert!((to_implied_probability(150).unwrap() - 0.4).abs() < 1e-12);
        assert!((to_implied_probability(-100).unwrap() - 0.5).abs() < 1e-12);
        assert!((to_implied_probability(100).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn implied_probability_rejects_invalid() {
        assert_eq!(to_implied_probability(0), Err(OddsError::InvalidOdds(0)));
        assert_eq!(to_implied_probability(50), Err(OddsError::InvalidOdds(50)));
        assert_eq!(to_implied_probability(-99), Err(OddsError::InvalidOdds(-99)));
    }

    #[test]
    fn american_odds_from_probability() {
        assert_eq!(to_american_odds(0.6).unwrap(), odds(-150));
        assert_eq!(to_american_odds(0.4).unwrap(), odds(150));
        assert_eq!(to_american_odds(0.5).unwrap(), odds(-100));
        assert_eq!(to_american_odds(1.0 / 3.0).unwrap(), odds(200));
    }

    #[test]
    fn american_odds_rejects_bounds() {
        for p in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(matches!(
                to_american_odds(p),
                Err(OddsError::InvalidProbability(_))
            ));
        }
    }

    #[test]
    fn american_odds_extreme_probability_overflows_cleanly() {
        assert!(to_american_odds(1e-12).is_err());
        assert!(to_american_odds(1.0 - 1e-12).is_err());
    }

    #[test]
    fn decimal_payout_both_signs() {
        assert!((decimal_payout(odds(148)) - 2.48).abs() < 1e-12);
        assert!((decimal_payout(odds(-200)) - 1.5).abs() < 1e-12);
        assert!((decimal_payout(odds(100)) - 2.0).abs() < 1e-12);
        assert!((decimal_payout(odds(-100)) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn devig_standard_line() {
        let d = devig_odds(odds(-110), odds(-110)).unwrap();
        assert!((d.fair_a - 0.5).abs() < 1e-12);
        assert!((d.fair_b - 0.5).abs() < 1e-12);
        assert!((d.margin() - (220.0 / 210.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn devig_rejects_non_positive() {
        assert!(devig(0.0, 0.5).is_err());
        assert!(devig(0.5, -0.1).is_err());
    }
}
