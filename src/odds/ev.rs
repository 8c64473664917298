//! Expected value of taking the best available price against the fair price.

use serde::{Deserialize, Serialize};

use super::normalizer::decimal_payout;
use crate::error::{OddsError, OddsResult};
use crate::types::{AmericanOdds, EvClass, EvResult, FairPrice, Quote};

/// Lower bounds (in percent) for each EV bucket. Anything below `neutral_pct`
/// is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvThresholds {
    pub excellent_pct: f64,
    pub high_pct: f64,
    pub positive_pct: f64,
    pub neutral_pct: f64,
}

impl Default for EvThresholds {
    fn default() -> Self {
        Self {
            excellent_pct: 4.5,
            high_pct: 2.0,
            positive_pct: 0.0,
            neutral_pct: -2.0,
        }
    }
}

impl EvThresholds {
    /// Buckets must be strictly descending.
    pub fn is_ordered(&self) -> bool {
        self.excellent_pct > self.high_pct
            && self.high_pct > self.positive_pct
            && self.positive_pct > self.neutral_pct
    }

    pub fn classify(&self, ev_pct: f64) -> EvClass {
        if ev_pct >= self.excellent_pct {
            EvClass::Excellent
        } else if ev_pct >= self.high_pct {
            EvClass::High
        } else if ev_pct >= self.positive_pct {
            EvClass::Positive
        } else if ev_pct >= self.neutral_pct {
            EvClass::Neutral
        } else {
            EvClass::Negative
        }
    }
}

/// EV in percent of stake: `(p * decimal_payout - 1) * 100`.
pub fn expected_value_pct(fair_probability: f64, odds: AmericanOdds) -> f64 {
    (fair_probability * decimal_payout(odds) - 1.0) * 100.0
}

/// Highest-paying quote; the first one wins ties.
pub fn best_quote<'a>(quotes: impl IntoIterator<Item = &'a Quote>) -> Option<&'a Quote> {
    quotes.into_iter().fold(None::<&'a Quote>, |best, q| match best {
        Some(b) if decimal_payout(b.odds) >= decimal_payout(q.odds) => Some(b),
        _ => Some(q),
    })
}

#[derive(Debug, Clone, Default)]
pub struct EvCalculator {
    thresholds: EvThresholds,
}

impl EvCalculator {
    pub fn new(thresholds: EvThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &EvThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, fair: &FairPrice, best: &Quote) -> OddsResult<EvResult> {
        let p = fair.fair_probability;
        if !p.is_finite() || p <= 0.0 || p >= 1.0 {
            return Err(OddsError::InvalidProbability(p));
        }
        let ev_pct = expected_value_pct(p, best.odds);
        Ok(EvResult {
            side: fair.side.clone(),
            best_quote: best.clone(),
            fair_probability: p,
            ev_pct,
            class: self.thresholds.classify(ev_pct),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::normalizer::implied_probability;

    fn odds(v: i32) -> AmericanOdds {
        AmericanOdds::new(v).unwrap()
    }

    fn fair(p: f64) -> FairPrice {
        FairPrice {
            side: "over".into(),
            fair_odds: crate::odds::to_american_odds(p).unwrap(),
            fair_probability: p,
            anchor_book: "pinnacle".into(),
            margin: 0.0,
        }
    }

    #[test]
    fn classify_boundaries() {
        let t = EvThresholds::default();
        assert_eq!(t.classify(4.5), EvClass::Excellent);
        assert_eq!(t.classify(4.49), EvClass::High);
        assert_eq!(t.classify(2.0), EvClass::High);
        assert_eq!(t.classify(0.0), EvClass::Positive);
        assert_eq!(t.classify(-0.01), EvClass::Neutral);
        assert_eq!(t.classify(-2.0), EvClass::Neutral);
        assert_eq!(t.classify(-2.01), EvClass::Negative);
    }

    #[test]
    fn thresholds_must_descend() {
        assert!(EvThresholds::default().is_ordered());
        let bad = EvThresholds {
            high_pct: 5.0,
            ..Default::default()
        };
        assert!(!bad.is_ordered());
    }

    #[test]
    fn fair_quote_has_zero_ev() {
        let q = odds(-120);
        let ev = expected_value_pct(implied_probability(q), q);
        assert!(ev.abs() < 1e-9);
    }

    #[test]
    fn evaluate_rejects_degenerate_probability() {
        let calc = EvCalculator::default();
        let mut f = fair(0.5);
        f.fair_probability = 1.0;
        let q = Quote::new("fanduel", "over", odds(100));
        assert!(calc.evaluate(&f, &q).is_err());
    }

    #[test]
    fn evaluate_classifies() {
        let calc = EvCalculator::default();
        let q = Quote::new("fanduel", "over", odds(110));
        let r = calc.evaluate(&fair(0.5), &q).unwrap();
        assert!((r.ev_pct - 5.0).abs() < 1e-9);
        assert_eq!(r.class, EvClass::Excellent);
        assert_eq!(r.best_quote.bookmaker, "fanduel");
    }

    #[test]
    fn best_quote_prefers_payout_across_signs() {
        let quotes = vec![
            Quote::new("a", "over", odds(-120)),
            Quote::new("b", "over", odds(105)),
            Quote::new("c", "over", odds(-101)),
            Quote::new("d", "over", odds(105)),
        ];
        assert_eq!(best_quote(&quotes).unwrap().bookmaker, "b");
        assert!(best_quote(Vec::<&Quote>::new()).is_none());
    }
}
