//! Error kinds raised by the pricing core.
//!
//! Every variant is local to a single outcome: callers skip the quote or
//! market that produced it and carry on with the rest of the batch.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OddsError {
    #[error("invalid american odds: {0}")]
    InvalidOdds(i64),

    #[error("unparseable american odds: {0:?}")]
    UnparseableOdds(String),

    #[error("invalid probability: {0}")]
    InvalidProbability(f64),

    #[error("insufficient market depth: {found} reference book(s) quote both sides, need {required}")]
    InsufficientMarketDepth { found: usize, required: usize },

    #[error("unachievable posting target: required probability {required_probability:.4} is outside (0, 1)")]
    UnachievableTarget { required_probability: f64 },

    #[error("mismatched outcome pair: {0}")]
    MismatchedPair(String),
}

impl OddsError {
    /// Short machine label, used for skip tallies and structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            OddsError::InvalidOdds(_) => "invalid_odds",
            OddsError::UnparseableOdds(_) => "unparseable_odds",
            OddsError::InvalidProbability(_) => "invalid_probability",
            OddsError::InsufficientMarketDepth { .. } => "insufficient_market_depth",
            OddsError::UnachievableTarget { .. } => "unachievable_target",
            OddsError::MismatchedPair(_) => "mismatched_pair",
        }
    }
}

pub type OddsResult<T> = std::result::Result<T, OddsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let errs = [
            OddsError::InvalidOdds(50),
            OddsError::UnparseableOdds("abc".into()),
            OddsError::InvalidProbability(1.0),
            OddsError::InsufficientMarketDepth {
                found: 1,
                required: 2,
            },
            OddsError::UnachievableTarget {
                required_probability: 1.2,
            },
            OddsError::MismatchedPair("x".into()),
        ];
        let mut kinds: Vec<_> = errs.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), errs.len());
    }

    #[test]
    fn unparseable_message_carries_raw_text() {
        let msg = OddsError::UnparseableOdds("evens".into()).to_string();
        assert_eq!(msg, "unparseable american odds: \"evens\"");
    }

    #[test]
    fn depth_message_mentions_counts() {
        let msg = OddsError::InsufficientMarketDepth {
            found: 1,
            required: 2,
        }
        .to_string();
        assert!(msg.contains("1 reference book"));
        assert!(msg.contains("need 2"));
    }
}
