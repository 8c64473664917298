//! Pricing core: odds normalization, fair odds, EV and posting recommendations.
//!
//! Everything here is a pure function of its inputs; no IO, no shared state.

pub mod ev;
pub mod fair_odds;
pub mod normalizer;
pub mod posting;

pub use ev::{best_quote, expected_value_pct, EvCalculator, EvThresholds};
pub use fair_odds::{FairOddsEngine, DEFAULT_MIN_BOOKS};
pub use normalizer::{
    decimal_payout, devig, devig_odds, implied_probability, to_american_odds,
    to_implied_probability, DevigQuote,
};
pub use posting::{
    net_expected_value, required_probability, PostingOddsRecommender, DEFAULT_COMMISSION_RATE,
    DEFAULT_TARGET_EV,
};
