//! Core types used throughout Fairline
//!
//! Quotes as received from sportsbooks, the per-book pairs the devig works on,
//! and the derived fair-price / EV / posting records handed to presentation.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{OddsError, OddsResult};

/// A price in American format.
///
/// Always nonzero with magnitude >= 100. `+100` and `-100` are both even money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct AmericanOdds(i32);

impl AmericanOdds {
    pub fn new(value: i32) -> OddsResult<Self> {
        if value.unsigned_abs() < 100 {
            return Err(OddsError::InvalidOdds(value as i64));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn is_favorite(&self) -> bool {
        self.0 < 0
    }
}

impl TryFrom<i32> for AmericanOdds {
    type Error = OddsError;

    fn try_from(value: i32) -> OddsResult<Self> {
        Self::new(value)
    }
}

impl From<AmericanOdds> for i32 {
    fn from(odds: AmericanOdds) -> Self {
        odds.0
    }
}

impl FromStr for AmericanOdds {
    type Err = OddsError;

    /// Accepts `"+148"`, `"148"` and `"-120"`.
    fn from_str(s: &str) -> OddsResult<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let value: i64 = digits
            .parse()
            .map_err(|_| OddsError::UnparseableOdds(trimmed.to_string()))?;
        let value = i32::try_from(value).map_err(|_| OddsError::InvalidOdds(value))?;
        Self::new(value)
    }
}

impl fmt::Display for AmericanOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A single sportsbook price for one side of a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Bookmaker identifier, lowercase (e.g. "pinnacle")
    pub bookmaker: String,
    /// Side identifier (e.g. "over", "under", a team name)
    pub side: String,
    pub odds: AmericanOdds,
}

impl Quote {
    /// Bookmaker ids are trimmed and lowercased so feeds that disagree on case
    /// still pair up.
    pub fn new(bookmaker: impl Into<String>, side: impl Into<String>, odds: AmericanOdds) -> Self {
        Self {
            bookmaker: bookmaker.into().trim().to_ascii_lowercase(),
            side: side.into(),
            odds,
        }
    }
}

/// Both sides of one market from the same bookmaker.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomePair {
    side_a: Quote,
    side_b: Quote,
}

impl OutcomePair {
    pub fn new(side_a: Quote, side_b: Quote) -> OddsResult<Self> {
        if !side_a.bookmaker.eq_ignore_ascii_case(&side_b.bookmaker) {
            return Err(OddsError::MismatchedPair(format!(
                "bookmakers differ: {} vs {}",
                side_a.bookmaker, side_b.bookmaker
            )));
        }
        if side_a.side.eq_ignore_ascii_case(&side_b.side) {
            return Err(OddsError::MismatchedPair(format!(
                "both quotes are for side {}",
                side_a.side
            )));
        }
        Ok(Self { side_a, side_b })
    }

    pub fn bookmaker(&self) -> &str {
        &self.side_a.bookmaker
    }

    pub fn side_a(&self) -> &Quote {
        &self.side_a
    }

    pub fn side_b(&self) -> &Quote {
        &self.side_b
    }
}

/// Which half of a two-way market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketSide {
    A,
    B,
}

impl MarketSide {
    pub fn opposite(&self) -> Self {
        match self {
            MarketSide::A => MarketSide::B,
            MarketSide::B => MarketSide::A,
        }
    }
}

/// One outcome (e.g. "Player X Over/Under 4.5") with every book's quotes on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub market_id: String,
    pub description: String,
    pub side_a: String,
    pub side_b: String,
    pub quotes: Vec<Quote>,
}

impl Market {
    pub fn new(
        market_id: impl Into<String>,
        description: impl Into<String>,
        side_a: impl Into<String>,
        side_b: impl Into<String>,
    ) -> Self {
        Self {
            market_id: market_id.into(),
            description: description.into(),
            side_a: side_a.into(),
            side_b: side_b.into(),
            quotes: Vec::new(),
        }
    }

    pub fn with_quote(mut self, bookmaker: &str, side: &str, odds: AmericanOdds) -> Self {
        self.quotes.push(Quote::new(bookmaker, side, odds));
        self
    }

    /// Resolve a quote's side label against this market's two sides.
    pub fn side_of(&self, quote: &Quote) -> Option<MarketSide> {
        if quote.side.eq_ignore_ascii_case(&self.side_a) {
            Some(MarketSide::A)
        } else if quote.side.eq_ignore_ascii_case(&self.side_b) {
            Some(MarketSide::B)
        } else {
            None
        }
    }

    pub fn side_label(&self, side: MarketSide) -> &str {
        match side {
            MarketSide::A => &self.side_a,
            MarketSide::B => &self.side_b,
        }
    }

    /// One pair per bookmaker that quoted both sides, in first-seen order.
    /// A later quote from the same book for the same side replaces the earlier one.
    pub fn pairs(&self) -> Vec<OutcomePair> {
        let mut books: Vec<(&str, Option<&Quote>, Option<&Quote>)> = Vec::new();
        for quote in &self.quotes {
            let Some(side) = self.side_of(quote) else {
                continue;
            };
            let existing = books
                .iter()
                .position(|(b, _, _)| b.eq_ignore_ascii_case(&quote.bookmaker));
            let idx = match existing {
                Some(idx) => idx,
                None => {
                    books.push((quote.bookmaker.as_str(), None, None));
                    books.len() - 1
                }
            };
            match side {
                MarketSide::A => books[idx].1 = Some(quote),
                MarketSide::B => books[idx].2 = Some(quote),
            }
        }

        books
            .into_iter()
            .filter_map(|(_, a, b)| match (a, b) {
                (Some(a), Some(b)) => OutcomePair::new(a.clone(), b.clone()).ok(),
                _ => None,
            })
            .collect()
    }

    /// All quotes for one side, across every book.
    pub fn quotes_for(&self, side: MarketSide) -> impl Iterator<Item = &Quote> + '_ {
        self.quotes
            .iter()
            .filter(move |q| self.side_of(q) == Some(side))
    }
}

/// No-margin price for one side, derived from a reference book's pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairPrice {
    pub side: String,
    pub fair_odds: AmericanOdds,
    pub fair_probability: f64,
    /// Reference book whose pair produced this estimate
    pub anchor_book: String,
    /// Anchor book's margin (sum of implied probabilities minus one)
    pub margin: f64,
}

/// Fair prices for both sides of a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairMarket {
    pub side_a: FairPrice,
    pub side_b: FairPrice,
}

impl FairMarket {
    pub fn side(&self, side: MarketSide) -> &FairPrice {
        match side {
            MarketSide::A => &self.side_a,
            MarketSide::B => &self.side_b,
        }
    }
}

/// Coarse EV bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvClass {
    Negative,
    Neutral,
    Positive,
    High,
    Excellent,
}

impl fmt::Display for EvClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvClass::Negative => write!(f, "negative"),
            EvClass::Neutral => write!(f, "neutral"),
            EvClass::Positive => write!(f, "positive"),
            EvClass::High => write!(f, "high"),
            EvClass::Excellent => write!(f, "excellent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvResult {
    pub side: String,
    pub best_quote: Quote,
    pub fair_probability: f64,
    /// Expected value as a percentage of stake (may be negative)
    pub ev_pct: f64,
    pub class: EvClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostingRecommendation {
    pub fair_odds: AmericanOdds,
    pub target_ev: f64,
    pub commission_rate: f64,
    pub recommended_odds: AmericanOdds,
}

/// Everything computed for one side of one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub market_id: String,
    pub description: String,
    pub fair: FairPrice,
    pub ev: EvResult,
    pub posting: Option<PostingRecommendation>,
    pub computed_at: DateTime<Utc>,
}

/// Presentation projection of an [`Opportunity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityView {
    pub market_id: String,
    pub description: String,
    pub side: String,
    pub book: String,
    pub odds: String,
    pub fair_odds: String,
    pub fair_probability: Decimal,
    pub anchor_book: String,
    pub ev_pct: Decimal,
    pub ev_label: String,
    pub class: EvClass,
    pub posting_odds: Option<String>,
    pub computed_at: DateTime<Utc>,
}

/// Round an f64 for display; non-finite values collapse to zero.
pub fn round_for_display(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(dp)
}

impl From<&Opportunity> for OpportunityView {
    fn from(opp: &Opportunity) -> Self {
        let ev_pct = round_for_display(opp.ev.ev_pct, 2);
        let ev_label = if ev_pct.is_sign_negative() && !ev_pct.is_zero() {
            format!("{:.2}%", ev_pct)
        } else {
            format!("+{:.2}%", ev_pct)
        };
        Self {
            market_id: opp.market_id.clone(),
            description: opp.description.clone(),
            side: opp.ev.side.clone(),
            book: opp.ev.best_quote.bookmaker.clone(),
            odds: opp.ev.best_quote.odds.to_string(),
            fair_odds: opp.fair.fair_odds.to_string(),
            fair_probability: round_for_display(opp.fair.fair_probability, 4),
            anchor_book: opp.fair.anchor_book.clone(),
            ev_pct,
            ev_label,
            class: opp.ev.class,
            posting_odds: opp.posting.map(|p| p.recommended_odds.to_string()),
            computed_at: opp.computed_at,
        }
    }
}
