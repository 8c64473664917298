//! Fair odds from a fixed set of reference ("sharp") books.
//!
//! For each side we take the reference book paying the most on that side and
//! devig that book's own two-way price. That gives two estimates per side (one
//! anchored on each side's best book); the one implying the lower win
//! probability for the side being priced is kept.

use tracing::debug;

use super::normalizer::{devig_odds, implied_probability, to_american_odds, DevigQuote};
use crate::error::{OddsError, OddsResult};
use crate::types::{FairMarket, FairPrice, MarketSide, OutcomePair, Quote};

/// Default minimum number of reference books that must quote both sides.
pub const DEFAULT_MIN_BOOKS: usize = 2;

/// A reference book's pair, oriented to the market's side A / side B.
#[derive(Debug, Clone, Copy)]
struct Anchor<'a> {
    book: &'a str,
    a: &'a Quote,
    b: &'a Quote,
}

impl<'a> Anchor<'a> {
    fn quote(&self, side: MarketSide) -> &'a Quote {
        match side {
            MarketSide::A => self.a,
            MarketSide::B => self.b,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FairOddsEngine {
    /// Reference books in priority order; earlier books win payout ties
    reference_books: Vec<String>,
    min_books: usize,
}

impl FairOddsEngine {
    pub fn new(reference_books: Vec<String>, min_books: usize) -> Self {
        Self {
            reference_books: reference_books
                .into_iter()
                .map(|b| b.trim().to_ascii_lowercase())
                .collect(),
            min_books: min_books.max(1),
        }
    }

    pub fn reference_books(&self) -> &[String] {
        &self.reference_books
    }

    pub fn min_books(&self) -> usize {
        self.min_books
    }

    fn priority(&self, book: &str) -> Option<usize> {
        self.reference_books
            .iter()
            .position(|b| b.eq_ignore_ascii_case(book))
    }

    /// Reference-book pairs, oriented so `a` carries `side_a` and `b` carries
    /// `side_b`, one per book, ordered by allow-list priority. Pairs quoting any
    /// other labels belong to a different market and are skipped.
    fn anchors<'a>(
        &self,
        pairs: &'a [OutcomePair],
        side_a: &str,
        side_b: &str,
    ) -> Vec<(usize, Anchor<'a>)> {
        let mut anchors: Vec<(usize, Anchor<'a>)> = Vec::new();
        for pair in pairs {
            let Some(priority) = self.priority(pair.bookmaker()) else {
                continue;
            };
            if anchors.iter().any(|(p, _)| *p == priority) {
                continue;
            }
            let (first, second) = (&pair.side_a().side, &pair.side_b().side);
            let (a, b) = if first.eq_ignore_ascii_case(side_a) && second.eq_ignore_ascii_case(side_b)
            {
                (pair.side_a(), pair.side_b())
            } else if second.eq_ignore_ascii_case(side_a) && first.eq_ignore_ascii_case(side_b) {
                (pair.side_b(), pair.side_a())
            } else {
                debug!(
                    book = pair.bookmaker(),
                    expected = %format!("{side_a}/{side_b}"),
                    got = %format!("{first}/{second}"),
                    "pair does not quote this market's sides, skipping"
                );
                continue;
            };
            anchors.push((
                priority,
                Anchor {
                    book: pair.bookmaker(),
                    a,
                    b,
                },
            ));
        }
        anchors.sort_by_key(|(p, _)| *p);
        anchors
    }

    /// Best-paying reference book for `side`: lowest implied probability.
    fn best_for<'a>(anchors: &[(usize, Anchor<'a>)], side: MarketSide) -> Option<Anchor<'a>> {
        anchors
            .iter()
            .map(|(_, anchor)| *anchor)
            .min_by(|x, y| {
                implied_probability(x.quote(side).odds)
                    .total_cmp(&implied_probability(y.quote(side).odds))
            })
    }

    /// Fair prices for both sides of one market.
    ///
    /// Side A's label is taken from the first pair given; the other pairs may
    /// list their quotes in either order.
    pub fn fair_prices(&self, pairs: &[OutcomePair]) -> OddsResult<FairMarket> {
        let Some(first) = pairs.iter().find(|p| self.priority(p.bookmaker()).is_some()) else {
            return Err(OddsError::InsufficientMarketDepth {
                found: 0,
                required: self.min_books,
            });
        };
        let side_a_label = first.side_a().side.clone();
        let side_b_label = first.side_b().side.clone();

        let anchors = self.anchors(pairs, &side_a_label, &side_b_label);
        if anchors.len() < self.min_books {
            return Err(OddsError::InsufficientMarketDepth {
                found: anchors.len(),
                required: self.min_books,
            });
        }

        let (Some(best_a), Some(best_b)) = (
            Self::best_for(&anchors, MarketSide::A),
            Self::best_for(&anchors, MarketSide::B),
        ) else {
            return Err(OddsError::InsufficientMarketDepth {
                found: 0,
                required: self.min_books,
            });
        };

        let devig_a = devig_odds(best_a.a.odds, best_a.b.odds)?;
        let devig_b = devig_odds(best_b.a.odds, best_b.b.odds)?;

        debug!(
            anchor_a = best_a.book,
            anchor_b = best_b.book,
            fair_a_from_a = devig_a.fair_a,
            fair_a_from_b = devig_b.fair_a,
            "devigged anchor pairs"
        );

        let side_a = conservative(
            side_a_label,
            (best_a.book, devig_a, devig_a.fair_a),
            (best_b.book, devig_b, devig_b.fair_a),
        )?;
        let side_b = conservative(
            side_b_label,
            (best_b.book, devig_b, devig_b.fair_b),
            (best_a.book, devig_a, devig_a.fair_b),
        )?;

        Ok(FairMarket { side_a, side_b })
    }
}

/// Pick the estimate with the lower win probability; ties keep the side's own anchor.
fn conservative(
    side: String,
    own: (&str, DevigQuote, f64),
    other: (&str, DevigQuote, f64),
) -> OddsResult<FairPrice> {
    let (book, devigged, probability) = if other.2 < own.2 { other } else { own };
    Ok(FairPrice {
        side,
        fair_odds: to_american_odds(probability)?,
        fair_probability: probability,
        anchor_book: book.to_string(),
        margin: devigged.margin(),
    })
}
