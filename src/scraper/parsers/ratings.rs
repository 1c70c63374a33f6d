//! Rating-triple reconciler.
//!
//! Each of the four players normally renders as `before, change, after`. The
//! page drops the change cell entirely when the change is zero, so a match can
//! yield anywhere from 8 to 12 rating tokens.

use crate::types::RatingTriple;

/// How a fragment's rating tokens were laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingLayout {
    /// Four full `(before, change, after)` triples.
    Full12,
    /// Four `(before, after)` pairs, change derived.
    Fallback8,
    /// A mix of triples and zero-change pairs (9-11 tokens).
    Mixed,
    /// Fewer than 8 tokens.
    Insufficient,
    /// Enough tokens, but they do not decode into four consistent slots.
    Unrecognized,
}

impl RatingLayout {
    /// Pick the layout from the token count alone.
    pub fn classify(count: usize) -> Self {
        match count {
            n if n >= 12 => RatingLayout::Full12,
            8 => RatingLayout::Fallback8,
            9..=11 => RatingLayout::Mixed,
            _ => RatingLayout::Insufficient,
        }
    }
}

/// Four rating triples in slot order, plus the layout they were read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub layout: RatingLayout,
    pub triples: [RatingTriple; 4],
}

/// Round to the platform's 3 decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// How far `before + change` may sit from `after`. Each cell is rounded to 3
/// decimals on its own, so the sum can be off by one unit in the last place.
const ROUNDING_SLACK: f64 = 0.001 + 1e-9;

fn same3(a: f64, b: f64) -> bool {
    (round3(a) - round3(b)).abs() < 0.0005
}

fn adds_up(before: f64, change: f64, after: f64) -> bool {
    (round3(before + change) - round3(after)).abs() <= ROUNDING_SLACK
}

fn triple(before: f64, change: f64, after: f64) -> RatingTriple {
    RatingTriple {
        before: round3(before),
        change: round3(change),
        after: round3(after),
    }
}

fn pair(before: f64, after: f64) -> RatingTriple {
    triple(before, after - before, after)
}

/// Reconcile a fragment's rating tokens into four triples.
///
/// On failure the returned layout says why the fragment was rejected.
pub fn reconcile(ratings: &[f64]) -> Result<Reconciled, RatingLayout> {
    let layout = RatingLayout::classify(ratings.len());

    let triples = match layout {
        RatingLayout::Full12 => read_full(ratings)?,
        RatingLayout::Fallback8 => [
            pair(ratings[0], ratings[1]),
            pair(ratings[2], ratings[3]),
            pair(ratings[4], ratings[5]),
            pair(ratings[6], ratings[7]),
        ],
        RatingLayout::Mixed => read_mixed(ratings)?,
        RatingLayout::Insufficient | RatingLayout::Unrecognized => return Err(layout),
    };

    Ok(Reconciled { layout, triples })
}

fn read_full(ratings: &[f64]) -> Result<[RatingTriple; 4], RatingLayout> {
    let mut triples = [RatingTriple::default(); 4];
    for (slot, chunk) in triples.iter_mut().zip(ratings.chunks_exact(3)) {
        // A triple that does not add up means the tokens were misaligned
        if !adds_up(chunk[0], chunk[1], chunk[2]) {
            return Err(RatingLayout::Unrecognized);
        }
        *slot = triple(chunk[0], chunk[1], chunk[2]);
    }
    Ok(triples)
}

/// Decode slot by slot: a triple when `before + change` matches `after`, a
/// zero-change pair when the next value repeats `before`. Every token must be
/// consumed by exactly four slots.
fn read_mixed(ratings: &[f64]) -> Result<[RatingTriple; 4], RatingLayout> {
    let mut triples = [RatingTriple::default(); 4];
    let mut i = 0;

    for slot in triples.iter_mut() {
        if i + 2 < ratings.len() && adds_up(ratings[i], ratings[i + 1], ratings[i + 2]) {
            *slot = triple(ratings[i], ratings[i + 1], ratings[i + 2]);
            i += 3;
        } else if i + 1 < ratings.len() && same3(ratings[i], ratings[i + 1]) {
            *slot = triple(ratings[i], 0.0, ratings[i + 1]);
            i += 2;
        } else {
            return Err(RatingLayout::Unrecognized);
        }
    }

    if i != ratings.len() {
        return Err(RatingLayout::Unrecognized);
    }
    Ok(triples)
}

/// Check that every decrease token found in the fragment shows up as one of
/// the reconciled changes.
pub fn corroborates(triples: &[RatingTriple; 4], decreases: &[f64]) -> bool {
    decreases
        .iter()
        .all(|d| triples.iter().any(|t| same3(t.change, *d)))
}
