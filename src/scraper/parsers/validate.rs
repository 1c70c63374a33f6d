//! Match validator: turns a parsed fragment into a structured doubles match
//! or says why it was dropped.

use tracing::debug;

use super::fragment::{Outcome, ParsedMatch};
use super::ratings::{corroborates, reconcile, RatingLayout};
use super::scores::decompose_games;
use crate::types::StructuredMatch;

/// Why a fragment produced no match. Drops are expected and only counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Fewer than two other participants: a singles match.
    Singles,
    /// No win/loss marker, or no complete first game.
    NoScore,
    /// Rating tokens could not be reconciled.
    Ratings(RatingLayout),
}

/// Validate and structure one parsed fragment for `subject` (the scraped
/// player, always team 1 player 1).
pub fn validate(parsed: &ParsedMatch, subject: &str) -> Result<StructuredMatch, Rejection> {
    if parsed.participant_names.len() < 2 {
        return Err(Rejection::Singles);
    }

    let games = parsed
        .score_digits()
        .map(decompose_games)
        .ok_or(Rejection::NoScore)?;
    if games[0].is_none() {
        return Err(Rejection::NoScore);
    }

    let reconciled = reconcile(&parsed.ratings).map_err(Rejection::Ratings)?;
    let result = match &parsed.outcome {
        Outcome::Win { games_won, .. } => format!("Win ({} games won)", games_won),
        _ => "Loss".to_string(),
    };
    debug!(
        "{} on {:?}: {} games, {:?} layout",
        result,
        parsed.date,
        games.iter().flatten().count(),
        reconciled.layout
    );
    if !corroborates(&reconciled.triples, &parsed.changes) {
        debug!(
            "Decrease tokens {:?} not among reconciled changes ({:?} layout)",
            parsed.changes, reconciled.layout
        );
    }

    let name = |i: usize| parsed.participant_names.get(i).cloned();
    let [t1p1, t1p2, t2p1, t2p2] = reconciled.triples;

    Ok(StructuredMatch {
        date: parsed.date,
        team1_player1_name: Some(subject.to_string()),
        team1_player2_name: name(0),
        team2_player1_name: name(1),
        team2_player2_name: name(2),
        team1_player1: t1p1,
        team1_player2: t1p2,
        team2_player1: t2p1,
        team2_player2: t2p2,
        games,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameScore;
    use chrono::NaiveDate;

    fn parsed(names: &[&str], ratings: Vec<f64>, outcome: Outcome) -> ParsedMatch {
        ParsedMatch {
            date: NaiveDate::from_ymd_opt(2024, 12, 12),
            ratings,
            changes: Vec::new(),
            participant_names: names.iter().map(|s| s.to_string()).collect(),
            outcome,
        }
    }

    fn full_ratings() -> Vec<f64> {
        vec![
            4.0, 0.05, 4.05, 4.1, -0.02, 4.08, 3.9, 0.01, 3.91, 4.2, -0.03, 4.17,
        ]
    }

    fn win(digits: &str) -> Outcome {
        Outcome::Win {
            games_won: 1,
            digits: digits.to_string(),
        }
    }

    #[test]
    fn test_valid_doubles_match() {
        let p = parsed(&["Megan Fox", "Ann Lee", "Bo Kim"], full_ratings(), win("119116"));
        let m = validate(&p, "Jessica Wang").unwrap();

        assert_eq!(m.team1_player1_name.as_deref(), Some("Jessica Wang"));
        assert_eq!(m.team1_player2_name.as_deref(), Some("Megan Fox"));
        assert_eq!(m.team2_player1_name.as_deref(), Some("Ann Lee"));
        assert_eq!(m.team2_player2_name.as_deref(), Some("Bo Kim"));
        assert_eq!(m.games[0], Some(GameScore { team: 11, opponent: 9 }));
        assert_eq!(m.games[1], Some(GameScore { team: 11, opponent: 6 }));
        assert_eq!(m.games[2], None);
        assert_eq!(m.team2_player2.after, 4.17);
    }

    #[test]
    fn test_two_names_is_enough() {
        let p = parsed(&["Megan Fox", "Ann Lee"], full_ratings(), win("116"));
        let m = validate(&p, "Jessica Wang").unwrap();
        assert_eq!(m.team2_player2_name, None);
    }

    #[test]
    fn test_singles_always_rejected() {
        let p = parsed(&["Megan Fox"], full_ratings(), win("116"));
        assert_eq!(validate(&p, "Jessica Wang"), Err(Rejection::Singles));

        let p = parsed(&[], full_ratings(), win("116"));
        assert_eq!(validate(&p, "Jessica Wang"), Err(Rejection::Singles));
    }

    #[test]
    fn test_missing_score_rejected() {
        let p = parsed(&["Megan Fox", "Ann Lee"], full_ratings(), Outcome::Unknown);
        assert_eq!(validate(&p, "Jessica Wang"), Err(Rejection::NoScore));

        let p = parsed(&["Megan Fox", "Ann Lee"], full_ratings(), win("7"));
        assert_eq!(validate(&p, "Jessica Wang"), Err(Rejection::NoScore));
    }

    #[test]
    fn test_insufficient_ratings_rejected() {
        let p = parsed(&["Megan Fox", "Ann Lee"], vec![4.0, 4.0, 4.1], win("116"));
        assert_eq!(
            validate(&p, "Jessica Wang"),
            Err(Rejection::Ratings(RatingLayout::Insufficient))
        );
    }
}
