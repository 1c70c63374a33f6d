//! CSV layout for persisted matches.
//!
//! One row per match. Rating columns follow slot order team1_player1,
//! team1_player2, team2_player1, team2_player2.

use polars::prelude::*;

use crate::types::{GameScore, RatingTriple, StructuredMatch};

/// Column names in file order.
pub const COLUMNS: [&str; 23] = [
    "date",
    "team1_player1_name",
    "team1_player2_name",
    "team2_player1_name",
    "team2_player2_name",
    "team1_player1_rating_before",
    "team1_player1_rating_change",
    "team1_player1_rating_after",
    "team1_player2_rating_before",
    "team1_player2_rating_change",
    "team1_player2_rating_after",
    "team2_player1_rating_before",
    "team2_player1_rating_change",
    "team2_player1_rating_after",
    "team2_player2_rating_before",
    "team2_player2_rating_change",
    "team2_player2_rating_after",
    "game1_team1_score",
    "game1_team2_score",
    "game2_team1_score",
    "game2_team2_score",
    "game3_team1_score",
    "game3_team2_score",
];

fn names(matches: &[StructuredMatch], get: fn(&StructuredMatch) -> &Option<String>) -> Vec<Option<String>> {
    matches.iter().map(|m| get(m).clone()).collect()
}

fn ratings(
    matches: &[StructuredMatch],
    slot: fn(&StructuredMatch) -> &RatingTriple,
    field: fn(&RatingTriple) -> f64,
) -> Vec<f64> {
    matches.iter().map(|m| field(slot(m))).collect()
}

fn scores(matches: &[StructuredMatch], game: usize, side: fn(&GameScore) -> u32) -> Vec<Option<i64>> {
    matches
        .iter()
        .map(|m| m.games[game].as_ref().map(|g| i64::from(side(g))))
        .collect()
}

fn t1p1(m: &StructuredMatch) -> &RatingTriple {
    &m.team1_player1
}

fn t1p2(m: &StructuredMatch) -> &RatingTriple {
    &m.team1_player2
}

fn t2p1(m: &StructuredMatch) -> &RatingTriple {
    &m.team2_player1
}

fn t2p2(m: &StructuredMatch) -> &RatingTriple {
    &m.team2_player2
}

fn before(t: &RatingTriple) -> f64 {
    t.before
}

fn change(t: &RatingTriple) -> f64 {
    t.change
}

fn after(t: &RatingTriple) -> f64 {
    t.after
}

fn team(g: &GameScore) -> u32 {
    g.team
}

fn opponent(g: &GameScore) -> u32 {
    g.opponent
}

/// Build a frame with [`COLUMNS`] from matches.
pub fn to_frame(matches: &[StructuredMatch]) -> PolarsResult<DataFrame> {
    let dates: Vec<Option<String>> = matches
        .iter()
        .map(|m| m.date.map(|d| d.format("%Y-%m-%d").to_string()))
        .collect();

    df!(
        "date" => dates,
        "team1_player1_name" => names(matches, |m| &m.team1_player1_name),
        "team1_player2_name" => names(matches, |m| &m.team1_player2_name),
        "team2_player1_name" => names(matches, |m| &m.team2_player1_name),
        "team2_player2_name" => names(matches, |m| &m.team2_player2_name),
        "team1_player1_rating_before" => ratings(matches, t1p1, before),
        "team1_player1_rating_change" => ratings(matches, t1p1, change),
        "team1_player1_rating_after" => ratings(matches, t1p1, after),
        "team1_player2_rating_before" => ratings(matches, t1p2, before),
        "team1_player2_rating_change" => ratings(matches, t1p2, change),
        "team1_player2_rating_after" => ratings(matches, t1p2, after),
        "team2_player1_rating_before" => ratings(matches, t2p1, before),
        "team2_player1_rating_change" => ratings(matches, t2p1, change),
        "team2_player1_rating_after" => ratings(matches, t2p1, after),
        "team2_player2_rating_before" => ratings(matches, t2p2, before),
        "team2_player2_rating_change" => ratings(matches, t2p2, change),
        "team2_player2_rating_after" => ratings(matches, t2p2, after),
        "game1_team1_score" => scores(matches, 0, team),
        "game1_team2_score" => scores(matches, 0, opponent),
        "game2_team1_score" => scores(matches, 1, team),
        "game2_team2_score" => scores(matches, 1, opponent),
        "game3_team1_score" => scores(matches, 2, team),
        "game3_team2_score" => scores(matches, 2, opponent)
    )
}
