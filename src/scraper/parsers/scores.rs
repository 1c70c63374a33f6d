//! Score digit decomposer.
//!
//! The rendered score cells collapse into one run of digits such as `119116`
//! (11-9, 11-6). Games are played to 11 or 15 and can run past that on
//! extended play, so any two-digit value in `10..=20` is read as one score.

use crate::types::GameScore;

/// Maximum number of scores in a match: 3 games x 2 teams.
const MAX_SCORES: usize = 6;

/// Split a digit run into up to six scores, greedily from the left.
///
/// Missing trailing scores are `None`.
pub fn decompose_digits(digits: &str) -> [Option<u32>; MAX_SCORES] {
    let bytes = digits.as_bytes();
    let mut scores = [None; MAX_SCORES];
    let mut count = 0;
    let mut i = 0;

    while i < bytes.len() && count < MAX_SCORES {
        if !bytes[i].is_ascii_digit() {
            break;
        }

        if i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            let two = u32::from(bytes[i] - b'0') * 10 + u32::from(bytes[i + 1] - b'0');
            if (10..=20).contains(&two) {
                scores[count] = Some(two);
                count += 1;
                i += 2;
                continue;
            }
        }

        scores[count] = Some(u32::from(bytes[i] - b'0'));
        count += 1;
        i += 1;
    }

    scores
}

/// Decompose a digit run into per-game scores.
///
/// A game is present only when both of its scores are present.
pub fn decompose_games(digits: &str) -> [Option<GameScore>; 3] {
    let scores = decompose_digits(digits);
    let mut games = [None; 3];

    for (game, pair) in games.iter_mut().zip(scores.chunks(2)) {
        if let (Some(team), Some(opponent)) = (pair[0], pair[1]) {
            *game = Some(GameScore { team, opponent });
        }
    }

    games
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_game_win() {
        let games = decompose_games("116");
        assert_eq!(games[0], Some(GameScore { team: 11, opponent: 6 }));
        assert_eq!(games[1], None);
        assert_eq!(games[2], None);
    }

    #[test]
    fn test_single_game_loss() {
        let games = decompose_games("1416");
        assert_eq!(games[0], Some(GameScore { team: 14, opponent: 16 }));
        assert_eq!(games[1], None);
    }

    #[test]
    fn test_three_games() {
        let games = decompose_games("9111161311");
        assert_eq!(games[0], Some(GameScore { team: 9, opponent: 11 }));
        assert_eq!(games[1], Some(GameScore { team: 11, opponent: 6 }));
        assert_eq!(games[2], Some(GameScore { team: 13, opponent: 11 }));
    }

    #[test]
    fn test_extended_play_scores() {
        // 15-17, 20-18
        let games = decompose_games("15172018");
        assert_eq!(games[0], Some(GameScore { team: 15, opponent: 17 }));
        assert_eq!(games[1], Some(GameScore { team: 20, opponent: 18 }));
    }

    #[test]
    fn test_values_above_twenty_split() {
        // "21" is not a plausible score, so it reads as 2 then 1
        let scores = decompose_digits("21");
        assert_eq!(scores[0], Some(2));
        assert_eq!(scores[1], Some(1));
        assert_eq!(scores[2], None);
    }

    #[test]
    fn test_caps_at_six_scores() {
        let scores = decompose_digits("1191161149");
        assert_eq!(
            scores,
            [Some(11), Some(9), Some(11), Some(6), Some(11), Some(4)]
        );
    }

    #[test]
    fn test_unpaired_trailing_score_is_not_a_game() {
        let games = decompose_games("1191");
        assert_eq!(games[0], Some(GameScore { team: 11, opponent: 9 }));
        assert_eq!(games[1], None);
    }

    #[test]
    fn test_empty_digits() {
        assert_eq!(decompose_games(""), [None, None, None]);
    }
}
