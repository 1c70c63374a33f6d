//! Match records and batch job types shared across the scraper.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One player's rating state for a single match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RatingTriple {
    pub before: f64,
    pub change: f64,
    pub after: f64,
}

/// Score of a single game, always ordered (subject's team, opponents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    pub team: u32,
    pub opponent: u32,
}

/// A fully reconciled doubles match, the unit written to the output store.
///
/// `team1_player1` is always the scraped player; the remaining slots follow
/// fragment order (partner, then the two opponents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredMatch {
    pub date: Option<NaiveDate>,
    pub team1_player1_name: Option<String>,
    pub team1_player2_name: Option<String>,
    pub team2_player1_name: Option<String>,
    pub team2_player2_name: Option<String>,
    pub team1_player1: RatingTriple,
    pub team1_player2: RatingTriple,
    pub team2_player1: RatingTriple,
    pub team2_player2: RatingTriple,
    pub games: [Option<GameScore>; 3],
}

/// Final classification of one player job in a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Success,
    Partial,
    Timeout,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Success => "success",
            JobStatus::Partial => "partial",
            JobStatus::Timeout => "timeout",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One player's scrape job, finalized exactly once by the batch runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub url: String,
    pub output_path: String,
    pub timeout_seconds: u64,
    pub status: JobStatus,
    pub matches_recovered: usize,
    pub message: String,
}

/// Aggregate counts over a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub success: usize,
    pub partial: usize,
    pub failed: usize,
    pub total_matches: usize,
}

impl BatchSummary {
    /// Fold a finished job into the summary.
    ///
    /// A timed-out job that salvaged rows counts as partial, one that salvaged
    /// nothing counts as failed.
    pub fn record(&mut self, job: &BatchJob) {
        match job.status {
            JobStatus::Success => self.success += 1,
            JobStatus::Partial => self.partial += 1,
            JobStatus::Timeout if job.matches_recovered > 0 => self.partial += 1,
            JobStatus::Timeout | JobStatus::Failed => self.failed += 1,
        }
        self.total_matches += job.matches_recovered;
    }
}
