//! Append-only CSV store for one player's matches.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::schema::{to_frame, COLUMNS};
use crate::types::StructuredMatch;

/// Destination for matches as pages are scraped.
pub trait MatchSink {
    fn push_matches(&mut self, matches: &[StructuredMatch]) -> Result<()>;
}

impl MatchSink for Vec<StructuredMatch> {
    fn push_matches(&mut self, matches: &[StructuredMatch]) -> Result<()> {
        self.extend_from_slice(matches);
        Ok(())
    }
}

/// CSV file of matches. Every append is flushed before returning, so rows
/// survive the process being killed later.
#[derive(Debug, Clone)]
pub struct MatchRepository {
    path: PathBuf,
}

impl MatchRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove any previous output at this destination.
    pub fn reset(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Append rows, writing the header only when the file is new or empty.
    pub fn append_matches(&self, matches: &[StructuredMatch]) -> Result<()> {
        if matches.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let include_header = file.metadata()?.len() == 0;

        let mut df = to_frame(matches)?;
        CsvWriter::new(&mut file)
            .include_header(include_header)
            .finish(&mut df)?;
        file.sync_data()?;

        Ok(())
    }

    /// Number of rows currently persisted; 0 when nothing was written.
    pub fn match_count(&self) -> Result<usize> {
        if !self.path.exists() || fs::metadata(&self.path)?.len() == 0 {
            return Ok(0);
        }

        let read = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(self.path.clone()))
            .and_then(|reader| reader.finish());

        match read {
            Ok(df) => {
                if df.width() != COLUMNS.len() {
                    warn!(
                        "{} has {} columns, expected {}",
                        self.path.display(),
                        df.width(),
                        COLUMNS.len()
                    );
                }
                Ok(df.height())
            }
            Err(e) => {
                // A job killed mid-write can leave a ragged last line
                warn!(
                    "Could not read {} as CSV ({}), counting lines",
                    self.path.display(),
                    e
                );
                let content = fs::read_to_string(&self.path)?;
                Ok(content.lines().filter(|l| !l.trim().is_empty()).count().saturating_sub(1))
            }
        }
    }
}

impl MatchSink for MatchRepository {
    fn push_matches(&mut self, matches: &[StructuredMatch]) -> Result<()> {
        self.append_matches(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GameScore, RatingTriple};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sample(day: u32, games: usize) -> StructuredMatch {
        let t = RatingTriple {
            before: 4.0,
            change: 0.05,
            after: 4.05,
        };
        let mut scores = [None; 3];
        for g in scores.iter_mut().take(games) {
            *g = Some(GameScore { team: 11, opponent: 7 });
        }
        StructuredMatch {
            date: NaiveDate::from_ymd_opt(2024, 12, day),
            team1_player1_name: Some("Jessica Wang".to_string()),
            team1_player2_name: Some("Megan Fox".to_string()),
            team2_player1_name: Some("Ann Lee".to_string()),
            team2_player2_name: None,
            team1_player1: t,
            team1_player2: t,
            team2_player1: t,
            team2_player2: t,
            games: scores,
        }
    }

    #[test]
    fn test_missing_file_counts_zero() {
        let dir = tempdir().unwrap();
        let repo = MatchRepository::new(dir.path().join("none.csv"));
        assert_eq!(repo.match_count().unwrap(), 0);
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempdir().unwrap();
        let repo = MatchRepository::new(dir.path().join("nested/player.csv"));

        repo.append_matches(&[sample(1, 1), sample(2, 2)]).unwrap();
        repo.append_matches(&[sample(3, 3)]).unwrap();

        let content = fs::read_to_string(repo.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], COLUMNS.join(","));
        assert!(lines[1].starts_with("2024-12-01,Jessica Wang,Megan Fox,Ann Lee,,"));
        assert_eq!(content.matches("team1_player1_name").count(), 1);

        assert_eq!(repo.match_count().unwrap(), 3);
    }

    #[test]
    fn test_empty_append_creates_nothing() {
        let dir = tempdir().unwrap();
        let repo = MatchRepository::new(dir.path().join("player.csv"));
        repo.append_matches(&[]).unwrap();
        assert!(!repo.path().exists());
    }

    #[test]
    fn test_reset_removes_previous_output() {
        let dir = tempdir().unwrap();
        let repo = MatchRepository::new(dir.path().join("player.csv"));
        repo.append_matches(&[sample(1, 1)]).unwrap();
        assert_eq!(repo.match_count().unwrap(), 1);

        repo.reset().unwrap();
        assert_eq!(repo.match_count().unwrap(), 0);
        repo.reset().unwrap();
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<StructuredMatch> = Vec::new();
        sink.push_matches(&[sample(1, 1)]).unwrap();
        sink.push_matches(&[sample(2, 1), sample(3, 1)]).unwrap();
        assert_eq!(sink.len(), 3);
    }
}
