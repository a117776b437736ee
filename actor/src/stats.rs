//! Self-play statistics tracking and persistence.
//!
//! This module tracks, across a run:
//! - Game counts and outcomes per seat
//! - Game lengths (average and 20th/80th percentiles)
//! - Decision timing per seat and accumulated MCTS search statistics
//!
//! Stats are written to a JSON file so a run can be monitored from outside.

use engine_core::{Outcome, PlayerId};
use mcts::SearchStats;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Result of one finished game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameRecord {
    /// `None` when the game stopped at the turn cap
    pub outcome: Option<Outcome>,
    pub turns: u32,
    /// Seat that conceded after its agent failed
    pub conceded: Option<PlayerId>,
    /// Decision wall-clock time per seat
    pub decision_time: [Duration; 2],
    pub decisions: [u32; 2],
}

/// Aggregated statistics for a self-play run.
#[derive(Debug)]
pub struct SelfPlayStats {
    agents: [String; 2],
    player1_wins: u32,
    player2_wins: u32,
    draws: u32,
    /// Games discarded for hitting the turn cap
    invalid_games: u32,
    concessions: u32,
    /// Lengths of every counted game
    turns: Vec<u32>,
    decision_time: [Duration; 2],
    decisions: [u64; 2],
    search: [Option<SearchStats>; 2],
    start_time: Instant,
    stats_path: PathBuf,
}

/// Serializable stats for JSON output.
#[derive(Debug, Serialize)]
pub struct SelfPlayStatsSnapshot {
    pub player1: String,
    pub player2: String,
    pub games_played: u32,
    pub player1_wins: u32,
    pub player2_wins: u32,
    pub draws: u32,
    pub invalid_games: u32,
    pub concessions: u32,
    pub total_turns: u64,
    pub avg_turns: f64,
    pub turns_p20: u32,
    pub turns_p80: u32,
    pub player1_avg_decision_ms: f64,
    pub player2_avg_decision_ms: f64,
    pub games_per_second: f64,
    pub runtime_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player1_search: Option<SearchStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player2_search: Option<SearchStats>,
    pub timestamp: u64,
}

impl SelfPlayStats {
    /// Create new stats tracker writing to `stats_path`.
    pub fn new(stats_path: impl Into<PathBuf>, agents: [String; 2]) -> Self {
        let stats_path = stats_path.into();

        // Ensure data directory exists
        if let Some(dir) = stats_path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!("Failed to create data directory: {}", e);
            }
        }

        Self {
            agents,
            player1_wins: 0,
            player2_wins: 0,
            draws: 0,
            invalid_games: 0,
            concessions: 0,
            turns: Vec::new(),
            decision_time: [Duration::ZERO; 2],
            decisions: [0; 2],
            search: [None, None],
            start_time: Instant::now(),
            stats_path,
        }
    }

    /// Record a counted game. A game without an outcome counts as a draw.
    pub fn record_game(&mut self, record: &GameRecord) {
        match record.outcome {
            Some(Outcome::Won(PlayerId::One)) => self.player1_wins += 1,
            Some(Outcome::Won(PlayerId::Two)) => self.player2_wins += 1,
            Some(Outcome::Draw) | None => self.draws += 1,
        }
        if record.conceded.is_some() {
            self.concessions += 1;
        }

        self.turns.push(record.turns);
        for seat in 0..2 {
            self.decision_time[seat] += record.decision_time[seat];
            self.decisions[seat] += record.decisions[seat] as u64;
        }
    }

    /// Record a game discarded for hitting the turn cap.
    pub fn record_invalid(&mut self) {
        self.invalid_games += 1;
    }

    /// Replace the accumulated search statistics of one seat.
    pub fn set_search_stats(&mut self, seat: PlayerId, stats: Option<&SearchStats>) {
        self.search[seat.index()] = stats.cloned();
    }

    pub fn games_played(&self) -> u32 {
        self.turns.len() as u32
    }

    pub fn invalid_games(&self) -> u32 {
        self.invalid_games
    }

    /// Get a snapshot of current stats.
    pub fn snapshot(&self) -> SelfPlayStatsSnapshot {
        let games = self.games_played();
        let runtime = self.start_time.elapsed().as_secs_f64();
        let total_turns: u64 = self.turns.iter().map(|&t| t as u64).sum();

        let avg_turns = if games > 0 {
            total_turns as f64 / games as f64
        } else {
            0.0
        };

        let games_per_second = if runtime > 0.0 {
            games as f64 / runtime
        } else {
            0.0
        };

        let mut sorted = self.turns.clone();
        sorted.sort_unstable();

        let avg_decision_ms = |seat: usize| {
            if self.decisions[seat] > 0 {
                self.decision_time[seat].as_secs_f64() * 1000.0 / self.decisions[seat] as f64
            } else {
                0.0
            }
        };

        SelfPlayStatsSnapshot {
            player1: self.agents[0].clone(),
            player2: self.agents[1].clone(),
            games_played: games,
            player1_wins: self.player1_wins,
            player2_wins: self.player2_wins,
            draws: self.draws,
            invalid_games: self.invalid_games,
            concessions: self.concessions,
            total_turns,
            avg_turns,
            turns_p20: percentile(&sorted, 20),
            turns_p80: percentile(&sorted, 80),
            player1_avg_decision_ms: avg_decision_ms(0),
            player2_avg_decision_ms: avg_decision_ms(1),
            games_per_second,
            runtime_seconds: runtime,
            player1_search: self.search[0].clone(),
            player2_search: self.search[1].clone(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Write stats to JSON file (atomic write-then-rename).
    pub fn write_stats(&self) {
        let snapshot = self.snapshot();

        let json = match serde_json::to_string_pretty(&snapshot) {
            Ok(j) => j,
            Err(e) => {
                warn!("Failed to serialize self-play stats: {}", e);
                return;
            }
        };

        // Write to temp file then rename (atomic on most filesystems)
        let temp_path = self.stats_path.with_extension("json.tmp");
        match fs::File::create(&temp_path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(json.as_bytes()) {
                    warn!("Failed to write self-play stats: {}", e);
                    return;
                }
            }
            Err(e) => {
                warn!("Failed to create temp stats file: {}", e);
                return;
            }
        }

        if let Err(e) = fs::rename(&temp_path, &self.stats_path) {
            warn!("Failed to rename stats file: {}", e);
            let _ = fs::remove_file(&temp_path);
            return;
        }

        debug!("Wrote self-play stats to {}", self.stats_path.display());
    }

    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }
}

/// Element at `len * percent / 100` of an ascending slice; 0 when empty.
fn percentile(sorted: &[u32], percent: usize) -> u32 {
    if sorted.is_empty() {
        return 0;
    }
    let index = sorted.len() * percent / 100;
    sorted[index.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tracker(dir: &Path) -> SelfPlayStats {
        SelfPlayStats::new(
            dir.join("selfplay_stats.json"),
            ["mcts".into(), "random".into()],
        )
    }

    fn game(outcome: Option<Outcome>, turns: u32) -> GameRecord {
        GameRecord {
            outcome,
            turns,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_games() {
        let dir = tempdir().unwrap();
        let mut stats = tracker(dir.path());

        stats.record_game(&game(Some(Outcome::Won(PlayerId::One)), 20));
        stats.record_game(&game(Some(Outcome::Won(PlayerId::Two)), 24));
        stats.record_game(&game(Some(Outcome::Draw), 30));
        stats.record_game(&game(None, 50));
        stats.record_invalid();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.games_played, 4);
        assert_eq!(snapshot.player1_wins, 1);
        assert_eq!(snapshot.player2_wins, 1);
        assert_eq!(snapshot.draws, 2);
        assert_eq!(snapshot.invalid_games, 1);
        assert_eq!(snapshot.total_turns, 124);
        assert_eq!(snapshot.avg_turns, 31.0);
    }

    #[test]
    fn test_turn_percentiles() {
        let dir = tempdir().unwrap();
        let mut stats = tracker(dir.path());
        for turns in [50, 10, 40, 20, 30, 60] {
            stats.record_game(&game(Some(Outcome::Won(PlayerId::One)), turns));
        }

        let snapshot = stats.snapshot();
        // Sorted: 10 20 30 40 50 60; indices 6/5 = 1 and 24/5 = 4
        assert_eq!(snapshot.turns_p20, 20);
        assert_eq!(snapshot.turns_p80, 50);
    }

    #[test]
    fn test_percentile_indexes_len_fifths() {
        let five = [10, 20, 30, 40, 50];
        assert_eq!(percentile(&five, 20), 20);
        assert_eq!(percentile(&five, 80), 50);

        let eleven: Vec<u32> = (0..11).collect();
        assert_eq!(percentile(&eleven, 20), 2);
        assert_eq!(percentile(&eleven, 80), 8);
    }

    #[test]
    fn test_percentile_edges() {
        assert_eq!(percentile(&[], 50), 0);
        assert_eq!(percentile(&[7], 20), 7);
        assert_eq!(percentile(&[1, 2], 100), 2);
    }

    #[test]
    fn test_decision_time_per_seat() {
        let dir = tempdir().unwrap();
        let mut stats = tracker(dir.path());
        stats.record_game(&GameRecord {
            outcome: Some(Outcome::Won(PlayerId::Two)),
            turns: 10,
            conceded: Some(PlayerId::One),
            decision_time: [Duration::from_millis(40), Duration::from_millis(5)],
            decisions: [4, 5],
        });

        let snapshot = stats.snapshot();
        assert!((snapshot.player1_avg_decision_ms - 10.0).abs() < 1e-9);
        assert!((snapshot.player2_avg_decision_ms - 1.0).abs() < 1e-9);
        assert_eq!(snapshot.concessions, 1);
    }

    #[test]
    fn test_average_with_zero_games() {
        let dir = tempdir().unwrap();
        let stats = tracker(dir.path());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.games_played, 0);
        assert_eq!(snapshot.avg_turns, 0.0);
        assert!(!snapshot.avg_turns.is_nan());
        assert_eq!(snapshot.player1_avg_decision_ms, 0.0);
        assert_eq!(snapshot.turns_p80, 0);
    }

    #[test]
    fn test_write_stats() {
        let dir = tempdir().unwrap();
        let mut stats = tracker(dir.path());

        stats.record_game(&game(Some(Outcome::Won(PlayerId::One)), 18));
        stats.set_search_stats(
            PlayerId::One,
            Some(&SearchStats {
                evaluations: 12,
                ..Default::default()
            }),
        );
        stats.write_stats();

        let path = stats.stats_path();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let content = fs::read_to_string(path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["games_played"], 1);
        assert_eq!(parsed["player1"], "mcts");
        assert_eq!(parsed["player1_search"]["evaluations"], 12);
        assert!(parsed.get("player2_search").is_none());
    }

    #[test]
    fn test_write_stats_creates_data_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("data");
        let stats = tracker(&nested);

        stats.write_stats();
        assert!(nested.join("selfplay_stats.json").exists());
    }
}
