//! Labelled training positions as CSV.
//!
//! Each row holds the 169 feature fields of one position followed by the
//! game label: `1` if player 1 won, `-1` otherwise. Positions are buffered
//! per game and only written once the game is counted.

use anyhow::{Context, Result};
use engine_core::{Outcome, PlayerId, Position};
use mcts::FeatureVector;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct TrainingExporter {
    writer: csv::Writer<File>,
    path: PathBuf,
    pending: Vec<FeatureVector>,
    rows_written: u64,
}

impl TrainingExporter {
    /// Open `path` for appending, creating it (and its directory) if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        Ok(Self {
            writer,
            path,
            pending: Vec::new(),
            rows_written: 0,
        })
    }

    /// Buffer a position of the current game.
    pub fn snapshot(&mut self, position: &Position) {
        self.pending.push(FeatureVector::encode(position));
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Label and write every buffered position. Returns the rows written.
    pub fn finish_game(&mut self, outcome: Option<Outcome>) -> Result<usize> {
        let label = label(outcome);
        let rows = self.pending.len();

        for features in self.pending.drain(..) {
            let record = features
                .as_slice()
                .iter()
                .map(|v| v.to_string())
                .chain(std::iter::once(label.to_string()));
            self.writer
                .write_record(record)
                .with_context(|| format!("writing {}", self.path.display()))?;
        }
        self.writer.flush()?;

        self.rows_written += rows as u64;
        debug!(rows, label, "Exported training positions");
        Ok(rows)
    }

    /// Drop the buffered positions of a game that is not counted.
    pub fn discard_game(&mut self) {
        self.pending.clear();
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn label(outcome: Option<Outcome>) -> i32 {
    match outcome {
        Some(Outcome::Won(PlayerId::One)) => 1,
        _ => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcts::FEATURE_COUNT;
    use tempfile::tempdir;

    fn position(turn: u32) -> Position {
        Position {
            turn,
            ..Default::default()
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<i32>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(|v| v.parse().unwrap()).collect())
            .collect()
    }

    #[test]
    fn test_rows_carry_features_and_label() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("training_data.csv");
        let mut exporter = TrainingExporter::open(&path).unwrap();

        exporter.snapshot(&position(5));
        exporter.snapshot(&position(9));
        assert_eq!(exporter.pending(), 2);
        assert_eq!(
            exporter
                .finish_game(Some(Outcome::Won(PlayerId::One)))
                .unwrap(),
            2
        );
        assert_eq!(exporter.pending(), 0);

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), FEATURE_COUNT + 1);
            assert_eq!(row[FEATURE_COUNT], 1);
        }
        assert_eq!(rows[0][0], 5);
        assert_eq!(rows[1][0], 9);
    }

    #[test]
    fn test_losses_draws_and_caps_label_negative() {
        assert_eq!(label(Some(Outcome::Won(PlayerId::One))), 1);
        assert_eq!(label(Some(Outcome::Won(PlayerId::Two))), -1);
        assert_eq!(label(Some(Outcome::Draw)), -1);
        assert_eq!(label(None), -1);
    }

    #[test]
    fn test_discarded_game_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("training_data.csv");
        let mut exporter = TrainingExporter::open(&path).unwrap();

        exporter.snapshot(&position(3));
        exporter.discard_game();
        assert_eq!(exporter.finish_game(None).unwrap(), 0);
        assert_eq!(exporter.rows_written(), 0);
        assert!(read_rows(&path).is_empty());
    }

    #[test]
    fn test_appends_across_runs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("training_data.csv");

        for turn in [2, 4] {
            let mut exporter = TrainingExporter::open(&path).unwrap();
            exporter.snapshot(&position(turn));
            exporter
                .finish_game(Some(Outcome::Won(PlayerId::Two)))
                .unwrap();
        }

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], 4);
        assert_eq!(rows[1][FEATURE_COUNT], -1);
    }
}
