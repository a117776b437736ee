//! Self-play game runner.

use anyhow::{anyhow, bail, Result};
use engine_core::{GameAction, GameState, Outcome, PlayerId};
use games_skirmish::SkirmishState;
use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::agent::{build_agent, connect_evaluator, Agent};
use crate::config::Config;
use crate::export::TrainingExporter;
use crate::stats::{GameRecord, SelfPlayStats, SelfPlayStatsSnapshot};

/// Give up when this many games per requested game hit the turn cap.
const MAX_INVALID_PER_GAME: u32 = 100;

/// Upper bound (exclusive) of the per-snapshot turn threshold.
const EXPORT_TURN_THRESHOLD: u32 = 20;

pub struct SelfPlay {
    config: Config,
    agents: [Box<dyn Agent>; 2],
    rng: ChaCha20Rng,
    stats: SelfPlayStats,
    exporter: Option<TrainingExporter>,
}

impl SelfPlay {
    /// Build both agents from the configuration. The evaluator is connected
    /// once and shared by both seats; fails if it cannot be reached.
    pub fn new(config: Config) -> Result<Self> {
        let kinds = config.agents()?;
        let mcts_config = config.mcts_config()?;
        let evaluator = connect_evaluator(&kinds, &config.evaluator_settings()?)?;
        let seed = config.seed();

        let [kind1, kind2] = kinds;
        let agents = [
            build_agent(kind1, &mcts_config, evaluator.as_ref(), seed.map(|s| s.wrapping_add(1)))?,
            build_agent(kind2, &mcts_config, evaluator.as_ref(), seed.map(|s| s.wrapping_add(2)))?,
        ];
        Self::with_agents(config, agents)
    }

    pub fn with_agents(config: Config, agents: [Box<dyn Agent>; 2]) -> Result<Self> {
        let rng = match config.seed() {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };

        let stats = SelfPlayStats::new(
            config.stats_path(),
            [agents[0].kind().to_string(), agents[1].kind().to_string()],
        );

        let exporter = if config.export_training_data {
            let exporter = TrainingExporter::open(config.training_data_path())?;
            info!(path = %exporter.path().display(), "Exporting training positions");
            Some(exporter)
        } else {
            None
        };

        Ok(Self {
            config,
            agents,
            rng,
            stats,
            exporter,
        })
    }

    /// Play until the requested number of counted games is reached.
    pub fn run(&mut self) -> Result<SelfPlayStatsSnapshot> {
        let games = self.config.games;
        info!(
            games,
            max_turns = self.config.max_turns,
            player1 = %self.agents[0].kind(),
            player2 = %self.agents[1].kind(),
            repeat_draws = self.config.repeat_draws,
            "Starting self-play"
        );

        // Progress bar only when stderr is a TTY
        let progress = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
            let pb = ProgressBar::new(games as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} games ({eta})")?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        while self.stats.games_played() < games {
            let game_start = Instant::now();
            let record = self.play_game()?;

            if record.outcome.is_none() && self.config.repeat_draws {
                self.stats.record_invalid();
                let discarded = self.exporter.as_mut().map_or(0, |exporter| {
                    let pending = exporter.pending();
                    exporter.discard_game();
                    pending
                });
                debug!(turns = record.turns, discarded, "Game hit the turn cap, replaying");
                if self.stats.invalid_games() >= games.saturating_mul(MAX_INVALID_PER_GAME) {
                    bail!(
                        "{} games hit the turn cap of {}; raise max_turns",
                        self.stats.invalid_games(),
                        self.config.max_turns
                    );
                }
                continue;
            }

            if let Some(exporter) = self.exporter.as_mut() {
                exporter.finish_game(record.outcome)?;
            }
            self.stats.record_game(&record);

            let played = self.stats.games_played();
            debug!(
                game = played,
                outcome = ?record.outcome,
                turns = record.turns,
                duration = game_start.elapsed().as_secs_f64(),
                "Game completed"
            );

            if let Some(ref pb) = progress {
                pb.inc(1);
            }

            if self.config.log_interval > 0 && played % self.config.log_interval == 0 {
                self.refresh_search_stats();
                let snapshot = self.stats.snapshot();
                let log = || {
                    info!(
                        games = played,
                        player1_wins = snapshot.player1_wins,
                        player2_wins = snapshot.player2_wins,
                        draws = snapshot.draws,
                        avg_turns = format!("{:.1}", snapshot.avg_turns),
                        "Self-play progress"
                    )
                };
                // Suspend progress bar while logging to avoid visual glitches
                match progress {
                    Some(ref pb) => pb.suspend(log),
                    None => log(),
                }
                self.stats.write_stats();
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("done");
        }

        self.refresh_search_stats();
        self.stats.write_stats();
        let snapshot = self.stats.snapshot();

        info!(
            games = snapshot.games_played,
            player1_wins = snapshot.player1_wins,
            player2_wins = snapshot.player2_wins,
            draws = snapshot.draws,
            invalid = snapshot.invalid_games,
            avg_turns = format!("{:.1}", snapshot.avg_turns),
            turns_p20 = snapshot.turns_p20,
            turns_p80 = snapshot.turns_p80,
            player1_ms = format!("{:.2}", snapshot.player1_avg_decision_ms),
            player2_ms = format!("{:.2}", snapshot.player2_avg_decision_ms),
            exported = self.exporter.as_ref().map_or(0, |e| e.rows_written()),
            stats = %self.stats.stats_path().display(),
            "Self-play finished"
        );

        Ok(snapshot)
    }

    /// Play one game. Only a fatal evaluator failure is an error; any other
    /// agent failure concedes the game for that seat.
    fn play_game(&mut self) -> Result<GameRecord> {
        let mut state = SkirmishState::new_game(&mut self.rng);
        let mut record = GameRecord::default();

        while !state.is_terminal() && state.turn() < self.config.max_turns {
            let seat = state.current_actor();
            let agent = &mut self.agents[seat.index()];

            let start = Instant::now();
            let choice = agent.choose_action(&state);
            record.decision_time[seat.index()] += start.elapsed();
            record.decisions[seat.index()] += 1;

            let action = match choice {
                Ok(action) => action,
                Err(e) if e.is_fatal() => {
                    return Err(anyhow!(e).context(format!("{} evaluator became unavailable", seat)))
                }
                Err(e) => {
                    error!(seat = %seat, agent = %agent.kind(), error = %e, "Agent failed, conceding");
                    record.conceded = Some(seat);
                    break;
                }
            };

            if seat == PlayerId::One && action.is_pass() {
                if let Some(exporter) = self.exporter.as_mut() {
                    if state.turn() > self.rng.gen_range(1..EXPORT_TURN_THRESHOLD) {
                        exporter.snapshot(&state.observe(PlayerId::One));
                    }
                }
            }

            state = match state.step(action) {
                Ok(next) => next,
                Err(e) => {
                    error!(seat = %seat, action = %action, error = %e, "Agent chose an illegal action, conceding");
                    record.conceded = Some(seat);
                    break;
                }
            };
        }

        record.turns = state.turn();
        record.outcome = match record.conceded {
            Some(seat) => Some(Outcome::Won(seat.opponent())),
            None => state.outcome(),
        };
        Ok(record)
    }

    fn refresh_search_stats(&mut self) {
        for seat in [PlayerId::One, PlayerId::Two] {
            self.stats
                .set_search_stats(seat, self.agents[seat.index()].search_stats());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentKind, RandomAgent};
    use crate::config::tests::base_config;
    use games_skirmish::Action;
    use mcts::{EvaluatorError, SearchError, FEATURE_COUNT};
    use std::fs;
    use std::net::TcpListener;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> Config {
        let mut config = base_config();
        config.data_dir = dir.to_string_lossy().into_owned();
        config.player1 = "random".into();
        config.player2 = "random".into();
        config.repeat_draws = false;
        config
    }

    /// Fails every decision with the given error.
    struct FailingAgent(fn() -> SearchError);

    impl Agent for FailingAgent {
        fn kind(&self) -> AgentKind {
            AgentKind::Mcts
        }

        fn choose_action(&mut self, _state: &SkirmishState) -> Result<Action, SearchError> {
            Err((self.0)())
        }
    }

    #[test]
    fn plays_requested_games_and_writes_stats() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.games = 3;

        let mut selfplay = SelfPlay::new(config).unwrap();
        let snapshot = selfplay.run().unwrap();

        assert_eq!(snapshot.games_played, 3);
        assert_eq!(
            snapshot.player1_wins + snapshot.player2_wins + snapshot.draws,
            3
        );
        assert!(snapshot.avg_turns > 0.0);

        let json = fs::read_to_string(dir.path().join("selfplay_stats.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["games_played"], 3);
    }

    #[test]
    fn turn_cap_counts_as_draw_without_repeat() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.games = 2;
        config.max_turns = 2;
        config.repeat_draws = false;

        let snapshot = SelfPlay::new(config).unwrap().run().unwrap();
        assert_eq!(snapshot.games_played, 2);
        assert_eq!(snapshot.draws, 2);
        assert_eq!(snapshot.invalid_games, 0);
        assert_eq!(snapshot.turns_p80, 2);
    }

    #[test]
    fn turn_cap_with_repeat_eventually_gives_up() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.games = 1;
        config.max_turns = 2;
        config.repeat_draws = true;

        let err = SelfPlay::new(config).unwrap().run().unwrap_err();
        assert!(err.to_string().contains("turn cap"));
    }

    #[test]
    fn failing_agent_concedes() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.games = 2;

        let agents: [Box<dyn Agent>; 2] = [
            Box::new(FailingAgent(|| SearchError::NoDecision)),
            Box::new(RandomAgent::new(Some(9))),
        ];
        let snapshot = SelfPlay::with_agents(config, agents)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(snapshot.player2_wins, 2);
        assert_eq!(snapshot.concessions, 2);
        assert_eq!(snapshot.total_turns, 2);
    }

    #[test]
    fn unavailable_evaluator_aborts_run() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());

        let agents: [Box<dyn Agent>; 2] = [
            Box::new(RandomAgent::new(Some(1))),
            Box::new(FailingAgent(|| {
                SearchError::Evaluator(EvaluatorError::Unavailable("connection lost".into()))
            })),
        ];
        let err = SelfPlay::with_agents(config, agents)
            .unwrap()
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn exported_rows_are_labelled() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.games = 4;
        config.export_training_data = true;

        let mut selfplay = SelfPlay::new(config).unwrap();
        let snapshot = selfplay.run().unwrap();
        assert_eq!(snapshot.games_played, 4);

        let path = dir.path().join("training_data.csv");
        assert!(path.exists());
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .unwrap();
        for record in reader.records() {
            let record = record.unwrap();
            assert_eq!(record.len(), FEATURE_COUNT + 1);
            let label: i32 = record[FEATURE_COUNT].parse().unwrap();
            assert!(label == 1 || label == -1);
            // Snapshots are taken after the first turn
            let turn: i32 = record[0].parse().unwrap();
            assert!(turn > 1);
        }
    }

    #[test]
    fn mcts_seats_share_one_evaluator_connection() {
        let dir = tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = config_in(dir.path());
        config.player1 = "mcts".into();
        config.player2 = "mcts".into();
        config.evaluator = "remote".into();
        config.evaluator_host = "127.0.0.1".into();
        config.evaluator_port = listener.local_addr().unwrap().port();

        let selfplay = SelfPlay::new(config).unwrap();
        assert_eq!(selfplay.agents[1].kind(), AgentKind::Mcts);

        let mut accepted = vec![listener.accept().unwrap().0];
        thread::sleep(Duration::from_millis(50));
        listener.set_nonblocking(true).unwrap();
        while let Ok((conn, _)) = listener.accept() {
            accepted.push(conn);
        }
        assert_eq!(accepted.len(), 1);
    }

    #[test]
    fn mcts_against_random_finishes() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.games = 1;
        config.player1 = "mcts".into();
        config.num_iterations = 10;

        let snapshot = SelfPlay::new(config).unwrap().run().unwrap();
        assert_eq!(snapshot.games_played, 1);
        assert_eq!(snapshot.player1, "mcts");
        assert!(snapshot.player1_search.is_some());
        assert!(snapshot.player2_search.is_none());
    }
}
