//! Scripted game fixtures for search tests.
//!
//! A [`Script`] is a small explicit graph: each node lists its legal actions
//! and where they lead (`None` = the branch fails to apply). Positions carry
//! the node id in `turn`, so [`TableEvaluator`] can score nodes directly.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use engine_core::{GameAction, GameState, Outcome, PlayerId, Position};

use crate::evaluator::{Evaluator, EvaluatorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToyAction(pub u8);

impl GameAction for ToyAction {
    fn is_pass(&self) -> bool {
        self.0 == 0
    }
}

pub const PASS: ToyAction = ToyAction(0);
pub const A: ToyAction = ToyAction(1);
pub const B: ToyAction = ToyAction(2);
pub const C: ToyAction = ToyAction(3);

type Edges = Vec<(ToyAction, Option<u32>)>;

#[derive(Debug, Default)]
pub struct Script {
    edges: HashMap<u32, Edges>,
    actors: HashMap<u32, PlayerId>,
    terminal: HashSet<u32>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, id: u32, edges: &[(ToyAction, Option<u32>)]) -> Self {
        self.edges.insert(id, edges.to_vec());
        self
    }

    pub fn actor(mut self, id: u32, actor: PlayerId) -> Self {
        self.actors.insert(id, actor);
        self
    }

    pub fn terminal(mut self, id: u32) -> Self {
        self.terminal.insert(id);
        self
    }

    pub fn start(self, id: u32) -> ScriptedState {
        ScriptedState {
            node: id,
            script: Arc::new(self),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedState {
    pub node: u32,
    script: Arc<Script>,
}

impl ScriptedState {
    fn goto(&self, node: u32) -> Self {
        Self {
            node,
            script: Arc::clone(&self.script),
        }
    }
}

impl GameState for ScriptedState {
    type Action = ToyAction;

    fn current_actor(&self) -> PlayerId {
        self.script
            .actors
            .get(&self.node)
            .copied()
            .unwrap_or(PlayerId::One)
    }

    fn legal_actions(&self) -> Vec<ToyAction> {
        if self.is_terminal() {
            return Vec::new();
        }
        match self.script.edges.get(&self.node) {
            Some(edges) => edges.iter().map(|(a, _)| *a).collect(),
            None => vec![PASS],
        }
    }

    fn apply(&self, actions: &[ToyAction]) -> Vec<(ToyAction, Option<Self>)> {
        let edges = self.script.edges.get(&self.node);
        actions
            .iter()
            .map(|action| {
                let target = edges
                    .and_then(|e| e.iter().find(|(a, _)| a == action))
                    .and_then(|(_, t)| *t);
                (*action, target.map(|t| self.goto(t)))
            })
            .collect()
    }

    fn is_terminal(&self) -> bool {
        self.script.terminal.contains(&self.node)
    }

    fn outcome(&self) -> Option<Outcome> {
        None
    }

    fn turn(&self) -> u32 {
        1
    }

    fn observe(&self, _perspective: PlayerId) -> Position {
        Position {
            turn: self.node,
            ..Default::default()
        }
    }
}

/// Scores scripted nodes from a lookup table (missing nodes score 0).
#[derive(Debug, Default)]
pub struct TableEvaluator {
    values: HashMap<u32, f64>,
    calls: AtomicU64,
}

impl TableEvaluator {
    pub fn new(values: &[(u32, f64)]) -> Self {
        Self {
            values: values.iter().copied().collect(),
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Evaluator for TableEvaluator {
    fn evaluate(&self, position: &Position) -> Result<f64, EvaluatorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.values.get(&position.turn).copied().unwrap_or(0.0))
    }
}
