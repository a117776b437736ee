//! MCTS tree structure with arena allocation.
//!
//! Nodes are stored in a contiguous Vec and referenced by [`NodeId`] indices.
//! Children are owned by the arena; a child only keeps its parent's index, so
//! there are no ownership cycles and parent lookup is O(1).

use engine_core::{GameAction, GameState};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::node::{uct_score, Children, MctsNode, NodeId};
use crate::search::SearchError;

/// MCTS tree with arena-based node storage.
#[derive(Debug)]
pub struct MctsTree<S: GameState> {
    /// Arena storing all nodes
    nodes: Vec<MctsNode<S>>,

    /// Root node index (always 0)
    root: NodeId,

    /// Batched `apply` calls issued by expansions
    apply_calls: u64,
}

impl<S: GameState> MctsTree<S> {
    /// Create a new tree rooted at `root_state`.
    pub fn new(root_state: S) -> Self {
        Self {
            nodes: vec![MctsNode::new_root(root_state)],
            root: NodeId(0),
            apply_calls: 0,
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&MctsNode<S>> {
        self.nodes.get(id.index())
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut MctsNode<S>> {
        self.nodes.get_mut(id.index())
    }

    fn node(&self, id: NodeId) -> Result<&MctsNode<S>, SearchError> {
        self.get(id).ok_or(SearchError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MctsNode<S>, SearchError> {
        self.get_mut(id).ok_or(SearchError::UnknownNode(id))
    }

    /// Get the total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty (never true after construction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of batched `apply` calls made while expanding.
    pub fn apply_calls(&self) -> u64 {
        self.apply_calls
    }

    /// Selection score of a node: plain mean for the root, UCT otherwise.
    pub fn score(&self, id: NodeId, c: f64) -> Result<f64, SearchError> {
        let node = self.node(id)?;
        match node.parent {
            None => Ok(node.visited_mean().unwrap_or(0.0)),
            Some(parent) => {
                let parent_visits = self.node(parent)?.visit_count;
                Ok(uct_score(
                    node.total_value,
                    node.visit_count,
                    parent_visits,
                    c,
                ))
            }
        }
    }

    /// Best child of `id` by UCT score. Ties go to the last maximal child in
    /// insertion order.
    pub fn select_child(&self, id: NodeId, c: f64) -> Result<Option<NodeId>, SearchError> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child in self.node(id)?.child_ids() {
            if self.node(child)?.parent != Some(id) {
                return Err(SearchError::InconsistentTree(format!(
                    "child {} of {} has a different parent",
                    child, id
                )));
            }
            let score = self.score(child, c)?;
            match best {
                Some((_, best_score)) if score < best_score => {}
                _ => best = Some((child, score)),
            }
        }
        Ok(best.map(|(child, _)| child))
    }

    /// Descend from the root by UCT until reaching a node without children.
    pub fn select(&self, c: f64) -> Result<NodeId, SearchError> {
        let mut current = self.root;
        while let Some(child) = self.select_child(current, c)? {
            current = child;
        }
        Ok(current)
    }

    /// Expand `id` and return the node to roll out from.
    ///
    /// Pass-only, terminal, and fully failed nodes become leaves and return
    /// themselves; expanding a leaf again is a no-op. Otherwise one child is
    /// created per successfully applied non-pass action and one of them is
    /// picked uniformly as the rollout seed.
    pub fn expand(&mut self, id: NodeId, rng: &mut ChaCha20Rng) -> Result<NodeId, SearchError> {
        let node = self.node(id)?;
        match &node.children {
            Children::Leaf => return Ok(id),
            Children::Expanded(_) => return Err(SearchError::AlreadyExpanded(id)),
            Children::Unexpanded => {}
        }

        let actions: Vec<S::Action> = if node.state.is_terminal() {
            Vec::new()
        } else {
            node.state
                .legal_actions()
                .into_iter()
                .filter(|a| !a.is_pass())
                .collect()
        };

        if actions.is_empty() {
            self.node_mut(id)?.children = Children::Leaf;
            return Ok(id);
        }

        let results = node.state.apply(&actions);
        self.apply_calls += 1;

        let mut ids = Vec::with_capacity(results.len());
        for (action, next) in results {
            match next {
                Some(state) => {
                    let child = NodeId(self.nodes.len() as u32);
                    self.nodes.push(MctsNode::new_child(id, action, state));
                    ids.push(child);
                }
                None => trace!(?action, "Branch failed to apply, skipping"),
            }
        }

        if ids.is_empty() {
            self.node_mut(id)?.children = Children::Leaf;
            return Ok(id);
        }

        let seed = ids[rng.gen_range(0..ids.len())];
        trace!(node = id.0, children = ids.len(), seed = seed.0, "Expanded node");
        self.node_mut(id)?.children = Children::Expanded(ids);
        Ok(seed)
    }

    /// Add `reward` and one visit to `id` and every ancestor up to the root.
    /// Returns the number of nodes updated.
    pub fn backpropagate(&mut self, id: NodeId, reward: f64) -> Result<usize, SearchError> {
        let path = self.path_to_root(id)?;
        for &node_id in &path {
            let node = self.node_mut(node_id)?;
            node.visit_count += 1;
            node.total_value += reward;
        }
        Ok(path.len())
    }

    /// Node ids from `id` up to and including the root, checking that every
    /// parent lists its child exactly once.
    pub fn path_to_root(&self, id: NodeId) -> Result<Vec<NodeId>, SearchError> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current)?.parent {
            let links = self
                .node(parent)?
                .child_ids()
                .iter()
                .filter(|&&c| c == current)
                .count();
            if links != 1 {
                return Err(SearchError::InconsistentTree(format!(
                    "{} is listed {} times under its parent {}",
                    current, links, parent
                )));
            }
            if path.len() > self.nodes.len() {
                return Err(SearchError::InconsistentTree(format!(
                    "cycle above {}",
                    id
                )));
            }
            path.push(parent);
            current = parent;
        }
        if current != self.root {
            return Err(SearchError::InconsistentTree(format!(
                "{} has no parent but is not the root",
                current
            )));
        }
        Ok(path)
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> Result<usize, SearchError> {
        Ok(self.path_to_root(id)?.len() - 1)
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = &self.nodes[self.root.index()];

        // Nodes are pushed after their parent, so one forward pass fills depths
        let mut depths = vec![0u32; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                depths[i] = depths.get(parent.index()).copied().unwrap_or(0) + 1;
            }
        }

        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.visit_count,
            root_value: root.visited_mean(),
            max_depth: depths.into_iter().max().unwrap_or(0),
        }
    }
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    /// Root mean value, `None` before the first backpropagation
    pub root_value: Option<f64>,
    pub max_depth: u32,
}
