//! MCTS tree node representation.
//!
//! Each node holds the game state reached by taking `action` from its parent,
//! plus the visit statistics used for UCT selection and the final choice.

use engine_core::GameState;

/// Score and mean value reported for a node that was never visited.
///
/// A visited sibling scores its mean plus an exploration bonus, which can
/// exceed this once the parent has two or more visits, so an unvisited node is
/// not guaranteed to be picked before a visited one is revisited.
pub const UNEXPLORED_VALUE: f64 = 1.0;

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Expansion state of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    /// Never expanded.
    Unexpanded,
    /// Expanded into at least one child, in insertion order.
    Expanded(Vec<NodeId>),
    /// Looked at and found nothing to expand: pass-only, terminal, or every
    /// branch failed to apply.
    Leaf,
}

/// A node in the MCTS tree.
#[derive(Debug, Clone)]
pub struct MctsNode<S: GameState> {
    /// Parent node index (`None` for root)
    pub parent: Option<NodeId>,

    /// Action that led to this node from parent (`None` for root)
    pub action: Option<S::Action>,

    /// Game state at this node
    pub state: S,

    /// Number of backpropagated paths through this node
    pub visit_count: u32,

    /// Sum of rewards backpropagated through this node
    pub total_value: f64,

    pub children: Children,
}

impl<S: GameState> MctsNode<S> {
    /// Create a new root node.
    pub fn new_root(state: S) -> Self {
        Self {
            parent: None,
            action: None,
            state,
            visit_count: 0,
            total_value: 0.0,
            children: Children::Unexpanded,
        }
    }

    /// Create a new child node.
    pub fn new_child(parent: NodeId, action: S::Action, state: S) -> Self {
        Self {
            parent: Some(parent),
            action: Some(action),
            state,
            visit_count: 0,
            total_value: 0.0,
            children: Children::Unexpanded,
        }
    }

    /// Mean value T/N, or [`UNEXPLORED_VALUE`] if never visited.
    #[inline]
    pub fn mean_value(&self) -> f64 {
        self.visited_mean().unwrap_or(UNEXPLORED_VALUE)
    }

    /// Mean value T/N, `None` if never visited.
    #[inline]
    pub fn visited_mean(&self) -> Option<f64> {
        if self.visit_count == 0 {
            None
        } else {
            Some(self.total_value / self.visit_count as f64)
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Check if this node has been expanded into children.
    #[inline]
    pub fn is_expanded(&self) -> bool {
        matches!(&self.children, Children::Expanded(ids) if !ids.is_empty())
    }

    /// Child ids in insertion order (empty unless expanded).
    pub fn child_ids(&self) -> &[NodeId] {
        match &self.children {
            Children::Expanded(ids) => ids,
            Children::Unexpanded | Children::Leaf => &[],
        }
    }
}

/// UCT score of a non-root node.
///
/// ```text
/// score = UNEXPLORED_VALUE                       if N == 0
///       = T/N + C * sqrt(ln(parent_N) / N)       otherwise
/// ```
#[inline]
pub fn uct_score(total_value: f64, visit_count: u32, parent_visits: u32, c: f64) -> f64 {
    if visit_count == 0 {
        return UNEXPLORED_VALUE;
    }
    let n = visit_count as f64;
    let parent_ln = (parent_visits.max(1) as f64).ln();
    total_value / n + c * (parent_ln / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{GameAction, Outcome, PlayerId, Position};

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Noop;

    impl GameAction for Noop {
        fn is_pass(&self) -> bool {
            true
        }
    }

    #[derive(Debug, Clone)]
    struct Stub;

    impl GameState for Stub {
        type Action = Noop;

        fn current_actor(&self) -> PlayerId {
            PlayerId::One
        }
        fn legal_actions(&self) -> Vec<Noop> {
            vec![Noop]
        }
        fn apply(&self, actions: &[Noop]) -> Vec<(Noop, Option<Self>)> {
            actions.iter().map(|a| (a.clone(), Some(Stub))).collect()
        }
        fn is_terminal(&self) -> bool {
            false
        }
        fn outcome(&self) -> Option<Outcome> {
            None
        }
        fn turn(&self) -> u32 {
            1
        }
        fn observe(&self, _perspective: PlayerId) -> Position {
            Position::default()
        }
    }

    #[test]
    fn test_new_root() {
        let node = MctsNode::new_root(Stub);
        assert!(node.is_root());
        assert!(node.action.is_none());
        assert_eq!(node.visit_count, 0);
        assert_eq!(node.children, Children::Unexpanded);
        assert!(node.child_ids().is_empty());
    }

    #[test]
    fn test_mean_value() {
        let mut node = MctsNode::new_child(NodeId(0), Noop, Stub);

        // Unvisited
        assert_eq!(node.visited_mean(), None);
        assert_eq!(node.mean_value(), UNEXPLORED_VALUE);

        node.visit_count = 4;
        node.total_value = -2.0;
        assert!((node.mean_value() + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_is_expanded() {
        let mut node = MctsNode::new_root(Stub);
        node.children = Children::Leaf;
        assert!(!node.is_expanded());
        node.children = Children::Expanded(vec![NodeId(1), NodeId(2)]);
        assert!(node.is_expanded());
        assert_eq!(node.child_ids(), &[NodeId(1), NodeId(2)]);
    }

    #[test]
    fn test_uct_unvisited() {
        assert_eq!(uct_score(0.0, 0, 10, 0.7), UNEXPLORED_VALUE);
    }

    #[test]
    fn test_uct_formula() {
        // T/N = 0.5, C = 1, parent N = 100, N = 10
        let expected = 0.5 + (100f64.ln() / 10.0).sqrt();
        assert!((uct_score(5.0, 10, 100, 1.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_uct_exploration_shrinks_with_visits() {
        // Fixed mean 0.25: more visits to the child never raise its score
        let c = 0.66;
        let mut last = f64::INFINITY;
        for n in 1..200u32 {
            let score = uct_score(0.25 * n as f64, n, 500, c);
            assert!(score <= last + 1e-12);
            assert!(score >= 0.25);
            last = score;
        }
    }

    #[test]
    fn test_uct_grows_with_parent_visits() {
        // Fixed child statistics: a busier parent never lowers the bonus
        let c = 0.66;
        let mut last = f64::NEG_INFINITY;
        for parent in 10..2000u32 {
            let score = uct_score(3.0, 10, parent, c);
            assert!(score >= last - 1e-12);
            last = score;
        }
    }
}
