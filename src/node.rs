//! Search tree arena and the evaluation heuristic.
//!
//! Nodes are owned by the [`SearchTree`]; parents refer to children and
//! children to parents by [`NodeId`], so there are no reference cycles and
//! dropping the tree frees everything at once.

use std::cmp::Ordering;
use std::ops::Index;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::learned::LearnedDepthCache;
use crate::moves::Move;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct SearchNode {
    pub board: Board,
    pub parent: Option<NodeId>,
    /// Move that produced this node from its parent.
    pub via: Option<Move>,
    pub children: Vec<(NodeId, Move)>,
    /// Next step towards the goal, filled in by path reconstruction.
    pub next: Option<(NodeId, Move)>,
    pub score: f64,
    pub depth: u32,
}

#[derive(Debug, Default)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
}

impl SearchTree {
    /// Creates a tree holding only the root.
    pub fn with_root(board: Board, score: f64) -> Self {
        Self {
            nodes: vec![SearchNode {
                board,
                parent: None,
                via: None,
                children: Vec::new(),
                next: None,
                score,
                depth: 0,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn add_child(&mut self, parent: NodeId, board: Board, mv: Move, score: f64) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(SearchNode {
            board,
            parent: Some(parent),
            via: Some(mv),
            children: Vec::new(),
            next: None,
            score,
            depth,
        });
        self.nodes[parent.0].children.push((id, mv));
        id
    }

    /// Every node in allocation order, root first.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SearchNode)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub(crate) fn set_next(&mut self, id: NodeId, next: (NodeId, Move)) {
        self.nodes[id.0].next = Some(next);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Follows `next` links from `from`, yielding each step's move and node.
    pub fn forward_chain(&self, from: NodeId) -> impl Iterator<Item = (Move, NodeId)> + '_ {
        std::iter::successors(self.nodes[from.0].next, move |&(id, _)| self.nodes[id.0].next)
            .map(|(id, mv)| (mv, id))
    }
}

impl Index<NodeId> for SearchTree {
    type Output = SearchNode;

    fn index(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0]
    }
}

/// Min-heap entry for `BinaryHeap`: the lowest priority pops first.
#[derive(Debug, Clone, Copy)]
pub struct Ranked {
    pub priority: f64,
    pub id: NodeId,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.total_cmp(&self.priority)
    }
}

/// Tunable weights of [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    /// Numerator of the bonus for states with a learned depth.
    pub learned: f64,
    /// A playable card with `n` cards above it costs `burial_base^n`.
    pub burial_base: f64,
    /// Cost per card still in the tableau.
    pub remaining: f64,
    /// Scale of the uniform tie-breaking noise.
    pub jitter: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            learned: 1000.0,
            burial_base: 2.0,
            remaining: 1.0,
            jitter: 1.0,
        }
    }
}

/// Scores `board`; lower is more promising.
pub fn evaluate<R: Rng>(
    board: &Board,
    cache: &LearnedDepthCache,
    weights: &HeuristicWeights,
    rng: &mut R,
) -> f64 {
    if let Some(depth) = cache.get(board.key()) {
        return -weights.learned / (depth as f64 + 1.0);
    }

    let mut score = 0.0;
    for column in board.columns() {
        let cards = column.cards();
        for (i, &card) in cards.iter().enumerate() {
            if board.is_playable(card) {
                let above = (cards.len() - i - 1) as i32;
                score += weights.burial_base.powi(above);
            }
        }
    }
    score += weights.remaining * board.cards_outside_foundations() as f64;

    if weights.jitter > 0.0 {
        score += weights.jitter * rng.gen::<f64>();
    }
    score
}
