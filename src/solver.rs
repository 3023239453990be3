//! Search strategies over Baker's Dozen boards.
//!
//! Every strategy runs against a [`SearchContext`], which owns the search
//! tree, the visited set of the current run, the resource bounds and the
//! cancellation token. Strategies are synchronous; [`crate::runner`] moves
//! them onto a worker thread.

pub mod best_first;
pub mod depth_bounded;
pub mod iterative;

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::{Board, StateKey};
use crate::constants::{CHECK_INTERVAL, DEFAULT_IDA_HEIGHT, DEFAULT_MAX_DEPTH, DEFAULT_MAX_STATES};
use crate::learned::LearnedDepthCache;
use crate::moves::{apply_move, possible_moves, Move};
use crate::node::{evaluate, HeuristicWeights, NodeId, SearchTree};

pub use best_first::BestFirst;
pub use depth_bounded::DepthBounded;
pub use iterative::IterativeDeepening;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    BestFirst,
    DepthBounded,
    IterativeDeepening,
}

impl StrategyKind {
    pub fn build(self) -> Box<dyn Strategy> {
        match self {
            StrategyKind::BestFirst => Box::new(BestFirst),
            StrategyKind::DepthBounded => Box::new(DepthBounded::default()),
            StrategyKind::IterativeDeepening => Box::new(IterativeDeepening),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            StrategyKind::BestFirst => "best-first",
            StrategyKind::DepthBounded => "depth-bounded",
            StrategyKind::IterativeDeepening => "iterative-deepening",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resource bounds and tuning shared by all strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Maximum distinct states in the visited set of one run.
    pub max_states: Option<usize>,
    /// Depth cap of the depth-bounded search.
    pub max_depth: u32,
    pub timeout_ms: Option<u64>,
    /// Leaf threshold of the iterative-deepening search.
    pub ida_height: u32,
    /// Maximum number of new children a single node may add.
    pub branch_limit: Option<usize>,
    /// Seed of the tie-breaking noise; entropy when absent.
    pub seed: Option<u64>,
    pub weights: HeuristicWeights,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_states: Some(DEFAULT_MAX_STATES),
            max_depth: DEFAULT_MAX_DEPTH,
            timeout_ms: None,
            ida_height: DEFAULT_IDA_HEIGHT,
            branch_limit: None,
            seed: None,
            weights: HeuristicWeights::default(),
        }
    }
}

impl SearchOptions {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Cooperative cancellation flag shared between a caller and a search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExhaustReason {
    FrontierEmpty,
    StateLimit,
    DepthLimit,
    Timeout,
}

/// Terminal state of one strategy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Solved; the id is the root, whose `next` chain is the solution.
    Found(NodeId),
    Exhausted(ExhaustReason),
    Cancelled,
}

/// Why a run has to stop early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    Cancelled,
    Exhausted(ExhaustReason),
}

impl From<Stop> for Outcome {
    fn from(stop: Stop) -> Self {
        match stop {
            Stop::Cancelled => Outcome::Cancelled,
            Stop::Exhausted(reason) => Outcome::Exhausted(reason),
        }
    }
}

pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    /// Explores from `ctx.root()` until a win, a bound, or cancellation.
    fn run(&mut self, ctx: &mut SearchContext) -> Outcome;
}

/// Run-scoped search state.
pub struct SearchContext {
    initial: Board,
    tree: SearchTree,
    visited: HashSet<StateKey>,
    options: SearchOptions,
    cache: Arc<LearnedDepthCache>,
    cancel: CancelToken,
    rng: StdRng,
    started: Instant,
    deadline: Option<Instant>,
    expanded: u64,
    allocated: u64,
}

impl SearchContext {
    pub fn new(
        initial: Board,
        options: SearchOptions,
        cache: Arc<LearnedDepthCache>,
        cancel: CancelToken,
    ) -> Self {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let started = Instant::now();
        let deadline = options.timeout().and_then(|t| started.checked_add(t));
        let score = evaluate(&initial, &cache, &options.weights, &mut rng);
        let mut visited = HashSet::new();
        visited.insert(initial.key());
        Self {
            tree: SearchTree::with_root(initial.clone(), score),
            initial,
            visited,
            options,
            cache,
            cancel,
            rng,
            started,
            deadline,
            expanded: 0,
            allocated: 1,
        }
    }

    /// Drops the tree and visited set and reseeds the root. Counters, the
    /// deadline and the RNG carry over.
    pub fn restart(&mut self) {
        let score = evaluate(&self.initial, &self.cache, &self.options.weights, &mut self.rng);
        self.tree = SearchTree::with_root(self.initial.clone(), score);
        self.visited.clear();
        self.visited.insert(self.initial.key());
        self.allocated += 1;
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn cache(&self) -> &LearnedDepthCache {
        &self.cache
    }

    pub fn is_visited(&self, key: StateKey) -> bool {
        self.visited.contains(&key)
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn states_processed(&self) -> u64 {
        self.expanded
    }

    pub fn nodes_allocated(&self) -> u64 {
        self.allocated
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Counts one processed node and checks for cancellation. The deadline
    /// is only consulted every `CHECK_INTERVAL` nodes.
    pub fn tick(&mut self) -> Result<(), Stop> {
        self.expanded += 1;
        if self.cancel.is_cancelled() {
            return Err(Stop::Cancelled);
        }
        if self.expanded % CHECK_INTERVAL == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(Stop::Exhausted(ExhaustReason::Timeout));
                }
            }
        }
        Ok(())
    }

    /// Generates the unvisited children of `parent`, marks them visited and
    /// links them into the tree. Returns them in move-generation order.
    pub fn expand(&mut self, parent: NodeId) -> Result<Vec<NodeId>, Stop> {
        let moves = possible_moves(&self.tree[parent].board);
        let limit = self.options.branch_limit.unwrap_or(usize::MAX);
        let mut children = Vec::with_capacity(moves.len().min(limit));
        for mv in moves {
            if children.len() >= limit {
                break;
            }
            let Some(board) = apply_move(&self.tree[parent].board, mv) else {
                continue;
            };
            let key = board.key();
            if self.visited.contains(&key) {
                continue;
            }
            if self
                .options
                .max_states
                .is_some_and(|max| self.visited.len() >= max)
            {
                return Err(Stop::Exhausted(ExhaustReason::StateLimit));
            }
            self.visited.insert(key);
            let score = evaluate(&board, &self.cache, &self.options.weights, &mut self.rng);
            children.push(self.tree.add_child(parent, board, mv, score));
            self.allocated += 1;
        }
        Ok(children)
    }

    /// Links the path to `goal`, records it in the learned cache, and
    /// returns the outcome pointing at the root.
    pub fn found(&mut self, goal: NodeId) -> Outcome {
        let path = reconstruct_path(&mut self.tree, goal);
        let improved = self.cache.merge_path(&path);
        info!(
            moves = self.tree[goal].depth,
            states = self.expanded,
            improved,
            "solution found"
        );
        Outcome::Found(self.tree.root())
    }

    pub fn report(&self, strategy: &str, outcome: Outcome) -> SearchReport {
        let (outcome, solution) = match outcome {
            Outcome::Found(root) => (
                RunOutcome::Solved,
                Some(Solution::from_tree(&self.tree, root)),
            ),
            Outcome::Exhausted(reason) => (RunOutcome::Exhausted(reason), None),
            Outcome::Cancelled => (RunOutcome::Cancelled, None),
        };
        SearchReport {
            strategy: strategy.to_string(),
            outcome,
            solution,
            states_processed: self.expanded,
            nodes_allocated: self.allocated,
            elapsed: self.elapsed(),
        }
    }
}

/// Walks from `goal` back to the root, pointing every parent's `next` at the
/// child on the path. Returns each path node's key with its distance to the
/// goal, goal first.
pub fn reconstruct_path(tree: &mut SearchTree, goal: NodeId) -> Vec<(StateKey, u32)> {
    let mut entries = vec![(tree[goal].board.key(), 0)];
    let mut current = goal;
    let mut distance = 0;
    while let (Some(parent), Some(mv)) = (tree[current].parent, tree[current].via) {
        tree.set_next(parent, (current, mv));
        distance += 1;
        entries.push((tree[parent].board.key(), distance));
        current = parent;
    }
    entries
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub mv: Move,
    /// Board after `mv` has been played.
    pub board: Board,
}

/// Flat solution path, detached from the search tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub initial: Board,
    pub steps: Vec<Step>,
}

impl Solution {
    pub fn from_tree(tree: &SearchTree, root: NodeId) -> Self {
        let steps = tree
            .forward_chain(root)
            .map(|(mv, id)| Step {
                mv,
                board: tree[id].board.clone(),
            })
            .collect();
        Self {
            initial: tree[root].board.clone(),
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn moves(&self) -> impl Iterator<Item = Move> + '_ {
        self.steps.iter().map(|s| s.mv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Solved,
    Exhausted(ExhaustReason),
    Cancelled,
    /// The worker thread died without reporting.
    Crashed,
    /// The worker ignored cancellation past the grace period or watchdog.
    Abandoned,
}

#[derive(Debug, Clone)]
pub struct SearchReport {
    pub strategy: String,
    pub outcome: RunOutcome,
    pub solution: Option<Solution>,
    pub states_processed: u64,
    pub nodes_allocated: u64,
    pub elapsed: Duration,
}

impl SearchReport {
    pub fn without_solution(strategy: &str, outcome: RunOutcome, elapsed: Duration) -> Self {
        Self {
            strategy: strategy.to_string(),
            outcome,
            solution: None,
            states_processed: 0,
            nodes_allocated: 0,
            elapsed,
        }
    }

    pub fn is_solved(&self) -> bool {
        self.solution.is_some()
    }
}

/// Runs `strategy` synchronously on the calling thread.
pub fn solve(
    strategy: &mut dyn Strategy,
    board: Board,
    options: SearchOptions,
    cache: Arc<LearnedDepthCache>,
    cancel: CancelToken,
) -> SearchReport {
    let mut ctx = SearchContext::new(board, options, cache, cancel);
    debug!(strategy = strategy.name(), "search starting");
    let outcome = strategy.run(&mut ctx);
    let report = ctx.report(strategy.name(), outcome);
    debug!(
        strategy = strategy.name(),
        outcome = ?report.outcome,
        states = report.states_processed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "search finished"
    );
    report
}
