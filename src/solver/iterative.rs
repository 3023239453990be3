use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::{debug, trace};

use super::{ExhaustReason, Outcome, SearchContext, Stop, Strategy};
use crate::node::{NodeId, Ranked};

/// Iterative-deepening best-first search.
///
/// Each round explores a subtree of `ida_height` plies below a leaf, visiting
/// children cheapest score first, and collects the nodes at the horizon. The
/// collected leaves wait in a queue ordered by path cost, then score; the
/// best one seeds the next round.
#[derive(Debug, Default, Clone, Copy)]
pub struct IterativeDeepening;

enum Halt {
    Found(NodeId),
    Stop(Stop),
}

impl From<Stop> for Halt {
    fn from(stop: Stop) -> Self {
        Halt::Stop(stop)
    }
}

type LeafKey = (Reverse<u32>, Ranked);

fn dfs(
    ctx: &mut SearchContext,
    id: NodeId,
    depth: u32,
    height: u32,
) -> Result<Vec<NodeId>, Halt> {
    if ctx.tree()[id].board.is_game_won() {
        return Err(Halt::Found(id));
    }
    if depth == height {
        return Ok(vec![id]);
    }
    ctx.tick()?;

    let mut local: BinaryHeap<Ranked> = ctx
        .expand(id)?
        .into_iter()
        .map(|child| Ranked {
            priority: ctx.tree()[child].score,
            id: child,
        })
        .collect();

    let mut leaves = Vec::new();
    while let Some(Ranked { id: child, .. }) = local.pop() {
        leaves.extend(dfs(ctx, child, depth + 1, height)?);
    }
    Ok(leaves)
}

fn leaf_key(ctx: &SearchContext, id: NodeId) -> LeafKey {
    let node = &ctx.tree()[id];
    (
        Reverse(node.depth),
        Ranked {
            priority: node.score,
            id,
        },
    )
}

impl Strategy for IterativeDeepening {
    fn name(&self) -> &'static str {
        "iterative-deepening"
    }

    fn run(&mut self, ctx: &mut SearchContext) -> Outcome {
        // A zero horizon would hand every leaf straight back.
        let height = ctx.options().ida_height.max(1);
        let mut queue: BinaryHeap<LeafKey> = BinaryHeap::new();
        queue.push(leaf_key(ctx, ctx.root()));
        let mut rounds = 0u64;

        while let Some((_, Ranked { id, .. })) = queue.pop() {
            rounds += 1;
            match dfs(ctx, id, 0, height) {
                Ok(leaves) => {
                    trace!(
                        round = rounds,
                        leaves = leaves.len(),
                        queued = queue.len(),
                        "horizon reached"
                    );
                    for leaf in leaves {
                        queue.push(leaf_key(ctx, leaf));
                    }
                }
                Err(Halt::Found(goal)) => {
                    debug!(rounds, "won board surfaced");
                    return ctx.found(goal);
                }
                Err(Halt::Stop(stop)) => return stop.into(),
            }
        }

        Outcome::Exhausted(ExhaustReason::FrontierEmpty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::card::Rank;
    use crate::learned::LearnedDepthCache;
    use crate::solver::{CancelToken, SearchOptions};
    use std::sync::Arc;

    fn ctx(board: Board, ida_height: u32) -> SearchContext {
        SearchContext::new(
            board,
            SearchOptions {
                ida_height,
                seed: Some(11),
                ..SearchOptions::default()
            },
            Arc::new(LearnedDepthCache::new()),
            CancelToken::new(),
        )
    }

    fn two_suits_left() -> Board {
        Board::from_notation(
            &["2H AH", "2D AD", "", ""],
            &["AC 2C", "AS 2S", "", ""],
            Rank::new(2).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn solves_across_several_rounds() {
        // Horizon of one ply forces a round per move.
        let mut ctx = ctx(two_suits_left(), 1);
        let Outcome::Found(root) = IterativeDeepening.run(&mut ctx) else {
            panic!("expected a solution");
        };
        let steps: Vec<_> = ctx.tree().forward_chain(root).collect();
        assert_eq!(steps.len(), 4);
        let (_, last) = steps[steps.len() - 1];
        assert!(ctx.tree()[last].board.is_game_won());
    }

    #[test]
    fn zero_height_still_terminates() {
        let mut ctx = ctx(two_suits_left(), 0);
        assert!(matches!(IterativeDeepening.run(&mut ctx), Outcome::Found(_)));
    }

    #[test]
    fn leaf_queue_prefers_shallow_then_cheap() {
        let mut heap = BinaryHeap::new();
        let a = (Reverse(3), Ranked { priority: -5.0, id: NodeId::ROOT });
        let b = (Reverse(1), Ranked { priority: 9.0, id: NodeId::ROOT });
        let c = (Reverse(1), Ranked { priority: 2.0, id: NodeId::ROOT });
        heap.extend([a, b, c]);
        let order: Vec<(u32, f64)> = std::iter::from_fn(|| heap.pop())
            .map(|(Reverse(d), r)| (d, r.priority))
            .collect();
        assert_eq!(order, vec![(1, 2.0), (1, 9.0), (3, -5.0)]);
    }
}
