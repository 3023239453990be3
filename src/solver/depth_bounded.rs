use tracing::debug;

use super::{ExhaustReason, Outcome, SearchContext, Stop, Strategy};
use crate::node::NodeId;

/// Depth-first search under a growing depth bound: `1, 2, ...` up to
/// `max_depth`, each pass with a fresh tree and visited set. A solution found
/// under bound `k` has at most `k` moves.
#[derive(Debug, Default, Clone, Copy)]
pub struct DepthBounded {
    /// Set when some node was cut off by the current bound.
    cut: bool,
}

impl DepthBounded {
    fn dfs(
        &mut self,
        ctx: &mut SearchContext,
        id: NodeId,
        bound: u32,
    ) -> Result<Option<NodeId>, Stop> {
        ctx.tick()?;
        let node = &ctx.tree()[id];
        if node.board.is_game_won() {
            return Ok(Some(id));
        }
        if node.depth >= bound {
            self.cut = true;
            return Ok(None);
        }

        let children = ctx.expand(id)?;
        for &child in children.iter().rev() {
            if let Some(goal) = self.dfs(ctx, child, bound)? {
                return Ok(Some(goal));
            }
        }
        Ok(None)
    }
}

impl Strategy for DepthBounded {
    fn name(&self) -> &'static str {
        "depth-bounded"
    }

    fn run(&mut self, ctx: &mut SearchContext) -> Outcome {
        let cap = ctx.options().max_depth;
        // A won root is caught before the bound is checked, so bound 1 covers it.
        for bound in 1..=cap.max(1) {
            if bound > 1 {
                ctx.restart();
            }
            self.cut = false;
            let root = ctx.root();
            match self.dfs(ctx, root, bound) {
                Ok(Some(goal)) => return ctx.found(goal),
                Ok(None) if !self.cut => {
                    debug!(bound, "space exhausted below bound");
                    return Outcome::Exhausted(ExhaustReason::FrontierEmpty);
                }
                Ok(None) => {
                    debug!(bound, states = ctx.states_processed(), "no solution within bound")
                }
                Err(stop) => return stop.into(),
            }
        }
        Outcome::Exhausted(ExhaustReason::DepthLimit)
    }
}
