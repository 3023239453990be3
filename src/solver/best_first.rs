use std::collections::BinaryHeap;

use tracing::trace;

use super::{ExhaustReason, Outcome, SearchContext, Strategy};
use crate::node::Ranked;

/// Best-first search on heuristic score alone. Terminates once the visited
/// set reaches `max_states`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BestFirst;

impl Strategy for BestFirst {
    fn name(&self) -> &'static str {
        "best-first"
    }

    fn run(&mut self, ctx: &mut SearchContext) -> Outcome {
        let root = ctx.root();
        let mut frontier = BinaryHeap::new();
        frontier.push(Ranked {
            priority: ctx.tree()[root].score,
            id: root,
        });

        while let Some(Ranked { id, .. }) = frontier.pop() {
            if let Err(stop) = ctx.tick() {
                return stop.into();
            }
            if ctx.tree()[id].board.is_game_won() {
                return ctx.found(id);
            }
            let children = match ctx.expand(id) {
                Ok(children) => children,
                Err(stop) => return stop.into(),
            };
            trace!(
                node = id.index(),
                children = children.len(),
                frontier = frontier.len(),
                "expanded"
            );
            frontier.extend(children.into_iter().map(|child| Ranked {
                priority: ctx.tree()[child].score,
                id: child,
            }));
        }

        Outcome::Exhausted(ExhaustReason::FrontierEmpty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, DeckShape};
    use crate::card::Rank;
    use crate::learned::LearnedDepthCache;
    use crate::solver::{CancelToken, SearchOptions};
    use std::sync::Arc;

    fn ctx(board: Board, options: SearchOptions) -> SearchContext {
        SearchContext::new(
            board,
            options,
            Arc::new(LearnedDepthCache::new()),
            CancelToken::new(),
        )
    }

    #[test]
    fn solves_a_reduced_deal() {
        let board = Board::deal(1, DeckShape::reduced(Rank::new(4).unwrap(), 4));
        let mut ctx = ctx(
            board,
            SearchOptions {
                seed: Some(1),
                ..SearchOptions::default()
            },
        );
        match BestFirst.run(&mut ctx) {
            Outcome::Found(root) => {
                let last = ctx.tree().forward_chain(root).last().map(|(_, id)| id);
                let end = last.unwrap_or(root);
                assert!(ctx.tree()[end].board.is_game_won());
            }
            Outcome::Exhausted(reason) => {
                assert_ne!(reason, ExhaustReason::Timeout);
            }
            Outcome::Cancelled => panic!("not cancelled"),
        }
    }

    #[test]
    fn every_tree_node_holds_a_distinct_state() {
        let board = Board::from_notation(
            &["5C 2D 4S 3H", "5S AH 3C 2S", "5D 4C 2H 3D", "4D AS 3S 2C", "5H 4H AD AC"],
            &["", "", "", ""],
            Rank::new(5).unwrap(),
        )
        .unwrap();
        let mut ctx = ctx(
            board,
            SearchOptions {
                max_states: Some(1_000),
                seed: Some(4),
                ..SearchOptions::default()
            },
        );
        BestFirst.run(&mut ctx);
        let keys: Vec<_> = ctx.tree().iter().map(|(_, node)| node.board.key()).collect();
        assert!(keys.len() > 1);
        let distinct: std::collections::HashSet<_> = keys.iter().copied().collect();
        assert_eq!(distinct.len(), keys.len());
        assert!(keys.iter().all(|&k| ctx.is_visited(k)));
        assert_eq!(ctx.visited_len(), keys.len());
    }

    #[test]
    fn never_exceeds_state_bound() {
        let board = Board::deal(5, DeckShape::STANDARD);
        let mut ctx = ctx(
            board,
            SearchOptions {
                max_states: Some(300),
                seed: Some(2),
                ..SearchOptions::default()
            },
        );
        let outcome = BestFirst.run(&mut ctx);
        assert!(ctx.visited_len() <= 300);
        assert!(matches!(
            outcome,
            Outcome::Found(_)
                | Outcome::Exhausted(ExhaustReason::StateLimit)
                | Outcome::Exhausted(ExhaustReason::FrontierEmpty)
        ));
    }
}
