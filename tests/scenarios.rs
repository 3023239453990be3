use std::sync::Arc;
use std::time::{Duration, Instant};

use bakers_dozen::solver::SearchContext;
use bakers_dozen::{
    apply_move, possible_moves, solve, Board, CancelToken, DeckShape, ExhaustReason,
    LearnedDepthCache, Move, Outcome, Rank, RunOutcome, RunState, SearchOptions, SolverHandle,
    StrategyKind,
};
use pretty_assertions::assert_eq;

const ALL: [StrategyKind; 3] = [
    StrategyKind::BestFirst,
    StrategyKind::DepthBounded,
    StrategyKind::IterativeDeepening,
];

fn four() -> Rank {
    Rank::new(4).unwrap()
}

fn hearts_stack() -> Board {
    Board::from_notation(
        &["4H 3H 2H AH", "", "", ""],
        &["AC 2C 3C 4C", "AS 2S 3S 4S", "", "AD 2D 3D 4D"],
        four(),
    )
    .unwrap()
}

fn seeded() -> SearchOptions {
    SearchOptions {
        seed: Some(7),
        ..SearchOptions::default()
    }
}

fn run(kind: StrategyKind, board: Board, options: SearchOptions) -> bakers_dozen::SearchReport {
    solve(
        kind.build().as_mut(),
        board,
        options,
        Arc::new(LearnedDepthCache::new()),
        CancelToken::new(),
    )
}

#[test]
fn already_won_board_has_an_empty_solution() {
    let board = Board::from_notation(
        &["", "", "", ""],
        &["AC 2C 3C 4C", "AS 2S 3S 4S", "AH 2H 3H 4H", "AD 2D 3D 4D"],
        four(),
    )
    .unwrap();
    assert!(board.is_game_won());
    for kind in ALL {
        let report = run(kind, board.clone(), seeded());
        assert_eq!(report.outcome, RunOutcome::Solved, "{kind}");
        let solution = report.solution.unwrap();
        assert!(solution.is_empty());
        assert_eq!(solution.initial, board);
    }
}

#[test]
fn ace_next_to_its_foundation_is_a_one_move_solution() {
    let board =
        Board::from_notation(&["", "AH", "", ""], &["AC", "AS", "", "AD"], Rank::ACE).unwrap();
    for kind in ALL {
        let report = run(kind, board.clone(), seeded());
        let moves: Vec<Move> = report.solution.expect("solved").moves().collect();
        assert_eq!(
            moves,
            vec![Move::Foundation {
                from_column: 1,
                to_foundation: 2
            }],
            "{kind}"
        );
    }
}

#[test]
fn last_card_of_a_reduced_deck_is_a_one_move_solution() {
    let board = Board::from_notation(
        &["", "", "4H", ""],
        &["AC 2C 3C 4C", "AS 2S 3S 4S", "AH 2H 3H", "AD 2D 3D 4D"],
        four(),
    )
    .unwrap();
    let report = run(StrategyKind::BestFirst, board, seeded());
    let moves: Vec<Move> = report.solution.expect("solved").moves().collect();
    assert_eq!(
        moves,
        vec![Move::Foundation {
            from_column: 2,
            to_foundation: 2
        }]
    );
}

#[test]
fn unwinnable_deal_explores_then_stops_within_state_bound() {
    // The five of hearts is missing, so hearts can never be completed, but
    // plenty of column and foundation moves stay available.
    let board = Board::from_notation(
        &["5C 2D 4S 3H", "5S AH 3C 2S", "5D 4C 2H 3D", "4D AS 3S 2C", "4H AD AC"],
        &["", "", "", ""],
        Rank::new(5).unwrap(),
    )
    .unwrap();
    assert!(!possible_moves(&board).is_empty());
    for kind in ALL {
        let options = SearchOptions {
            max_states: Some(200),
            max_depth: 20,
            ..seeded()
        };
        let mut ctx = SearchContext::new(
            board.clone(),
            options,
            Arc::new(LearnedDepthCache::new()),
            CancelToken::new(),
        );
        let outcome = kind.build().run(&mut ctx);
        assert!(
            matches!(
                outcome,
                Outcome::Exhausted(
                    ExhaustReason::StateLimit
                        | ExhaustReason::FrontierEmpty
                        | ExhaustReason::DepthLimit
                )
            ),
            "{kind}: {outcome:?}"
        );
        assert!(ctx.states_processed() > 1, "{kind} never expanded");
        assert!(ctx.visited_len() <= 200);
    }
}

#[test]
fn board_without_moves_exhausts_at_once() {
    // Every ace sits under a top-rank card and every top is a two.
    let board = Board::from_notation(
        &["AC 4D 3C 2D", "AD 4C 3D 2C", "AH 4S 3H 2S", "AS 4H 3S 2H"],
        &["", "", "", ""],
        four(),
    )
    .unwrap();
    assert!(possible_moves(&board).is_empty());
    for kind in ALL {
        let report = run(kind, board.clone(), seeded());
        assert_eq!(
            report.outcome,
            RunOutcome::Exhausted(ExhaustReason::FrontierEmpty),
            "{kind}"
        );
    }
}

#[test]
fn large_deal_respects_state_bound() {
    let options = SearchOptions {
        max_states: Some(200),
        ..seeded()
    };
    let mut ctx = SearchContext::new(
        Board::deal(17, DeckShape::STANDARD),
        options,
        Arc::new(LearnedDepthCache::new()),
        CancelToken::new(),
    );
    let outcome = StrategyKind::BestFirst.build().run(&mut ctx);
    assert!(ctx.visited_len() <= 200);
    assert_ne!(outcome, Outcome::Cancelled);
}

#[test]
fn forced_foundation_move_preempts_everything_else() {
    let board = Board::from_notation(
        &["3D", "4C", "2H", ""],
        &["AC", "AS", "AH", "AD"],
        four(),
    )
    .unwrap();
    assert_eq!(
        possible_moves(&board),
        vec![Move::Foundation {
            from_column: 2,
            to_foundation: 2
        }]
    );
}

#[test]
fn stop_completes_promptly_without_a_solution() {
    let options = SearchOptions {
        max_states: None,
        ..seeded()
    };
    let grace = Duration::from_millis(500);
    let mut handle = SolverHandle::new(
        Board::deal(1234, DeckShape::STANDARD),
        StrategyKind::BestFirst,
        options,
        Arc::new(LearnedDepthCache::new()),
    )
    .with_grace(grace);
    handle.start().unwrap();
    let t0 = Instant::now();
    handle.stop();
    assert!(t0.elapsed() < Duration::from_secs(1) + grace);
    assert_eq!(handle.state(), RunState::Completed);
    assert!(!handle.is_running());
    match handle.outcome() {
        // The search may legitimately win the race on an easy deal.
        Some(RunOutcome::Solved) => {}
        other => {
            assert_eq!(other, Some(RunOutcome::Cancelled));
            assert_eq!(handle.extract_solution(), None);
        }
    }
}

#[test]
fn learned_depths_only_ever_shrink() {
    let board = hearts_stack();
    let cache = Arc::new(LearnedDepthCache::new());
    let first = solve(
        StrategyKind::BestFirst.build().as_mut(),
        board.clone(),
        seeded(),
        Arc::clone(&cache),
        CancelToken::new(),
    );
    let solution = first.solution.expect("solved");
    assert_eq!(cache.get(board.key()), Some(solution.len() as u32));

    let midway = solution.steps[1].board.clone();
    let d = cache.get(midway.key()).unwrap();
    assert_eq!(d, solution.len() as u32 - 2);

    // A worse depth never replaces a better one.
    assert!(!cache.record(midway.key(), d + 5));
    assert_eq!(cache.get(midway.key()), Some(d));

    // A second run that reaches the same state again keeps the minimum.
    let second = solve(
        StrategyKind::DepthBounded.build().as_mut(),
        midway.clone(),
        seeded(),
        Arc::clone(&cache),
        CancelToken::new(),
    );
    assert!(second.is_solved());
    assert_eq!(cache.get(midway.key()), Some(d.min(second.solution.unwrap().len() as u32)));
}

#[test]
fn solutions_replay_legally_to_a_won_board() {
    for kind in ALL {
        for seed in 0..6 {
            let board = Board::deal(seed, DeckShape::reduced(four(), 4));
            let options = SearchOptions {
                max_states: Some(5_000),
                max_depth: 30,
                ..seeded()
            };
            let report = run(kind, board.clone(), options);
            let Some(solution) = report.solution else {
                continue;
            };
            let mut current = board;
            for step in &solution.steps {
                let next = apply_move(&current, step.mv).expect("legal step");
                assert_eq!(next, step.board);
                current = next;
            }
            assert!(current.is_game_won(), "{kind} seed {seed}");
        }
    }
}

#[test]
fn forward_chain_length_matches_goal_depth() {
    let mut boards = vec![hearts_stack()];
    boards.extend((0..6).map(|seed| Board::deal(seed, DeckShape::reduced(four(), 4))));
    for kind in ALL {
        let mut solved = 0;
        for board in &boards {
            let options = SearchOptions {
                max_states: Some(5_000),
                max_depth: 30,
                ..seeded()
            };
            let mut ctx = SearchContext::new(
                board.clone(),
                options,
                Arc::new(LearnedDepthCache::new()),
                CancelToken::new(),
            );
            let Outcome::Found(root) = kind.build().run(&mut ctx) else {
                continue;
            };
            solved += 1;
            let chain: Vec<_> = ctx.tree().forward_chain(root).collect();
            let goal = chain.last().map_or(root, |&(_, id)| id);
            let depth = ctx.tree()[goal].depth;
            assert!(ctx.tree()[goal].board.is_game_won(), "{kind}");
            assert_eq!(chain.len() as u32, depth, "{kind}");
            assert_eq!(ctx.cache().get(board.key()), Some(depth), "{kind}");
        }
        assert!(solved >= 1, "{kind} solved nothing");
    }
}

#[test]
fn depth_bounded_solutions_never_exceed_the_cap() {
    for seed in 0..6 {
        let board = Board::deal(seed, DeckShape::reduced(four(), 4));
        let cap = 12;
        let report = run(
            StrategyKind::DepthBounded,
            board,
            SearchOptions {
                max_depth: cap,
                max_states: Some(5_000),
                ..seeded()
            },
        );
        match report.solution {
            Some(solution) => assert!(solution.len() <= cap as usize),
            None => assert!(matches!(report.outcome, RunOutcome::Exhausted(_))),
        }
    }
}

#[test]
fn exhausted_reason_is_reported() {
    let board = Board::from_notation(&["2D", "", "", ""], &["", "", "", ""], Rank::new(2).unwrap())
        .unwrap();
    let report = run(StrategyKind::BestFirst, board, seeded());
    assert_eq!(report.outcome, RunOutcome::Exhausted(ExhaustReason::FrontierEmpty));
}
