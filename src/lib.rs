//! Baker's Dozen solitaire solver.
//!
//! Boards and moves live in [`board`] and [`moves`]; [`solver`] holds the
//! search strategies and [`runner`] runs one on a background thread.

pub mod board;
pub mod card;
pub mod config;
pub mod constants;
pub mod error;
pub mod learned;
pub mod moves;
pub mod node;
pub mod runner;
pub mod solver;

pub use board::{Board, Column, DeckShape, Foundation, StateKey};
pub use card::{Card, Rank, Suit};
pub use error::{Result, SolverError};
pub use learned::LearnedDepthCache;
pub use moves::{apply_move, possible_moves, Move};
pub use runner::{RunState, SolverHandle};
pub use solver::{
    solve, CancelToken, ExhaustReason, Outcome, RunOutcome, SearchOptions, SearchReport, Solution,
    Strategy, StrategyKind,
};
