//! Move representation and prioritised move generation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Board;

/// A single-card move; always takes the top card of `from_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Foundation {
        from_column: usize,
        to_foundation: usize,
    },
    Column {
        from_column: usize,
        to_column: usize,
    },
}

impl Move {
    pub fn from_column(self) -> usize {
        match self {
            Move::Foundation { from_column, .. } | Move::Column { from_column, .. } => from_column,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Move::Foundation {
                from_column,
                to_foundation,
            } => write!(f, "C{:02} -> F{}", from_column + 1, to_foundation + 1),
            Move::Column {
                from_column,
                to_column,
            } => write!(f, "C{:02} -> C{:02}", from_column + 1, to_column + 1),
        }
    }
}

/// Enumerates legal moves from `board`.
///
/// If some column top is exactly one rank above the shortest foundation and
/// can be played, that single move is returned on its own. Otherwise every
/// foundation move comes first, then every column-to-column move.
pub fn possible_moves(board: &Board) -> Vec<Move> {
    if let Some(forced) = forced_foundation_move(board) {
        return vec![forced];
    }

    let columns = board.columns().len();
    let foundations = board.foundations().len();
    let mut moves: Vec<Move> = Vec::with_capacity(columns * 2);

    for from_column in 0..columns {
        for to_foundation in 0..foundations {
            if board.is_valid_column_to_foundation(from_column, to_foundation) {
                moves.push(Move::Foundation {
                    from_column,
                    to_foundation,
                });
            }
        }
    }

    for from_column in 0..columns {
        for to_column in 0..columns {
            if board.is_valid_column_to_column(from_column, to_column) {
                moves.push(Move::Column {
                    from_column,
                    to_column,
                });
            }
        }
    }

    moves
}

fn forced_foundation_move(board: &Board) -> Option<Move> {
    let wanted = board.min_foundation_len() + 1;
    for (from_column, col) in board.columns().iter().enumerate() {
        let Some(top) = col.top() else { continue };
        if top.rank.value() as usize != wanted {
            continue;
        }
        if let Some(to_foundation) = (0..board.foundations().len())
            .find(|&f| board.is_valid_column_to_foundation(from_column, f))
        {
            return Some(Move::Foundation {
                from_column,
                to_foundation,
            });
        }
    }
    None
}

/// Applies `mv` to a copy of `board`. `None` if the move is not legal there.
pub fn apply_move(board: &Board, mv: Move) -> Option<Board> {
    match mv {
        Move::Foundation {
            from_column,
            to_foundation,
        } => board.apply_column_to_foundation(from_column, to_foundation),
        Move::Column {
            from_column,
            to_column,
        } => board.apply_column_to_column(from_column, to_column),
    }
}
