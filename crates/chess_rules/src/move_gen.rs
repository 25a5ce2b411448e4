//! Pseudo-legal move generation
//!
//! Produces every destination a piece can reach by its movement geometry,
//! respecting blocking and captures but ignoring whether the move exposes
//! the mover's own king. [`crate::ChessGame`] does the self-check filtering.
//!
//! ## Dispatch
//!
//! The piece kinds are a closed set, so generation is a single `match` on
//! [`PieceType`]:
//! - Rook, bishop and queen walk each direction until the edge, stopping
//!   before a friendly piece or on an enemy piece (capture)
//! - King and knight use the same walk limited to one step
//! - Pawns have their own rules (see `pawn`)
//!
//! ## Output
//!
//! Moves are collected into a [`MoveSet`] (`BTreeSet`), so duplicates are
//! impossible and iteration order is stable across runs.

mod pawn;
mod sliding;

use crate::board::ChessBoard;
use crate::types::{ChessMove, PieceType, Position};
use std::collections::BTreeSet;

/// Ordered set of moves
pub type MoveSet = BTreeSet<ChessMove>;

pub(crate) const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub(crate) const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
pub(crate) const KING_DIRS: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];
pub(crate) const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

/// Pseudo-legal moves of the piece on `from`. Empty when the square is empty.
pub fn piece_moves(board: &ChessBoard, from: Position) -> MoveSet {
    let mut moves = MoveSet::new();
    let Some(piece) = board.piece_at(from) else {
        return moves;
    };
    let color = piece.team_color;

    match piece.piece_type {
        PieceType::King => sliding::walk(board, from, color, &KING_DIRS, false, &mut moves),
        PieceType::Knight => sliding::walk(board, from, color, &KNIGHT_JUMPS, false, &mut moves),
        PieceType::Rook => sliding::walk(board, from, color, &ROOK_DIRS, true, &mut moves),
        PieceType::Bishop => sliding::walk(board, from, color, &BISHOP_DIRS, true, &mut moves),
        PieceType::Queen => {
            sliding::walk(board, from, color, &ROOK_DIRS, true, &mut moves);
            sliding::walk(board, from, color, &BISHOP_DIRS, true, &mut moves);
        }
        PieceType::Pawn => pawn::pawn_moves(board, from, color, &mut moves),
    }

    moves
}
