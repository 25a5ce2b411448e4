//! Pawn move generation
//!
//! - **Push**: one square forward onto an empty square
//! - **Double push**: from the home row, when both squares ahead are empty
//! - **Capture**: one square diagonally forward, only onto an enemy piece
//! - **Promotion**: any of the above landing on the far back rank becomes
//!   four moves, one per promotion piece
//!
//! En passant is not generated.

use super::MoveSet;
use crate::board::ChessBoard;
use crate::types::{ChessMove, PieceType, Position, TeamColor};

pub(crate) fn pawn_moves(board: &ChessBoard, from: Position, color: TeamColor, moves: &mut MoveSet) {
    let forward = color.forward();

    let one = from.offset(forward, 0);
    if board.in_bounds(one) && board.is_empty(one) {
        push(moves, from, one, color);

        if from.row == color.pawn_home_row() {
            let two = from.offset(2 * forward, 0);
            if board.in_bounds(two) && board.is_empty(two) {
                push(moves, from, two, color);
            }
        }
    }

    for cols in [-1, 1] {
        let target = from.offset(forward, cols);
        if !board.in_bounds(target) {
            continue;
        }
        if board
            .piece_at(target)
            .is_some_and(|piece| piece.team_color != color)
        {
            push(moves, from, target, color);
        }
    }
}

fn push(moves: &mut MoveSet, from: Position, to: Position, color: TeamColor) {
    if to.row == color.promotion_row() {
        for promotion in PieceType::PROMOTIONS {
            moves.insert(ChessMove::new(from, to, Some(promotion)));
        }
    } else {
        moves.insert(ChessMove::new(from, to, None));
    }
}
