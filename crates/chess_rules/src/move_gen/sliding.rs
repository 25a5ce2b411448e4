//! Direction walking for rooks, bishops and queens, and the single-step
//! variant used by kings and knights.

use super::MoveSet;
use crate::board::ChessBoard;
use crate::types::{ChessMove, Position, TeamColor};

/// Walk each `(row, col)` direction from `from`.
///
/// Empty squares are added and the walk continues (only while `sliding`).
/// An enemy piece is added and ends the direction, a friendly piece ends it
/// without being added. Squares off the board end the direction and are
/// never added.
pub(crate) fn walk(
    board: &ChessBoard,
    from: Position,
    color: TeamColor,
    directions: &[(i8, i8)],
    sliding: bool,
    moves: &mut MoveSet,
) {
    for &(rows, cols) in directions {
        let mut current = from;
        loop {
            current = current.offset(rows, cols);
            if !board.in_bounds(current) {
                break;
            }
            match board.piece_at(current) {
                None => {
                    moves.insert(ChessMove::new(from, current, None));
                    if !sliding {
                        break;
                    }
                }
                Some(piece) => {
                    if piece.team_color != color {
                        moves.insert(ChessMove::new(from, current, None));
                    }
                    break;
                }
            }
        }
    }
}
