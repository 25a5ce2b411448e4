//! Game state machine
//!
//! A [`ChessGame`] is a board plus the side to move. It is the authoritative
//! unit of chess state: the server stores it, ships it to clients in
//! `LOAD_GAME` messages, and mutates it only through [`ChessGame::make_move`].
//!
//! # Legality
//!
//! Move generation is check-blind. A move is legal when, after playing it on
//! an independent copy of the board, the mover's own king is not attacked.
//! The live board is never touched while candidates are evaluated, so a
//! rejected move leaves no trace.
//!
//! # Game over
//!
//! Check, checkmate and stalemate are queries, not states. Nothing here stops
//! a caller from continuing to submit moves after mate; the server tracks
//! game over separately.

use crate::board::ChessBoard;
use crate::error::{RulesError, RulesResult};
use crate::move_gen::{piece_moves, MoveSet};
use crate::types::{ChessMove, ChessPiece, PieceType, Position, TeamColor};
use serde::{Deserialize, Serialize};

/// Where a side stands after the latest move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    Check,
    Checkmate,
    Stalemate,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        matches!(self, GameStatus::Checkmate | GameStatus::Stalemate)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChessGame {
    board: ChessBoard,
    team_turn: TeamColor,
}

impl Default for ChessGame {
    fn default() -> Self {
        Self::new()
    }
}

impl ChessGame {
    /// Standard starting position, White to move
    pub fn new() -> Self {
        Self {
            board: ChessBoard::starting(),
            team_turn: TeamColor::White,
        }
    }

    /// Rehydrate a game from a saved board and side to move
    pub fn from_parts(board: ChessBoard, team_turn: TeamColor) -> Self {
        Self { board, team_turn }
    }

    pub fn team_turn(&self) -> TeamColor {
        self.team_turn
    }

    pub fn set_team_turn(&mut self, team: TeamColor) {
        self.team_turn = team;
    }

    pub fn board(&self) -> &ChessBoard {
        &self.board
    }

    /// Replace the whole board, e.g. with a persisted snapshot
    pub fn set_board(&mut self, board: ChessBoard) {
        self.board = board;
    }

    /// Legal moves for the piece on `start`, or `None` if the square is empty.
    ///
    /// Each pseudo-legal candidate is played on a fresh clone of the board;
    /// it is kept only if the moving piece's own king is safe afterwards.
    pub fn valid_moves(&self, start: Position) -> Option<MoveSet> {
        let piece = self.board.piece_at(start)?;
        let legal = piece_moves(&self.board, start)
            .into_iter()
            .filter(|mv| {
                let mut scratch = self.board.clone();
                apply_move(&mut scratch, *mv);
                !king_attacked(&scratch, piece.team_color)
            })
            .collect();
        Some(legal)
    }

    /// Play `mv` for the side to move and hand the turn over.
    ///
    /// A pawn move onto the back rank without a promotion piece promotes to a
    /// queen. Returns the move as applied (with that default filled in).
    /// On error the game is unchanged.
    pub fn make_move(&mut self, mv: ChessMove) -> RulesResult<ChessMove> {
        let piece = self
            .board
            .piece_at(mv.start)
            .ok_or(RulesError::NoPiece { position: mv.start })?;

        if piece.team_color != self.team_turn {
            return Err(RulesError::WrongTurn {
                expected: self.team_turn,
                found: piece.team_color,
            });
        }

        let mv = with_default_promotion(piece, mv);
        let legal = self.valid_moves(mv.start).unwrap_or_default();
        if !legal.contains(&mv) {
            return Err(RulesError::IllegalMove { mv });
        }

        apply_move(&mut self.board, mv);
        self.team_turn = self.team_turn.opponent();
        Ok(mv)
    }

    /// True when an enemy piece can reach `color`'s king
    pub fn is_in_check(&self, color: TeamColor) -> bool {
        king_attacked(&self.board, color)
    }

    pub fn is_in_checkmate(&self, color: TeamColor) -> bool {
        self.is_in_check(color) && !self.has_legal_moves(color)
    }

    /// Stalemate only has meaning for the side to move; asking about the
    /// other side always answers `false`.
    pub fn is_in_stalemate(&self, color: TeamColor) -> bool {
        color == self.team_turn && !self.is_in_check(color) && !self.has_legal_moves(color)
    }

    pub fn status(&self, color: TeamColor) -> GameStatus {
        if self.is_in_checkmate(color) {
            GameStatus::Checkmate
        } else if self.is_in_check(color) {
            GameStatus::Check
        } else if self.is_in_stalemate(color) {
            GameStatus::Stalemate
        } else {
            GameStatus::InProgress
        }
    }

    fn has_legal_moves(&self, color: TeamColor) -> bool {
        self.board.pieces_of(color).any(|(position, _)| {
            self.valid_moves(position)
                .is_some_and(|moves| !moves.is_empty())
        })
    }
}

fn with_default_promotion(piece: ChessPiece, mv: ChessMove) -> ChessMove {
    let promotes =
        piece.piece_type == PieceType::Pawn && mv.end.row == piece.team_color.promotion_row();
    if promotes && mv.promotion.is_none() {
        ChessMove::new(mv.start, mv.end, Some(PieceType::Queen))
    } else {
        mv
    }
}

/// Move the piece, clearing its start square. A pawn landing on its
/// promotion row becomes the requested piece (queen if none was given).
fn apply_move(board: &mut ChessBoard, mv: ChessMove) {
    let Some(piece) = board.piece_at(mv.start) else {
        return;
    };
    let landed = if piece.piece_type == PieceType::Pawn
        && mv.end.row == piece.team_color.promotion_row()
    {
        ChessPiece::new(
            piece.team_color,
            mv.promotion.unwrap_or(PieceType::Queen),
        )
    } else {
        piece
    };
    board.place(mv.start, None);
    board.place(mv.end, Some(landed));
}

/// A board without `color`'s king is never in check
fn king_attacked(board: &ChessBoard, color: TeamColor) -> bool {
    let Some(king) = board.king_location(color) else {
        return false;
    };
    board.pieces_of(color.opponent()).any(|(position, _)| {
        piece_moves(board, position)
            .iter()
            .any(|mv| mv.end == king)
    })
}
