//! Error types for the rules engine

use crate::types::{ChessMove, Position, TeamColor};
use thiserror::Error;

/// Reasons a move is rejected by [`crate::ChessGame::make_move`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// Nothing stands on the start square
    #[error("no piece at {position}")]
    NoPiece { position: Position },

    /// The piece on the start square belongs to the side not on move
    #[error("it is {expected}'s turn, not {found}'s")]
    WrongTurn {
        expected: TeamColor,
        found: TeamColor,
    },

    /// The move is not in the legal move set of its piece
    #[error("illegal move {mv}")]
    IllegalMove { mv: ChessMove },
}

/// Failures turning text into rules types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid team color: {0}")]
    InvalidColor(String),

    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error("invalid board layout: {0}")]
    InvalidBoard(String),
}

/// Result type alias for rules operations
pub type RulesResult<T> = Result<T, RulesError>;
