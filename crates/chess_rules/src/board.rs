//! Board representation
//!
//! A plain coordinate-indexed container of optional pieces. The board knows
//! nothing about legality; [`crate::ChessGame`] layers the rules on top.
//! Boards are cheap to clone, which is how hypothetical moves are evaluated.

use crate::error::ParseError;
use crate::types::{ChessPiece, PieceType, Position, TeamColor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Back rank layout from the a-file to the h-file
const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// 8x8 grid, `squares[row - 1][col - 1]`
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChessBoard {
    squares: [[Option<ChessPiece>; 8]; 8],
}

impl ChessBoard {
    /// An empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// A board in the standard opening arrangement
    pub fn starting() -> Self {
        let mut board = Self::new();
        board.reset();
        board
    }

    /// Put `piece` on `position`, or clear the square with `None`.
    /// Positions off the board are ignored.
    pub fn place(&mut self, position: Position, piece: Option<ChessPiece>) {
        if let Some((row, col)) = position.index() {
            self.squares[row][col] = piece;
        }
    }

    pub fn piece_at(&self, position: Position) -> Option<ChessPiece> {
        position
            .index()
            .and_then(|(row, col)| self.squares[row][col])
    }

    pub fn is_empty(&self, position: Position) -> bool {
        self.piece_at(position).is_none()
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        position.in_bounds()
    }

    /// Square of `color`'s king. A board without that king returns `None`.
    pub fn king_location(&self, color: TeamColor) -> Option<Position> {
        let king = ChessPiece::new(color, PieceType::King);
        Position::all().find(|&position| self.piece_at(position) == Some(king))
    }

    /// Every occupied square with its piece, a1 to h8
    pub fn pieces(&self) -> impl Iterator<Item = (Position, ChessPiece)> + '_ {
        Position::all().filter_map(move |position| {
            self.piece_at(position).map(|piece| (position, piece))
        })
    }

    /// Occupied squares belonging to `color`
    pub fn pieces_of(&self, color: TeamColor) -> impl Iterator<Item = (Position, ChessPiece)> + '_ {
        self.pieces()
            .filter(move |(_, piece)| piece.team_color == color)
    }

    pub fn clear(&mut self) {
        self.squares = Default::default();
    }

    /// Restore the standard opening layout: pawns on rows 2 and 7, pieces
    /// mirrored on rows 1 and 8, queens on the d-file and kings on the e-file.
    pub fn reset(&mut self) {
        self.clear();
        for (index, piece_type) in BACK_RANK.iter().enumerate() {
            let col = index as i8 + 1;
            self.place(
                Position::new(1, col),
                Some(ChessPiece::new(TeamColor::White, *piece_type)),
            );
            self.place(
                Position::new(2, col),
                Some(ChessPiece::new(TeamColor::White, PieceType::Pawn)),
            );
            self.place(
                Position::new(7, col),
                Some(ChessPiece::new(TeamColor::Black, PieceType::Pawn)),
            );
            self.place(
                Position::new(8, col),
                Some(ChessPiece::new(TeamColor::Black, *piece_type)),
            );
        }
    }
}

/// Eight lines, row 8 first. Upper case is White, lower case Black, `.` empty.
impl fmt::Display for ChessBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (1..=8).rev() {
            for col in 1..=8 {
                let symbol = self
                    .piece_at(Position::new(row, col))
                    .map_or('.', ChessPiece::symbol);
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parses the diagram format written by `Display`. Blank lines and spaces
/// between squares are ignored.
impl FromStr for ChessBoard {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<Vec<char>> = s
            .lines()
            .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
            .filter(|squares| !squares.is_empty())
            .collect();

        if rows.len() != 8 {
            return Err(ParseError::InvalidBoard(format!(
                "expected 8 rows, found {}",
                rows.len()
            )));
        }

        let mut board = ChessBoard::new();
        for (line, squares) in rows.iter().enumerate() {
            if squares.len() != 8 {
                return Err(ParseError::InvalidBoard(format!(
                    "row {} has {} squares",
                    8 - line,
                    squares.len()
                )));
            }
            let row = 8 - line as i8;
            for (index, &symbol) in squares.iter().enumerate() {
                let position = Position::new(row, index as i8 + 1);
                if symbol == '.' {
                    continue;
                }
                let piece = ChessPiece::from_symbol(symbol).ok_or_else(|| {
                    ParseError::InvalidBoard(format!("unknown piece '{}' at {}", symbol, position))
                })?;
                board.place(position, Some(piece));
            }
        }
        Ok(board)
    }
}
