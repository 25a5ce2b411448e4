//! Value types shared by every part of the rules engine
//!
//! Coordinates are 1-based: row 1 is White's back rank and column 1 is the
//! a-file, so `Position::new(2, 5)` is e2. All types here are `Copy` and
//! compare by value. The serde representation is the one carried on the wire
//! inside `LOAD_GAME` snapshots and `MAKE_MOVE` commands.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two sides of a game
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TeamColor {
    White,
    Black,
}

impl TeamColor {
    pub fn opponent(self) -> Self {
        match self {
            TeamColor::White => TeamColor::Black,
            TeamColor::Black => TeamColor::White,
        }
    }

    /// Row delta of a pawn push
    pub fn forward(self) -> i8 {
        match self {
            TeamColor::White => 1,
            TeamColor::Black => -1,
        }
    }

    /// Row this color's pawns start on (double push allowed from here)
    pub fn pawn_home_row(self) -> i8 {
        match self {
            TeamColor::White => 2,
            TeamColor::Black => 7,
        }
    }

    /// Opponent's back rank, where this color's pawns promote
    pub fn promotion_row(self) -> i8 {
        match self {
            TeamColor::White => 8,
            TeamColor::Black => 1,
        }
    }
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamColor::White => write!(f, "white"),
            TeamColor::Black => write!(f, "black"),
        }
    }
}

impl FromStr for TeamColor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(TeamColor::White),
            "black" => Ok(TeamColor::Black),
            _ => Err(ParseError::InvalidColor(s.to_string())),
        }
    }
}

/// The closed set of chess piece kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PieceType {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceType {
    /// Pieces a pawn may become on the back rank, strongest first
    pub const PROMOTIONS: [PieceType; 4] = [
        PieceType::Queen,
        PieceType::Rook,
        PieceType::Bishop,
        PieceType::Knight,
    ];

    /// Upper-case letter used in board diagrams
    pub fn symbol(self) -> char {
        match self {
            PieceType::King => 'K',
            PieceType::Queen => 'Q',
            PieceType::Rook => 'R',
            PieceType::Bishop => 'B',
            PieceType::Knight => 'N',
            PieceType::Pawn => 'P',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'K' => Some(PieceType::King),
            'Q' => Some(PieceType::Queen),
            'R' => Some(PieceType::Rook),
            'B' => Some(PieceType::Bishop),
            'N' => Some(PieceType::Knight),
            'P' => Some(PieceType::Pawn),
            _ => None,
        }
    }
}

impl fmt::Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceType::King => "KING",
            PieceType::Queen => "QUEEN",
            PieceType::Rook => "ROOK",
            PieceType::Bishop => "BISHOP",
            PieceType::Knight => "KNIGHT",
            PieceType::Pawn => "PAWN",
        };
        f.write_str(name)
    }
}

/// A typed, colored piece
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChessPiece {
    pub team_color: TeamColor,
    pub piece_type: PieceType,
}

impl ChessPiece {
    pub const fn new(team_color: TeamColor, piece_type: PieceType) -> Self {
        Self {
            team_color,
            piece_type,
        }
    }

    /// Diagram letter: upper case for White, lower case for Black
    pub fn symbol(self) -> char {
        match self.team_color {
            TeamColor::White => self.piece_type.symbol(),
            TeamColor::Black => self.piece_type.symbol().to_ascii_lowercase(),
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        let piece_type = PieceType::from_symbol(symbol)?;
        let team_color = if symbol.is_ascii_uppercase() {
            TeamColor::White
        } else {
            TeamColor::Black
        };
        Some(Self::new(team_color, piece_type))
    }
}

/// A square coordinate. Valid squares have `row` and `col` in `1..=8`.
///
/// Values off the board can be built (move generation steps past the edge
/// before checking), but they are never stored in a board or a move set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i8,
    pub col: i8,
}

impl Position {
    pub const fn new(row: i8, col: i8) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(self) -> bool {
        (1..=8).contains(&self.row) && (1..=8).contains(&self.col)
    }

    /// The position `rows`/`cols` away. May be off the board.
    pub fn offset(self, rows: i8, cols: i8) -> Self {
        Self::new(self.row + rows, self.col + cols)
    }

    /// Zero-based grid indices, `None` when off the board
    pub(crate) fn index(self) -> Option<(usize, usize)> {
        self.in_bounds()
            .then(|| ((self.row - 1) as usize, (self.col - 1) as usize))
    }

    /// All 64 squares, row by row from a1 to h8
    pub fn all() -> impl Iterator<Item = Position> {
        (1..=8).flat_map(|row| (1..=8).map(move |col| Position::new(row, col)))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.in_bounds() {
            let file = (b'a' + (self.col - 1) as u8) as char;
            write!(f, "{}{}", file, self.row)
        } else {
            write!(f, "({}, {})", self.row, self.col)
        }
    }
}

impl FromStr for Position {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        if bytes.len() != 2 {
            return Err(ParseError::InvalidSquare(s.to_string()));
        }
        let file = bytes[0].to_ascii_lowercase();
        let rank = bytes[1];
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(ParseError::InvalidSquare(s.to_string()));
        }
        Ok(Position::new((rank - b'0') as i8, (file - b'a' + 1) as i8))
    }
}

/// A move from one square to another, optionally promoting a pawn
///
/// Two moves between the same squares with different promotion pieces are
/// distinct values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChessMove {
    #[serde(alias = "startPosition")]
    pub start: Position,
    #[serde(alias = "endPosition")]
    pub end: Position,
    #[serde(default, alias = "promotionPiece")]
    pub promotion: Option<PieceType>,
}

impl ChessMove {
    pub const fn new(start: Position, end: Position, promotion: Option<PieceType>) -> Self {
        Self {
            start,
            end,
            promotion,
        }
    }
}

impl fmt::Display for ChessMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.start, self.end)?;
        if let Some(promotion) = self.promotion {
            write!(f, "={}", promotion.symbol())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_algebraic_names() {
        assert_eq!(Position::new(2, 5).to_string(), "e2");
        assert_eq!(Position::new(8, 1).to_string(), "a8");
        assert_eq!("h1".parse::<Position>(), Ok(Position::new(1, 8)));
        assert!("i9".parse::<Position>().is_err());
        assert!("e".parse::<Position>().is_err());
    }

    #[test]
    fn test_position_bounds() {
        assert!(Position::new(1, 1).in_bounds());
        assert!(Position::new(8, 8).in_bounds());
        assert!(!Position::new(0, 4).in_bounds());
        assert!(!Position::new(4, 9).in_bounds());
        assert_eq!(Position::all().count(), 64);
    }

    #[test]
    fn test_team_color_parsing_is_case_insensitive() {
        assert_eq!("WHITE".parse::<TeamColor>(), Ok(TeamColor::White));
        assert_eq!("black".parse::<TeamColor>(), Ok(TeamColor::Black));
        assert!("green".parse::<TeamColor>().is_err());
    }

    #[test]
    fn test_piece_symbols() {
        let black_knight = ChessPiece::new(TeamColor::Black, PieceType::Knight);
        assert_eq!(black_knight.symbol(), 'n');
        assert_eq!(ChessPiece::from_symbol('n'), Some(black_knight));
        assert_eq!(ChessPiece::from_symbol('x'), None);
    }

    #[test]
    fn test_moves_differing_only_in_promotion_are_distinct() {
        let from = Position::new(7, 1);
        let to = Position::new(8, 1);
        let queen = ChessMove::new(from, to, Some(PieceType::Queen));
        let knight = ChessMove::new(from, to, Some(PieceType::Knight));
        assert_ne!(queen, knight);
        assert_eq!(queen.to_string(), "a7a8=Q");
    }

    #[test]
    fn test_move_accepts_long_field_names() {
        let json = r#"{"startPosition":{"row":7,"col":1},"endPosition":{"row":8,"col":1},"promotionPiece":"ROOK"}"#;
        let mv: ChessMove = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(mv.promotion, Some(PieceType::Rook));

        let short = r#"{"start":{"row":2,"col":5},"end":{"row":4,"col":5}}"#;
        let mv: ChessMove = serde_json::from_str(short).expect("Should deserialize");
        assert_eq!(mv.promotion, None);
    }
}
