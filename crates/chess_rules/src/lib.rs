//! Chess rules engine
//!
//! Pure game logic with no I/O: board representation, pseudo-legal move
//! generation per piece type, and the [`ChessGame`] turn state machine that
//! filters out moves leaving the mover's own king in check.
//!
//! # Module Structure
//!
//! - `types` - Positions, pieces, colors and moves (small `Copy` values)
//! - `board` - 8x8 grid of optional pieces
//! - `move_gen` - Pseudo-legal destinations for each piece type
//! - `game` - Legality filtering, check/checkmate/stalemate, promotion
//! - `error` - Rule violations and parse failures
//!
//! # Example
//!
//! ```
//! use chess_rules::{ChessGame, ChessMove, Position, TeamColor};
//!
//! let mut game = ChessGame::new();
//! let e4 = ChessMove::new(Position::new(2, 5), Position::new(4, 5), None);
//! game.make_move(e4).unwrap();
//! assert_eq!(game.team_turn(), TeamColor::Black);
//! ```

pub mod board;
pub mod error;
pub mod game;
pub mod move_gen;
pub mod types;

pub use board::ChessBoard;
pub use error::{ParseError, RulesError, RulesResult};
pub use game::{ChessGame, GameStatus};
pub use move_gen::{piece_moves, MoveSet};
pub use types::{ChessMove, ChessPiece, PieceType, Position, TeamColor};
