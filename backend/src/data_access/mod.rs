//! Storage collaborator
//!
//! The rules engine and the room handler never see how data is stored; they
//! go through [`DataAccess`]. Two implementations are provided:
//!
//! - [`MemoryDataAccess`] - process-local maps, used when no database is configured
//! - [`SqliteDataAccess`] - sqlx SQLite pool, game snapshots stored as JSON
//!
//! Seat changes (`join_game`, `leave_game`) are atomic per call so that two
//! users racing for the same color cannot both win.

mod memory;
mod sqlite;

pub use memory::MemoryDataAccess;
pub use sqlite::SqliteDataAccess;

use crate::error::ServiceResult;
use async_trait::async_trait;
use chess_rules::{ChessGame, TeamColor};
use shared::models::{AuthData, GameData, UserData};
use shared::protocol::GameId;

#[async_trait]
pub trait DataAccess: Send + Sync {
    /// Drop every user, token and game
    async fn clear(&self) -> ServiceResult<()>;

    /// Store a user. `Conflict` if the username exists.
    async fn create_user(&self, user: UserData) -> ServiceResult<()>;
    async fn get_user(&self, username: &str) -> ServiceResult<Option<UserData>>;

    async fn create_auth(&self, auth: AuthData) -> ServiceResult<()>;
    async fn get_auth(&self, auth_token: &str) -> ServiceResult<Option<AuthData>>;
    async fn delete_auth(&self, auth_token: &str) -> ServiceResult<()>;

    /// New game in the starting position with both seats free
    async fn create_game(&self, game_name: &str) -> ServiceResult<GameData>;
    async fn list_games(&self) -> ServiceResult<Vec<GameData>>;
    async fn get_game(&self, game_id: GameId) -> ServiceResult<Option<GameData>>;

    /// Claim `color` for `username`. `NotFound` for an unknown game,
    /// `Conflict` when the seat is occupied.
    async fn join_game(&self, username: &str, color: TeamColor, game_id: GameId)
        -> ServiceResult<()>;

    /// Free the seat held by `username`. `BadRequest` when they hold none.
    async fn leave_game(&self, username: &str, game_id: GameId) -> ServiceResult<()>;

    /// Mark the game over
    async fn resign_game(&self, game_id: GameId) -> ServiceResult<()>;

    /// Persist a new snapshot
    async fn update_game(&self, game_id: GameId, game: &ChessGame, game_over: bool)
        -> ServiceResult<()>;
}

pub(crate) const NOT_A_PLAYER: &str = "not a player in this game";
