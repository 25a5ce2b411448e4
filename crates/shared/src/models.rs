//! Records held by the data-access layer and the HTTP bodies built from them

use crate::protocol::GameId;
use chess_rules::{ChessGame, TeamColor};
use serde::{Deserialize, Serialize};

/// A registered account. Missing fields deserialize as empty strings so the
/// service can reject them with a proper error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

/// An issued session token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub username: String,
    pub auth_token: String,
}

/// A game with its seats and authoritative state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    #[serde(rename = "gameID")]
    pub game_id: GameId,
    pub white_username: Option<String>,
    pub black_username: Option<String>,
    pub game_name: String,
    pub game: ChessGame,
    #[serde(default)]
    pub game_over: bool,
}

impl GameData {
    pub fn new(game_id: GameId, game_name: impl Into<String>) -> Self {
        Self {
            game_id,
            white_username: None,
            black_username: None,
            game_name: game_name.into(),
            game: ChessGame::new(),
            game_over: false,
        }
    }

    /// Seat held by `username`, if any
    pub fn color_of(&self, username: &str) -> Option<TeamColor> {
        if self.white_username.as_deref() == Some(username) {
            Some(TeamColor::White)
        } else if self.black_username.as_deref() == Some(username) {
            Some(TeamColor::Black)
        } else {
            None
        }
    }

    pub fn username_for(&self, color: TeamColor) -> Option<&str> {
        match color {
            TeamColor::White => self.white_username.as_deref(),
            TeamColor::Black => self.black_username.as_deref(),
        }
    }
}

/// One row of `GET /game`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    #[serde(rename = "gameID")]
    pub game_id: GameId,
    pub white_username: Option<String>,
    pub black_username: Option<String>,
    pub game_name: String,
}

impl From<&GameData> for GameSummary {
    fn from(data: &GameData) -> Self {
        Self {
            game_id: data.game_id,
            white_username: data.white_username.clone(),
            black_username: data.black_username.clone(),
            game_name: data.game_name.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    #[serde(default)]
    pub game_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateGameResponse {
    #[serde(rename = "gameID")]
    pub game_id: GameId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    #[serde(default)]
    pub player_color: String,
    #[serde(rename = "gameID")]
    pub game_id: GameId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListGamesResponse {
    pub games: Vec<GameSummary>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
