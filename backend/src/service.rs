//! Account and game operations on top of [`DataAccess`]
//!
//! HTTP handlers and the WebSocket handler both go through [`GameService`];
//! it owns every rule that is not a chess rule (who may move, who may
//! resign, when a game is over).

use crate::auth::{hash_password, verify_password};
use crate::data_access::DataAccess;
use crate::error::{ServiceError, ServiceResult};
use chess_rules::{ChessMove, GameStatus, RulesError, TeamColor};
use shared::models::{AuthData, GameData, GameSummary, UserData};
use shared::protocol::GameId;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Result of an accepted move
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    /// Game after the move, as persisted
    pub game: GameData,
    /// The move as applied (promotion default filled in)
    pub applied: ChessMove,
    pub mover: TeamColor,
    /// Status of the side now on move
    pub opponent_status: GameStatus,
}

#[derive(Clone)]
pub struct GameService {
    data: Arc<dyn DataAccess>,
}

impl GameService {
    pub fn new(data: Arc<dyn DataAccess>) -> Self {
        Self { data }
    }

    pub async fn clear(&self) -> ServiceResult<()> {
        self.data.clear().await
    }

    /// Create an account and log it in
    pub async fn register(&self, user: UserData) -> ServiceResult<AuthData> {
        if user.username.is_empty() || user.password.is_empty() || user.email.is_empty() {
            return Err(ServiceError::BadRequest("missing required fields".to_string()));
        }

        let password_hash = hash_password(&user.password)?;
        self.data
            .create_user(UserData {
                password: password_hash,
                ..user.clone()
            })
            .await?;

        info!(username = %user.username, "Registered user");
        self.issue_token(&user.username).await
    }

    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<AuthData> {
        if username.is_empty() || password.is_empty() {
            return Err(ServiceError::BadRequest("missing required fields".to_string()));
        }
        let user = self
            .data
            .get_user(username)
            .await?
            .ok_or(ServiceError::Unauthorized)?;

        if !verify_password(password, &user.password) {
            return Err(ServiceError::Unauthorized);
        }
        self.issue_token(username).await
    }

    pub async fn logout(&self, auth_token: &str) -> ServiceResult<()> {
        self.validate(auth_token).await?;
        self.data.delete_auth(auth_token).await
    }

    /// Resolve a token to its identity
    pub async fn validate(&self, auth_token: &str) -> ServiceResult<AuthData> {
        if auth_token.is_empty() {
            return Err(ServiceError::Unauthorized);
        }
        self.data
            .get_auth(auth_token)
            .await?
            .ok_or(ServiceError::Unauthorized)
    }

    pub async fn create_game(&self, auth_token: &str, game_name: &str) -> ServiceResult<GameId> {
        self.validate(auth_token).await?;
        if game_name.trim().is_empty() {
            return Err(ServiceError::BadRequest("missing game name".to_string()));
        }
        let game = self.data.create_game(game_name).await?;
        info!(game_id = game.game_id, name = %game_name, "Created game");
        Ok(game.game_id)
    }

    pub async fn list_games(&self, auth_token: &str) -> ServiceResult<Vec<GameSummary>> {
        self.validate(auth_token).await?;
        let games = self.data.list_games().await?;
        Ok(games.iter().map(GameSummary::from).collect())
    }

    /// Take a seat. `player_color` is "white" or "black", any case.
    pub async fn join_game(
        &self,
        auth_token: &str,
        player_color: &str,
        game_id: GameId,
    ) -> ServiceResult<()> {
        let auth = self.validate(auth_token).await?;
        let color: TeamColor = player_color
            .parse()
            .map_err(|_| ServiceError::BadRequest("invalid color".to_string()))?;

        self.data.join_game(&auth.username, color, game_id).await?;
        info!(game_id, username = %auth.username, %color, "Player joined game");
        Ok(())
    }

    pub async fn get_game(&self, auth_token: &str, game_id: GameId) -> ServiceResult<GameData> {
        self.validate(auth_token).await?;
        self.require_game(game_id).await
    }

    /// Validate and play a move for `auth`, then persist the new snapshot.
    ///
    /// Only the seated player whose color is on move may move, and not after
    /// the game is over. Checkmate or stalemate of the opponent ends the game.
    /// Nothing is written unless the move is accepted.
    pub async fn apply_move(
        &self,
        auth: &AuthData,
        game_id: GameId,
        mv: ChessMove,
    ) -> ServiceResult<MoveOutcome> {
        let mut data = self.require_game(game_id).await?;
        if data.game_over {
            return Err(ServiceError::BadRequest("game is over".to_string()));
        }

        // One user may hold both seats, so match against the side on move
        let turn = data.game.team_turn();
        if data.username_for(turn) != Some(auth.username.as_str()) {
            return match data.color_of(&auth.username) {
                Some(found) => Err(RulesError::WrongTurn {
                    expected: turn,
                    found,
                }
                .into()),
                None => Err(ServiceError::BadRequest(
                    "observers cannot make moves".to_string(),
                )),
            };
        }
        let mover = turn;

        let applied = data.game.make_move(mv)?;
        let opponent_status = data.game.status(mover.opponent());
        data.game_over = opponent_status.is_over();
        self.data
            .update_game(game_id, &data.game, data.game_over)
            .await?;

        if data.game_over {
            info!(game_id, status = ?opponent_status, "Game over");
        }
        Ok(MoveOutcome {
            game: data,
            applied,
            mover,
            opponent_status,
        })
    }

    /// Give up `auth`'s seat. `None` when they were not seated, in which
    /// case nothing changes.
    pub async fn leave_game(
        &self,
        auth: &AuthData,
        game_id: GameId,
    ) -> ServiceResult<Option<TeamColor>> {
        let data = self.require_game(game_id).await?;
        let Some(color) = data.color_of(&auth.username) else {
            return Ok(None);
        };
        self.data.leave_game(&auth.username, game_id).await?;
        Ok(Some(color))
    }

    /// End the game by resignation. Returns the resigning color.
    pub async fn resign_game(&self, auth: &AuthData, game_id: GameId) -> ServiceResult<TeamColor> {
        let data = self.require_game(game_id).await?;
        let color = data
            .color_of(&auth.username)
            .ok_or_else(|| ServiceError::BadRequest("observers cannot resign".to_string()))?;
        if data.game_over {
            return Err(ServiceError::BadRequest("game is already over".to_string()));
        }

        self.data.resign_game(game_id).await?;
        info!(game_id, username = %auth.username, "Player resigned");
        Ok(color)
    }

    async fn require_game(&self, game_id: GameId) -> ServiceResult<GameData> {
        self.data
            .get_game(game_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("game {}", game_id)))
    }

    async fn issue_token(&self, username: &str) -> ServiceResult<AuthData> {
        let auth = AuthData {
            username: username.to_string(),
            auth_token: Uuid::new_v4().to_string(),
        };
        self.data.create_auth(auth.clone()).await?;
        Ok(auth)
    }
}
