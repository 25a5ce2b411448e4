//! WebSocket command handler
//!
//! Each socket gets a [`Connection`]; every text frame it sends is handed to
//! [`GameServer::handle_message`]. Commands touching a game run under that
//! game's lock, so validation, persistence and the resulting broadcasts for
//! one command finish before the next command for the same game starts.
//!
//! A failing command produces exactly one `ERROR`, sent only to the
//! connection that issued it.

use crate::error::{ServiceError, ServiceResult};
use crate::rooms::{Connection, ConnectionRegistry, GameLocks, Participant, Role};
use crate::service::{GameService, MoveOutcome};
use chess_rules::{ChessMove, GameStatus, TeamColor};
use shared::models::GameData;
use shared::protocol::{GameId, ServerMessage, UserGameCommand};
use tracing::{debug, info, warn};

pub struct GameServer {
    service: GameService,
    registry: ConnectionRegistry,
    locks: GameLocks,
}

impl GameServer {
    pub fn new(service: GameService) -> Self {
        Self {
            service,
            registry: ConnectionRegistry::new(),
            locks: GameLocks::new(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Parse and run one inbound frame
    pub async fn handle_message(&self, connection: &Connection, text: &str) {
        let command: UserGameCommand = match serde_json::from_str(text) {
            Ok(command) => command,
            Err(err) => {
                warn!(connection = %connection.id(), error = %err, "Malformed command");
                self.send_error(
                    connection,
                    &ServiceError::BadRequest(format!("malformed command: {}", err)),
                );
                return;
            }
        };

        let game_id = command.game_id();
        debug!(
            connection = %connection.id(),
            game_id,
            command = command.command_type(),
            "Dispatching command"
        );

        let auth_token = command.auth_token();
        let result = match &command {
            UserGameCommand::Connect { .. } => self.connect(connection, auth_token, game_id).await,
            UserGameCommand::MakeMove { chess_move, .. } => {
                self.make_move(connection, auth_token, game_id, *chess_move)
                    .await
            }
            UserGameCommand::Leave { .. } => self.leave(connection, auth_token, game_id).await,
            UserGameCommand::Resign { .. } => self.resign(connection, auth_token, game_id).await,
        };

        if let Err(err) = result {
            warn!(connection = %connection.id(), game_id, error = %err, "Command rejected");
            self.send_error(connection, &err);
        }
    }

    /// The socket is gone: drop it from every room without notifying anyone
    pub fn handle_close(&self, connection: &Connection) {
        let rooms = self.registry.remove_connection(connection.id());
        info!(connection = %connection.id(), ?rooms, "Connection closed");
    }

    async fn connect(
        &self,
        connection: &Connection,
        auth_token: &str,
        game_id: GameId,
    ) -> ServiceResult<()> {
        let _guard = self.locks.lock(game_id).await;
        let auth = self.service.validate(auth_token).await?;
        let data = self.service.get_game(auth_token, game_id).await?;

        let role = Role::from(data.color_of(&auth.username));
        let snapshot = ServerMessage::load_game(data.game).to_json()?;
        let joined = ServerMessage::notification(format!(
            "{} has joined as {}.",
            auth.username, role
        ))
        .to_json()?;

        self.registry.add(
            game_id,
            Participant {
                connection: connection.clone(),
                username: auth.username.clone(),
                role,
            },
        );
        if !connection.send(&snapshot) {
            self.registry.remove(game_id, connection.id());
            debug!(game_id, username = %auth.username, "Joiner went away before the snapshot");
            return Ok(());
        }
        self.registry
            .broadcast(game_id, Some(connection.id()), &joined);

        info!(game_id, username = %auth.username, %role, "Joined room");
        Ok(())
    }

    async fn make_move(
        &self,
        connection: &Connection,
        auth_token: &str,
        game_id: GameId,
        chess_move: ChessMove,
    ) -> ServiceResult<()> {
        let _guard = self.locks.lock(game_id).await;
        let auth = self.service.validate(auth_token).await?;
        let outcome = self.service.apply_move(&auth, game_id, chess_move).await?;

        let moved =
            ServerMessage::notification(move_description(&auth.username, &outcome.applied))
                .to_json()?;
        let snapshot = ServerMessage::load_game(outcome.game.game.clone()).to_json()?;
        self.registry
            .broadcast(game_id, Some(connection.id()), &moved);
        self.send_to_room(connection, game_id, &snapshot);

        if let Some(message) = status_message(&outcome) {
            self.send_to_room(connection, game_id, &ServerMessage::notification(message).to_json()?);
        }

        debug!(game_id, username = %auth.username, mv = %outcome.applied, "Move applied");
        Ok(())
    }

    async fn leave(
        &self,
        connection: &Connection,
        auth_token: &str,
        game_id: GameId,
    ) -> ServiceResult<()> {
        let _guard = self.locks.lock(game_id).await;
        let auth = self.service.validate(auth_token).await?;
        let seat = self.service.leave_game(&auth, game_id).await?;
        self.registry.remove(game_id, connection.id());

        if seat.is_none() {
            debug!(game_id, username = %auth.username, "Observer disconnected");
            return Ok(());
        }

        let left = ServerMessage::notification(format!("{} has left the game.", auth.username))
            .to_json()?;
        self.registry
            .broadcast(game_id, Some(connection.id()), &left);
        info!(game_id, username = %auth.username, "Player left");
        Ok(())
    }

    async fn resign(
        &self,
        connection: &Connection,
        auth_token: &str,
        game_id: GameId,
    ) -> ServiceResult<()> {
        let _guard = self.locks.lock(game_id).await;
        let auth = self.service.validate(auth_token).await?;
        self.service.resign_game(&auth, game_id).await?;

        let resigned = ServerMessage::notification(format!("{} has resigned.", auth.username))
            .to_json()?;
        self.send_to_room(connection, game_id, &resigned);
        self.registry.remove(game_id, connection.id());
        Ok(())
    }

    /// Broadcast to the whole room, making sure `connection` gets it even if
    /// it never sent CONNECT for this game
    fn send_to_room(&self, connection: &Connection, game_id: GameId, payload: &str) {
        let member = self
            .registry
            .participant(game_id, connection.id())
            .is_some();
        self.registry.broadcast(game_id, None, payload);
        if !member {
            connection.send(payload);
        }
    }

    fn send_error(&self, connection: &Connection, err: &ServiceError) {
        match ServerMessage::error(err.client_message()).to_json() {
            Ok(payload) => {
                connection.send(&payload);
            }
            Err(err) => warn!(connection = %connection.id(), error = %err, "Could not encode error"),
        }
    }
}

/// "lee moved e2 to e4", with the promotion piece when there is one
fn move_description(username: &str, mv: &ChessMove) -> String {
    let mut text = format!("{} moved {} to {}", username, mv.start, mv.end);
    if let Some(piece) = mv.promotion {
        text.push_str(&format!(" (promoted to {})", piece));
    }
    text
}

fn player_name(data: &GameData, color: TeamColor) -> String {
    data.username_for(color)
        .map_or_else(|| color.to_string(), str::to_string)
}

/// Room-wide announcement for the side now on move, if any
fn status_message(outcome: &MoveOutcome) -> Option<String> {
    let defender = player_name(&outcome.game, outcome.mover.opponent());
    match outcome.opponent_status {
        GameStatus::InProgress => None,
        GameStatus::Check => Some(format!("{} is in check.", defender)),
        GameStatus::Checkmate => Some(format!(
            "{} is in checkmate. {} wins.",
            defender,
            player_name(&outcome.game, outcome.mover)
        )),
        GameStatus::Stalemate => Some(format!("{} is in stalemate. The game is a draw.", defender)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_rules::{PieceType, Position};

    #[test]
    fn test_move_description() {
        let push = ChessMove::new(Position::new(2, 5), Position::new(4, 5), None);
        assert_eq!(move_description("lee", &push), "lee moved e2 to e4");

        let promote = ChessMove::new(
            Position::new(7, 1),
            Position::new(8, 1),
            Some(PieceType::Knight),
        );
        assert_eq!(
            move_description("lee", &promote),
            "lee moved a7 to a8 (promoted to KNIGHT)"
        );
    }

    #[test]
    fn test_status_message_names_players() {
        let mut game = GameData::new(1, "match");
        game.white_username = Some("lee".to_string());
        let mut outcome = MoveOutcome {
            game,
            applied: ChessMove::new(Position::new(2, 5), Position::new(4, 5), None),
            mover: TeamColor::White,
            opponent_status: GameStatus::InProgress,
        };
        assert_eq!(status_message(&outcome), None);

        outcome.opponent_status = GameStatus::Check;
        assert_eq!(status_message(&outcome).unwrap(), "black is in check.");

        outcome.opponent_status = GameStatus::Checkmate;
        assert_eq!(
            status_message(&outcome).unwrap(),
            "black is in checkmate. lee wins."
        );
    }
}
