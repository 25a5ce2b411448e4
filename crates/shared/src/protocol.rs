//! WebSocket protocol
//!
//! Every frame is a JSON text message. Clients send [`UserGameCommand`]s,
//! tagged by `commandType`; the server answers with [`ServerMessage`]s,
//! tagged by `serverMessageType`.

use chess_rules::{ChessGame, ChessMove};
use serde::{Deserialize, Serialize};

/// Game identifier as carried on the wire
pub type GameId = i32;

/// Client → Server
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(
    tag = "commandType",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum UserGameCommand {
    Connect {
        auth_token: String,
        #[serde(alias = "gameID")]
        game_id: GameId,
    },
    MakeMove {
        auth_token: String,
        #[serde(alias = "gameID")]
        game_id: GameId,
        #[serde(rename = "move")]
        chess_move: ChessMove,
    },
    Leave {
        auth_token: String,
        #[serde(alias = "gameID")]
        game_id: GameId,
    },
    Resign {
        auth_token: String,
        #[serde(alias = "gameID")]
        game_id: GameId,
    },
}

impl UserGameCommand {
    pub fn auth_token(&self) -> &str {
        match self {
            UserGameCommand::Connect { auth_token, .. }
            | UserGameCommand::MakeMove { auth_token, .. }
            | UserGameCommand::Leave { auth_token, .. }
            | UserGameCommand::Resign { auth_token, .. } => auth_token,
        }
    }

    pub fn game_id(&self) -> GameId {
        match self {
            UserGameCommand::Connect { game_id, .. }
            | UserGameCommand::MakeMove { game_id, .. }
            | UserGameCommand::Leave { game_id, .. }
            | UserGameCommand::Resign { game_id, .. } => *game_id,
        }
    }

    /// Wire name of the command, for logging
    pub fn command_type(&self) -> &'static str {
        match self {
            UserGameCommand::Connect { .. } => "CONNECT",
            UserGameCommand::MakeMove { .. } => "MAKE_MOVE",
            UserGameCommand::Leave { .. } => "LEAVE",
            UserGameCommand::Resign { .. } => "RESIGN",
        }
    }
}

/// Server → Client
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(
    tag = "serverMessageType",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Full authoritative snapshot (board + side to move)
    LoadGame { game: ChessGame },
    /// Human-readable event in the room
    Notification { message: String },
    /// Rejection of the recipient's own command
    Error { error_message: String },
}

impl ServerMessage {
    pub fn load_game(game: ChessGame) -> Self {
        ServerMessage::LoadGame { game }
    }

    pub fn notification(message: impl Into<String>) -> Self {
        ServerMessage::Notification {
            message: message.into(),
        }
    }

    pub fn error(error_message: impl Into<String>) -> Self {
        ServerMessage::Error {
            error_message: error_message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_rules::{PieceType, Position};
    use serde_json::{json, Value};

    #[test]
    fn test_connect_command_wire_format() {
        let msg = UserGameCommand::Connect {
            auth_token: "abc".to_string(),
            game_id: 7,
        };
        let value = serde_json::to_value(&msg).expect("Should serialize");
        assert_eq!(
            value,
            json!({"commandType": "CONNECT", "authToken": "abc", "gameId": 7})
        );
    }

    #[test]
    fn test_make_move_command_deserialization() {
        let text = r#"{
            "commandType": "MAKE_MOVE",
            "authToken": "tok",
            "gameId": 3,
            "move": {"start": {"row": 7, "col": 1}, "end": {"row": 8, "col": 1}, "promotion": "KNIGHT"}
        }"#;
        let decoded: UserGameCommand = serde_json::from_str(text).expect("Should deserialize");

        match decoded {
            UserGameCommand::MakeMove {
                auth_token,
                game_id,
                chess_move,
            } => {
                assert_eq!(auth_token, "tok");
                assert_eq!(game_id, 3);
                assert_eq!(chess_move.start, Position::new(7, 1));
                assert_eq!(chess_move.promotion, Some(PieceType::Knight));
            }
            _ => panic!("Wrong command type after deserialization"),
        }
    }

    #[test]
    fn test_command_accepts_upper_case_game_id() {
        let text = r#"{"commandType": "RESIGN", "authToken": "tok", "gameID": 12}"#;
        let decoded: UserGameCommand = serde_json::from_str(text).expect("Should deserialize");
        assert_eq!(decoded.game_id(), 12);
        assert_eq!(decoded.command_type(), "RESIGN");
        assert_eq!(decoded.auth_token(), "tok");
    }

    #[test]
    fn test_unknown_command_rejected() {
        let text = r#"{"commandType": "DANCE", "authToken": "tok", "gameId": 1}"#;
        assert!(serde_json::from_str::<UserGameCommand>(text).is_err());
        assert!(serde_json::from_str::<UserGameCommand>("not json").is_err());
    }

    #[test]
    fn test_make_move_without_move_rejected() {
        let text = r#"{"commandType": "MAKE_MOVE", "authToken": "tok", "gameId": 1}"#;
        assert!(serde_json::from_str::<UserGameCommand>(text).is_err());
    }

    #[test]
    fn test_load_game_message() {
        let msg = ServerMessage::load_game(ChessGame::new());
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["serverMessageType"], "LOAD_GAME");
        assert_eq!(value["game"]["teamTurn"], "WHITE");

        let decoded: ServerMessage = serde_json::from_value(value).expect("Should deserialize");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_error_and_notification_messages() {
        let err = serde_json::to_value(ServerMessage::error("Error: bad")).unwrap();
        assert_eq!(err, json!({"serverMessageType": "ERROR", "errorMessage": "Error: bad"}));

        let note = serde_json::to_value(ServerMessage::notification("hi")).unwrap();
        assert_eq!(note, json!({"serverMessageType": "NOTIFICATION", "message": "hi"}));
    }
}
