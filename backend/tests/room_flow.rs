//! Game room protocol tests
//!
//! Drives `GameServer` with channel-backed connections and checks what every
//! participant receives.

use async_trait::async_trait;
use backend::api::AppState;
use backend::data_access::{DataAccess, MemoryDataAccess};
use backend::error::ServiceResult;
use backend::rooms::Connection;
use chess_rules::{ChessGame, PieceType, TeamColor};
use serde_json::{json, Value};
use shared::models::{AuthData, GameData, UserData};
use shared::protocol::GameId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// In-memory storage whose game reads take a while, so that concurrent
/// commands overlap unless something serializes them
struct SlowReads(MemoryDataAccess);

#[async_trait]
impl DataAccess for SlowReads {
    async fn clear(&self) -> ServiceResult<()> {
        self.0.clear().await
    }
    async fn create_user(&self, user: UserData) -> ServiceResult<()> {
        self.0.create_user(user).await
    }
    async fn get_user(&self, username: &str) -> ServiceResult<Option<UserData>> {
        self.0.get_user(username).await
    }
    async fn create_auth(&self, auth: AuthData) -> ServiceResult<()> {
        self.0.create_auth(auth).await
    }
    async fn get_auth(&self, auth_token: &str) -> ServiceResult<Option<AuthData>> {
        self.0.get_auth(auth_token).await
    }
    async fn delete_auth(&self, auth_token: &str) -> ServiceResult<()> {
        self.0.delete_auth(auth_token).await
    }
    async fn create_game(&self, game_name: &str) -> ServiceResult<GameData> {
        self.0.create_game(game_name).await
    }
    async fn list_games(&self) -> ServiceResult<Vec<GameData>> {
        self.0.list_games().await
    }
    async fn get_game(&self, game_id: GameId) -> ServiceResult<Option<GameData>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.0.get_game(game_id).await
    }
    async fn join_game(
        &self,
        username: &str,
        color: TeamColor,
        game_id: GameId,
    ) -> ServiceResult<()> {
        self.0.join_game(username, color, game_id).await
    }
    async fn leave_game(&self, username: &str, game_id: GameId) -> ServiceResult<()> {
        self.0.leave_game(username, game_id).await
    }
    async fn resign_game(&self, game_id: GameId) -> ServiceResult<()> {
        self.0.resign_game(game_id).await
    }
    async fn update_game(
        &self,
        game_id: GameId,
        game: &ChessGame,
        game_over: bool,
    ) -> ServiceResult<()> {
        self.0.update_game(game_id, game, game_over).await
    }
}

struct Room {
    state: AppState,
    white: String,
    black: String,
    observer: String,
    game_id: i32,
}

async fn room() -> Room {
    room_over(Arc::new(MemoryDataAccess::new())).await
}

/// Registers three users, creates games up to id 7 and seats white/black in 7
async fn room_over(data: Arc<dyn DataAccess>) -> Room {
    let state = AppState::new(data);
    let mut tokens = Vec::new();
    for name in ["white", "black", "observer"] {
        let auth = state
            .service
            .register(UserData {
                username: name.to_string(),
                password: "secret".to_string(),
                email: format!("{}@example.com", name),
            })
            .await
            .unwrap();
        tokens.push(auth.auth_token);
    }

    let mut game_id = 0;
    while game_id < 7 {
        game_id = state
            .service
            .create_game(&tokens[0], &format!("game {}", game_id + 1))
            .await
            .unwrap();
    }
    state
        .service
        .join_game(&tokens[0], "white", game_id)
        .await
        .unwrap();
    state
        .service
        .join_game(&tokens[1], "black", game_id)
        .await
        .unwrap();

    Room {
        state,
        white: tokens[0].clone(),
        black: tokens[1].clone(),
        observer: tokens[2].clone(),
        game_id,
    }
}

/// Everything queued for a connection so far
fn drain(receiver: &mut UnboundedReceiver<String>) -> Vec<Value> {
    let mut messages = Vec::new();
    while let Ok(text) = receiver.try_recv() {
        messages.push(serde_json::from_str(&text).unwrap());
    }
    messages
}

fn command(kind: &str, token: &str, game_id: i32) -> String {
    json!({"commandType": kind, "authToken": token, "gameId": game_id}).to_string()
}

fn make_move(token: &str, game_id: i32, from: (i8, i8), to: (i8, i8)) -> String {
    json!({
        "commandType": "MAKE_MOVE",
        "authToken": token,
        "gameId": game_id,
        "move": {
            "start": {"row": from.0, "col": from.1},
            "end": {"row": to.0, "col": to.1},
            "promotion": null
        }
    })
    .to_string()
}

fn kinds(messages: &[Value]) -> Vec<&str> {
    messages
        .iter()
        .map(|message| message["serverMessageType"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_connect_loads_game_and_notifies_others() {
    let room = room().await;
    let server = &room.state.server;
    let (white, mut white_rx) = Connection::new();
    let (black, mut black_rx) = Connection::new();

    server
        .handle_message(&white, &command("CONNECT", &room.white, room.game_id))
        .await;
    let received = drain(&mut white_rx);
    assert_eq!(kinds(&received), ["LOAD_GAME"]);
    assert_eq!(received[0]["game"]["teamTurn"], "WHITE");

    server
        .handle_message(&black, &command("CONNECT", &room.black, room.game_id))
        .await;
    assert_eq!(kinds(&drain(&mut black_rx)), ["LOAD_GAME"]);
    let notices = drain(&mut white_rx);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0]["message"], "black has joined as black.");
    assert_eq!(server.registry().room_size(room.game_id), 2);
}

#[tokio::test]
async fn test_connect_with_bad_token_is_rejected() {
    let room = room().await;
    let server = &room.state.server;
    let (connection, mut rx) = Connection::new();

    server
        .handle_message(&connection, &command("CONNECT", "bogus", room.game_id))
        .await;

    let received = drain(&mut rx);
    assert_eq!(kinds(&received), ["ERROR"]);
    assert!(received[0]["errorMessage"]
        .as_str()
        .unwrap()
        .starts_with("Error:"));
    assert_eq!(server.registry().room_size(room.game_id), 0);
}

#[tokio::test]
async fn test_connect_to_missing_game_is_rejected() {
    let room = room().await;
    let (connection, mut rx) = Connection::new();
    room.state
        .server
        .handle_message(&connection, &command("CONNECT", &room.white, 99))
        .await;
    assert_eq!(kinds(&drain(&mut rx)), ["ERROR"]);
}

#[tokio::test]
async fn test_move_broadcasts_load_game_to_everyone() {
    let room = room().await;
    let server = &room.state.server;
    let (white, mut white_rx) = Connection::new();
    let (black, mut black_rx) = Connection::new();
    server
        .handle_message(&white, &command("CONNECT", &room.white, room.game_id))
        .await;
    server
        .handle_message(&black, &command("CONNECT", &room.black, room.game_id))
        .await;
    drain(&mut white_rx);
    drain(&mut black_rx);

    server
        .handle_message(&white, &make_move(&room.white, room.game_id, (2, 5), (4, 5)))
        .await;

    let mover = drain(&mut white_rx);
    assert_eq!(kinds(&mover), ["LOAD_GAME"]);
    assert_eq!(mover[0]["game"]["teamTurn"], "BLACK");

    let other = drain(&mut black_rx);
    assert_eq!(kinds(&other), ["NOTIFICATION", "LOAD_GAME"]);
    assert_eq!(other[0]["message"], "white moved e2 to e4");
    assert_eq!(other[1], mover[0]);
}

#[tokio::test]
async fn test_rejected_move_errors_only_the_sender() {
    let room = room().await;
    let server = &room.state.server;
    let (white, mut white_rx) = Connection::new();
    let (black, mut black_rx) = Connection::new();
    let (watcher, mut watcher_rx) = Connection::new();
    for (connection, token) in [
        (&white, &room.white),
        (&black, &room.black),
        (&watcher, &room.observer),
    ] {
        server
            .handle_message(connection, &command("CONNECT", token, room.game_id))
            .await;
    }
    drain(&mut white_rx);
    drain(&mut black_rx);
    drain(&mut watcher_rx);

    // black out of turn
    server
        .handle_message(&black, &make_move(&room.black, room.game_id, (7, 5), (5, 5)))
        .await;
    // observer
    server
        .handle_message(
            &watcher,
            &make_move(&room.observer, room.game_id, (2, 5), (4, 5)),
        )
        .await;
    // geometry
    server
        .handle_message(&white, &make_move(&room.white, room.game_id, (2, 5), (5, 5)))
        .await;

    assert_eq!(kinds(&drain(&mut black_rx)), ["ERROR"]);
    assert_eq!(kinds(&drain(&mut watcher_rx)), ["ERROR"]);
    assert_eq!(kinds(&drain(&mut white_rx)), ["ERROR"]);

    let game = room
        .state
        .service
        .get_game(&room.white, room.game_id)
        .await
        .unwrap();
    assert_eq!(game.game, ChessGame::new());
}

#[tokio::test]
async fn test_malformed_command_keeps_connection() {
    let room = room().await;
    let server = &room.state.server;
    let (connection, mut rx) = Connection::new();

    server.handle_message(&connection, "not json").await;
    server
        .handle_message(&connection, r#"{"commandType": "DANCE", "authToken": "x", "gameId": 1}"#)
        .await;
    assert_eq!(kinds(&drain(&mut rx)), ["ERROR", "ERROR"]);

    server
        .handle_message(&connection, &command("CONNECT", &room.white, room.game_id))
        .await;
    assert_eq!(kinds(&drain(&mut rx)), ["LOAD_GAME"]);
}

#[tokio::test]
async fn test_checkmate_is_announced_to_room() {
    let room = room().await;
    let server = &room.state.server;
    let (white, mut white_rx) = Connection::new();
    let (black, mut black_rx) = Connection::new();
    server
        .handle_message(&white, &command("CONNECT", &room.white, room.game_id))
        .await;
    server
        .handle_message(&black, &command("CONNECT", &room.black, room.game_id))
        .await;

    let plies = [
        (&white, &room.white, (2, 6), (3, 6)),
        (&black, &room.black, (7, 5), (5, 5)),
        (&white, &room.white, (2, 7), (4, 7)),
        (&black, &room.black, (8, 4), (4, 8)),
    ];
    for (connection, token, from, to) in plies {
        server
            .handle_message(connection, &make_move(token, room.game_id, from, to))
            .await;
    }

    let last = drain(&mut white_rx).pop().unwrap();
    assert_eq!(last["message"], "white is in checkmate. black wins.");
    assert_eq!(
        drain(&mut black_rx).pop().unwrap()["message"],
        "white is in checkmate. black wins."
    );

    server
        .handle_message(&white, &make_move(&room.white, room.game_id, (2, 1), (3, 1)))
        .await;
    assert_eq!(kinds(&drain(&mut white_rx)), ["ERROR"]);
}

#[tokio::test]
async fn test_resign_notifies_everyone_and_removes_resigner() {
    let room = room().await;
    let server = &room.state.server;
    let (white, mut white_rx) = Connection::new();
    let (black, mut black_rx) = Connection::new();
    server
        .handle_message(&white, &command("CONNECT", &room.white, room.game_id))
        .await;
    server
        .handle_message(&black, &command("CONNECT", &room.black, room.game_id))
        .await;
    drain(&mut white_rx);
    drain(&mut black_rx);

    server
        .handle_message(&black, &command("RESIGN", &room.black, room.game_id))
        .await;

    assert_eq!(drain(&mut black_rx)[0]["message"], "black has resigned.");
    assert_eq!(drain(&mut white_rx)[0]["message"], "black has resigned.");
    assert_eq!(server.registry().room_size(room.game_id), 1);

    server
        .handle_message(&white, &command("RESIGN", &room.white, room.game_id))
        .await;
    assert_eq!(kinds(&drain(&mut white_rx)), ["ERROR"]);
}

#[tokio::test]
async fn test_player_leave_notifies_and_observer_leave_is_silent() {
    let room = room().await;
    let server = &room.state.server;
    let (white, mut white_rx) = Connection::new();
    let (black, mut black_rx) = Connection::new();
    let (watcher, mut watcher_rx) = Connection::new();
    for (connection, token) in [
        (&white, &room.white),
        (&black, &room.black),
        (&watcher, &room.observer),
    ] {
        server
            .handle_message(connection, &command("CONNECT", token, room.game_id))
            .await;
    }
    drain(&mut white_rx);
    drain(&mut black_rx);
    drain(&mut watcher_rx);

    server
        .handle_message(&watcher, &command("LEAVE", &room.observer, room.game_id))
        .await;
    assert!(drain(&mut watcher_rx).is_empty());
    assert!(drain(&mut white_rx).is_empty());
    assert_eq!(server.registry().room_size(room.game_id), 2);

    server
        .handle_message(&white, &command("LEAVE", &room.white, room.game_id))
        .await;
    assert!(drain(&mut white_rx).is_empty());
    assert_eq!(drain(&mut black_rx)[0]["message"], "white has left the game.");
    assert_eq!(server.registry().room_size(room.game_id), 1);

    let game = room
        .state
        .service
        .get_game(&room.black, room.game_id)
        .await
        .unwrap();
    assert!(game.white_username.is_none());
}

#[tokio::test]
async fn test_closed_connection_is_dropped_on_broadcast() {
    let room = room().await;
    let server = &room.state.server;
    let (white, mut white_rx) = Connection::new();
    let (black, black_rx) = Connection::new();
    server
        .handle_message(&white, &command("CONNECT", &room.white, room.game_id))
        .await;
    server
        .handle_message(&black, &command("CONNECT", &room.black, room.game_id))
        .await;
    drain(&mut white_rx);
    drop(black_rx);

    server
        .handle_message(&white, &make_move(&room.white, room.game_id, (2, 5), (4, 5)))
        .await;

    assert_eq!(kinds(&drain(&mut white_rx)), ["LOAD_GAME"]);
    assert_eq!(server.registry().room_size(room.game_id), 1);
}

#[tokio::test]
async fn test_close_removes_connection_from_all_rooms() {
    let room = room().await;
    let server = &room.state.server;
    let (connection, _rx) = Connection::new();
    server
        .handle_message(&connection, &command("CONNECT", &room.observer, room.game_id))
        .await;
    server
        .handle_message(&connection, &command("CONNECT", &room.observer, 1))
        .await;
    assert_eq!(server.registry().room_count(), 2);

    server.handle_close(&connection);
    assert_eq!(server.registry().room_count(), 0);
}

#[tokio::test]
async fn test_connect_from_vanished_client_is_not_registered() {
    let room = room().await;
    let server = &room.state.server;
    let (white, mut white_rx) = Connection::new();
    let (gone, gone_rx) = Connection::new();
    server
        .handle_message(&white, &command("CONNECT", &room.white, room.game_id))
        .await;
    drain(&mut white_rx);
    drop(gone_rx);

    server
        .handle_message(&gone, &command("CONNECT", &room.black, room.game_id))
        .await;

    assert_eq!(server.registry().room_size(room.game_id), 1);
    assert!(server.registry().participant(room.game_id, gone.id()).is_none());
    assert!(drain(&mut white_rx).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_moves_on_one_game_are_serialized() {
    let room = room_over(Arc::new(SlowReads(MemoryDataAccess::new()))).await;
    let server = room.state.server.clone();
    let (white, mut white_rx) = Connection::new();
    server
        .handle_message(&white, &command("CONNECT", &room.white, room.game_id))
        .await;
    drain(&mut white_rx);

    let tasks: Vec<_> = [(2, 5), (2, 4)]
        .into_iter()
        .map(|from| {
            let server = server.clone();
            let connection = white.clone();
            let text = make_move(&room.white, room.game_id, from, (4, from.1));
            tokio::spawn(async move { server.handle_message(&connection, &text).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let received = drain(&mut white_rx);
    let load_games = kinds(&received)
        .into_iter()
        .filter(|kind| *kind == "LOAD_GAME")
        .count();
    let errors = kinds(&received)
        .into_iter()
        .filter(|kind| *kind == "ERROR")
        .count();
    assert_eq!((load_games, errors), (1, 1));

    let game = room
        .state
        .service
        .get_game(&room.white, room.game_id)
        .await
        .unwrap();
    assert_eq!(game.game.team_turn(), TeamColor::Black);
    let pushed = ["e4", "d4"]
        .into_iter()
        .filter(|square| {
            game.game
                .board()
                .piece_at(square.parse().unwrap())
                .is_some_and(|piece| piece.piece_type == PieceType::Pawn)
        })
        .count();
    assert_eq!(pushed, 1);
}
