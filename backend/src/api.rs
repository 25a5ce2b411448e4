//! HTTP routes and the WebSocket upgrade
//!
//! | Route | Handler |
//! |---|---|
//! | `DELETE /db` | wipe all data |
//! | `POST /user`, `POST /session`, `DELETE /session` | [`crate::auth`] |
//! | `GET /game`, `POST /game`, `PUT /game` | list, create, join |
//! | `GET /ws` | game room protocol, see [`crate::game`] |

use crate::auth::{self, auth_token};
use crate::data_access::DataAccess;
use crate::error::ServiceResult;
use crate::game::GameServer;
use crate::rooms::Connection;
use crate::service::GameService;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Json, State,
    },
    http::HeaderMap,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use shared::models::{
    CreateGameRequest, CreateGameResponse, JoinGameRequest, ListGamesResponse,
};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub service: GameService,
    pub server: Arc<GameServer>,
}

impl AppState {
    pub fn new(data: Arc<dyn DataAccess>) -> Self {
        let service = GameService::new(data);
        let server = Arc::new(GameServer::new(service.clone()));
        Self { service, server }
    }
}

pub fn router(data: Arc<dyn DataAccess>) -> Router {
    router_with_state(AppState::new(data))
}

pub fn router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/db", delete(clear))
        .route("/user", post(auth::register))
        .route("/session", post(auth::login).delete(auth::logout))
        .route(
            "/game",
            get(list_games).post(create_game).put(join_game),
        )
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn clear(State(state): State<AppState>) -> ServiceResult<Json<Value>> {
    state.service.clear().await?;
    info!("Database cleared");
    Ok(Json(json!({})))
}

async fn list_games(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServiceResult<Json<ListGamesResponse>> {
    let games = state.service.list_games(auth_token(&headers)).await?;
    Ok(Json(ListGamesResponse { games }))
}

async fn create_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGameRequest>,
) -> ServiceResult<Json<CreateGameResponse>> {
    let game_id = state
        .service
        .create_game(auth_token(&headers), &payload.game_name)
        .await?;
    Ok(Json(CreateGameResponse { game_id }))
}

async fn join_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<JoinGameRequest>,
) -> ServiceResult<Json<Value>> {
    state
        .service
        .join_game(auth_token(&headers), &payload.player_color, payload.game_id)
        .await?;
    Ok(Json(json!({})))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.server))
}

/// Pump one socket: a writer task drains the connection's queue while this
/// task feeds inbound text frames to the game server in order.
async fn handle_socket(socket: WebSocket, server: Arc<GameServer>) {
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut outbound) = Connection::new();
    info!(connection = %connection.id(), "WebSocket connected");

    let writer = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => server.handle_message(&connection, text.as_str()).await,
            Message::Close(_) => break,
            other => debug!(connection = %connection.id(), ?other, "Ignoring frame"),
        }
    }

    server.handle_close(&connection);
    drop(connection);
    writer.abort();
}
