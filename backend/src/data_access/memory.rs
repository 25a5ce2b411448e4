use super::{DataAccess, NOT_A_PLAYER};
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use chess_rules::{ChessGame, TeamColor};
use parking_lot::RwLock;
use shared::models::{AuthData, GameData, UserData};
use shared::protocol::GameId;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserData>,
    auths: HashMap<String, AuthData>,
    games: BTreeMap<GameId, GameData>,
}

/// Data access backed by in-process maps. Ids start at 1.
#[derive(Default)]
pub struct MemoryDataAccess {
    tables: RwLock<Tables>,
    last_game_id: AtomicI32,
}

impl MemoryDataAccess {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_game<T>(
        &self,
        game_id: GameId,
        update: impl FnOnce(&mut GameData) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let mut tables = self.tables.write();
        let game = tables
            .games
            .get_mut(&game_id)
            .ok_or_else(|| ServiceError::NotFound(format!("game {}", game_id)))?;
        update(game)
    }
}

fn seat(game: &mut GameData, color: TeamColor) -> &mut Option<String> {
    match color {
        TeamColor::White => &mut game.white_username,
        TeamColor::Black => &mut game.black_username,
    }
}

#[async_trait]
impl DataAccess for MemoryDataAccess {
    async fn clear(&self) -> ServiceResult<()> {
        *self.tables.write() = Tables::default();
        Ok(())
    }

    async fn create_user(&self, user: UserData) -> ServiceResult<()> {
        let mut tables = self.tables.write();
        if tables.users.contains_key(&user.username) {
            return Err(ServiceError::Conflict(format!("username {}", user.username)));
        }
        tables.users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn get_user(&self, username: &str) -> ServiceResult<Option<UserData>> {
        Ok(self.tables.read().users.get(username).cloned())
    }

    async fn create_auth(&self, auth: AuthData) -> ServiceResult<()> {
        self.tables
            .write()
            .auths
            .insert(auth.auth_token.clone(), auth);
        Ok(())
    }

    async fn get_auth(&self, auth_token: &str) -> ServiceResult<Option<AuthData>> {
        Ok(self.tables.read().auths.get(auth_token).cloned())
    }

    async fn delete_auth(&self, auth_token: &str) -> ServiceResult<()> {
        self.tables.write().auths.remove(auth_token);
        Ok(())
    }

    async fn create_game(&self, game_name: &str) -> ServiceResult<GameData> {
        let game_id = self.last_game_id.fetch_add(1, Ordering::SeqCst) + 1;
        let game = GameData::new(game_id, game_name);
        self.tables.write().games.insert(game_id, game.clone());
        Ok(game)
    }

    async fn list_games(&self) -> ServiceResult<Vec<GameData>> {
        Ok(self.tables.read().games.values().cloned().collect())
    }

    async fn get_game(&self, game_id: GameId) -> ServiceResult<Option<GameData>> {
        Ok(self.tables.read().games.get(&game_id).cloned())
    }

    async fn join_game(
        &self,
        username: &str,
        color: TeamColor,
        game_id: GameId,
    ) -> ServiceResult<()> {
        self.with_game(game_id, |game| {
            let slot = seat(game, color);
            if slot.is_some() {
                return Err(ServiceError::Conflict(format!("{} seat", color)));
            }
            *slot = Some(username.to_string());
            Ok(())
        })
    }

    async fn leave_game(&self, username: &str, game_id: GameId) -> ServiceResult<()> {
        self.with_game(game_id, |game| {
            let color = game
                .color_of(username)
                .ok_or_else(|| ServiceError::BadRequest(NOT_A_PLAYER.to_string()))?;
            *seat(game, color) = None;
            Ok(())
        })
    }

    async fn resign_game(&self, game_id: GameId) -> ServiceResult<()> {
        self.with_game(game_id, |game| {
            game.game_over = true;
            Ok(())
        })
    }

    async fn update_game(
        &self,
        game_id: GameId,
        state: &ChessGame,
        game_over: bool,
    ) -> ServiceResult<()> {
        self.with_game(game_id, |game| {
            game.game = state.clone();
            game.game_over = game_over;
            Ok(())
        })
    }
}
