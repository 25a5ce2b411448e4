use super::{DataAccess, NOT_A_PLAYER};
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use chess_rules::{ChessGame, TeamColor};
use shared::models::{AuthData, GameData, UserData};
use shared::protocol::GameId;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS users (
        username TEXT PRIMARY KEY,
        password_hash TEXT NOT NULL,
        email TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS auth (
        token TEXT PRIMARY KEY,
        username TEXT NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS games (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        white_username TEXT,
        black_username TEXT,
        state TEXT NOT NULL,
        game_over INTEGER NOT NULL DEFAULT 0
    );",
];

/// Data access over a SQLite pool
pub struct SqliteDataAccess {
    pool: Pool<Sqlite>,
}

impl SqliteDataAccess {
    /// Open (creating if missing) the database at `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> ServiceResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the tables if needed
    pub async fn from_pool(pool: Pool<Sqlite>) -> ServiceResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    async fn require_game(&self, game_id: GameId) -> ServiceResult<GameData> {
        self.get_game(game_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("game {}", game_id)))
    }
}

fn seat_column(color: TeamColor) -> &'static str {
    match color {
        TeamColor::White => "white_username",
        TeamColor::Black => "black_username",
    }
}

fn game_from_row(row: &SqliteRow) -> ServiceResult<GameData> {
    let state: String = row.try_get("state")?;
    Ok(GameData {
        game_id: row.try_get("id")?,
        white_username: row.try_get("white_username")?,
        black_username: row.try_get("black_username")?,
        game_name: row.try_get("name")?,
        game: serde_json::from_str(&state)?,
        game_over: row.try_get("game_over")?,
    })
}

#[async_trait]
impl DataAccess for SqliteDataAccess {
    async fn clear(&self) -> ServiceResult<()> {
        for table in ["users", "auth", "games"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn create_user(&self, user: UserData) -> ServiceResult<()> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, email) VALUES ($1, $2, $3)",
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.email)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(ServiceError::Conflict(format!("username {}", user.username)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_user(&self, username: &str) -> ServiceResult<Option<UserData>> {
        let row = sqlx::query("SELECT username, password_hash, email FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> ServiceResult<UserData> {
            Ok(UserData {
                username: row.try_get("username")?,
                password: row.try_get("password_hash")?,
                email: row.try_get("email")?,
            })
        })
        .transpose()
    }

    async fn create_auth(&self, auth: AuthData) -> ServiceResult<()> {
        sqlx::query("INSERT INTO auth (token, username) VALUES ($1, $2)")
            .bind(&auth.auth_token)
            .bind(&auth.username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_auth(&self, auth_token: &str) -> ServiceResult<Option<AuthData>> {
        let row = sqlx::query("SELECT token, username FROM auth WHERE token = $1")
            .bind(auth_token)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> ServiceResult<AuthData> {
            Ok(AuthData {
                username: row.try_get("username")?,
                auth_token: row.try_get("token")?,
            })
        })
        .transpose()
    }

    async fn delete_auth(&self, auth_token: &str) -> ServiceResult<()> {
        sqlx::query("DELETE FROM auth WHERE token = $1")
            .bind(auth_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_game(&self, game_name: &str) -> ServiceResult<GameData> {
        let state = serde_json::to_string(&ChessGame::new())?;
        let result = sqlx::query("INSERT INTO games (name, state) VALUES ($1, $2)")
            .bind(game_name)
            .bind(&state)
            .execute(&self.pool)
            .await?;

        let game_id = GameId::try_from(result.last_insert_rowid())
            .map_err(|_| ServiceError::ServerError("game id out of range".to_string()))?;
        Ok(GameData::new(game_id, game_name))
    }

    async fn list_games(&self) -> ServiceResult<Vec<GameData>> {
        let rows = sqlx::query("SELECT * FROM games ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(game_from_row).collect()
    }

    async fn get_game(&self, game_id: GameId) -> ServiceResult<Option<GameData>> {
        let row = sqlx::query("SELECT * FROM games WHERE id = $1")
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(game_from_row).transpose()
    }

    async fn join_game(
        &self,
        username: &str,
        color: TeamColor,
        game_id: GameId,
    ) -> ServiceResult<()> {
        self.require_game(game_id).await?;

        let column = seat_column(color);
        let claimed = sqlx::query(&format!(
            "UPDATE games SET {column} = $1 WHERE id = $2 AND {column} IS NULL"
        ))
        .bind(username)
        .bind(game_id)
        .execute(&self.pool)
        .await?;

        if claimed.rows_affected() == 0 {
            return Err(ServiceError::Conflict(format!("{} seat", color)));
        }
        Ok(())
    }

    async fn leave_game(&self, username: &str, game_id: GameId) -> ServiceResult<()> {
        let game = self.require_game(game_id).await?;
        let color = game
            .color_of(username)
            .ok_or_else(|| ServiceError::BadRequest(NOT_A_PLAYER.to_string()))?;

        let column = seat_column(color);
        sqlx::query(&format!(
            "UPDATE games SET {column} = NULL WHERE id = $1 AND {column} = $2"
        ))
        .bind(game_id)
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn resign_game(&self, game_id: GameId) -> ServiceResult<()> {
        let result = sqlx::query("UPDATE games SET game_over = 1 WHERE id = $1")
            .bind(game_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("game {}", game_id)));
        }
        Ok(())
    }

    async fn update_game(
        &self,
        game_id: GameId,
        game: &ChessGame,
        game_over: bool,
    ) -> ServiceResult<()> {
        let state = serde_json::to_string(game)?;
        let result = sqlx::query("UPDATE games SET state = $1, game_over = $2 WHERE id = $3")
            .bind(&state)
            .bind(game_over)
            .bind(game_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("game {}", game_id)));
        }
        Ok(())
    }
}
