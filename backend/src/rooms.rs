//! Game rooms: who is connected to which game
//!
//! [`ConnectionRegistry`] maps each game id to the connections watching it.
//! [`GameLocks`] hands out one async mutex per game id so that commands for
//! the same game run one at a time while different games proceed in
//! parallel.

use chess_rules::TeamColor;
use parking_lot::{Mutex, RwLock};
use shared::protocol::GameId;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, OwnedMutexGuard};
use tracing::debug;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Outbound half of a client connection.
///
/// Text pushed here is drained by the socket writer task. Once the receiver
/// is gone every send fails, which the registry treats as a disconnect.
#[derive(Clone, Debug)]
pub struct Connection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<String>,
}

impl Connection {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        (Self { id, sender }, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue `payload`. Returns false when the peer has gone away.
    pub fn send(&self, payload: &str) -> bool {
        self.sender.send(payload.to_string()).is_ok()
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// What a participant is in a room
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Player(TeamColor),
    Observer,
}

impl From<Option<TeamColor>> for Role {
    fn from(color: Option<TeamColor>) -> Self {
        color.map_or(Role::Observer, Role::Player)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player(color) => write!(f, "{}", color),
            Role::Observer => write!(f, "an observer"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Participant {
    pub connection: Connection,
    /// Identity the connection's token resolved to
    pub username: String,
    pub role: Role,
}

type Room = HashMap<ConnectionId, Participant>;

/// Room membership, shared by every connection task
#[derive(Default)]
pub struct ConnectionRegistry {
    rooms: RwLock<HashMap<GameId, Room>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a participant in `game_id`'s room
    pub fn add(&self, game_id: GameId, participant: Participant) {
        self.rooms
            .write()
            .entry(game_id)
            .or_default()
            .insert(participant.connection.id(), participant);
    }

    /// Remove one connection from one room. Empty rooms are dropped.
    pub fn remove(&self, game_id: GameId, connection: ConnectionId) -> Option<Participant> {
        let mut rooms = self.rooms.write();
        let room = rooms.get_mut(&game_id)?;
        let removed = room.remove(&connection);
        if room.is_empty() {
            rooms.remove(&game_id);
        }
        removed
    }

    /// Remove a connection from every room it is in. Returns those rooms.
    pub fn remove_connection(&self, connection: ConnectionId) -> Vec<GameId> {
        let mut rooms = self.rooms.write();
        let mut left = Vec::new();
        rooms.retain(|game_id, room| {
            if room.remove(&connection).is_some() {
                left.push(*game_id);
            }
            !room.is_empty()
        });
        left.sort_unstable();
        left
    }

    pub fn participant(&self, game_id: GameId, connection: ConnectionId) -> Option<Participant> {
        self.rooms
            .read()
            .get(&game_id)
            .and_then(|room| room.get(&connection))
            .cloned()
    }

    pub fn room_size(&self, game_id: GameId) -> usize {
        self.rooms.read().get(&game_id).map_or(0, HashMap::len)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    /// Send `payload` to everyone in the room except `exclude`.
    ///
    /// Membership is snapshotted first and sends happen without holding the
    /// lock. Participants whose send fails are removed afterwards. Returns
    /// the number of successful deliveries.
    pub fn broadcast(&self, game_id: GameId, exclude: Option<ConnectionId>, payload: &str) -> usize {
        let recipients: Vec<Connection> = match self.rooms.read().get(&game_id) {
            Some(room) => room
                .values()
                .filter(|participant| Some(participant.connection.id()) != exclude)
                .map(|participant| participant.connection.clone())
                .collect(),
            None => return 0,
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for connection in recipients {
            if connection.send(payload) {
                delivered += 1;
            } else {
                closed.push(connection.id());
            }
        }

        for connection in closed {
            if let Some(participant) = self.remove(game_id, connection) {
                debug!(
                    game_id,
                    %connection,
                    username = %participant.username,
                    role = %participant.role,
                    "Dropping closed connection"
                );
            }
        }
        delivered
    }
}

/// One async mutex per game id, created on demand.
///
/// Only weak references are kept here, so a game's lock is freed once no
/// command holds or waits for it.
#[derive(Default)]
pub struct GameLocks {
    locks: Mutex<HashMap<GameId, Weak<tokio::sync::Mutex<()>>>>,
}

impl GameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `game_id`
    pub async fn lock(&self, game_id: GameId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|_, lock| lock.strong_count() > 0);
            match locks.get(&game_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(tokio::sync::Mutex::new(()));
                    locks.insert(game_id, Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Games with a live lock
    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }
}
