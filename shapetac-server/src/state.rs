//! Server state management
//!
//! Every game lives in its own session behind its own mutex; the map of
//! sessions is only write-locked to add or drop a game.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use shapetac_core::{GameConfig, GameSession, Snapshot};

/// Games kept before the oldest one is dropped
pub const MAX_SESSIONS: usize = 256;

pub type SharedSession = Arc<Mutex<GameSession>>;

/// Server-wide shared state
pub struct ServerState {
    games: RwLock<BTreeMap<u64, SharedSession>>,
    next_id: AtomicU64,
    defaults: GameConfig,
}

impl ServerState {
    pub fn new() -> Self {
        Self::with_defaults(GameConfig::default())
    }

    /// New games start from `defaults`; request bodies override single fields
    pub fn with_defaults(defaults: GameConfig) -> Self {
        Self {
            games: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            defaults,
        }
    }

    pub fn defaults(&self) -> &GameConfig {
        &self.defaults
    }

    /// Start a game and return its id with the opening snapshot
    pub fn create_game(&self, config: GameConfig) -> (String, Snapshot) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = GameSession::new(config);
        let snapshot = session.snapshot();

        let mut games = self.games.write().unwrap_or_else(PoisonError::into_inner);
        if games.len() >= MAX_SESSIONS {
            if let Some((oldest, _)) = games.pop_first() {
                tracing::warn!(game = oldest, "session limit reached, dropping oldest game");
            }
        }
        games.insert(id, Arc::new(Mutex::new(session)));

        tracing::info!(game = id, active = games.len(), "game created");
        (id.to_string(), snapshot)
    }

    pub fn session(&self, id: &str) -> Option<SharedSession> {
        let id: u64 = id.parse().ok()?;
        let games = self.games.read().unwrap_or_else(PoisonError::into_inner);
        games.get(&id).cloned()
    }

    /// Drop a game; false when no such game exists
    pub fn remove(&self, id: &str) -> bool {
        let Ok(id) = id.parse::<u64>() else {
            return false;
        };
        let mut games = self.games.write().unwrap_or_else(PoisonError::into_inner);
        games.remove(&id).is_some()
    }

    pub fn game_count(&self) -> usize {
        self.games.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock a session, recovering it if a previous holder panicked
pub fn lock(session: &SharedSession) -> MutexGuard<'_, GameSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
