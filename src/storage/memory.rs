//! In-memory progress storage.
//!
//! Used by tests and by the CLI's dry-run replay.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::core::PlayerProgress;
use crate::error::Result;
use crate::storage::ProgressStore;

/// In-memory progress store backed by `RwLock<HashMap>`.
///
/// Records are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    players: RwLock<HashMap<String, PlayerProgress>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.players
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ProgressStore for MemoryProgressStore {
    fn get(&self, player_id: &str) -> Result<Option<PlayerProgress>> {
        let players = self.players.read().unwrap_or_else(PoisonError::into_inner);
        Ok(players.get(player_id).cloned())
    }

    fn put(&self, progress: &PlayerProgress) -> Result<()> {
        let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
        players.insert(progress.player_id.clone(), progress.clone());
        Ok(())
    }

    fn list(&self, limit: usize) -> Result<Vec<PlayerProgress>> {
        let players = self.players.read().unwrap_or_else(PoisonError::into_inner);
        let mut result: Vec<PlayerProgress> = players.values().cloned().collect();

        // Most recent first
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }

    fn delete(&self, player_id: &str) -> Result<()> {
        let mut players = self.players.write().unwrap_or_else(PoisonError::into_inner);
        players.remove(player_id);
        Ok(())
    }
}
