//! Progress storage traits for Skillpath.
//!
//! This module defines the `ProgressStore` trait for durable player progress.

use std::sync::Arc;

use crate::core::PlayerProgress;
use crate::error::Result;

/// Trait for player progress storage backends.
///
/// Records are keyed by player id and always written whole, so a failed write
/// is repaired by the next successful one.
pub trait ProgressStore: Send + Sync {
    /// Retrieve a player's progress.
    ///
    /// Returns `Ok(None)` if the player has no record.
    fn get(&self, player_id: &str) -> Result<Option<PlayerProgress>>;

    /// Save a player's progress, replacing any previous record.
    fn put(&self, progress: &PlayerProgress) -> Result<()>;

    /// List stored players.
    ///
    /// Returns up to `limit` records, most recently updated first.
    fn list(&self, limit: usize) -> Result<Vec<PlayerProgress>>;

    /// Delete a player's progress.
    ///
    /// Returns `Ok(())` even if the player doesn't exist.
    fn delete(&self, player_id: &str) -> Result<()>;

    /// Check if a player has a record.
    fn exists(&self, player_id: &str) -> Result<bool> {
        Ok(self.get(player_id)?.is_some())
    }
}

/// Blanket implementation of ProgressStore for Arc-wrapped stores.
///
/// Lets the engine and a test share one store.
impl<T: ProgressStore + ?Sized> ProgressStore for Arc<T> {
    fn get(&self, player_id: &str) -> Result<Option<PlayerProgress>> {
        (**self).get(player_id)
    }

    fn put(&self, progress: &PlayerProgress) -> Result<()> {
        (**self).put(progress)
    }

    fn list(&self, limit: usize) -> Result<Vec<PlayerProgress>> {
        (**self).list(limit)
    }

    fn delete(&self, player_id: &str) -> Result<()> {
        (**self).delete(player_id)
    }
}
