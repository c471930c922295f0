//! File-based progress storage for Skillpath.
//!
//! One pretty-printed JSON file per player in `~/.skillpath/players/`.
//! Atomic writes are achieved via temp file + rename pattern.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::config::players_dir;
use crate::core::PlayerProgress;
use crate::error::{Result, SkillpathError};
use crate::storage::ProgressStore;

/// File-based progress storage.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    /// Directory where player files are stored.
    players_dir: PathBuf,
}

impl FileProgressStore {
    /// Create a store in the default directory.
    ///
    /// Uses `~/.skillpath/players/` or `$SKILLPATH_HOME/players/`.
    pub fn new() -> Result<Self> {
        let dir = players_dir().ok_or_else(|| {
            SkillpathError::config("Could not determine players directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory, creating it if needed.
    pub fn with_dir(players_dir: impl Into<PathBuf>) -> Result<Self> {
        let players_dir = players_dir.into();

        if !players_dir.exists() {
            fs::create_dir_all(&players_dir)
                .map_err(|e| SkillpathError::storage(&players_dir, e))?;
        }

        Ok(Self { players_dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.players_dir
    }

    fn player_path(&self, player_id: &str) -> PathBuf {
        self.players_dir
            .join(format!("{}.json", file_stem(player_id)))
    }

    fn temp_path(&self, player_id: &str) -> PathBuf {
        self.players_dir
            .join(format!(".{}.json.tmp", file_stem(player_id)))
    }

    fn atomic_write(&self, progress: &PlayerProgress) -> Result<()> {
        let final_path = self.player_path(&progress.player_id);
        let temp_path = self.temp_path(&progress.player_id);

        let json = serde_json::to_string_pretty(progress)?;

        {
            let mut file = fs::File::create(&temp_path)
                .map_err(|e| SkillpathError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| SkillpathError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| SkillpathError::storage(&temp_path, e))?;
        }

        // Rename is atomic on POSIX
        fs::rename(&temp_path, &final_path)
            .map_err(|e| SkillpathError::storage(&final_path, e))?;

        Ok(())
    }
}

/// Map a player id onto a safe, collision-free file stem.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte is written
/// as `%XX`.
fn file_stem(player_id: &str) -> String {
    let mut stem = String::with_capacity(player_id.len());
    for byte in player_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    if stem.is_empty() {
        stem.push('%');
    }
    stem
}

impl ProgressStore for FileProgressStore {
    fn get(&self, player_id: &str) -> Result<Option<PlayerProgress>> {
        let path = self.player_path(player_id);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| SkillpathError::storage(&path, e))?;
        let progress: PlayerProgress = serde_json::from_str(&content)?;

        Ok(Some(progress))
    }

    fn put(&self, progress: &PlayerProgress) -> Result<()> {
        self.atomic_write(progress)
    }

    fn list(&self, limit: usize) -> Result<Vec<PlayerProgress>> {
        if !self.players_dir.exists() {
            return Ok(Vec::new());
        }

        let mut players = Vec::new();

        let entries = fs::read_dir(&self.players_dir)
            .map_err(|e| SkillpathError::storage(&self.players_dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| SkillpathError::storage(&self.players_dir, e))?;
            let path = entry.path();

            // Skip non-JSON files and temp files
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            if path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true)
            {
                continue;
            }

            let parsed = fs::read_to_string(&path)
                .map_err(SkillpathError::from)
                .and_then(|c| {
                    serde_json::from_str::<PlayerProgress>(&c).map_err(SkillpathError::from)
                });
            match parsed {
                Ok(progress) => players.push(progress),
                Err(e) => tracing::debug!(path = %path.display(), "skipping unreadable record: {}", e),
            }
        }

        players.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        players.truncate(limit);

        Ok(players)
    }

    fn delete(&self, player_id: &str) -> Result<()> {
        let path = self.player_path(player_id);

        if path.exists() {
            fs::remove_file(&path).map_err(|e| SkillpathError::storage(&path, e))?;
        }

        let temp_path = self.temp_path(player_id);
        if temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }

        Ok(())
    }
}
