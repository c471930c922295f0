//! Progress event types and JSONL log writer for Skillpath.
//!
//! Every durable progress change is also appended to `events.log` under the
//! Skillpath home directory, one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{ExperienceLevel, SkillBackfill, SkillState, SkillTransition};
use crate::error::{Result, SkillpathError};

/// Schema version for progress events.
///
/// Increment when the event schema changes in a breaking way.
pub const EVENTS_SCHEMA_VERSION: u8 = 1;

/// A progress event as written to the JSONL log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    /// Schema version for forward compatibility.
    pub v: u8,
    pub ts: DateTime<Utc>,
    /// The event type and its data.
    #[serde(flatten)]
    pub data: ProgressEventType,
}

impl ProgressEvent {
    pub fn new(data: ProgressEventType) -> Self {
        Self {
            v: EVENTS_SCHEMA_VERSION,
            ts: Utc::now(),
            data,
        }
    }

    /// Create an event with a specific timestamp (for testing).
    pub fn with_timestamp(data: ProgressEventType, ts: DateTime<Utc>) -> Self {
        Self {
            v: EVENTS_SCHEMA_VERSION,
            ts,
            data,
        }
    }
}

/// The type of progress event and its associated data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEventType {
    /// A skill moved between mastery states.
    SkillTransition {
        player_id: String,
        skill_id: String,
        from: SkillState,
        to: SkillState,
        /// Windowed accuracy that triggered the move.
        accuracy: f64,
        opportunities: u32,
    },

    /// A gate opened for a player.
    GateUnlocked { player_id: String, gate: u32 },

    /// A missing skill row was created for an unlocked gate.
    SkillBackfilled {
        player_id: String,
        skill_id: String,
        gate: u32,
        state: SkillState,
    },

    /// A player was bootstrapped from a self-reported level.
    Onboarded {
        player_id: String,
        level: ExperienceLevel,
        /// Number of skill rows seeded.
        skills: u32,
    },
}

impl ProgressEventType {
    pub fn skill_transition(player_id: impl Into<String>, transition: &SkillTransition) -> Self {
        Self::SkillTransition {
            player_id: player_id.into(),
            skill_id: transition.skill_id.clone(),
            from: transition.from,
            to: transition.to,
            accuracy: transition.accuracy,
            opportunities: transition.opportunities,
        }
    }

    pub fn gate_unlocked(player_id: impl Into<String>, gate: u32) -> Self {
        Self::GateUnlocked {
            player_id: player_id.into(),
            gate,
        }
    }

    pub fn skill_backfilled(player_id: impl Into<String>, backfill: &SkillBackfill) -> Self {
        Self::SkillBackfilled {
            player_id: player_id.into(),
            skill_id: backfill.skill_id.clone(),
            gate: backfill.gate,
            state: backfill.state,
        }
    }

    pub fn onboarded(player_id: impl Into<String>, level: ExperienceLevel, skills: u32) -> Self {
        Self::Onboarded {
            player_id: player_id.into(),
            level,
            skills,
        }
    }

    /// Player the event belongs to.
    pub fn player_id(&self) -> &str {
        match self {
            Self::SkillTransition { player_id, .. }
            | Self::GateUnlocked { player_id, .. }
            | Self::SkillBackfilled { player_id, .. }
            | Self::Onboarded { player_id, .. } => player_id,
        }
    }

    /// Get the event type name as a string.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::SkillTransition { .. } => "skill_transition",
            Self::GateUnlocked { .. } => "gate_unlocked",
            Self::SkillBackfilled { .. } => "skill_backfilled",
            Self::Onboarded { .. } => "onboarded",
        }
    }
}

/// JSONL log writer for progress events.
#[derive(Debug, Clone)]
pub struct EventLogger {
    path: PathBuf,
}

impl EventLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append an event to the log, creating the file and its directory.
    pub fn append(&self, event: &ProgressEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SkillpathError::storage(parent, e))?;
        }

        let json = serde_json::to_string(event)
            .map_err(|e| SkillpathError::serde(format!("Failed to serialize progress event: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SkillpathError::storage(&self.path, e))?;

        writeln!(file, "{}", json).map_err(|e| SkillpathError::storage(&self.path, e))?;

        Ok(())
    }

    /// Wrap `data` in an event stamped now and append it.
    pub fn record(&self, data: ProgressEventType) -> Result<()> {
        self.append(&ProgressEvent::new(data))
    }

    /// Read all events from the log.
    pub fn read_all(&self) -> Result<Vec<ProgressEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| SkillpathError::storage(&self.path, e))?;

        let mut events = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let event: ProgressEvent = serde_json::from_str(line).map_err(|e| {
                SkillpathError::serde(format!(
                    "Failed to parse progress event on line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            events.push(event);
        }

        Ok(events)
    }

    /// Events for one player, in log order.
    pub fn read_for_player(&self, player_id: &str) -> Result<Vec<ProgressEvent>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.data.player_id() == player_id)
            .collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn transition() -> SkillTransition {
        SkillTransition {
            skill_id: "pot_odds_call".to_string(),
            from: SkillState::Introduced,
            to: SkillState::Practicing,
            accuracy: 0.75,
            opportunities: 8,
        }
    }

    #[test]
    fn test_transition_serialization() {
        let event = ProgressEvent::new(ProgressEventType::skill_transition("hero", &transition()));
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains(r#""event":"skill_transition""#));
        assert!(json.contains(r#""from":"introduced""#));
        assert!(json.contains(r#""to":"practicing""#));
        assert!(json.contains(r#""v":1"#));
    }

    #[test]
    fn test_gate_unlocked_serialization() {
        let event = ProgressEvent::new(ProgressEventType::gate_unlocked("hero", 2));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"gate_unlocked""#));
        assert!(json.contains(r#""gate":2"#));
    }

    #[test]
    fn test_event_names_and_player() {
        let backfill = SkillBackfill {
            skill_id: "follow_through".to_string(),
            gate: 2,
            state: SkillState::Introduced,
        };
        let events = [
            ProgressEventType::skill_transition("a", &transition()),
            ProgressEventType::gate_unlocked("a", 2),
            ProgressEventType::skill_backfilled("a", &backfill),
            ProgressEventType::onboarded("a", ExperienceLevel::Beginner, 3),
        ];
        let names: Vec<&str> = events.iter().map(|e| e.event_name()).collect();
        assert_eq!(
            names,
            vec!["skill_transition", "gate_unlocked", "skill_backfilled", "onboarded"]
        );
        assert!(events.iter().all(|e| e.player_id() == "a"));
    }

    #[test]
    fn test_logger_append_and_read() {
        let dir = TempDir::new().unwrap();
        let logger = EventLogger::new(dir.path().join("events.log"));

        logger
            .record(ProgressEventType::skill_transition("hero", &transition()))
            .unwrap();
        logger
            .record(ProgressEventType::gate_unlocked("villain", 2))
            .unwrap();

        let events = logger.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].data,
            ProgressEventType::skill_transition("hero", &transition())
        );
        assert_eq!(logger.read_for_player("villain").unwrap().len(), 1);
    }

    #[test]
    fn test_logger_read_empty() {
        let dir = TempDir::new().unwrap();
        let logger = EventLogger::new(dir.path().join("missing.log"));
        assert!(logger.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_logger_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("events.log");
        let logger = EventLogger::new(&path);

        logger.record(ProgressEventType::gate_unlocked("p", 1)).unwrap();
        assert!(path.exists());
        assert_eq!(logger.path(), path.as_path());
    }

    #[test]
    fn test_logger_reports_bad_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.log");
        fs::write(&path, "{\"v\":1}\n").unwrap();

        let err = EventLogger::new(&path).read_all().unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
