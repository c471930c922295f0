//! Unified error types for Skillpath with fail-open philosophy.
//!
//! Nothing in Skillpath may abort or alter the game it observes. Errors are
//! returned internally so callers can log them, but every boundary facing the
//! game engine converts them into a safe default instead of propagating.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Skillpath operations.
#[derive(Error, Debug)]
pub enum SkillpathError {
    /// I/O errors from progress file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// State violations (e.g. onboarding a player twice).
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// No durable progress exists for the player.
    #[error("player not found: {player_id}")]
    PlayerNotFound { player_id: String },

    /// A skill id that is not part of the loaded curriculum.
    #[error("unknown skill: {skill_id}")]
    UnknownSkill { skill_id: String },

    /// Skill or gate definitions that fail validation.
    #[error("definition error: {message}")]
    Definition { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Session memory lookup for a session that was never started.
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },
}

/// A specialized Result type for Skillpath operations.
pub type Result<T> = std::result::Result<T, SkillpathError>;

impl SkillpathError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a player not found error.
    pub fn player_not_found(player_id: impl Into<String>) -> Self {
        Self::PlayerNotFound {
            player_id: player_id.into(),
        }
    }

    /// Create an unknown skill error.
    pub fn unknown_skill(skill_id: impl Into<String>) -> Self {
        Self::UnknownSkill {
            skill_id: skill_id.into(),
        }
    }

    /// Create a definition error.
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a session not found error.
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Whether this error came from the durable storage layer.
    ///
    /// Storage failures are tracked as a health concern by the engine while
    /// play continues on the in-memory record.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Serde { .. })
    }
}

impl From<io::Error> for SkillpathError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SkillpathError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and carry on with a safe value.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the Skillpath CLI.
pub mod exit_codes {
    /// Command completed successfully.
    pub const SUCCESS: i32 = 0;

    /// Command ran but reported a failure.
    pub const ERROR: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}
