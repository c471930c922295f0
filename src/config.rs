//! Configuration loading for Skillpath.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.skillpath/config.toml`)
//! 3. User config (`~/.skillpath/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::DEFAULT_PRACTICING_SPLIT;
use crate::error::{Result, SkillpathError};
use crate::session::Cadence;

/// Main configuration struct for Skillpath.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub evidence: EvidenceConfig,
    pub coaching: CoachingConfig,
    pub session: SessionConfig,
    pub curriculum: CurriculumConfig,
    pub logging: LoggingConfig,
    pub events: EventsConfig,
}

/// Evidence window scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Credit a `marginal` outcome earns toward windowed accuracy, in `[0, 1]`.
    pub marginal_credit: f64,
}

/// Coaching mode selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoachingConfig {
    /// Accuracy at which a `practicing` skill switches from learn to compete.
    pub practicing_split: f64,
}

impl Default for CoachingConfig {
    fn default() -> Self {
        Self {
            practicing_split: DEFAULT_PRACTICING_SPLIT,
        }
    }
}

/// Per-session coaching cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub max_surfaces_per_skill: u32,
    pub min_hands_between_surfaces: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let cadence = Cadence::default();
        Self {
            max_surfaces_per_skill: cadence.max_surfaces_per_skill,
            min_hands_between_surfaces: cadence.min_hands_between_surfaces,
        }
    }
}

impl SessionConfig {
    pub fn cadence(&self) -> Cadence {
        Cadence {
            max_surfaces_per_skill: self.max_surfaces_per_skill,
            min_hands_between_surfaces: self.min_hands_between_surfaces,
        }
    }
}

/// Curriculum source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CurriculumConfig {
    /// TOML curriculum file. The built-in curriculum is used when unset.
    pub path: Option<PathBuf>,
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `SKILLPATH_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Valid values for the logging level field.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl LoggingConfig {
    pub fn is_valid_level(value: &str) -> bool {
        VALID_LOG_LEVELS.contains(&value)
    }
}

/// Progress event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventsConfig {
    pub enabled: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Whether a ratio setting is inside `[0, 1]`.
pub fn is_valid_ratio(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

impl Config {
    /// Load configuration with full precedence chain, using the current
    /// directory for the project layer.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    fn load_user_config() -> Option<Config> {
        let path = skillpath_home()?.join("config.toml");
        Self::load_layer(&path)
    }

    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_layer(&project_config_path(cwd))
    }

    /// A missing file is silent; an unreadable or invalid one is reported.
    fn load_layer(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring config file: {}", e);
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| SkillpathError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| SkillpathError::config(e.to_string()))
    }

    /// Apply environment variable overrides. Invalid values are reported and ignored.
    fn apply_env_overrides(&mut self) {
        // SKILLPATH_MARGINAL_CREDIT
        if let Ok(val) = env::var("SKILLPATH_MARGINAL_CREDIT") {
            match val.parse::<f64>() {
                Ok(n) if is_valid_ratio(n) => self.evidence.marginal_credit = n,
                _ => eprintln!(
                    "Warning: Invalid SKILLPATH_MARGINAL_CREDIT value '{}'. \
                    Must be a number in [0.0, 1.0]. Using '{}'.",
                    val, self.evidence.marginal_credit
                ),
            }
        }

        // SKILLPATH_PRACTICING_SPLIT
        if let Ok(val) = env::var("SKILLPATH_PRACTICING_SPLIT") {
            match val.parse::<f64>() {
                Ok(n) if is_valid_ratio(n) => self.coaching.practicing_split = n,
                _ => eprintln!(
                    "Warning: Invalid SKILLPATH_PRACTICING_SPLIT value '{}'. \
                    Must be a number in [0.0, 1.0]. Using '{}'.",
                    val, self.coaching.practicing_split
                ),
            }
        }

        // SKILLPATH_MAX_SURFACES
        if let Ok(val) = env::var("SKILLPATH_MAX_SURFACES") {
            match val.parse::<u32>() {
                Ok(n) => self.session.max_surfaces_per_skill = n,
                Err(_) => eprintln!(
                    "Warning: Invalid SKILLPATH_MAX_SURFACES value '{}'. \
                    Expected a non-negative integer. Using '{}'.",
                    val, self.session.max_surfaces_per_skill
                ),
            }
        }

        // SKILLPATH_MIN_HANDS_BETWEEN
        if let Ok(val) = env::var("SKILLPATH_MIN_HANDS_BETWEEN") {
            match val.parse::<u32>() {
                Ok(n) => self.session.min_hands_between_surfaces = n,
                Err(_) => eprintln!(
                    "Warning: Invalid SKILLPATH_MIN_HANDS_BETWEEN value '{}'. \
                    Expected a non-negative integer. Using '{}'.",
                    val, self.session.min_hands_between_surfaces
                ),
            }
        }

        // SKILLPATH_CURRICULUM
        if let Ok(val) = env::var("SKILLPATH_CURRICULUM") {
            if val.is_empty() {
                self.curriculum.path = None;
            } else {
                self.curriculum.path = Some(PathBuf::from(val));
            }
        }

        // SKILLPATH_LOG_LEVEL
        if let Ok(val) = env::var("SKILLPATH_LOG_LEVEL") {
            let level = val.to_lowercase();
            if LoggingConfig::is_valid_level(&level) {
                self.logging.level = level;
            } else {
                eprintln!(
                    "Warning: Invalid SKILLPATH_LOG_LEVEL value '{}'. \
                    Valid values: {:?}. Using '{}'.",
                    val, VALID_LOG_LEVELS, self.logging.level
                );
            }
        }

        // SKILLPATH_EVENTS
        if let Ok(val) = env::var("SKILLPATH_EVENTS") {
            self.events.enabled = val == "true" || val == "1";
        }
    }

    /// Merge another config into this one.
    ///
    /// Field-by-field: every non-default value in `other` wins. A layer cannot
    /// set a value back to its default over a lower layer's customization.
    /// Out-of-range values in `other` are reported and skipped.
    fn merge(mut self, other: Config) -> Self {
        let defaults = Config::default();

        if other.evidence.marginal_credit != defaults.evidence.marginal_credit {
            if is_valid_ratio(other.evidence.marginal_credit) {
                self.evidence.marginal_credit = other.evidence.marginal_credit;
            } else {
                tracing::warn!(
                    value = other.evidence.marginal_credit,
                    "evidence.marginal_credit outside [0, 1]; ignored"
                );
            }
        }

        if other.coaching.practicing_split != defaults.coaching.practicing_split {
            if is_valid_ratio(other.coaching.practicing_split) {
                self.coaching.practicing_split = other.coaching.practicing_split;
            } else {
                tracing::warn!(
                    value = other.coaching.practicing_split,
                    "coaching.practicing_split outside [0, 1]; ignored"
                );
            }
        }

        if other.session.max_surfaces_per_skill != defaults.session.max_surfaces_per_skill {
            self.session.max_surfaces_per_skill = other.session.max_surfaces_per_skill;
        }
        if other.session.min_hands_between_surfaces != defaults.session.min_hands_between_surfaces
        {
            self.session.min_hands_between_surfaces = other.session.min_hands_between_surfaces;
        }

        if other.curriculum.path.is_some() {
            self.curriculum.path = other.curriculum.path;
        }

        if other.logging.level != defaults.logging.level {
            if LoggingConfig::is_valid_level(&other.logging.level) {
                self.logging.level = other.logging.level;
            } else {
                tracing::warn!(level = %other.logging.level, "unknown logging.level; ignored");
            }
        }

        if other.events.enabled != defaults.events.enabled {
            self.events.enabled = other.events.enabled;
        }

        self
    }
}

/// Get the Skillpath home directory.
///
/// Checks `SKILLPATH_HOME` first, then falls back to `~/.skillpath`. An empty
/// `SKILLPATH_HOME` is ignored.
pub fn skillpath_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("SKILLPATH_HOME") {
        if home.is_empty() {
            tracing::warn!("SKILLPATH_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("SKILLPATH_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".skillpath"));
    }

    let fallback = env::temp_dir().join("skillpath");
    tracing::warn!("HOME not set, using fallback location: {}", fallback.display());
    Some(fallback)
}

/// Returns `<skillpath_home>/players/`.
pub fn players_dir() -> Option<PathBuf> {
    skillpath_home().map(|h| h.join("players"))
}

/// Returns `<skillpath_home>/events.log`.
pub fn events_log_path() -> Option<PathBuf> {
    skillpath_home().map(|h| h.join("events.log"))
}

/// Returns `<skillpath_home>/crash.log`.
pub fn crash_log_path() -> Option<PathBuf> {
    skillpath_home().map(|h| h.join("crash.log"))
}

/// Returns `<cwd>/.skillpath/config.toml`.
pub fn project_config_path(cwd: &Path) -> PathBuf {
    cwd.join(".skillpath").join("config.toml")
}
