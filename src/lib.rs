//! Skillpath - skill progression for poker training
//!
//! Skillpath watches each player decision, decides which curriculum skills the
//! situation exercises, judges the action against each, and tracks per-player
//! mastery through a hysteresis state machine. Skills are grouped into gates
//! that unlock in order, and each skill's mastery selects how the coaching
//! layer should talk about it.

pub mod cli;
pub mod config;
pub mod context;
pub mod core;
pub mod engine;
pub mod error;
pub mod events;
pub mod rules;
pub mod session;
pub mod storage;

pub use config::Config;
pub use context::{
    ActionKind, ContextBuilder, DecisionInput, HandFlags, LiveAction, Phase, RecordedAction,
    SituationContext,
};
pub use core::{
    CoachingMode, ExperienceLevel, GateController, Outcome, PlayerProgress, PlayerSkillState,
    SkillBackfill, SkillDefinition, SkillEvaluation, SkillRegistry, SkillState, SkillTransition,
};
pub use engine::{DecisionReport, Engine, SkillSummary, StorageHealth};
pub use error::{Result, SkillpathError};
pub use events::{EventLogger, ProgressEvent, ProgressEventType, EVENTS_SCHEMA_VERSION};
pub use rules::{Judgement, RuleRegistry, SkillRule};
pub use session::{SessionMemory, SessionSummary};
pub use storage::{FileProgressStore, MemoryProgressStore, ProgressStore};

// CLI commands
pub use cli::{OnboardCommand, ProgressCommand, ReplayCommand, SkillsCommand};
