//! Core types and logic for Skillpath.
//!
//! Skill and gate definitions, the curriculum registry, durable player
//! progress, the hysteresis state machine, gate unlocking and coaching modes.

pub mod coaching;
pub mod gate;
pub mod machine;
pub mod registry;
pub mod skill;
pub mod state;

pub use coaching::{mode_for, select_mode, CoachingMode, DEFAULT_PRACTICING_SPLIT};
pub use gate::{GateController, SkillBackfill};
pub use machine::{next_state, record_evaluation, windowed_accuracy, SkillTransition};
pub use registry::{skill_ids, CurriculumFile, SkillRegistry};
pub use skill::{EvidenceRule, GateDefinition, SkillDefinition, SkillState};
pub use state::{
    ExperienceLevel, GateProgress, Outcome, PlayerProgress, PlayerSkillState, SkillEvaluation,
};
