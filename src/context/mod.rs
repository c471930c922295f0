//! Decision context for Skillpath.
//!
//! Poker input types from the game engine and the builder that derives
//! cross-street facts for each decision.

pub mod builder;
pub mod types;

pub use builder::ContextBuilder;
pub use types::{
    ActionKind, DecisionInput, HandFlags, LiveAction, Phase, RecordedAction, SituationContext,
    StreetFlags,
};
