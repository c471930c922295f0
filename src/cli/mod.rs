//! CLI commands for Skillpath.
//!
//! - **Player commands**: replay, progress, onboard
//! - **Curriculum commands**: skills

// Player commands
pub mod onboard;
pub mod progress;
pub mod replay;

// Curriculum commands
pub mod skills;

pub use onboard::OnboardCommand;
pub use progress::ProgressCommand;
pub use replay::ReplayCommand;
pub use skills::SkillsCommand;
