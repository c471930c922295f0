//! Coaching mode selection.
//!
//! Tells the prompt layer how much to say about a skill. Pure; reads state
//! and accuracy, never mutates anything.

use serde::{Deserialize, Serialize};

use crate::core::skill::SkillState;
use crate::core::state::PlayerSkillState;

/// Default accuracy split for `practicing` skills.
pub const DEFAULT_PRACTICING_SPLIT: f64 = 0.60;

/// How the prompt layer should coach a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachingMode {
    /// Explain the concept and walk through the decision.
    Learn,
    /// Brief feedback, mostly on mistakes.
    Compete,
    /// Say nothing.
    Silent,
}

impl CoachingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoachingMode::Learn => "learn",
            CoachingMode::Compete => "compete",
            CoachingMode::Silent => "silent",
        }
    }
}

impl std::fmt::Display for CoachingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a skill state and its windowed accuracy to a coaching mode.
pub fn select_mode(state: Option<SkillState>, accuracy: f64, practicing_split: f64) -> CoachingMode {
    match state {
        None | Some(SkillState::Introduced) => CoachingMode::Learn,
        Some(SkillState::Practicing) => {
            if accuracy.is_finite() && accuracy >= practicing_split {
                CoachingMode::Compete
            } else {
                CoachingMode::Learn
            }
        }
        Some(SkillState::Reliable) => CoachingMode::Compete,
        Some(SkillState::Automatic) => CoachingMode::Silent,
    }
}

/// Convenience over [`select_mode`] for a stored skill record.
pub fn mode_for(
    skill: Option<&PlayerSkillState>,
    marginal_credit: f64,
    practicing_split: f64,
) -> CoachingMode {
    let accuracy = skill
        .map(|s| crate::core::machine::windowed_accuracy(&s.window, marginal_credit))
        .unwrap_or(0.0);
    select_mode(skill.map(|s| s.state), accuracy, practicing_split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Outcome;

    #[test]
    fn test_no_state_is_learn() {
        assert_eq!(select_mode(None, 1.0, 0.6), CoachingMode::Learn);
    }

    #[test]
    fn test_introduced_is_learn_regardless_of_accuracy() {
        assert_eq!(
            select_mode(Some(SkillState::Introduced), 0.95, 0.6),
            CoachingMode::Learn
        );
    }

    #[test]
    fn test_practicing_split() {
        let practicing = Some(SkillState::Practicing);
        assert_eq!(select_mode(practicing, 0.59, 0.6), CoachingMode::Learn);
        assert_eq!(select_mode(practicing, 0.60, 0.6), CoachingMode::Compete);
        assert_eq!(select_mode(practicing, f64::NAN, 0.6), CoachingMode::Learn);
    }

    #[test]
    fn test_graduated_states() {
        assert_eq!(
            select_mode(Some(SkillState::Reliable), 0.1, 0.6),
            CoachingMode::Compete
        );
        assert_eq!(
            select_mode(Some(SkillState::Automatic), 0.1, 0.6),
            CoachingMode::Silent
        );
    }

    #[test]
    fn test_mode_for_uses_window() {
        let mut skill = PlayerSkillState::new("s", SkillState::Practicing);
        skill.push_outcome(Outcome::Correct, 30);
        skill.push_outcome(Outcome::Marginal, 30);

        assert_eq!(mode_for(Some(&skill), 0.0, 0.6), CoachingMode::Learn);
        assert_eq!(mode_for(Some(&skill), 0.5, 0.6), CoachingMode::Compete);
        assert_eq!(mode_for(None, 0.0, 0.6), CoachingMode::Learn);
    }
}
