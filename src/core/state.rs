//! Durable player progress and per-decision evaluation records.
//!
//! [`PlayerProgress`] is the unit read from and written to the
//! [`crate::storage::ProgressStore`]. [`SkillEvaluation`] is produced fresh per
//! decision and only survives in session memory and in the evidence window.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ActionKind;
use crate::core::skill::SkillState;

/// Verdict on one action for one skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    Marginal,
    NotApplicable,
}

impl Outcome {
    /// Review order: worst first.
    pub fn review_rank(&self) -> u8 {
        match self {
            Outcome::Incorrect => 0,
            Outcome::Marginal => 1,
            Outcome::Correct => 2,
            Outcome::NotApplicable => 3,
        }
    }

    /// Counts as an opportunity.
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Outcome::NotApplicable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Correct => "correct",
            Outcome::Incorrect => "incorrect",
            Outcome::Marginal => "marginal",
            Outcome::NotApplicable => "not_applicable",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of judging one action against one skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEvaluation {
    pub skill_id: String,
    pub action: ActionKind,
    pub outcome: Outcome,
    /// Evaluator confidence in `[0, 1]`.
    pub confidence: f64,
    pub reasoning: String,
}

impl SkillEvaluation {
    pub fn new(
        skill_id: impl Into<String>,
        action: ActionKind,
        outcome: Outcome,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            skill_id: skill_id.into(),
            action,
            outcome,
            confidence: if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
            reasoning: reasoning.into(),
        }
    }
}

/// Per (player, skill) mastery record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSkillState {
    pub skill_id: String,
    pub state: SkillState,
    /// Most recent applicable outcomes, oldest first.
    pub window: VecDeque<Outcome>,
    /// Cumulative applicable opportunities.
    pub opportunities: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_transition_at: Option<DateTime<Utc>>,
}

impl PlayerSkillState {
    pub fn new(skill_id: impl Into<String>, state: SkillState) -> Self {
        let now = Utc::now();
        Self {
            skill_id: skill_id.into(),
            state,
            window: VecDeque::new(),
            opportunities: 0,
            created_at: now,
            updated_at: now,
            last_transition_at: None,
        }
    }

    /// Append an outcome, evicting the oldest beyond `window_size`.
    ///
    /// `NotApplicable` is ignored. Returns whether the outcome was recorded.
    pub fn push_outcome(&mut self, outcome: Outcome, window_size: usize) -> bool {
        if !outcome.is_applicable() {
            return false;
        }
        self.window.push_back(outcome);
        while self.window.len() > window_size.max(1) {
            self.window.pop_front();
        }
        self.opportunities = self.opportunities.saturating_add(1);
        self.updated_at = Utc::now();
        true
    }
}

/// Per (player, gate) unlock record. Monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GateProgress {
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl GateProgress {
    /// Unlock the gate. Returns true only on the first call.
    pub fn unlock(&mut self) -> bool {
        if self.unlocked {
            return false;
        }
        self.unlocked = true;
        self.unlocked_at = Some(Utc::now());
        true
    }
}

/// Self-reported experience level for onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" | "new" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" | "expert" => Some(Self::Advanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

/// Everything durable about one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub player_id: String,
    /// Skill states keyed by skill id.
    pub skills: BTreeMap<String, PlayerSkillState>,
    /// Gate progress keyed by gate number.
    pub gates: BTreeMap<u32, GateProgress>,
    /// Set once by onboarding.
    #[serde(default)]
    pub onboarded: Option<ExperienceLevel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerProgress {
    pub fn new(player_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            player_id: player_id.into(),
            skills: BTreeMap::new(),
            gates: BTreeMap::new(),
            onboarded: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_gate_unlocked(&self, gate: u32) -> bool {
        self.gates.get(&gate).map(|g| g.unlocked).unwrap_or(false)
    }

    /// Highest unlocked gate number, if any.
    pub fn frontier_gate(&self) -> Option<u32> {
        self.gates
            .iter()
            .filter(|(_, g)| g.unlocked)
            .map(|(n, _)| *n)
            .max()
    }

    pub fn skill(&self, skill_id: &str) -> Option<&PlayerSkillState> {
        self.skills.get(skill_id)
    }

    /// Update the record's updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_rank_order() {
        assert!(Outcome::Incorrect.review_rank() < Outcome::Marginal.review_rank());
        assert!(Outcome::Marginal.review_rank() < Outcome::Correct.review_rank());
    }

    #[test]
    fn test_push_outcome_ignores_not_applicable() {
        let mut state = PlayerSkillState::new("s", SkillState::Introduced);
        assert!(!state.push_outcome(Outcome::NotApplicable, 5));
        assert!(state.window.is_empty());
        assert_eq!(state.opportunities, 0);
    }

    #[test]
    fn test_push_outcome_fifo_eviction() {
        let mut state = PlayerSkillState::new("s", SkillState::Introduced);
        state.push_outcome(Outcome::Incorrect, 3);
        state.push_outcome(Outcome::Correct, 3);
        state.push_outcome(Outcome::Correct, 3);
        state.push_outcome(Outcome::Marginal, 3);

        assert_eq!(state.window.len(), 3);
        assert_eq!(state.window.front(), Some(&Outcome::Correct));
        assert_eq!(state.window.back(), Some(&Outcome::Marginal));
        // Opportunities are cumulative, not windowed.
        assert_eq!(state.opportunities, 4);
    }

    #[test]
    fn test_gate_unlock_once() {
        let mut gate = GateProgress::default();
        assert!(gate.unlock());
        let first = gate.unlocked_at;
        assert!(!gate.unlock());
        assert!(gate.unlocked);
        assert_eq!(gate.unlocked_at, first);
    }

    #[test]
    fn test_evaluation_clamps_confidence() {
        let eval = SkillEvaluation::new("s", ActionKind::Fold, Outcome::Correct, 1.5, "");
        assert_eq!(eval.confidence, 1.0);
        let eval = SkillEvaluation::new("s", ActionKind::Fold, Outcome::Correct, f64::NAN, "");
        assert_eq!(eval.confidence, 0.0);
    }

    #[test]
    fn test_frontier_gate() {
        let mut progress = PlayerProgress::new("p");
        assert_eq!(progress.frontier_gate(), None);
        progress.gates.entry(1).or_default().unlock();
        progress.gates.entry(2).or_default().unlock();
        progress.gates.entry(3).or_default();
        assert_eq!(progress.frontier_gate(), Some(2));
        assert!(progress.is_gate_unlocked(2));
        assert!(!progress.is_gate_unlocked(3));
    }

    #[test]
    fn test_experience_level_parse() {
        assert_eq!(
            ExperienceLevel::parse("Advanced"),
            Some(ExperienceLevel::Advanced)
        );
        assert_eq!(ExperienceLevel::parse("new"), Some(ExperienceLevel::Beginner));
        assert_eq!(ExperienceLevel::parse("pro"), None);
    }

    #[test]
    fn test_progress_json_round_trip_keeps_gate_keys() {
        let mut progress = PlayerProgress::new("p");
        progress.gates.entry(2).or_default().unlock();
        let json = serde_json::to_string(&progress).unwrap();
        let back: PlayerProgress = serde_json::from_str(&json).unwrap();
        assert!(back.is_gate_unlocked(2));
    }
}
