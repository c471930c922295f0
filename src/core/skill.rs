//! Skill and gate definitions.
//!
//! Definitions are immutable configuration. They are validated once by
//! [`crate::core::SkillRegistry`] and shared read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::context::Phase;

/// Mastery state of one skill for one player.
///
/// Linear progression; regression steps back exactly one state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SkillState {
    #[default]
    Introduced,
    Practicing,
    Reliable,
    Automatic,
}

impl SkillState {
    /// One step forward, saturating at `Automatic`.
    pub fn advance(self) -> Self {
        match self {
            SkillState::Introduced => SkillState::Practicing,
            SkillState::Practicing => SkillState::Reliable,
            SkillState::Reliable | SkillState::Automatic => SkillState::Automatic,
        }
    }

    /// One step back, saturating at `Introduced`.
    pub fn regress(self) -> Self {
        match self {
            SkillState::Introduced | SkillState::Practicing => SkillState::Introduced,
            SkillState::Reliable => SkillState::Practicing,
            SkillState::Automatic => SkillState::Reliable,
        }
    }

    /// Counts toward a gate's graduation bar.
    pub fn is_graduated(&self) -> bool {
        matches!(self, SkillState::Reliable | SkillState::Automatic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillState::Introduced => "introduced",
            SkillState::Practicing => "practicing",
            SkillState::Reliable => "reliable",
            SkillState::Automatic => "automatic",
        }
    }
}

impl std::fmt::Display for SkillState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence parameters for a skill's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceRule {
    /// Opportunities required before any transition is considered.
    pub min_opportunities: u32,
    /// Number of most recent outcomes kept in the evidence window.
    pub window_size: usize,
    /// Windowed accuracy at or above which the skill advances.
    pub advancement_threshold: f64,
    /// Windowed accuracy at or below which the skill regresses.
    pub regression_threshold: f64,
}

impl Default for EvidenceRule {
    fn default() -> Self {
        Self {
            min_opportunities: 6,
            window_size: 30,
            advancement_threshold: 0.70,
            regression_threshold: 0.50,
        }
    }
}

impl EvidenceRule {
    /// Check the rule's internal consistency.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);

        if self.min_opportunities == 0 {
            return Err("min_opportunities must be at least 1".to_string());
        }
        if self.window_size == 0 {
            return Err("window_size must be at least 1".to_string());
        }
        if !in_unit(self.advancement_threshold) || !in_unit(self.regression_threshold) {
            return Err("thresholds must be within [0, 1]".to_string());
        }
        if self.advancement_threshold <= self.regression_threshold {
            return Err(format!(
                "advancement_threshold ({}) must be greater than regression_threshold ({})",
                self.advancement_threshold, self.regression_threshold
            ));
        }
        Ok(())
    }
}

/// A taught skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: String,
    pub name: String,
    /// Owning gate number.
    pub gate: u32,
    /// Streets where the skill can come up.
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub evidence: EvidenceRule,
}

impl SkillDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, gate: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            gate,
            phases: Vec::new(),
            tags: Vec::new(),
            evidence: EvidenceRule::default(),
        }
    }

    pub fn with_phases(mut self, phases: &[Phase]) -> Self {
        self.phases = phases.to_vec();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_evidence(mut self, evidence: EvidenceRule) -> Self {
        self.evidence = evidence;
        self
    }

    /// Whether the skill applies on the given street. An empty list means all.
    pub fn applies_in(&self, phase: Phase) -> bool {
        self.phases.is_empty() || self.phases.contains(&phase)
    }
}

/// An ordered group of skills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDefinition {
    pub number: u32,
    #[serde(default)]
    pub name: String,
    /// Member skill ids, in teaching order.
    pub skills: Vec<String>,
    /// Member skills that must be reliable or automatic to unlock the next gate.
    pub required_reliable: u32,
}

impl GateDefinition {
    pub fn new(number: u32, name: impl Into<String>, skills: &[&str], required_reliable: u32) -> Self {
        Self {
            number,
            name: name.into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            required_reliable,
        }
    }

    pub fn contains(&self, skill_id: &str) -> bool {
        self.skills.iter().any(|s| s == skill_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_saturates() {
        assert_eq!(SkillState::Introduced.advance(), SkillState::Practicing);
        assert_eq!(SkillState::Practicing.advance(), SkillState::Reliable);
        assert_eq!(SkillState::Reliable.advance(), SkillState::Automatic);
        assert_eq!(SkillState::Automatic.advance(), SkillState::Automatic);
    }

    #[test]
    fn test_regress_saturates() {
        assert_eq!(SkillState::Automatic.regress(), SkillState::Reliable);
        assert_eq!(SkillState::Reliable.regress(), SkillState::Practicing);
        assert_eq!(SkillState::Practicing.regress(), SkillState::Introduced);
        assert_eq!(SkillState::Introduced.regress(), SkillState::Introduced);
    }

    #[test]
    fn test_is_graduated() {
        assert!(!SkillState::Introduced.is_graduated());
        assert!(!SkillState::Practicing.is_graduated());
        assert!(SkillState::Reliable.is_graduated());
        assert!(SkillState::Automatic.is_graduated());
    }

    #[test]
    fn test_default_rule_is_valid() {
        assert!(EvidenceRule::default().validate().is_ok());
    }

    #[test]
    fn test_rule_rejects_inverted_thresholds() {
        let rule = EvidenceRule {
            advancement_threshold: 0.5,
            regression_threshold: 0.5,
            ..Default::default()
        };
        let err = rule.validate().unwrap_err();
        assert!(err.contains("must be greater"));
    }

    #[test]
    fn test_rule_rejects_zero_window() {
        let rule = EvidenceRule {
            window_size: 0,
            ..Default::default()
        };
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_rule_rejects_out_of_range() {
        let rule = EvidenceRule {
            advancement_threshold: 1.2,
            ..Default::default()
        };
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_applies_in() {
        let skill = SkillDefinition::new("s", "S", 1).with_phases(&[Phase::River]);
        assert!(skill.applies_in(Phase::River));
        assert!(!skill.applies_in(Phase::Flop));

        let any = SkillDefinition::new("t", "T", 1);
        assert!(any.applies_in(Phase::Preflop));
    }

    #[test]
    fn test_state_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&SkillState::Practicing).unwrap(),
            "\"practicing\""
        );
    }
}
