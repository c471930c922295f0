//! Immutable skill and gate registry.
//!
//! The registry is loaded once at startup, either from the built-in curriculum
//! or from a TOML curriculum file, validated, and then shared read-only
//! (typically behind an `Arc`). There is no runtime mutation.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::Phase;
use crate::core::skill::{GateDefinition, SkillDefinition};
use crate::error::{SkillpathError, Result};

/// Built-in skill ids.
pub mod skill_ids {
    pub const FOLD_TRASH_PREFLOP: &str = "fold_trash_preflop";
    pub const RAISE_PREMIUM_PREFLOP: &str = "raise_premium_preflop";
    pub const POT_ODDS_CALL: &str = "pot_odds_call";
    pub const VALUE_BET_SIZING: &str = "value_bet_sizing";
    pub const FOLD_TO_DOUBLE_BARREL: &str = "fold_to_double_barrel";
    pub const FOLLOW_THROUGH: &str = "follow_through";
    pub const SEMI_BLUFF_DRAWS: &str = "semi_bluff_draws";
    pub const CHECK_BEHIND_WEAK_RIVER: &str = "check_behind_weak_river";
}

/// On-disk curriculum layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CurriculumFile {
    pub gates: Vec<GateDefinition>,
    pub skills: Vec<SkillDefinition>,
}

/// Validated, read-only skill and gate definitions.
#[derive(Debug, Clone)]
pub struct SkillRegistry {
    skills: HashMap<String, SkillDefinition>,
    gates: BTreeMap<u32, GateDefinition>,
}

impl SkillRegistry {
    /// Build and validate a registry.
    pub fn new(skills: Vec<SkillDefinition>, gates: Vec<GateDefinition>) -> Result<Self> {
        let mut skill_map = HashMap::new();
        for skill in skills {
            if let Err(problem) = skill.evidence.validate() {
                return Err(SkillpathError::definition(format!(
                    "skill '{}': {}",
                    skill.id, problem
                )));
            }
            if skill_map.contains_key(&skill.id) {
                return Err(SkillpathError::definition(format!(
                    "duplicate skill id '{}'",
                    skill.id
                )));
            }
            skill_map.insert(skill.id.clone(), skill);
        }

        let mut gate_map = BTreeMap::new();
        for gate in gates {
            if gate.required_reliable as usize > gate.skills.len() {
                return Err(SkillpathError::definition(format!(
                    "gate {} requires {} reliable skills but has only {}",
                    gate.number,
                    gate.required_reliable,
                    gate.skills.len()
                )));
            }
            if gate_map.insert(gate.number, gate).is_some() {
                return Err(SkillpathError::definition("duplicate gate number"));
            }
        }

        for (expected, number) in (1u32..).zip(gate_map.keys()) {
            if *number != expected {
                return Err(SkillpathError::definition(format!(
                    "gate numbers must be contiguous from 1, found gate {} where {} was expected",
                    number, expected
                )));
            }
        }

        // Every skill belongs to exactly one gate, and agrees about which.
        let mut owner: HashMap<&str, u32> = HashMap::new();
        for gate in gate_map.values() {
            for skill_id in &gate.skills {
                let Some(skill) = skill_map.get(skill_id) else {
                    return Err(SkillpathError::definition(format!(
                        "gate {} lists undefined skill '{}'",
                        gate.number, skill_id
                    )));
                };
                if let Some(previous) = owner.insert(skill_id.as_str(), gate.number) {
                    return Err(SkillpathError::definition(format!(
                        "skill '{}' is listed in gates {} and {}",
                        skill_id, previous, gate.number
                    )));
                }
                if skill.gate != gate.number {
                    return Err(SkillpathError::definition(format!(
                        "skill '{}' declares gate {} but is listed in gate {}",
                        skill_id, skill.gate, gate.number
                    )));
                }
            }
        }
        if let Some(orphan) = skill_map.keys().find(|id| !owner.contains_key(id.as_str())) {
            return Err(SkillpathError::definition(format!(
                "skill '{}' is not listed in any gate",
                orphan
            )));
        }

        Ok(Self {
            skills: skill_map,
            gates: gate_map,
        })
    }

    /// The curriculum shipped with Skillpath.
    ///
    /// Validity of the built-in curriculum is asserted by tests, so it is
    /// assembled here without re-running validation.
    pub fn builtin() -> Self {
        let (skills, gates) = builtin_curriculum();
        Self {
            skills: skills.into_iter().map(|s| (s.id.clone(), s)).collect(),
            gates: gates.into_iter().map(|g| (g.number, g)).collect(),
        }
    }

    /// Parse and validate a curriculum from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CurriculumFile =
            toml::from_str(content).map_err(|e| SkillpathError::serde(e.to_string()))?;
        Self::new(file.skills, file.gates)
    }

    /// Load a curriculum file from disk.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SkillpathError::storage(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Load a curriculum file, falling back to the built-in curriculum.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match Self::load_from_file(path) {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "invalid curriculum file, using built-in curriculum"
                );
                Self::builtin()
            }
        }
    }

    pub fn skill(&self, id: &str) -> Option<&SkillDefinition> {
        self.skills.get(id)
    }

    /// Like [`skill`](Self::skill), but an id outside the curriculum is an error.
    pub fn require(&self, id: &str) -> Result<&SkillDefinition> {
        self.skill(id)
            .ok_or_else(|| SkillpathError::unknown_skill(id))
    }

    pub fn gate(&self, number: u32) -> Option<&GateDefinition> {
        self.gates.get(&number)
    }

    /// Gate that owns a skill.
    pub fn gate_of(&self, skill_id: &str) -> Option<&GateDefinition> {
        let skill = self.skills.get(skill_id)?;
        self.gates.get(&skill.gate)
    }

    /// The gate after `number`, if one exists.
    pub fn next_gate(&self, number: u32) -> Option<&GateDefinition> {
        self.gates.get(&(number + 1))
    }

    /// Gates in ascending order.
    pub fn gates(&self) -> impl Iterator<Item = &GateDefinition> {
        self.gates.values()
    }

    /// Skills in gate order, then teaching order within a gate.
    pub fn skills_in_order(&self) -> Vec<&SkillDefinition> {
        self.gates
            .values()
            .flat_map(|g| g.skills.iter())
            .filter_map(|id| self.skills.get(id))
            .collect()
    }

    pub fn last_gate(&self) -> u32 {
        self.gates.keys().next_back().copied().unwrap_or(0)
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    /// Serialize back to the curriculum file layout.
    pub fn to_curriculum(&self) -> CurriculumFile {
        CurriculumFile {
            gates: self.gates.values().cloned().collect(),
            skills: self.skills_in_order().into_iter().cloned().collect(),
        }
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_curriculum() -> (Vec<SkillDefinition>, Vec<GateDefinition>) {
    use skill_ids::*;

    const POSTFLOP: &[Phase] = &[Phase::Flop, Phase::Turn, Phase::River];

    let skills = vec![
        SkillDefinition::new(FOLD_TRASH_PREFLOP, "Fold trash hands preflop", 1)
            .with_phases(&[Phase::Preflop])
            .with_tags(&["preflop", "discipline"]),
        SkillDefinition::new(RAISE_PREMIUM_PREFLOP, "Raise premium hands preflop", 1)
            .with_phases(&[Phase::Preflop])
            .with_tags(&["preflop", "aggression"]),
        SkillDefinition::new(POT_ODDS_CALL, "Call or fold by pot odds", 1)
            .with_phases(POSTFLOP)
            .with_tags(&["math", "pot-odds"]),
        SkillDefinition::new(VALUE_BET_SIZING, "Size value bets", 2)
            .with_phases(POSTFLOP)
            .with_tags(&["sizing", "value"]),
        SkillDefinition::new(FOLD_TO_DOUBLE_BARREL, "Fold marginal hands to a double barrel", 2)
            .with_phases(&[Phase::Turn, Phase::River])
            .with_tags(&["hand-reading", "discipline"]),
        SkillDefinition::new(FOLLOW_THROUGH, "Follow through on aggression", 2)
            .with_phases(POSTFLOP)
            .with_tags(&["planning", "aggression"]),
        SkillDefinition::new(SEMI_BLUFF_DRAWS, "Semi-bluff strong draws", 3)
            .with_phases(&[Phase::Flop, Phase::Turn])
            .with_tags(&["draws", "aggression"]),
        SkillDefinition::new(CHECK_BEHIND_WEAK_RIVER, "Check back weak rivers", 3)
            .with_phases(&[Phase::River])
            .with_tags(&["river", "discipline"]),
    ];

    let gates = vec![
        GateDefinition::new(
            1,
            "Fundamentals",
            &[FOLD_TRASH_PREFLOP, RAISE_PREMIUM_PREFLOP, POT_ODDS_CALL],
            2,
        ),
        GateDefinition::new(
            2,
            "Postflop discipline",
            &[VALUE_BET_SIZING, FOLD_TO_DOUBLE_BARREL, FOLLOW_THROUGH],
            2,
        ),
        GateDefinition::new(
            3,
            "Aggression",
            &[SEMI_BLUFF_DRAWS, CHECK_BEHIND_WEAK_RIVER],
            1,
        ),
    ];

    (skills, gates)
}
