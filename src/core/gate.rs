//! Gate unlock controller for Skillpath.
//!
//! Gates group skills. Gate N+1 unlocks once enough of gate N's skills are
//! reliable or automatic. Unlocking is monotonic: nothing in this module ever
//! sets `unlocked` back to false.

use serde::{Deserialize, Serialize};

use crate::core::registry::SkillRegistry;
use crate::core::skill::SkillState;
use crate::core::state::{ExperienceLevel, PlayerProgress, PlayerSkillState};
use crate::error::{SkillpathError, Result};

/// A skill row created by versioning backfill or onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillBackfill {
    pub skill_id: String,
    pub gate: u32,
    pub state: SkillState,
}

/// Gate unlock controller.
///
/// Wraps one player's progress for the duration of a mutation. All gate
/// changes go through this struct.
#[derive(Debug)]
pub struct GateController<'a> {
    /// The progress record being managed.
    progress: &'a mut PlayerProgress,
    /// Curriculum definitions.
    registry: &'a SkillRegistry,
}

impl<'a> GateController<'a> {
    pub fn new(progress: &'a mut PlayerProgress, registry: &'a SkillRegistry) -> Self {
        Self { progress, registry }
    }

    /// Make sure the first gate is open. Returns true if it was just unlocked.
    pub fn ensure_entry_gate(&mut self) -> bool {
        let unlocked = self.unlock(1);
        if unlocked {
            self.progress.touch();
        }
        unlocked
    }

    /// Whether a skill's owning gate is unlocked.
    pub fn is_skill_active(&self, skill_id: &str) -> bool {
        self.registry
            .skill(skill_id)
            .map(|s| self.progress.is_gate_unlocked(s.gate))
            .unwrap_or(false)
    }

    /// Re-check the gate after the one owning `skill_id`.
    ///
    /// Returns the number of the gate that was unlocked, if any. Re-checking an
    /// already unlocked gate is a no-op.
    pub fn check_after_mutation(&mut self, skill_id: &str) -> Option<u32> {
        let registry = self.registry;
        let gate = registry.gate_of(skill_id)?;
        let next = registry.next_gate(gate.number)?;

        if self.progress.is_gate_unlocked(next.number) {
            return None;
        }

        let graduated = gate
            .skills
            .iter()
            .filter_map(|id| self.progress.skill(id))
            .filter(|s| s.state.is_graduated())
            .count();

        if graduated < gate.required_reliable as usize {
            return None;
        }

        let number = next.number;
        if self.unlock(number) {
            self.progress.touch();
            tracing::info!(
                player_id = %self.progress.player_id,
                gate = number,
                "gate unlocked"
            );
            Some(number)
        } else {
            None
        }
    }

    /// Create rows for skills of unlocked gates that have none.
    ///
    /// Covers skills added to a gate the player already has open. A missing
    /// skill starts as `practicing` when the following gate is also unlocked
    /// (the player has passed this gate), otherwise `introduced`. Idempotent.
    pub fn backfill_missing_skills(&mut self) -> Vec<SkillBackfill> {
        let registry = self.registry;
        let mut created = Vec::new();

        for gate in registry.gates() {
            if !self.progress.is_gate_unlocked(gate.number) {
                continue;
            }
            let passed = self.progress.is_gate_unlocked(gate.number + 1);
            let state = if passed {
                SkillState::Practicing
            } else {
                SkillState::Introduced
            };

            for skill_id in &gate.skills {
                if self.progress.skills.contains_key(skill_id) {
                    continue;
                }
                self.progress
                    .skills
                    .insert(skill_id.clone(), PlayerSkillState::new(skill_id, state));
                created.push(SkillBackfill {
                    skill_id: skill_id.clone(),
                    gate: gate.number,
                    state,
                });
            }
        }

        if !created.is_empty() {
            self.progress.touch();
        }
        created
    }

    /// One-time bootstrap from a self-reported experience level.
    ///
    /// Unlocks gates up to the level's frontier and seeds skill states by
    /// distance from it: the frontier gate's skills start `introduced`, one
    /// gate behind `practicing`, further behind `reliable`.
    pub fn onboard(&mut self, level: ExperienceLevel) -> Result<Vec<SkillBackfill>> {
        if self.progress.onboarded.is_some() || !self.progress.skills.is_empty() {
            return Err(SkillpathError::invalid_state(format!(
                "player '{}' already has progress; onboarding runs once",
                self.progress.player_id
            )));
        }

        let registry = self.registry;
        let last = registry.last_gate().max(1);
        let frontier = match level {
            ExperienceLevel::Beginner => 1,
            ExperienceLevel::Intermediate => 2.min(last),
            ExperienceLevel::Advanced => last,
        };

        let mut seeded = Vec::new();
        for gate in registry.gates() {
            if gate.number > frontier {
                break;
            }
            self.unlock(gate.number);

            let state = match frontier - gate.number {
                0 => SkillState::Introduced,
                1 => SkillState::Practicing,
                _ => SkillState::Reliable,
            };
            for skill_id in &gate.skills {
                self.progress
                    .skills
                    .insert(skill_id.clone(), PlayerSkillState::new(skill_id, state));
                seeded.push(SkillBackfill {
                    skill_id: skill_id.clone(),
                    gate: gate.number,
                    state,
                });
            }
        }

        self.progress.onboarded = Some(level);
        self.progress.touch();
        Ok(seeded)
    }

    fn unlock(&mut self, number: u32) -> bool {
        self.progress.gates.entry(number).or_default().unlock()
    }
}
