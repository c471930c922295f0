//! Ephemeral per-session evaluation log and coaching cadence.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::state::{Outcome, SkillEvaluation};

/// Coaching throttle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    /// Times a skill's coaching may surface per session.
    pub max_surfaces_per_skill: u32,
    /// Hands that must pass between two surfaces of the same skill.
    pub min_hands_between_surfaces: u32,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            max_surfaces_per_skill: 3,
            min_hands_between_surfaces: 2,
        }
    }
}

/// Per-skill surfacing counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurfaceCounter {
    pub surfaced: u32,
    pub last_hand: Option<u32>,
}

/// Counts for a session summary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub player_id: String,
    pub hands: usize,
    pub evaluations: usize,
    pub correct: usize,
    pub marginal: usize,
    pub incorrect: usize,
    /// Evaluations per skill id.
    pub by_skill: BTreeMap<String, usize>,
}

/// One game session's memory. Discarded when the session ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMemory {
    pub session_id: String,
    pub player_id: String,
    pub started_at: DateTime<Utc>,
    cadence: Cadence,
    hands: BTreeMap<u32, Vec<SkillEvaluation>>,
    surfaces: HashMap<String, SurfaceCounter>,
}

impl SessionMemory {
    pub fn new(session_id: impl Into<String>, player_id: impl Into<String>, cadence: Cadence) -> Self {
        Self {
            session_id: session_id.into(),
            player_id: player_id.into(),
            started_at: Utc::now(),
            cadence,
            hands: BTreeMap::new(),
            surfaces: HashMap::new(),
        }
    }

    /// Log an evaluation under its hand. `not_applicable` is dropped.
    pub fn record(&mut self, hand_number: u32, evaluation: SkillEvaluation) -> bool {
        if !evaluation.outcome.is_applicable() {
            return false;
        }
        self.hands.entry(hand_number).or_default().push(evaluation);
        true
    }

    /// Evaluations for a hand, worst first. Stable within each outcome.
    pub fn hand_review(&self, hand_number: u32) -> Vec<SkillEvaluation> {
        let mut review = self.hands.get(&hand_number).cloned().unwrap_or_default();
        review.sort_by_key(|e| e.outcome.review_rank());
        review
    }

    /// Whether coaching for `skill_id` may be shown on `hand_number`.
    pub fn may_surface(&self, skill_id: &str, hand_number: u32) -> bool {
        let Some(counter) = self.surfaces.get(skill_id) else {
            return self.cadence.max_surfaces_per_skill > 0;
        };
        if counter.surfaced >= self.cadence.max_surfaces_per_skill {
            return false;
        }
        match counter.last_hand {
            Some(last) => hand_number.saturating_sub(last) >= self.cadence.min_hands_between_surfaces,
            None => true,
        }
    }

    /// Note that coaching for `skill_id` was shown on `hand_number`.
    pub fn record_surfaced(&mut self, skill_id: &str, hand_number: u32) {
        let counter = self.surfaces.entry(skill_id.to_string()).or_default();
        counter.surfaced = counter.surfaced.saturating_add(1);
        counter.last_hand = Some(hand_number);
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary {
            session_id: self.session_id.clone(),
            player_id: self.player_id.clone(),
            hands: self.hands.len(),
            ..Default::default()
        };

        for evaluation in self.hands.values().flatten() {
            summary.evaluations += 1;
            match evaluation.outcome {
                Outcome::Correct => summary.correct += 1,
                Outcome::Marginal => summary.marginal += 1,
                Outcome::Incorrect => summary.incorrect += 1,
                Outcome::NotApplicable => {}
            }
            *summary
                .by_skill
                .entry(evaluation.skill_id.clone())
                .or_insert(0) += 1;
        }

        summary
    }
}
