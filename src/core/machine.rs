//! Skill state machine with hysteresis.
//!
//! The transition function is pure and independent of persistence:
//! `(state, windowed_accuracy, opportunities, rule) -> state`. Folding an
//! evaluation into a [`PlayerSkillState`] goes through [`record_evaluation`],
//! which reports every transition it makes.

use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::skill::{EvidenceRule, SkillState};
use crate::core::state::{Outcome, PlayerSkillState, SkillEvaluation};

/// Compute the next state for a skill.
///
/// No change before `min_opportunities`. Otherwise advance at or above the
/// advancement threshold, regress at or below the regression threshold.
pub fn next_state(
    current: SkillState,
    accuracy: f64,
    opportunities: u32,
    rule: &EvidenceRule,
) -> SkillState {
    if opportunities < rule.min_opportunities || !accuracy.is_finite() {
        return current;
    }
    if accuracy >= rule.advancement_threshold {
        current.advance()
    } else if accuracy <= rule.regression_threshold {
        current.regress()
    } else {
        current
    }
}

/// Fraction of applicable outcomes in the window that earned credit.
///
/// `correct` earns 1, `marginal` earns `marginal_credit`, `incorrect` earns 0.
/// `not_applicable` entries are excluded from both numerator and denominator.
/// An empty window has accuracy 0.
pub fn windowed_accuracy(window: &VecDeque<Outcome>, marginal_credit: f64) -> f64 {
    let credit = marginal_credit.clamp(0.0, 1.0);
    let mut applicable = 0usize;
    let mut earned = 0.0;

    for outcome in window {
        match outcome {
            Outcome::Correct => {
                applicable += 1;
                earned += 1.0;
            }
            Outcome::Marginal => {
                applicable += 1;
                earned += credit;
            }
            Outcome::Incorrect => applicable += 1,
            Outcome::NotApplicable => {}
        }
    }

    if applicable == 0 {
        0.0
    } else {
        earned / applicable as f64
    }
}

/// A state change produced by folding in an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTransition {
    pub skill_id: String,
    pub from: SkillState,
    pub to: SkillState,
    pub accuracy: f64,
    pub opportunities: u32,
}

impl SkillTransition {
    pub fn is_advancement(&self) -> bool {
        self.to > self.from
    }
}

/// Fold one evaluation into a skill's evidence window and state.
///
/// `not_applicable` evaluations leave the state untouched. Returns the
/// transition, if the state changed.
pub fn record_evaluation(
    state: &mut PlayerSkillState,
    evaluation: &SkillEvaluation,
    rule: &EvidenceRule,
    marginal_credit: f64,
) -> Option<SkillTransition> {
    if !state.push_outcome(evaluation.outcome, rule.window_size) {
        return None;
    }

    let accuracy = windowed_accuracy(&state.window, marginal_credit);
    let next = next_state(state.state, accuracy, state.opportunities, rule);
    if next == state.state {
        return None;
    }

    let transition = SkillTransition {
        skill_id: state.skill_id.clone(),
        from: state.state,
        to: next,
        accuracy,
        opportunities: state.opportunities,
    };
    state.state = next;
    state.last_transition_at = Some(Utc::now());
    Some(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ActionKind;
    use proptest::prelude::*;

    fn rule(min: u32, window: usize, adv: f64, reg: f64) -> EvidenceRule {
        EvidenceRule {
            min_opportunities: min,
            window_size: window,
            advancement_threshold: adv,
            regression_threshold: reg,
        }
    }

    fn eval(outcome: Outcome) -> SkillEvaluation {
        SkillEvaluation::new("s", ActionKind::Fold, outcome, 0.9, "test")
    }

    fn window(outcomes: &[Outcome]) -> VecDeque<Outcome> {
        outcomes.iter().copied().collect()
    }

    #[test]
    fn test_no_transition_before_min_opportunities() {
        let r = rule(6, 30, 0.7, 0.5);
        assert_eq!(next_state(SkillState::Introduced, 1.0, 5, &r), SkillState::Introduced);
        assert_eq!(next_state(SkillState::Reliable, 0.0, 5, &r), SkillState::Reliable);
    }

    #[test]
    fn test_hysteresis_band_holds_state() {
        let r = rule(6, 30, 0.7, 0.5);
        assert_eq!(next_state(SkillState::Practicing, 0.6, 10, &r), SkillState::Practicing);
        assert_eq!(next_state(SkillState::Practicing, 0.7, 10, &r), SkillState::Reliable);
        assert_eq!(next_state(SkillState::Practicing, 0.5, 10, &r), SkillState::Introduced);
    }

    #[test]
    fn test_bounds() {
        let r = rule(1, 30, 0.7, 0.5);
        assert_eq!(next_state(SkillState::Automatic, 1.0, 10, &r), SkillState::Automatic);
        assert_eq!(next_state(SkillState::Introduced, 0.0, 10, &r), SkillState::Introduced);
    }

    #[test]
    fn test_accuracy_excludes_not_applicable() {
        let w = window(&[
            Outcome::Correct,
            Outcome::NotApplicable,
            Outcome::Incorrect,
            Outcome::NotApplicable,
        ]);
        assert_eq!(windowed_accuracy(&w, 0.0), 0.5);
    }

    #[test]
    fn test_marginal_counts_as_miss_by_default() {
        let w = window(&[Outcome::Correct, Outcome::Marginal]);
        assert_eq!(windowed_accuracy(&w, 0.0), 0.5);
    }

    #[test]
    fn test_marginal_partial_credit() {
        let w = window(&[Outcome::Correct, Outcome::Marginal]);
        assert_eq!(windowed_accuracy(&w, 0.5), 0.75);
    }

    #[test]
    fn test_empty_window_accuracy() {
        assert_eq!(windowed_accuracy(&VecDeque::new(), 0.0), 0.0);
    }

    #[test]
    fn test_advances_after_six_with_five_correct() {
        let r = rule(6, 30, 0.70, 0.50);
        let mut state = PlayerSkillState::new("s", SkillState::Introduced);
        let outcomes = [
            Outcome::Correct,
            Outcome::Incorrect,
            Outcome::Correct,
            Outcome::Correct,
            Outcome::Correct,
        ];
        for outcome in outcomes {
            assert!(record_evaluation(&mut state, &eval(outcome), &r, 0.0).is_none());
        }

        let transition = record_evaluation(&mut state, &eval(Outcome::Correct), &r, 0.0).unwrap();
        assert_eq!(transition.from, SkillState::Introduced);
        assert_eq!(transition.to, SkillState::Practicing);
        assert!((transition.accuracy - 5.0 / 6.0).abs() < 1e-9);
        assert_eq!(state.state, SkillState::Practicing);
        assert!(state.last_transition_at.is_some());
    }

    #[test]
    fn test_regresses_when_recent_window_drops() {
        let r = rule(6, 30, 0.70, 0.50);
        let mut state = PlayerSkillState::new("s", SkillState::Practicing);
        // Oldest entry is evicted by the next outcome.
        state.push_outcome(Outcome::Correct, r.window_size);
        for i in 0..29 {
            let outcome = if i < 12 { Outcome::Correct } else { Outcome::Incorrect };
            state.push_outcome(outcome, r.window_size);
        }

        let transition = record_evaluation(&mut state, &eval(Outcome::Incorrect), &r, 0.0).unwrap();

        assert_eq!(state.window.len(), 30);
        assert!((transition.accuracy - 0.40).abs() < 1e-9);
        assert_eq!(transition.from, SkillState::Practicing);
        assert_eq!(transition.to, SkillState::Introduced);
        assert!(!transition.is_advancement());
        assert_eq!(state.state, SkillState::Introduced);
    }

    #[test]
    fn test_not_applicable_never_counts() {
        let r = rule(1, 30, 0.7, 0.5);
        let mut state = PlayerSkillState::new("s", SkillState::Introduced);
        for _ in 0..10 {
            assert!(record_evaluation(&mut state, &eval(Outcome::NotApplicable), &r, 0.0).is_none());
        }
        assert_eq!(state.opportunities, 0);
        assert!(state.window.is_empty());
        assert_eq!(state.state, SkillState::Introduced);
    }

    proptest! {
        #[test]
        fn prop_accuracy_in_unit_interval(
            outcomes in proptest::collection::vec(0u8..4, 0..60),
            credit in 0.0f64..=1.0,
        ) {
            let w: VecDeque<Outcome> = outcomes
                .iter()
                .map(|o| match o {
                    0 => Outcome::Correct,
                    1 => Outcome::Incorrect,
                    2 => Outcome::Marginal,
                    _ => Outcome::NotApplicable,
                })
                .collect();
            let acc = windowed_accuracy(&w, credit);
            prop_assert!((0.0..=1.0).contains(&acc));
        }

        #[test]
        fn prop_no_transition_below_min(
            accuracy in 0.0f64..=1.0,
            opportunities in 0u32..6,
        ) {
            let r = rule(6, 30, 0.7, 0.5);
            for state in [
                SkillState::Introduced,
                SkillState::Practicing,
                SkillState::Reliable,
                SkillState::Automatic,
            ] {
                prop_assert_eq!(next_state(state, accuracy, opportunities, &r), state);
            }
        }
    }
}
