//! Skill rules: situation classification and action evaluation.
//!
//! Each taught skill has one [`SkillRule`]: a trigger predicate over the
//! decision context and a deterministic judgement of the action taken. Rules
//! are looked up by skill id in a [`RuleRegistry`], so a curriculum can add
//! skills without touching the pipeline.

pub mod poker;

use std::collections::HashMap;

use crate::context::{LiveAction, SituationContext};
use crate::core::state::{Outcome, SkillEvaluation};

/// Confidence attached to judgements made on incomplete data.
pub const LOW_CONFIDENCE: f64 = 0.2;

/// A rule's verdict before it is tied to a skill id and action.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgement {
    pub outcome: Outcome,
    pub confidence: f64,
    pub reasoning: String,
}

impl Judgement {
    pub fn new(outcome: Outcome, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            outcome,
            confidence,
            reasoning: reasoning.into(),
        }
    }

    pub fn correct(confidence: f64, reasoning: impl Into<String>) -> Self {
        Self::new(Outcome::Correct, confidence, reasoning)
    }

    pub fn incorrect(confidence: f64, reasoning: impl Into<String>) -> Self {
        Self::new(Outcome::Incorrect, confidence, reasoning)
    }

    pub fn marginal(confidence: f64, reasoning: impl Into<String>) -> Self {
        Self::new(Outcome::Marginal, confidence, reasoning)
    }

    /// Neutral verdict for missing or unusable inputs.
    pub fn insufficient(reasoning: impl Into<String>) -> Self {
        Self::marginal(LOW_CONFIDENCE, reasoning)
    }
}

/// Trigger and evaluation logic for one skill.
///
/// Implementations must be pure and must not panic on odd input: zero pots,
/// missing equity or actions that make no sense in the spot.
pub trait SkillRule: Send + Sync {
    /// Skill id this rule serves.
    fn skill_id(&self) -> &str;

    /// Whether the skill is relevant to this decision.
    fn triggers(&self, ctx: &SituationContext) -> bool;

    /// Judge the action. Only called when `triggers` holds.
    fn judge(&self, action: &LiveAction, ctx: &SituationContext) -> Judgement;
}

/// Open map of skill id to rule.
#[derive(Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Box<dyn SkillRule>>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.rules.keys().collect();
        ids.sort();
        f.debug_struct("RuleRegistry").field("rules", &ids).finish()
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in poker rule.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for rule in poker::all_rules() {
            registry.register(rule);
        }
        registry
    }

    /// Add a rule, replacing any rule with the same skill id.
    pub fn register(&mut self, rule: Box<dyn SkillRule>) {
        self.rules.insert(rule.skill_id().to_string(), rule);
    }

    pub fn contains(&self, skill_id: &str) -> bool {
        self.rules.contains_key(skill_id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Ids among `candidates` whose trigger holds, in candidate order.
    ///
    /// Unknown ids never trigger.
    pub fn classify<'a, I>(&self, ctx: &SituationContext, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .filter(|id| match self.rules.get(*id) {
                Some(rule) => rule.triggers(ctx),
                None => {
                    tracing::debug!(skill_id = %id, "no rule registered for skill; skipping");
                    false
                }
            })
            .map(str::to_string)
            .collect()
    }

    /// Evaluate an action against one skill.
    ///
    /// Unknown skills and skills whose trigger does not hold yield
    /// `not_applicable` with confidence 0. A context with non-finite or
    /// negative amounts yields a low-confidence `marginal`.
    pub fn evaluate(
        &self,
        skill_id: &str,
        action: &LiveAction,
        ctx: &SituationContext,
    ) -> SkillEvaluation {
        let Some(rule) = self.rules.get(skill_id) else {
            tracing::debug!(skill_id = %skill_id, "evaluation requested for unknown skill");
            return SkillEvaluation::new(
                skill_id,
                action.action,
                Outcome::NotApplicable,
                0.0,
                "unknown skill",
            );
        };

        if let Some(problem) = malformed(ctx) {
            let judgement = Judgement::insufficient(format!("context unusable: {}", problem));
            return to_evaluation(skill_id, action, judgement);
        }

        if !rule.triggers(ctx) {
            return SkillEvaluation::new(
                skill_id,
                action.action,
                Outcome::NotApplicable,
                0.0,
                "skill does not apply to this spot",
            );
        }

        to_evaluation(skill_id, action, rule.judge(action, ctx))
    }
}

fn to_evaluation(skill_id: &str, action: &LiveAction, judgement: Judgement) -> SkillEvaluation {
    SkillEvaluation::new(
        skill_id,
        action.action,
        judgement.outcome,
        judgement.confidence,
        judgement.reasoning,
    )
}

fn malformed(ctx: &SituationContext) -> Option<&'static str> {
    let bad = |v: f64| !v.is_finite() || v < 0.0;
    if bad(ctx.pot_total) {
        return Some("pot total");
    }
    if bad(ctx.cost_to_call) {
        return Some("cost to call");
    }
    if bad(ctx.pot_before_bet) {
        return Some("pot before bet");
    }
    if ctx.bet_to_pot.is_some_and(bad) {
        return Some("bet to pot");
    }
    if ctx
        .equity
        .is_some_and(|e| !e.is_finite() || !(0.0..=1.0).contains(&e))
    {
        return Some("equity");
    }
    None
}
