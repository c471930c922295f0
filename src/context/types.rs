//! Poker input types and the decision-scoped situation context.
//!
//! Everything here is supplied by (or derived from) the external game engine.
//! Skillpath never computes hand strength or equity itself; it only reads the
//! flags and numbers handed to it.

use serde::{Deserialize, Serialize};

/// Betting round.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Preflop,
    Flop,
    Turn,
    River,
}

impl Phase {
    /// All streets in betting order.
    pub const ALL: [Phase; 4] = [Phase::Preflop, Phase::Flop, Phase::Turn, Phase::River];

    /// The street before this one, if any.
    pub fn previous(&self) -> Option<Phase> {
        match self {
            Phase::Preflop => None,
            Phase::Flop => Some(Phase::Preflop),
            Phase::Turn => Some(Phase::Flop),
            Phase::River => Some(Phase::Turn),
        }
    }

    /// Whether this street comes after the flop is dealt.
    pub fn is_postflop(&self) -> bool {
        !matches!(self, Phase::Preflop)
    }

    /// Lowercase name, as used in curriculum files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Preflop => "preflop",
            Phase::Flop => "flop",
            Phase::Turn => "turn",
            Phase::River => "river",
        }
    }

    fn index(&self) -> usize {
        match self {
            Phase::Preflop => 0,
            Phase::Flop => 1,
            Phase::Turn => 2,
            Phase::River => 3,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action a player can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

impl ActionKind {
    /// Bet, raise and all-in put new money in voluntarily.
    pub fn is_aggressive(&self) -> bool {
        matches!(self, ActionKind::Bet | ActionKind::Raise | ActionKind::AllIn)
    }

    /// Any action that keeps the hand alive when facing a bet.
    pub fn continues(&self) -> bool {
        !matches!(self, ActionKind::Fold)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Fold => "fold",
            ActionKind::Check => "check",
            ActionKind::Call => "call",
            ActionKind::Bet => "bet",
            ActionKind::Raise => "raise",
            ActionKind::AllIn => "all_in",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One action already recorded in the hand history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    /// Player id of whoever acted.
    pub actor: String,
    /// Street the action happened on.
    pub phase: Phase,
    /// What they did.
    pub action: ActionKind,
    /// Chips put in by this action (0 for fold/check).
    #[serde(default)]
    pub amount: f64,
}

impl RecordedAction {
    pub fn new(actor: impl Into<String>, phase: Phase, action: ActionKind, amount: f64) -> Self {
        Self {
            actor: actor.into(),
            phase,
            action,
            amount,
        }
    }
}

/// Hand-strength category flags supplied by the hand evaluator.
///
/// Several flags may hold at once (a marginal pair with a flush draw).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandFlags {
    /// Top of the preflop range.
    pub premium: bool,
    /// Bottom of the preflop range.
    pub trash: bool,
    /// Two pair or better, or an overpair.
    pub strong_made: bool,
    /// A pair that is not strong (middle/bottom pair, weak top pair).
    pub marginal_made: bool,
    /// Flush or straight draw.
    pub draw: bool,
}

impl HandFlags {
    /// No made hand of any strength.
    pub fn is_unmade(&self) -> bool {
        !self.strong_made && !self.marginal_made
    }
}

/// The decision the game engine is asking about, before the player acts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    /// Acting player.
    pub player_id: String,
    /// Hand number within the session.
    pub hand_number: u32,
    /// Current street.
    pub phase: Phase,
    /// Hand-strength flags for the acting player.
    #[serde(default)]
    pub hand: HandFlags,
    /// Chips needed to stay in (0 when checking is allowed).
    #[serde(default)]
    pub cost_to_call: f64,
    /// Total pot, including any outstanding bet the player faces.
    #[serde(default)]
    pub pot_total: f64,
    /// Hand equity against the opponent range, if the evaluator supplied it.
    #[serde(default)]
    pub equity: Option<f64>,
    /// Actions already recorded this hand, in order.
    #[serde(default)]
    pub history: Vec<RecordedAction>,
}

/// The action the player just took, not yet present in `history`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveAction {
    pub action: ActionKind,
    #[serde(default)]
    pub amount: f64,
}

impl LiveAction {
    pub fn new(action: ActionKind, amount: f64) -> Self {
        Self { action, amount }
    }
}

/// One boolean per street.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreetFlags([bool; 4]);

impl StreetFlags {
    pub fn get(&self, phase: Phase) -> bool {
        self.0[phase.index()]
    }

    pub fn set(&mut self, phase: Phase) {
        self.0[phase.index()] = true;
    }

    /// True when two adjacent streets, both at or before `upto`, are set.
    ///
    /// Preflop counts as a street: a preflop raise followed by a flop bet is
    /// a pair, and it stays a pair on later streets even if the turn checks
    /// through.
    pub fn any_consecutive(&self, upto: Phase) -> bool {
        Phase::ALL
            .iter()
            .filter(|p| **p <= upto)
            .filter_map(|p| p.previous().map(|prev| (prev, *p)))
            .any(|(prev, cur)| self.get(prev) && self.get(cur))
    }
}

/// Everything classifiers and evaluators read for one decision.
///
/// Built fresh per decision by [`crate::context::ContextBuilder`] and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SituationContext {
    pub phase: Phase,
    pub hand: HandFlags,
    pub pot_total: f64,
    pub cost_to_call: f64,
    /// Approximated as `pot_total - cost_to_call`; drifts under multi-raise pots.
    pub pot_before_bet: f64,
    pub equity: Option<f64>,
    /// `cost_to_call / (pot_total + cost_to_call)`, absent when nothing is owed.
    pub required_equity: Option<f64>,
    pub facing_bet: bool,
    pub player_aggression: StreetFlags,
    pub opponent_aggression: StreetFlags,
    pub opponent_double_barrel: bool,
    /// Live bet or raise size over the current pot.
    pub bet_to_pot: Option<f64>,
}

impl SituationContext {
    /// Whether the acting player was aggressive on the street before this one.
    pub fn player_aggressive_last_street(&self) -> bool {
        self.phase
            .previous()
            .map(|prev| self.player_aggression.get(prev))
            .unwrap_or(false)
    }
}
