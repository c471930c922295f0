//! Multi-street context builder.
//!
//! Turns the recorded hand history plus the live action into a
//! [`SituationContext`]. The live action has not been appended to the history
//! when evaluation runs, so its bet-to-pot ratio is computed here from the
//! live amount and the current pot and injected directly.

use crate::context::types::{DecisionInput, LiveAction, SituationContext, StreetFlags};

/// Stateless builder for decision contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    /// Build the full context for a decision, including the live action.
    pub fn build(input: &DecisionInput, live: Option<&LiveAction>) -> SituationContext {
        let pot_total = sanitize(input.pot_total);
        let cost_to_call = sanitize(input.cost_to_call);

        let (player_aggression, opponent_aggression) = aggression_flags(input);
        let opponent_double_barrel = opponent_aggression.any_consecutive(input.phase);

        let required_equity = if cost_to_call > 0.0 {
            Some(cost_to_call / (pot_total + cost_to_call))
        } else {
            None
        };

        SituationContext {
            phase: input.phase,
            hand: input.hand,
            pot_total,
            cost_to_call,
            pot_before_bet: (pot_total - cost_to_call).max(0.0),
            equity: input
                .equity
                .filter(|e| e.is_finite() && (0.0..=1.0).contains(e)),
            required_equity,
            facing_bet: cost_to_call > 0.0,
            player_aggression,
            opponent_aggression,
            opponent_double_barrel,
            bet_to_pot: live.and_then(|l| live_bet_to_pot(l, pot_total)),
        }
    }

    /// Build a context from history alone, without the live action.
    pub fn from_history(input: &DecisionInput) -> SituationContext {
        Self::build(input, None)
    }
}

/// Per-street aggression for the acting player and for everyone else.
///
/// A party may act several times on one street; any aggressive action sets the
/// flag for that street.
fn aggression_flags(input: &DecisionInput) -> (StreetFlags, StreetFlags) {
    let mut player = StreetFlags::default();
    let mut opponents = StreetFlags::default();

    for action in input.history.iter().filter(|a| a.action.is_aggressive()) {
        if action.actor == input.player_id {
            player.set(action.phase);
        } else {
            opponents.set(action.phase);
        }
    }

    (player, opponents)
}

/// Size of the live bet relative to the pot it goes into.
fn live_bet_to_pot(live: &LiveAction, pot_total: f64) -> Option<f64> {
    if !live.action.is_aggressive() {
        return None;
    }
    if !live.amount.is_finite() || live.amount <= 0.0 || pot_total <= 0.0 {
        return None;
    }
    Some(live.amount / pot_total)
}

/// Negative, NaN and infinite amounts are treated as zero.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::types::{ActionKind, HandFlags, Phase, RecordedAction};

    fn decision(phase: Phase, history: Vec<RecordedAction>) -> DecisionInput {
        DecisionInput {
            player_id: "hero".to_string(),
            hand_number: 1,
            phase,
            hand: HandFlags::default(),
            cost_to_call: 0.0,
            pot_total: 100.0,
            equity: None,
            history,
        }
    }

    #[test]
    fn test_aggression_split_by_actor() {
        let history = vec![
            RecordedAction::new("hero", Phase::Preflop, ActionKind::Raise, 6.0),
            RecordedAction::new("villain", Phase::Preflop, ActionKind::Call, 6.0),
            RecordedAction::new("villain", Phase::Flop, ActionKind::Bet, 8.0),
        ];
        let ctx = ContextBuilder::from_history(&decision(Phase::Flop, history));

        assert!(ctx.player_aggression.get(Phase::Preflop));
        assert!(!ctx.player_aggression.get(Phase::Flop));
        assert!(!ctx.opponent_aggression.get(Phase::Preflop));
        assert!(ctx.opponent_aggression.get(Phase::Flop));
    }

    #[test]
    fn test_multiple_actions_per_street() {
        // Villain checks then check-raises: still aggressive on the flop.
        let history = vec![
            RecordedAction::new("villain", Phase::Flop, ActionKind::Check, 0.0),
            RecordedAction::new("hero", Phase::Flop, ActionKind::Bet, 10.0),
            RecordedAction::new("villain", Phase::Flop, ActionKind::Raise, 30.0),
        ];
        let ctx = ContextBuilder::from_history(&decision(Phase::Flop, history));
        assert!(ctx.opponent_aggression.get(Phase::Flop));
        assert!(ctx.player_aggression.get(Phase::Flop));
    }

    #[test]
    fn test_double_barrel_detected() {
        let history = vec![
            RecordedAction::new("villain", Phase::Flop, ActionKind::Bet, 10.0),
            RecordedAction::new("hero", Phase::Flop, ActionKind::Call, 10.0),
            RecordedAction::new("villain", Phase::Turn, ActionKind::Bet, 25.0),
        ];
        let ctx = ContextBuilder::from_history(&decision(Phase::Turn, history));
        assert!(ctx.opponent_double_barrel);
    }

    #[test]
    fn test_no_double_barrel_with_gap() {
        let history = vec![
            RecordedAction::new("villain", Phase::Flop, ActionKind::Bet, 10.0),
            RecordedAction::new("villain", Phase::Turn, ActionKind::Check, 0.0),
            RecordedAction::new("villain", Phase::River, ActionKind::Bet, 40.0),
        ];
        let ctx = ContextBuilder::from_history(&decision(Phase::River, history));
        assert!(!ctx.opponent_double_barrel);
    }

    #[test]
    fn test_preflop_raise_and_cbet_count_on_river() {
        let history = vec![
            RecordedAction::new("villain", Phase::Preflop, ActionKind::Raise, 6.0),
            RecordedAction::new("villain", Phase::Flop, ActionKind::Bet, 10.0),
            RecordedAction::new("villain", Phase::Turn, ActionKind::Check, 0.0),
            RecordedAction::new("villain", Phase::River, ActionKind::Bet, 40.0),
        ];
        let ctx = ContextBuilder::from_history(&decision(Phase::River, history));
        assert!(ctx.opponent_double_barrel);
    }

    #[test]
    fn test_bet_to_pot_only_from_live_action() {
        let history = vec![RecordedAction::new(
            "hero",
            Phase::Preflop,
            ActionKind::Raise,
            6.0,
        )];
        let input = decision(Phase::Flop, history);

        let without = ContextBuilder::from_history(&input);
        assert!(without.bet_to_pot.is_none());

        let live = LiveAction::new(ActionKind::Bet, 75.0);
        let with = ContextBuilder::build(&input, Some(&live));
        assert_eq!(with.bet_to_pot, Some(0.75));
    }

    #[test]
    fn test_passive_live_action_has_no_ratio() {
        let input = decision(Phase::Flop, vec![]);
        let live = LiveAction::new(ActionKind::Check, 0.0);
        assert!(ContextBuilder::build(&input, Some(&live)).bet_to_pot.is_none());
    }

    #[test]
    fn test_required_equity_and_pot_before_bet() {
        let mut input = decision(Phase::Turn, vec![]);
        input.pot_total = 150.0;
        input.cost_to_call = 50.0;
        let ctx = ContextBuilder::from_history(&input);

        assert!(ctx.facing_bet);
        assert_eq!(ctx.pot_before_bet, 100.0);
        assert_eq!(ctx.required_equity, Some(0.25));
    }

    #[test]
    fn test_malformed_numbers_are_sanitized() {
        let mut input = decision(Phase::Flop, vec![]);
        input.pot_total = f64::NAN;
        input.cost_to_call = -5.0;
        input.equity = Some(1.7);
        let live = LiveAction::new(ActionKind::Bet, 10.0);
        let ctx = ContextBuilder::build(&input, Some(&live));

        assert_eq!(ctx.pot_total, 0.0);
        assert_eq!(ctx.cost_to_call, 0.0);
        assert!(!ctx.facing_bet);
        assert!(ctx.equity.is_none());
        assert!(ctx.bet_to_pot.is_none());
    }
}
