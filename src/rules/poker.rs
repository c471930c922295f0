//! Built-in poker rules for the default curriculum.
//!
//! Confidence levels: 0.9 for textbook spots, 0.7 where reasonable players
//! disagree, [`crate::rules::LOW_CONFIDENCE`] when data is missing or the action makes no
//! sense in the spot.

use crate::context::{ActionKind, LiveAction, Phase, SituationContext};
use crate::core::skill_ids;
use crate::rules::{Judgement, SkillRule};

const CLEAR: f64 = 0.9;
const JUDGEMENT_CALL: f64 = 0.7;

/// Every built-in rule, one per curriculum skill.
pub fn all_rules() -> Vec<Box<dyn SkillRule>> {
    vec![
        Box::new(FoldTrashPreflop),
        Box::new(RaisePremiumPreflop),
        Box::new(PotOddsCall),
        Box::new(ValueBetSizing),
        Box::new(FoldToDoubleBarrel),
        Box::new(FollowThrough),
        Box::new(SemiBluffDraws),
        Box::new(CheckBehindWeakRiver),
    ]
}

/// Action that is not legal or not sensible given whether a bet is faced.
fn out_of_place(action: &LiveAction) -> Judgement {
    Judgement::insufficient(format!("{} does not fit this spot", action.action))
}

// =============================================================================
// Gate 1: Fundamentals
// =============================================================================

/// Fold the bottom of the range before the flop.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoldTrashPreflop;

impl SkillRule for FoldTrashPreflop {
    fn skill_id(&self) -> &str {
        skill_ids::FOLD_TRASH_PREFLOP
    }

    fn triggers(&self, ctx: &SituationContext) -> bool {
        ctx.phase == Phase::Preflop && ctx.hand.trash
    }

    fn judge(&self, action: &LiveAction, ctx: &SituationContext) -> Judgement {
        match action.action {
            ActionKind::Fold => Judgement::correct(CLEAR, "folded a trash hand"),
            ActionKind::Check if !ctx.facing_bet => {
                Judgement::correct(CLEAR, "took the free look with a trash hand")
            }
            ActionKind::Check => out_of_place(action),
            ActionKind::Call => {
                Judgement::incorrect(CLEAR, "called with a hand that should be folded")
            }
            ActionKind::Bet | ActionKind::Raise | ActionKind::AllIn => Judgement::marginal(
                JUDGEMENT_CALL,
                "raised a trash hand; a bluff is a choice, not a fundamentals error",
            ),
        }
    }
}

/// Raise premium hands before the flop.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaisePremiumPreflop;

impl SkillRule for RaisePremiumPreflop {
    fn skill_id(&self) -> &str {
        skill_ids::RAISE_PREMIUM_PREFLOP
    }

    fn triggers(&self, ctx: &SituationContext) -> bool {
        ctx.phase == Phase::Preflop && ctx.hand.premium
    }

    fn judge(&self, action: &LiveAction, _ctx: &SituationContext) -> Judgement {
        match action.action {
            ActionKind::Bet | ActionKind::Raise | ActionKind::AllIn => {
                Judgement::correct(CLEAR, "raised a premium hand")
            }
            ActionKind::Call | ActionKind::Check => Judgement::marginal(
                JUDGEMENT_CALL,
                "flatted a premium hand; raising builds the pot",
            ),
            ActionKind::Fold => Judgement::incorrect(CLEAR, "folded a premium hand"),
        }
    }
}

/// Continue only when equity covers the price.
#[derive(Debug, Clone, Copy, Default)]
pub struct PotOddsCall;

impl SkillRule for PotOddsCall {
    fn skill_id(&self) -> &str {
        skill_ids::POT_ODDS_CALL
    }

    fn triggers(&self, ctx: &SituationContext) -> bool {
        ctx.phase.is_postflop() && ctx.facing_bet && !ctx.hand.strong_made && !ctx.hand.premium
    }

    fn judge(&self, action: &LiveAction, ctx: &SituationContext) -> Judgement {
        let (Some(equity), Some(required)) = (ctx.equity, ctx.required_equity) else {
            return Judgement::insufficient("no equity estimate for this decision");
        };
        if action.action == ActionKind::Check {
            return out_of_place(action);
        }

        let priced_in = equity >= required;
        let detail = format!("equity {:.0}% vs {:.0}% needed", equity * 100.0, required * 100.0);

        match (action.action.continues(), priced_in) {
            (true, true) => Judgement::correct(CLEAR, format!("continued with the odds: {}", detail)),
            (false, false) => Judgement::correct(CLEAR, format!("folded without the odds: {}", detail)),
            (true, false) => {
                Judgement::incorrect(CLEAR, format!("continued without the odds: {}", detail))
            }
            (false, true) => {
                Judgement::incorrect(CLEAR, format!("folded despite the odds: {}", detail))
            }
        }
    }
}

// =============================================================================
// Gate 2: Postflop discipline
// =============================================================================

/// Size value bets between half pot and pot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueBetSizing;

impl ValueBetSizing {
    fn judge_ratio(ratio: f64) -> Judgement {
        let detail = format!("bet {:.0}% of the pot", ratio * 100.0);
        if (0.5..=1.0).contains(&ratio) {
            Judgement::correct(CLEAR, format!("{}; good value sizing", detail))
        } else if (0.33..0.5).contains(&ratio) || (ratio > 1.0 && ratio <= 1.5) {
            Judgement::marginal(JUDGEMENT_CALL, format!("{}; workable but off target", detail))
        } else {
            Judgement::incorrect(CLEAR, format!("{}; too far from half-pot to pot", detail))
        }
    }
}

impl SkillRule for ValueBetSizing {
    fn skill_id(&self) -> &str {
        skill_ids::VALUE_BET_SIZING
    }

    fn triggers(&self, ctx: &SituationContext) -> bool {
        ctx.phase.is_postflop() && ctx.hand.strong_made && !ctx.facing_bet
    }

    fn judge(&self, action: &LiveAction, ctx: &SituationContext) -> Judgement {
        match action.action {
            ActionKind::Check => {
                Judgement::marginal(JUDGEMENT_CALL, "checked a strong hand (slow-play)")
            }
            ActionKind::Fold => Judgement::incorrect(CLEAR, "folded a strong hand for free"),
            ActionKind::Call => out_of_place(action),
            ActionKind::Bet | ActionKind::Raise | ActionKind::AllIn => match ctx.bet_to_pot {
                Some(ratio) => Self::judge_ratio(ratio),
                None => Judgement::insufficient("bet size unknown"),
            },
        }
    }
}

/// Let marginal pairs go against two streets of aggression.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoldToDoubleBarrel;

impl SkillRule for FoldToDoubleBarrel {
    fn skill_id(&self) -> &str {
        skill_ids::FOLD_TO_DOUBLE_BARREL
    }

    fn triggers(&self, ctx: &SituationContext) -> bool {
        ctx.opponent_double_barrel
            && ctx.facing_bet
            && ctx.hand.marginal_made
            && !ctx.hand.strong_made
    }

    fn judge(&self, action: &LiveAction, _ctx: &SituationContext) -> Judgement {
        match action.action {
            ActionKind::Fold => {
                Judgement::correct(CLEAR, "released a marginal pair to a double barrel")
            }
            ActionKind::Check => out_of_place(action),
            ActionKind::Call | ActionKind::Bet | ActionKind::Raise | ActionKind::AllIn => {
                Judgement::incorrect(CLEAR, "kept paying off a double barrel with a marginal pair")
            }
        }
    }
}

/// Keep the initiative after being the aggressor on the previous street.
///
/// Cannot see board texture: a scare card that justifies giving up still
/// scores a check as marginal.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowThrough;

impl SkillRule for FollowThrough {
    fn skill_id(&self) -> &str {
        skill_ids::FOLLOW_THROUGH
    }

    fn triggers(&self, ctx: &SituationContext) -> bool {
        ctx.phase.is_postflop() && ctx.player_aggressive_last_street()
    }

    fn judge(&self, action: &LiveAction, ctx: &SituationContext) -> Judgement {
        if ctx.facing_bet {
            return match action.action {
                ActionKind::Fold => {
                    Judgement::incorrect(CLEAR, "gave up the initiative to a single bet")
                }
                ActionKind::Check => out_of_place(action),
                _ => Judgement::correct(CLEAR, "stayed in after taking the lead last street"),
            };
        }

        match action.action {
            ActionKind::Bet | ActionKind::Raise | ActionKind::AllIn => {
                Judgement::correct(CLEAR, "followed through with a bet")
            }
            ActionKind::Check => {
                Judgement::marginal(JUDGEMENT_CALL, "checked after leading the previous street")
            }
            ActionKind::Fold => Judgement::incorrect(CLEAR, "folded when checking was free"),
            ActionKind::Call => out_of_place(action),
        }
    }
}

// =============================================================================
// Gate 3: Aggression
// =============================================================================

/// Bet draws when nobody has bet yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiBluffDraws;

impl SkillRule for SemiBluffDraws {
    fn skill_id(&self) -> &str {
        skill_ids::SEMI_BLUFF_DRAWS
    }

    fn triggers(&self, ctx: &SituationContext) -> bool {
        matches!(ctx.phase, Phase::Flop | Phase::Turn)
            && ctx.hand.draw
            && ctx.hand.is_unmade()
            && !ctx.facing_bet
    }

    fn judge(&self, action: &LiveAction, _ctx: &SituationContext) -> Judgement {
        match action.action {
            ActionKind::Bet | ActionKind::Raise | ActionKind::AllIn => {
                Judgement::correct(CLEAR, "semi-bluffed a draw")
            }
            ActionKind::Check => {
                Judgement::marginal(JUDGEMENT_CALL, "checked a draw instead of semi-bluffing")
            }
            ActionKind::Fold => Judgement::incorrect(CLEAR, "folded a draw when checking was free"),
            ActionKind::Call => out_of_place(action),
        }
    }
}

/// Check back air on the river instead of firing or folding.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckBehindWeakRiver;

impl SkillRule for CheckBehindWeakRiver {
    fn skill_id(&self) -> &str {
        skill_ids::CHECK_BEHIND_WEAK_RIVER
    }

    fn triggers(&self, ctx: &SituationContext) -> bool {
        ctx.phase == Phase::River && !ctx.facing_bet && ctx.hand.is_unmade() && !ctx.hand.premium
    }

    fn judge(&self, action: &LiveAction, _ctx: &SituationContext) -> Judgement {
        match action.action {
            ActionKind::Check => Judgement::correct(CLEAR, "checked back a weak river hand"),
            ActionKind::Bet | ActionKind::Raise | ActionKind::AllIn => {
                Judgement::marginal(JUDGEMENT_CALL, "bluffed the river with air")
            }
            ActionKind::Fold => Judgement::incorrect(CLEAR, "folded when checking was free"),
            ActionKind::Call => out_of_place(action),
        }
    }
}
