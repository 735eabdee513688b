//! The settlement engine: a pure function from final hands to chip credits
//! and result tags. Stakes are debited when bets are placed, so settlement
//! only ever credits; a loss is a credit of zero. Running it twice would
//! double-pay, which the state machine rules out by computing settlement
//! exactly once, inside the transition into the settlement phase.

use serde::{Deserialize, Serialize};

use super::entities::{Card, Chips, Player, RoundOutcome, Username};
use super::scoring::{self, BLACKJACK};

/// One player's settlement: the result tag for broadcast plus the amounts
/// returned to their stack.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SettlementEntry {
    pub username: Username,
    pub outcome: RoundOutcome,
    /// Main-bet credit: stake plus winnings, stake alone on a push, zero on
    /// a loss.
    pub main_credit: Chips,
    /// Insurance credit: 3x the stake when the dealer has blackjack (stake
    /// back plus 2:1 winnings), zero otherwise.
    pub insurance_credit: Chips,
}

/// The 3:2 blackjack bonus, rounded down.
pub fn blackjack_bonus(bet: Chips) -> Chips {
    bet * 3 / 2
}

/// Settles every player holding a bet against the dealer's final hand.
/// Players without a bet sat the round out and are skipped.
pub fn settle(dealer_hand: &[Card], players: &[Player]) -> Vec<SettlementEntry> {
    let dealer_score = scoring::hand_value(dealer_hand);
    let dealer_blackjack = scoring::is_blackjack(dealer_hand);
    let dealer_bust = dealer_score > BLACKJACK;

    players
        .iter()
        .filter(|player| player.bet > 0)
        .map(|player| {
            let score = player.score();
            let blackjack = scoring::is_blackjack(&player.hand);
            let (outcome, main_credit) = if score > BLACKJACK {
                (RoundOutcome::Lose, 0)
            } else if blackjack && !dealer_blackjack {
                (RoundOutcome::Blackjack, player.bet + blackjack_bonus(player.bet))
            } else if blackjack && dealer_blackjack {
                (RoundOutcome::Push, player.bet)
            } else if dealer_blackjack {
                (RoundOutcome::Lose, 0)
            } else if dealer_bust || score > dealer_score {
                (RoundOutcome::Win, 2 * player.bet)
            } else if score < dealer_score {
                (RoundOutcome::Lose, 0)
            } else {
                (RoundOutcome::Push, player.bet)
            };
            let insurance_credit = if dealer_blackjack {
                3 * player.insurance
            } else {
                0
            };
            SettlementEntry {
                username: player.name.clone(),
                outcome,
                main_credit,
                insurance_credit,
            }
        })
        .collect()
}
