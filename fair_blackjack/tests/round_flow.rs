/// Integration tests for full round flow through the public state machine
/// API. Hands are whatever the seeded shuffle deals, so assertions check
/// the table's invariants and recompute expected payouts from the observed
/// cards.
use fair_blackjack::entities::{
    CardView, Chips, PlayStatus, PlayerAction, RoundOutcome, RoundStage, Username,
};
use fair_blackjack::{RoundState, TableError, TableSettings, TableStateManagement, scoring};

fn seat_two_bettors() -> (RoundState, Username, Username) {
    let (alice, bob) = (Username::new("alice"), Username::new("bob"));
    let mut state = RoundState::new(TableSettings::default());
    state.join_player(&alice, 1000).unwrap();
    state.join_player(&bob, 800).unwrap();
    state.place_bet(&alice, 100).unwrap();
    state.place_bet(&bob, 50).unwrap();
    (state, alice, bob)
}

fn run_until(mut state: RoundState, stage: RoundStage) -> RoundState {
    for _ in 0..128 {
        if state.stage() == stage {
            return state;
        }
        state = state.step();
    }
    panic!("never reached {stage}, stuck in {}", state.stage());
}

fn stand_everyone(state: &mut RoundState) {
    for _ in 0..16 {
        let Some(turn) = state.view().turn else {
            return;
        };
        state.take_action(&turn, PlayerAction::Stand).unwrap();
    }
}

#[test]
fn bets_debit_immediately_and_deal_follows() {
    let (state, _, _) = seat_two_bettors();
    let view = state.view();
    assert_eq!(view.players[0].chips, 900);
    assert_eq!(view.players[1].chips, 750);
    assert_eq!(view.stage, RoundStage::Betting);

    let state = state.step();
    let view = state.view();
    assert_eq!(view.stage, RoundStage::Playing);
    for player in &view.players {
        assert_eq!(player.cards.len(), 2);
        assert_eq!(player.status, PlayStatus::Playing);
    }
    assert_eq!(view.dealer.cards.len(), 2);
}

#[test]
fn at_most_one_player_holds_the_turn_and_it_is_the_earliest_eligible() {
    let (state, _, _) = seat_two_bettors();
    let mut state = state.step();

    for _ in 0..8 {
        let view = state.view();
        if view.stage != RoundStage::Playing {
            break;
        }
        let holder = view.turn.clone().expect("someone must hold the turn");
        let earliest = view
            .players
            .iter()
            .find(|p| p.bet > 0 && !p.status.is_finished())
            .expect("an eligible player exists while playing");
        assert_eq!(holder, earliest.username);

        // Everyone else is rejected out of turn.
        for player in &view.players {
            if player.username != holder {
                assert_eq!(
                    state.take_action(&player.username, PlayerAction::Stand),
                    Err(TableError::OutOfTurnAction)
                );
            }
        }
        state.take_action(&holder, PlayerAction::Stand).unwrap();
        state = state.step();
    }
}

#[test]
fn dealer_hole_card_is_masked_until_reveal() {
    let (state, _, _) = seat_two_bettors();
    let mut state = state.step();

    let view = state.view();
    assert_eq!(view.dealer.cards[1], CardView::Hidden);
    assert!(matches!(view.dealer.cards[0], CardView::Up(_)));

    stand_everyone(&mut state);
    let state = run_until(state, RoundStage::Settlement);
    let view = state.view();
    assert!(view.dealer.cards.iter().all(|c| matches!(c, CardView::Up(_))));
}

#[test]
fn settlement_matches_the_payout_table_and_dealer_stands_on_17() {
    let (state, alice, bob) = seat_two_bettors();
    let mut state = state.step();

    stand_everyone(&mut state);
    let state = run_until(state, RoundStage::Settlement);
    let view = state.view();

    // Stand-on-17 policy: a non-busted dealer finished at 17 or better.
    let dealer_cards: Vec<_> = view
        .dealer
        .cards
        .iter()
        .map(|c| match c {
            CardView::Up(card) => *card,
            CardView::Hidden => panic!("hole card still masked in settlement"),
        })
        .collect();
    let dealer_score = scoring::hand_value(&dealer_cards);
    assert!(dealer_score >= 17);
    let dealer_blackjack = scoring::is_blackjack(&dealer_cards);

    for (name, bet, before) in [(alice, 100, 1000), (bob, 50, 800)] {
        let player = view
            .players
            .iter()
            .find(|p| p.username == name)
            .expect("seated");
        let score = scoring::hand_value(&player.cards);
        let blackjack = scoring::is_blackjack(&player.cards);
        let expected_credit: Chips = if score > 21 {
            0
        } else if blackjack && !dealer_blackjack {
            bet + bet * 3 / 2
        } else if blackjack && dealer_blackjack {
            bet
        } else if dealer_blackjack {
            0
        } else if dealer_score > 21 || score > dealer_score {
            2 * bet
        } else if score < dealer_score {
            0
        } else {
            bet
        };
        assert_eq!(player.chips, before - bet + expected_credit);
        assert!(player.outcome.is_some());
        if expected_credit == 0 {
            assert_eq!(player.outcome, Some(RoundOutcome::Lose));
        }
    }
}

#[test]
fn table_resets_for_the_next_round_with_chips_retained() {
    let (state, alice, _) = seat_two_bettors();
    let mut state = state.step();
    stand_everyone(&mut state);

    let state = run_until(state, RoundStage::Settlement);
    let settled_chips: Vec<Chips> = state.view().players.iter().map(|p| p.chips).collect();

    let mut state = run_until(state, RoundStage::Betting);
    let view = state.view();
    assert!(view.dealer.cards.is_empty());
    for (player, chips) in view.players.iter().zip(settled_chips) {
        assert!(player.cards.is_empty());
        assert_eq!(player.bet, 0);
        assert_eq!(player.status, PlayStatus::Betting);
        assert!(player.outcome.is_none());
        assert_eq!(player.chips, chips);
    }

    // The next round is accepted immediately.
    let chips = view.players[0].chips;
    if chips > 0 {
        state.place_bet(&alice, chips.min(25)).unwrap();
    }
}

#[test]
fn actions_outside_the_playing_phase_are_rejected() {
    let (mut state, alice, _) = seat_two_bettors();
    assert_eq!(
        state.take_action(&alice, PlayerAction::Hit),
        Err(TableError::NoActionsAllowed)
    );

    let mut state = state.step();
    assert_eq!(state.place_bet(&alice, 10), Err(TableError::BetsClosed));
    assert_eq!(state.start_round(&alice), Err(TableError::RoundInProgress));

    stand_everyone(&mut state);
    let mut state = run_until(state, RoundStage::Dealer);
    assert_eq!(
        state.take_action(&alice, PlayerAction::Hit),
        Err(TableError::NoActionsAllowed)
    );
}

#[test]
fn a_player_leaving_mid_round_forfeits_the_bet_and_play_continues() {
    let (state, alice, bob) = seat_two_bettors();
    let mut state = state.step();

    assert_eq!(state.view().turn, Some(alice.clone()));
    let chips = state.remove_player(&alice).unwrap();
    assert_eq!(chips, 900);

    // Bob inherits the turn and the round still completes.
    assert_eq!(state.view().turn, Some(bob.clone()));
    state.take_action(&bob, PlayerAction::Stand).unwrap();
    let state = run_until(state, RoundStage::Settlement);
    assert_eq!(state.view().players.len(), 1);
}
