//! Hand scoring. These functions are pure and are applied identically to
//! the dealer and every player; hidden-card masking never changes a score,
//! it only changes which cards a view includes.

use super::entities::Card;

/// Type alias for hand values.
pub type Score = u32;

/// The target total. Anything above is a bust.
pub const BLACKJACK: Score = 21;

/// Value of a hand: faces count 10, numerics their face value, and each ace
/// counts 11 until the total would bust, at which point aces downgrade to 1
/// one at a time.
pub fn hand_value(hand: &[Card]) -> Score {
    let mut total = 0;
    let mut aces = 0;
    for card in hand {
        if card.rank.is_ace() {
            aces += 1;
        }
        total += card.rank.base_value();
    }
    while total > BLACKJACK && aces > 0 {
        total -= 10;
        aces -= 1;
    }
    total
}

/// A hand is soft while an ace still counts as 11.
pub fn is_soft(hand: &[Card]) -> bool {
    let low: Score = hand
        .iter()
        .map(|card| if card.rank.is_ace() { 1 } else { card.rank.base_value() })
        .sum();
    hand.iter().any(|card| card.rank.is_ace()) && low + 10 == hand_value(hand)
}

pub fn is_bust(hand: &[Card]) -> bool {
    hand_value(hand) > BLACKJACK
}

/// A natural: exactly two cards totalling 21.
pub fn is_blackjack(hand: &[Card]) -> bool {
    hand.len() == 2 && hand_value(hand) == BLACKJACK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Rank, Suit};

    fn hand(ranks: &[Rank]) -> Vec<Card> {
        ranks
            .iter()
            .map(|&rank| Card::new(rank, Suit::Spades))
            .collect()
    }

    #[test]
    fn face_cards_count_ten() {
        assert_eq!(hand_value(&hand(&[Rank::King, Rank::Queen])), 20);
        assert_eq!(hand_value(&hand(&[Rank::Jack, Rank::Ten])), 20);
    }

    #[test]
    fn single_ace_counts_eleven_when_it_fits() {
        assert_eq!(hand_value(&hand(&[Rank::Ace, Rank::Six])), 17);
        assert_eq!(hand_value(&hand(&[Rank::Ace, Rank::Six, Rank::Nine])), 16);
    }

    #[test]
    fn two_aces_and_nine_is_twenty_one() {
        assert_eq!(hand_value(&hand(&[Rank::Ace, Rank::Ace, Rank::Nine])), 21);
    }

    #[test]
    fn four_aces() {
        assert_eq!(hand_value(&hand(&[Rank::Ace, Rank::Ace, Rank::Ace, Rank::Ace])), 14);
    }

    #[test]
    fn soft_hand_detection() {
        assert!(is_soft(&hand(&[Rank::Ace, Rank::Six])));
        assert!(!is_soft(&hand(&[Rank::Ace, Rank::Six, Rank::Nine])));
        assert!(!is_soft(&hand(&[Rank::King, Rank::Seven])));
    }

    #[test]
    fn bust_detection() {
        assert!(is_bust(&hand(&[Rank::King, Rank::Queen, Rank::Two])));
        assert!(!is_bust(&hand(&[Rank::Ace, Rank::King, Rank::Queen])));
    }

    #[test]
    fn blackjack_is_exactly_two_cards() {
        assert!(is_blackjack(&hand(&[Rank::Ace, Rank::King])));
        assert!(!is_blackjack(&hand(&[Rank::Seven, Rank::Seven, Rank::Seven])));
        assert!(!is_blackjack(&hand(&[Rank::King, Rank::Queen])));
    }
}
