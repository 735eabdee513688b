use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::scoring::{self, Score};

/// Usernames longer than this are truncated on construction.
pub const MAX_USERNAME_LENGTH: usize = 24;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Clubs,
    Spades,
    Diamonds,
    Hearts,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Clubs, Self::Spades, Self::Diamonds, Self::Hearts];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Clubs => "♣",
            Self::Spades => "♠",
            Self::Diamonds => "♦",
            Self::Hearts => "♥",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Self; 13] = [
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Ten,
        Self::Jack,
        Self::Queen,
        Self::King,
        Self::Ace,
    ];

    /// Rank value before any ace downgrades: faces are 10, an ace is 11.
    pub const fn base_value(self) -> Score {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten | Self::Jack | Self::Queen | Self::King => 10,
            Self::Ace => 11,
        }
    }

    pub const fn is_ace(self) -> bool {
        matches!(self, Self::Ace)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Ace => "A",
            rank => &rank.base_value().to_string(),
        };
        write!(f, "{repr}")
    }
}

/// A playing card. Immutable once drawn from the deck.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

/// Type alias for whole chips. All bets and balances are whole chips;
/// fractional payouts (the 3:2 blackjack bonus) round down.
pub type Chips = u32;

/// Type alias for seat positions. Seat order is turn order.
pub type SeatIndex = usize;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let mut username: String = s
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        username.truncate(MAX_USERNAME_LENGTH);
        Self(username)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// A player intent during their turn.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Hit,
    Stand,
    DoubleDown,
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Hit => "hits",
            Self::Stand => "stands",
            Self::DoubleDown => "doubles down",
        };
        write!(f, "{repr}")
    }
}

/// Where a player is within the current round. `Stood`, `Busted`, and
/// `Doubled` are the finished statuses; a finished player no longer takes
/// turns this round.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayStatus {
    Betting,
    Playing,
    Stood,
    Busted,
    Doubled,
}

impl PlayStatus {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Stood | Self::Busted | Self::Doubled)
    }
}

impl fmt::Display for PlayStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Betting => "betting",
            Self::Playing => "playing",
            Self::Stood => "stood",
            Self::Busted => "busted",
            Self::Doubled => "doubled",
        };
        write!(f, "{repr}")
    }
}

/// Per-player result tag from the most recent settlement.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    Blackjack,
    Win,
    Push,
    Lose,
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Blackjack => "blackjack",
            Self::Win => "win",
            Self::Push => "push",
            Self::Lose => "lose",
        };
        write!(f, "{repr}")
    }
}

/// A seated player. Created on join, reset at every round boundary (chips
/// are retained), removed on leave or disconnect.
#[derive(Clone, Debug)]
pub struct Player {
    pub name: Username,
    pub hand: Vec<Card>,
    pub chips: Chips,
    pub bet: Chips,
    pub insurance: Chips,
    pub status: PlayStatus,
    pub outcome: Option<RoundOutcome>,
}

impl Player {
    pub fn new(name: Username, chips: Chips) -> Self {
        Self {
            name,
            hand: Vec::with_capacity(8),
            chips,
            bet: 0,
            insurance: 0,
            status: PlayStatus::Betting,
            outcome: None,
        }
    }

    pub fn score(&self) -> Score {
        scoring::hand_value(&self.hand)
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// Clears every round-scoped field. Chips are retained.
    pub fn reset_round(&mut self) {
        self.hand.clear();
        self.bet = 0;
        self.insurance = 0;
        self.status = PlayStatus::Betting;
        self.outcome = None;
    }
}

/// The house hand. One per table, reset every round. The second card stays
/// hidden from clients until the reveal step of the dealer phase; that
/// masking happens in view construction, not here.
#[derive(Clone, Debug, Default)]
pub struct Dealer {
    pub hand: Vec<Card>,
}

impl Dealer {
    pub fn upcard(&self) -> Option<Card> {
        self.hand.first().copied()
    }

    pub fn hole_card(&self) -> Option<Card> {
        self.hand.get(1).copied()
    }

    pub fn score(&self) -> Score {
        scoring::hand_value(&self.hand)
    }

    pub fn reset(&mut self) {
        self.hand.clear();
    }
}

/// The round lifecycle phase, as shown to clients.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStage {
    Betting,
    Playing,
    Dealer,
    Settlement,
}

impl fmt::Display for RoundStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Betting => "betting",
            Self::Playing => "playing",
            Self::Dealer => "dealer",
            Self::Settlement => "settlement",
        };
        write!(f, "{repr}")
    }
}

/// A card as it appears in an outbound snapshot: face up, or an opaque
/// placeholder for the dealer's unrevealed hole card.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardView {
    Up(Card),
    Hidden,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DealerView {
    pub cards: Vec<CardView>,
    /// Value of the visible cards only; the full score would leak the
    /// hole card while it is masked.
    pub score: Score,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerView {
    pub username: Username,
    pub seat: SeatIndex,
    pub cards: Vec<Card>,
    pub score: Score,
    pub chips: Chips,
    pub bet: Chips,
    pub insurance: Chips,
    pub status: PlayStatus,
    pub outcome: Option<RoundOutcome>,
}

/// A full table snapshot as broadcast to clients. Masking has already been
/// applied; this is a presentation of internal state, never the state
/// itself.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableView {
    pub stage: RoundStage,
    pub dealer: DealerView,
    pub players: Vec<PlayerView>,
    pub turn: Option<Username>,
}

impl DealerView {
    /// Builds the dealer's outbound view. While `hide_hole` is set, the
    /// second card (and anything after it, which cannot exist before the
    /// reveal) is replaced with a placeholder and excluded from the score.
    pub fn masked(dealer: &Dealer, hide_hole: bool) -> Self {
        let (cards, visible): (Vec<CardView>, Vec<Card>) = if hide_hole {
            let cards = dealer
                .hand
                .iter()
                .enumerate()
                .map(|(i, card)| {
                    if i == 0 {
                        CardView::Up(*card)
                    } else {
                        CardView::Hidden
                    }
                })
                .collect();
            (cards, dealer.hand.iter().take(1).copied().collect())
        } else {
            (
                dealer.hand.iter().copied().map(CardView::Up).collect(),
                dealer.hand.clone(),
            )
        };
        Self {
            cards,
            score: scoring::hand_value(&visible),
        }
    }
}

impl PlayerView {
    pub fn of(player: &Player, seat: SeatIndex) -> Self {
        Self {
            username: player.name.clone(),
            seat,
            cards: player.hand.clone(),
            score: player.score(),
            chips: player.chips,
            bet: player.bet,
            insurance: player.insurance,
            status: player.status,
            outcome: player.outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_replaces_whitespace_and_truncates() {
        let name = Username::new("a very long name with lots of spaces");
        assert!(!name.as_str().contains(' '));
        assert_eq!(name.as_str().len(), MAX_USERNAME_LENGTH);
    }

    #[test]
    fn card_display_uses_rank_and_suit_glyphs() {
        let card = Card::new(Rank::Ace, Suit::Spades);
        assert_eq!(card.to_string(), "A♠");
        let card = Card::new(Rank::Ten, Suit::Hearts);
        assert_eq!(card.to_string(), "10♥");
    }

    #[test]
    fn finished_statuses() {
        assert!(!PlayStatus::Betting.is_finished());
        assert!(!PlayStatus::Playing.is_finished());
        assert!(PlayStatus::Stood.is_finished());
        assert!(PlayStatus::Busted.is_finished());
        assert!(PlayStatus::Doubled.is_finished());
    }

    #[test]
    fn dealer_view_masks_hole_card() {
        let dealer = Dealer {
            hand: vec![
                Card::new(Rank::Ace, Suit::Spades),
                Card::new(Rank::King, Suit::Hearts),
            ],
        };

        let masked = DealerView::masked(&dealer, true);
        assert_eq!(masked.cards[0], CardView::Up(Card::new(Rank::Ace, Suit::Spades)));
        assert_eq!(masked.cards[1], CardView::Hidden);
        assert_eq!(masked.score, 11);

        let shown = DealerView::masked(&dealer, false);
        assert_eq!(shown.cards[1], CardView::Up(Card::new(Rank::King, Suit::Hearts)));
        assert_eq!(shown.score, 21);
    }

    #[test]
    fn player_reset_retains_chips() {
        let mut player = Player::new(Username::new("alice"), 750);
        player.bet = 100;
        player.insurance = 50;
        player.hand.push(Card::new(Rank::Nine, Suit::Clubs));
        player.status = PlayStatus::Stood;
        player.outcome = Some(RoundOutcome::Win);

        player.reset_round();

        assert_eq!(player.chips, 750);
        assert_eq!(player.bet, 0);
        assert_eq!(player.insurance, 0);
        assert!(player.hand.is_empty());
        assert_eq!(player.status, PlayStatus::Betting);
        assert!(player.outcome.is_none());
    }
}
