//! The provably fair deck engine.
//!
//! Every shuffle is a deterministic function of `(server_seed, client_seed,
//! nonce)`: the triple is digested with SHA-256 and the digest drives a
//! Fisher-Yates pass. Disclosing the triple after a round lets any third
//! party recompute the identical permutation and confirm the order was
//! fixed before play — see [`derive_order`] for the exact algorithm.

use log::info;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::entities::{Card, Rank, Suit};

pub const DECK_SIZE: usize = 52;

/// Seeds are this many random bytes, hex-encoded.
const SEED_BYTES: usize = 32;

/// The verification payload for the most recent shuffle. `deck_order` is
/// populated only once the round using this shuffle has ended; while cards
/// from it are still in play the ordering stays sealed, since disclosing it
/// would let a client predict undealt cards.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Verification {
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck_order: Option<Vec<Card>>,
}

#[derive(Debug)]
pub struct Deck {
    /// Live ordering. Cards are drawn from the end.
    cards: Vec<Card>,
    /// The complete post-shuffle ordering, retained for disclosure.
    order: Vec<Card>,
    server_seed: String,
    client_seed: String,
    /// Incremented after every shuffle; the shuffle that produced the
    /// current ordering used `nonce - 1`.
    nonce: u64,
    round_open: bool,
}

impl Deck {
    /// Builds and shuffles a fresh 52-card deck. Missing seeds are
    /// generated from the thread's CSPRNG.
    pub fn new(server_seed: Option<String>, client_seed: Option<String>) -> Self {
        let mut deck = Self {
            cards: Vec::new(),
            order: Vec::new(),
            server_seed: server_seed.unwrap_or_else(random_seed),
            client_seed: client_seed.unwrap_or_else(random_seed),
            nonce: 0,
            round_open: false,
        };
        deck.shuffle();
        deck
    }

    /// Recomputes the ordering from the current seeds and nonce, then
    /// increments the nonce.
    pub fn shuffle(&mut self) {
        self.cards = derive_order(&self.server_seed, &self.client_seed, self.nonce);
        self.order = self.cards.clone();
        self.nonce += 1;
    }

    /// Draws the next card. An exhausted deck is not an error: a fresh
    /// server seed is generated and a complete new deck is shuffled in
    /// before drawing.
    pub fn draw(&mut self) -> Card {
        loop {
            if let Some(card) = self.cards.pop() {
                return card;
            }
            info!("deck exhausted, reshuffling with a fresh server seed");
            self.server_seed = random_seed();
            self.shuffle();
        }
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Marks the current ordering as in play, sealing `deck_order` in
    /// [`Self::verification`].
    pub fn open_round(&mut self) {
        self.round_open = true;
    }

    /// Marks the round as over, unsealing the full ordering.
    pub fn close_round(&mut self) {
        self.round_open = false;
    }

    /// The verification payload for the shuffle that produced the current
    /// ordering. Seeds and hash are always returned; the full ordering only
    /// once the round is closed.
    pub fn verification(&self) -> Verification {
        let nonce = self.nonce.saturating_sub(1);
        Verification {
            server_seed: self.server_seed.clone(),
            client_seed: self.client_seed.clone(),
            nonce,
            hash: hex::encode(shuffle_digest(&self.server_seed, &self.client_seed, nonce)),
            deck_order: (!self.round_open).then(|| self.order.clone()),
        }
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
impl Deck {
    /// A deck with a fixed ordering, for rigging hands in unit tests.
    /// Draws come from the end of `order`.
    pub(crate) fn rigged(order: Vec<Card>) -> Self {
        Self {
            cards: order.clone(),
            order,
            server_seed: "rigged".to_string(),
            client_seed: "rigged".to_string(),
            nonce: 1,
            round_open: false,
        }
    }
}

fn random_seed() -> String {
    let mut bytes = [0u8; SEED_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The unshuffled pack: suits in `Suit::ALL` order, ranks two through ace
/// within each suit. Verifiers must start from this ordering.
pub fn fresh_pack() -> Vec<Card> {
    let mut cards = Vec::with_capacity(DECK_SIZE);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            cards.push(Card::new(rank, suit));
        }
    }
    cards
}

/// `SHA-256("{server_seed}:{client_seed}:{nonce}")` with the nonce in
/// decimal.
pub fn shuffle_digest(server_seed: &str, client_seed: &str, nonce: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(format!("{server_seed}:{client_seed}:{nonce}").as_bytes());
    hasher.finalize().into()
}

/// Derives the full deck ordering for a seed triple. This is the documented
/// verification algorithm: starting from [`fresh_pack`], run Fisher-Yates
/// for `i = 51` down to `1`, where each swap index `j` is the next
/// big-endian two-byte window of the digest (cursor wrapping modulo the
/// digest length) reduced modulo `i + 1`.
pub fn derive_order(server_seed: &str, client_seed: &str, nonce: u64) -> Vec<Card> {
    let digest = shuffle_digest(server_seed, client_seed, nonce);
    let mut cards = fresh_pack();
    let mut cursor = 0usize;
    for i in (1..cards.len()).rev() {
        let window =
            ((digest[cursor % digest.len()] as usize) << 8) | digest[(cursor + 1) % digest.len()] as usize;
        cursor += 2;
        let j = window % (i + 1);
        cards.swap(i, j);
    }
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn shuffle_is_deterministic() {
        let a = derive_order("server", "client", 0);
        let b = derive_order("server", "client", 0);
        assert_eq!(a, b);

        let deck_a = Deck::new(Some("server".into()), Some("client".into()));
        let deck_b = Deck::new(Some("server".into()), Some("client".into()));
        assert_eq!(deck_a.order, deck_b.order);
        assert_eq!(deck_a.order, a);
    }

    #[test]
    fn different_nonce_changes_the_order() {
        assert_ne!(derive_order("server", "client", 0), derive_order("server", "client", 1));
    }

    #[test]
    fn shuffled_deck_has_52_unique_cards() {
        let order = derive_order("s", "c", 0);
        assert_eq!(order.len(), DECK_SIZE);
        let unique: HashSet<_> = order.iter().collect();
        assert_eq!(unique.len(), DECK_SIZE);
    }

    #[test]
    fn draw_pops_from_the_end() {
        let mut deck = Deck::new(Some("s".into()), Some("c".into()));
        let expected = *deck.order.last().expect("non-empty");
        assert_eq!(deck.draw(), expected);
        assert_eq!(deck.remaining(), DECK_SIZE - 1);
    }

    #[test]
    fn exhaustion_reshuffles_instead_of_failing() {
        let mut deck = Deck::new(None, None);
        let first_seed = deck.verification().server_seed;
        let mut shoe = HashSet::new();
        for _ in 0..DECK_SIZE {
            assert!(shoe.insert(deck.draw()), "duplicate card within one shoe");
        }
        // The 53rd draw triggers a fresh shoe under a new server seed.
        let _ = deck.draw();
        assert_eq!(deck.remaining(), DECK_SIZE - 1);
        assert_ne!(deck.verification().server_seed, first_seed);
    }

    #[test]
    fn verification_seals_order_while_round_open() {
        let mut deck = Deck::new(None, None);
        assert!(deck.verification().deck_order.is_some());

        deck.open_round();
        let sealed = deck.verification();
        assert!(sealed.deck_order.is_none());
        assert!(!sealed.server_seed.is_empty());

        deck.close_round();
        let disclosed = deck.verification();
        assert_eq!(disclosed.deck_order.as_deref(), Some(&deck.order[..]));
    }

    #[test]
    fn verification_nonce_matches_producing_shuffle() {
        let deck = Deck::new(Some("s".into()), Some("c".into()));
        let v = deck.verification();
        assert_eq!(v.nonce, 0);
        assert_eq!(derive_order(&v.server_seed, &v.client_seed, v.nonce), deck.order);
    }
}
