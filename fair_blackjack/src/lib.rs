//! # Fair Blackjack
//!
//! A real-time multiplayer blackjack engine built around two guarantees:
//!
//! - **Strict per-table serialization.** Every table is an async actor that
//!   handles one event (player intent or timer tick) to completion before
//!   the next, so turn order and chip accounting never race.
//! - **A provably fair deck.** Each shuffle is a deterministic function of
//!   a secret server seed, a client seed, and a round nonce; disclosing the
//!   triple after the round lets anyone recompute the exact permutation and
//!   confirm nothing was reordered mid-play.
//!
//! A round cycles through four phases:
//!
//! - **Betting**: seats accept bets; dealing starts when everyone is in or
//!   a bettor asks for it
//! - **Playing**: players hit, stand, or double down in seat order under a
//!   single authoritative turn pointer
//! - **Dealer**: the hole card is revealed and the dealer draws to 17 on a
//!   paced tick, one step at a time
//! - **Settlement**: payouts are applied exactly once, hands stay on
//!   display briefly, and the table resets
//!
//! ## Core Modules
//!
//! - [`game`]: entities, deck engine, scoring, settlement, and the round
//!   state machine
//! - [`table`]: per-table actors, the table registry, and broadcast fan-out
//! - [`net`]: the tagged-union wire protocol with hidden-card masking
//! - [`ledger`]: the external account service contract
//!
//! ## Example
//!
//! ```
//! use fair_blackjack::{RoundState, TableSettings};
//!
//! // A new table, waiting for bets.
//! let table = RoundState::new(TableSettings::default());
//! ```

/// Core game logic, entities, and the round state machine.
pub mod game;
pub use game::{
    RoundEvent, RoundState, TableError, TableSettings, TableStateManagement,
    deck::{self, Verification},
    entities, scoring, settlement,
};

/// External account/ledger collaborator contract.
pub mod ledger;
pub use ledger::{ChipAccounts, MemoryAccounts};

/// Wire protocol types.
pub mod net;
pub use net::messages::{ClientEvent, ServerEvent};

/// Table actors, registry, and messages.
pub mod table;
pub use table::{
    SessionId, TableActor, TableConfig, TableHandle, TableId, TableManager, TableMessage,
    TableResponse,
};
