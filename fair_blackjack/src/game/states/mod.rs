//! Phase definitions for the round state machine.
//!
//! Each struct is the per-phase state carried by `Table<T>`; everything
//! shared across phases lives in `TableData`.

use crate::game::entities::SeatIndex;

/// Waiting for bets. Dealing starts once every seated player has a bet (or
/// no chips to bet with), or once a bettor explicitly starts the round.
#[derive(Debug, Default)]
pub struct Betting {
    pub(crate) start_requested: bool,
}

/// Players act in seat order. `turn` is the authoritative turn pointer;
/// `idle_ticks` counts how long the current player has been on the clock.
#[derive(Debug)]
pub struct Turns {
    pub(crate) turn: Option<SeatIndex>,
    pub(crate) idle_ticks: u32,
}

/// The dealer's tick-driven sequence: reveal the hole card, then draw to 17
/// one card per elapsed delay, then stand or bust.
#[derive(Debug)]
pub struct DealerTurn {
    pub(crate) revealed: bool,
    pub(crate) cooldown: u32,
}

/// Payouts are applied on entry; the phase then holds the final hands on
/// display for a fixed delay before resetting to betting.
#[derive(Debug)]
pub struct Settling {
    pub(crate) ticks_remaining: u32,
}
