//! Table configuration models.

use serde::{Deserialize, Serialize};

use crate::game::entities::Chips;
use crate::game::{TableSettings, state_machine};

/// Hard cap on seats, the width of a physical blackjack table.
pub const MAX_SEATS: usize = 7;

/// Table configuration. Delays are in seconds; the actor ticks at 1 Hz, so
/// they convert one-to-one into state machine ticks.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableConfig {
    /// Table name shown to clients.
    pub name: String,

    /// Maximum number of seated players.
    pub max_players: usize,

    /// Smallest accepted bet.
    pub min_bet: Chips,

    /// Pause between dealer reveal/draw steps.
    pub dealer_delay_secs: u32,

    /// How long final hands stay on display before the next round.
    pub settle_delay_secs: u32,

    /// How long a player may hold the turn before being forced to stand.
    pub turn_timeout_secs: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Main Table".to_string(),
            max_players: state_machine::DEFAULT_MAX_PLAYERS,
            min_bet: state_machine::DEFAULT_MIN_BET,
            dealer_delay_secs: state_machine::DEFAULT_DEALER_DELAY_TICKS,
            settle_delay_secs: state_machine::DEFAULT_SETTLE_DELAY_TICKS,
            turn_timeout_secs: state_machine::DEFAULT_TURN_TIMEOUT_TICKS,
        }
    }
}

impl TableConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_players == 0 || self.max_players > MAX_SEATS {
            return Err(format!("max players must be between 1 and {MAX_SEATS}"));
        }
        if self.min_bet == 0 {
            return Err("minimum bet must be at least 1 chip".to_string());
        }
        if self.dealer_delay_secs == 0 {
            return Err("dealer delay must be at least 1 second".to_string());
        }
        if self.turn_timeout_secs < 5 {
            return Err("turn timeout must be at least 5 seconds".to_string());
        }
        Ok(())
    }

    /// The state machine settings this configuration implies.
    pub fn settings(&self) -> TableSettings {
        TableSettings {
            max_players: self.max_players,
            min_bet: self.min_bet,
            dealer_delay_ticks: self.dealer_delay_secs,
            settle_delay_ticks: self.settle_delay_secs,
            turn_timeout_ticks: self.turn_timeout_secs,
        }
    }
}
