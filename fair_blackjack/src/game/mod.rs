//! Blackjack game engine - entities, provably fair deck, scoring,
//! settlement, and the round state machine.
//!
//! This module provides the foundational game implementation including:
//! - A typestate FSM over the four round phases
//! - Player and dealer records owned exclusively by their table
//! - The seeded, hash-derived shuffle with post-round verification
//! - Pure scoring and settlement functions

pub mod deck;
pub mod entities;
pub mod scoring;
pub mod settlement;
pub mod state_machine;
pub mod states;

pub use state_machine::{
    RoundEvent, RoundState, Table, TableData, TableError, TableSettings, TableStateManagement,
};
