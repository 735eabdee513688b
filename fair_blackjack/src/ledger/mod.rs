//! The account/ledger collaborator boundary.
//!
//! Cross-session chip balances live with an external account service; the
//! table syncs with it only when a seat is taken or released. This module
//! defines that contract and ships an in-memory implementation.

pub mod errors;
pub mod manager;

pub use errors::{LedgerError, LedgerResult};
pub use manager::{ChipAccounts, DEFAULT_STARTING_CHIPS, MemoryAccounts};
