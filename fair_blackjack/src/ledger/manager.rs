//! The account ledger contract and its in-memory implementation.

use async_trait::async_trait;
use log::info;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::errors::LedgerResult;
use crate::game::entities::{Chips, Username};

/// Chips a brand-new account starts with.
pub const DEFAULT_STARTING_CHIPS: Chips = 1000;

/// The external account service. The table consults it exactly twice per
/// seat: once at join to load the authoritative balance, once at leave to
/// persist it. Nothing mid-round touches the ledger, and nothing a client
/// reports about its own balance is ever believed.
#[async_trait]
pub trait ChipAccounts: Send + Sync {
    async fn chip_balance(&self, username: &Username) -> LedgerResult<Chips>;

    async fn persist_chip_balance(&self, username: &Username, chips: Chips) -> LedgerResult<()>;
}

/// In-memory accounts, opening new ones at a fixed starting balance. Used
/// by the server binary and tests; a deployment backed by a real account
/// service implements [`ChipAccounts`] against that instead.
pub struct MemoryAccounts {
    starting_chips: Chips,
    accounts: RwLock<HashMap<Username, Chips>>,
}

impl MemoryAccounts {
    pub fn new(starting_chips: Chips) -> Self {
        Self {
            starting_chips,
            accounts: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryAccounts {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_CHIPS)
    }
}

#[async_trait]
impl ChipAccounts for MemoryAccounts {
    async fn chip_balance(&self, username: &Username) -> LedgerResult<Chips> {
        let mut accounts = self.accounts.write().await;
        let chips = accounts.entry(username.clone()).or_insert_with(|| {
            info!("opening account for {username} with {} chips", self.starting_chips);
            self.starting_chips
        });
        Ok(*chips)
    }

    async fn persist_chip_balance(&self, username: &Username, chips: Chips) -> LedgerResult<()> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(username.clone(), chips);
        Ok(())
    }
}
