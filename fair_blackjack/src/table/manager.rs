//! Table registry for spawning and tracking table actors.
//!
//! This is the only cross-table mutable state in the system: a map from
//! table name to actor handle. Tables themselves never share anything.

use log::info;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{RwLock, oneshot};

use super::{
    actor::{TableActor, TableHandle},
    config::TableConfig,
    messages::{TableId, TableMessage},
};
use crate::ledger::ChipAccounts;

/// Registry of running tables. Joining a name that is not registered spawns
/// a fresh table under the default configuration.
pub struct TableManager {
    accounts: Arc<dyn ChipAccounts>,
    defaults: TableConfig,
    tables: RwLock<HashMap<TableId, TableHandle>>,
}

impl TableManager {
    /// `defaults` seeds the configuration of every table created on
    /// demand; validate it before handing it in.
    pub fn new(accounts: Arc<dyn ChipAccounts>, defaults: TableConfig) -> Self {
        Self {
            accounts,
            defaults,
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_table(&self, table_id: &str) -> Option<TableHandle> {
        let tables = self.tables.read().await;
        tables.get(table_id).cloned()
    }

    /// Find a running table or spawn one under this name.
    pub async fn get_or_create(&self, table_id: &str) -> TableHandle {
        if let Some(handle) = self.get_table(table_id).await {
            return handle;
        }

        let mut tables = self.tables.write().await;
        // Someone else may have created it while we waited for the lock.
        if let Some(handle) = tables.get(table_id) {
            return handle.clone();
        }

        let config = TableConfig {
            name: table_id.to_string(),
            ..self.defaults.clone()
        };
        let (actor, handle) = TableActor::new(table_id.to_string(), config, self.accounts.clone());
        tokio::spawn(actor.run());
        tables.insert(table_id.to_string(), handle.clone());
        info!("created and spawned table '{table_id}'");

        handle
    }

    /// Shut a table down and drop it from the registry.
    pub async fn close_table(&self, table_id: &str) -> Result<(), String> {
        let handle = {
            let mut tables = self.tables.write().await;
            tables.remove(table_id)
        };
        let Some(handle) = handle else {
            return Err(format!("table '{table_id}' not found"));
        };

        let (tx, rx) = oneshot::channel();
        handle.send(TableMessage::Close { response: tx }).await?;
        rx.await.map_err(|_| "failed to receive response".to_string())?;

        info!("closed table '{table_id}'");
        Ok(())
    }

    pub async fn table_ids(&self) -> Vec<TableId> {
        let tables = self.tables.read().await;
        tables.keys().cloned().collect()
    }

    pub async fn active_table_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.len()
    }
}
