//! Table actor implementation with async message handling.
//!
//! Each table runs as one task owning its whole state; intents and timer
//! ticks are handled strictly one at a time off the inbox, which is the
//! entire concurrency story — no locks, no out-of-turn races, no double
//! draws.

use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    time::{Duration, interval},
};

use super::config::TableConfig;
use super::messages::{SessionId, TableId, TableMessage, TableResponse};
use crate::game::entities::{RoundStage, Username};
use crate::game::{RoundState, TableError, TableStateManagement};
use crate::ledger::ChipAccounts;
use crate::net::messages::ServerEvent;

/// Table actor handle for sending messages.
#[derive(Clone)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
}

impl TableHandle {
    pub fn new(sender: mpsc::Sender<TableMessage>, table_id: TableId) -> Self {
        Self { sender, table_id }
    }

    pub fn table_id(&self) -> &TableId {
        &self.table_id
    }

    /// Send a message to the table.
    pub async fn send(&self, message: TableMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "table is closed".to_string())
    }
}

/// Table actor managing a single blackjack table.
pub struct TableActor {
    id: TableId,

    /// Round state machine.
    state: RoundState,

    /// Message inbox.
    inbox: mpsc::Receiver<TableMessage>,

    /// Account ledger, consulted only at the join/leave boundaries.
    accounts: Arc<dyn ChipAccounts>,

    /// Connection to username mapping.
    sessions: HashMap<SessionId, Username>,

    /// Subscribers for outbound event fan-out.
    subscribers: HashMap<SessionId, mpsc::Sender<ServerEvent>>,

    /// Last broadcast turn holder and stage, for change detection.
    last_turn: Option<Username>,
    last_stage: RoundStage,

    is_closed: bool,
}

impl TableActor {
    /// Create a new table actor and a handle for sending it messages.
    pub fn new(
        id: TableId,
        config: TableConfig,
        accounts: Arc<dyn ChipAccounts>,
    ) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(100);
        let state = RoundState::new(config.settings());

        let actor = Self {
            id: id.clone(),
            state,
            inbox,
            accounts,
            sessions: HashMap::new(),
            subscribers: HashMap::new(),
            last_turn: None,
            last_stage: RoundStage::Betting,
            is_closed: false,
        };
        let handle = TableHandle::new(sender, id);

        (actor, handle)
    }

    /// Run the table actor event loop.
    pub async fn run(mut self) {
        info!("table '{}' starting", self.id);

        let mut tick_interval = interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        // Every handle dropped; nobody can reach us again.
                        None => break,
                    }
                    if self.is_closed {
                        break;
                    }
                }

                _ = tick_interval.tick() => {
                    self.tick();
                }
            }
        }

        info!("table '{}' closed", self.id);
    }

    async fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::Join {
                session,
                username,
                response,
            } => {
                let result = self.handle_join(session, username).await;
                let _ = response.send(result);
            }

            TableMessage::Leave { session, response } => {
                let result = self.handle_leave(session).await;
                let _ = response.send(result);
            }

            TableMessage::PlaceBet {
                session,
                amount,
                response,
            } => {
                let result =
                    self.handle_intent(session, |state, username| state.place_bet(username, amount));
                let _ = response.send(result);
            }

            TableMessage::TakeAction {
                session,
                action,
                response,
            } => {
                let result = self
                    .handle_intent(session, |state, username| state.take_action(username, action));
                let _ = response.send(result);
            }

            TableMessage::TakeInsurance { session, response } => {
                let result = self.handle_intent(session, RoundState::take_insurance);
                let _ = response.send(result);
            }

            TableMessage::StartRound { session, response } => {
                let result = self.handle_intent(session, RoundState::start_round);
                let _ = response.send(result);
            }

            TableMessage::RequestVerification { response } => {
                let _ = response.send(self.state.verification());
            }

            TableMessage::GetSnapshot { response } => {
                let _ = response.send(self.state.view());
            }

            TableMessage::Subscribe { session, sender } => {
                // Bring the new subscriber up to date immediately.
                let snapshot = ServerEvent::Snapshot {
                    table: self.state.view(),
                };
                let _ = sender.try_send(snapshot);
                self.subscribers.insert(session, sender);
                debug!("session {session} subscribed to table '{}'", self.id);
            }

            TableMessage::Unsubscribe { session } => {
                self.subscribers.remove(&session);
                debug!("session {session} unsubscribed from table '{}'", self.id);
            }

            TableMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(TableResponse::Ack);
            }
        }
    }

    /// Handle a join: pull the authoritative balance from the ledger, then
    /// seat the player.
    async fn handle_join(&mut self, session: SessionId, username: Username) -> TableResponse {
        if self.sessions.contains_key(&session) {
            return TableResponse::Rejected(TableError::UserAlreadyExists);
        }

        let chips = match self.accounts.chip_balance(&username).await {
            Ok(chips) => chips,
            Err(e) => {
                error!("table '{}': ledger error on join: {e}", self.id);
                return TableResponse::Failed(e.client_message());
            }
        };

        match self.state.join_player(&username, chips) {
            Ok(seat) => {
                self.sessions.insert(session, username.clone());
                info!(
                    "table '{}': {username} joined seat {seat} with {chips} chips",
                    self.id
                );
                self.broadcast(ServerEvent::PlayerJoined {
                    username,
                    seat,
                });
                self.flush();
                TableResponse::Seated { seat, chips }
            }
            Err(e) => TableResponse::Rejected(e),
        }
    }

    /// Handle a leave or disconnect: release the seat (forfeiting a live
    /// bet, counting as an implicit stand) and persist the balance.
    async fn handle_leave(&mut self, session: SessionId) -> TableResponse {
        let Some(username) = self.sessions.remove(&session) else {
            return TableResponse::Rejected(TableError::UserDoesNotExist);
        };
        self.subscribers.remove(&session);

        match self.state.remove_player(&username) {
            Ok(chips) => {
                if let Err(e) = self.accounts.persist_chip_balance(&username, chips).await {
                    error!(
                        "table '{}': failed to persist {username}'s balance of {chips}: {e}",
                        self.id
                    );
                }
                info!("table '{}': {username} left with {chips} chips", self.id);
                self.broadcast(ServerEvent::PlayerLeft {
                    username: username.clone(),
                });
                self.flush();
                TableResponse::Ack
            }
            Err(e) => TableResponse::Rejected(e),
        }
    }

    /// Run a validated player intent against the state machine. Rejections
    /// mutate nothing and go back to the caller alone; successes are fanned
    /// out to the whole table.
    fn handle_intent<F>(&mut self, session: SessionId, intent: F) -> TableResponse
    where
        F: FnOnce(&mut RoundState, &Username) -> Result<(), TableError>,
    {
        let Some(username) = self.sessions.get(&session).cloned() else {
            return TableResponse::Rejected(TableError::UserDoesNotExist);
        };
        match intent(&mut self.state, &username) {
            Ok(()) => {
                self.flush();
                TableResponse::Ack
            }
            Err(e) => TableResponse::Rejected(e),
        }
    }

    /// Advance timed behavior by one state machine tick.
    fn tick(&mut self) {
        let state = std::mem::take(&mut self.state);
        self.state = state.step();
        self.flush();
    }

    /// Publish anything that changed since the last broadcast: drained
    /// round events as game log lines, a turn signal when the turn pointer
    /// moved, and a fresh snapshot.
    fn flush(&mut self) {
        let events = self.state.drain_events();
        let view = self.state.view();
        let turn_changed = view.turn != self.last_turn;
        let stage_changed = view.stage != self.last_stage;
        if events.is_empty() && !turn_changed && !stage_changed {
            return;
        }

        for event in &events {
            debug!("table '{}': {event}", self.id);
            self.broadcast(ServerEvent::GameLog {
                message: event.to_string(),
            });
        }
        if turn_changed && let Some(username) = view.turn.clone() {
            self.broadcast(ServerEvent::Turn { username });
        }
        self.last_turn = view.turn.clone();
        self.last_stage = view.stage;
        self.broadcast(ServerEvent::Snapshot { table: view });
    }

    /// Fan an event out to every subscriber, pruning dead ones.
    fn broadcast(&mut self, event: ServerEvent) {
        self.subscribers.retain(|session, sender| {
            match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("subscriber {session} channel full, dropping event");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("subscriber {session} disconnected, removing");
                    false
                }
            }
        });
    }
}
