//! Table actor message types.

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::game::TableError;
use crate::game::deck::Verification;
use crate::game::entities::{Chips, PlayerAction, SeatIndex, TableView, Username};
use crate::net::messages::ServerEvent;

/// Tables are addressed by a client-visible room name; joining a name that
/// does not exist yet creates the table.
pub type TableId = String;

/// Identifies one client connection to a table.
pub type SessionId = Uuid;

/// Messages that can be sent to a `TableActor`.
#[derive(Debug)]
pub enum TableMessage {
    /// Seat a player, pulling their balance from the account ledger.
    Join {
        session: SessionId,
        username: Username,
        response: oneshot::Sender<TableResponse>,
    },

    /// Release a seat and persist the balance back to the ledger. Sent both
    /// for an explicit leave and for a disconnect.
    Leave {
        session: SessionId,
        response: oneshot::Sender<TableResponse>,
    },

    PlaceBet {
        session: SessionId,
        amount: Chips,
        response: oneshot::Sender<TableResponse>,
    },

    /// A turn action (hit, stand, double down).
    TakeAction {
        session: SessionId,
        action: PlayerAction,
        response: oneshot::Sender<TableResponse>,
    },

    TakeInsurance {
        session: SessionId,
        response: oneshot::Sender<TableResponse>,
    },

    /// Ask to deal now instead of waiting for every seat to bet.
    StartRound {
        session: SessionId,
        response: oneshot::Sender<TableResponse>,
    },

    /// Current shuffle seeds and hash; the full ordering only once the
    /// round has ended.
    RequestVerification {
        response: oneshot::Sender<Verification>,
    },

    /// Current masked snapshot.
    GetSnapshot {
        response: oneshot::Sender<TableView>,
    },

    /// Register a connection for outbound event fan-out.
    Subscribe {
        session: SessionId,
        sender: mpsc::Sender<ServerEvent>,
    },

    Unsubscribe {
        session: SessionId,
    },

    /// Shut the table down.
    Close {
        response: oneshot::Sender<TableResponse>,
    },
}

/// Response from table operations.
#[derive(Clone, Debug)]
pub enum TableResponse {
    /// Operation succeeded.
    Ack,

    /// Join succeeded; the seat taken and the balance brought to the table.
    Seated { seat: SeatIndex, chips: Chips },

    /// The intent was invalid for the current table state. Reported to the
    /// originating client only; nothing changed.
    Rejected(TableError),

    /// An infrastructure failure (e.g. the ledger was unreachable).
    Failed(String),
}

impl TableResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ack | Self::Seated { .. })
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Rejected(error) => Some(error.to_string()),
            Self::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }
}
