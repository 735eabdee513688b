//! The wire protocol: closed tagged unions for everything that crosses the
//! transport boundary. Payloads are validated into these types before any
//! table message is built; malformed input never reaches a state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::TableError;
use crate::game::deck::Verification;
use crate::game::entities::{Chips, PlayerAction, SeatIndex, TableView, Username};

/// An inbound client intent.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Stake chips on the coming round.
    PlaceBet { amount: Chips },
    /// A turn action (hit, stand, double down).
    Action { action: PlayerAction },
    /// Buy insurance against a dealer ace.
    TakeInsurance,
    /// Ask to deal now instead of waiting for every seat to bet.
    StartRound,
    /// Ask for the current shuffle seeds; the deck ordering is included
    /// only once the round has ended.
    RequestVerification,
    /// Give up the seat.
    Leave,
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::PlaceBet { amount } => &format!("bets {amount}"),
            Self::Action { action } => &action.to_string(),
            Self::TakeInsurance => "takes insurance",
            Self::StartRound => "starts the round",
            Self::RequestVerification => "requests verification",
            Self::Leave => "leaves",
        };
        write!(f, "{repr}")
    }
}

/// An outbound event fanned out to table subscribers (or, for `Rejected`
/// and `Verification`, returned to a single client).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A full masked snapshot of the table.
    Snapshot { table: TableView },
    /// Roster delta: someone sat down.
    PlayerJoined { username: Username, seat: SeatIndex },
    /// Roster delta: someone left.
    PlayerLeft { username: Username },
    /// The named player holds the turn.
    Turn { username: Username },
    /// Human-readable game log line.
    GameLog { message: String },
    /// Shuffle verification data.
    Verification { verification: Verification },
    /// The client's last intent was invalid; nothing changed.
    Rejected { reason: TableError },
    /// A transport- or infrastructure-level failure (malformed payload,
    /// ledger unreachable). Never fatal to the table.
    Error { message: String },
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Snapshot { table } => &format!("snapshot ({})", table.stage),
            Self::PlayerJoined { username, .. } => &format!("{username} joined"),
            Self::PlayerLeft { username } => &format!("{username} left"),
            Self::Turn { username } => &format!("{username}'s turn"),
            Self::GameLog { message } => message,
            Self::Verification { .. } => "verification",
            Self::Rejected { reason } => &reason.to_string(),
            Self::Error { message } => message,
        };
        write!(f, "{repr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::PlayerAction;

    #[test]
    fn client_events_use_snake_case_tags() {
        let event: ClientEvent = serde_json::from_str(r#"{"type":"place_bet","amount":50}"#)
            .expect("valid payload");
        assert_eq!(event, ClientEvent::PlaceBet { amount: 50 });

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"action","action":"double_down"}"#)
                .expect("valid payload");
        assert_eq!(
            event,
            ClientEvent::Action {
                action: PlayerAction::DoubleDown
            }
        );

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"take_insurance"}"#).expect("valid payload");
        assert_eq!(event, ClientEvent::TakeInsurance);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"rob_the_bank"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>(r#"{"amount":50}"#).is_err());
        assert!(
            serde_json::from_str::<ClientEvent>(r#"{"type":"place_bet","amount":-1}"#).is_err()
        );
    }

    #[test]
    fn rejection_serializes_with_a_typed_reason() {
        let event = ServerEvent::Rejected {
            reason: TableError::OutOfTurnAction,
        };
        let json = serde_json::to_string(&event).expect("serializes");
        assert!(json.contains(r#""type":"rejected""#));
        let back: ServerEvent = serde_json::from_str(&json).expect("round trips");
        assert_eq!(event, back);
    }

    #[test]
    fn client_event_display() {
        assert_eq!(ClientEvent::PlaceBet { amount: 25 }.to_string(), "bets 25");
        assert_eq!(
            ClientEvent::Action {
                action: PlayerAction::Hit
            }
            .to_string(),
            "hits"
        );
    }
}
