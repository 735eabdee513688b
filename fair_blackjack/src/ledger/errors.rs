//! Ledger error types.

use thiserror::Error;

/// Errors from the account ledger collaborator.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No account exists for the player.
    #[error("no account for {0}")]
    AccountNotFound(String),

    /// The backing service could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// A client-safe message that does not leak backend details.
    pub fn client_message(&self) -> String {
        match self {
            Self::AccountNotFound(_) => self.to_string(),
            Self::Unavailable(_) => "internal server error".to_string(),
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
