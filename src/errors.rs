use crate::amount::Amount;
use thiserror::Error;

/// Why a round was not played or not settled.
///
/// Every variant is scoped to the single request; none of them is fatal to the process.
#[derive(Debug, Error)]
pub enum RoundError {
    /// Bad stake, unknown game or bet type, malformed request
    #[error("{0}")]
    Validation(String),

    #[error("insufficient balance: stake {stake} exceeds balance {balance}")]
    InsufficientFunds { balance: Amount, stake: Amount },

    #[error("account {0} not found")]
    AccountNotFound(i64),

    /// A resubmitted blackjack round failed signature or consistency checks
    #[error("invalid round state: {0}")]
    StateIntegrity(String),

    /// The store was unavailable or the atomic unit failed; nothing was applied
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl RoundError {
    pub fn validation(message: impl Into<String>) -> Self {
        RoundError::Validation(message.into())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        RoundError::StateIntegrity(message.into())
    }

    /// Only persistence failures are worth retrying by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, RoundError::Persistence(_))
    }

    /// Stable machine-readable tag for API responses
    pub fn kind(&self) -> &'static str {
        match self {
            RoundError::Validation(_) => "validation",
            RoundError::InsufficientFunds { .. } => "insufficient_funds",
            RoundError::AccountNotFound(_) => "account_not_found",
            RoundError::StateIntegrity(_) => "state_integrity",
            RoundError::Persistence(_) => "persistence",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_persistence_is_retryable() {
        assert!(RoundError::Persistence(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!RoundError::validation("bad").is_retryable());
        assert!(!RoundError::integrity("bad").is_retryable());
        assert!(
            !RoundError::InsufficientFunds {
                balance: Amount::ZERO,
                stake: Amount::from_whole(1),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_messages() {
        let err = RoundError::InsufficientFunds {
            balance: Amount::from_whole(10),
            stake: Amount::from_cents(1001),
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance: stake 10.01 exceeds balance 10.00"
        );
        assert_eq!(err.kind(), "insufficient_funds");
    }
}
