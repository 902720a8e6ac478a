use thiserror::Error;

use crate::builder::Step;

/// How loudly a failure is surfaced to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// Failures reported by the wallet / contract collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// EIP-1193 code 4001
    #[error("user rejected the request")]
    UserRejected,
    /// EIP-1193 code -32002
    #[error("a request is already pending in the wallet")]
    AlreadyPending,
    #[error("submission failed: {0}")]
    Submission(String),
}

impl WalletError {
    /// Maps a provider error code onto the taxonomy.
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        match code {
            4001 => WalletError::UserRejected,
            -32002 => WalletError::AlreadyPending,
            _ => WalletError::Submission(message.into()),
        }
    }
}

/// Everything that can stop the transaction builder from moving forward.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("no wallet is available")]
    WalletUnavailable,
    #[error("user rejected the signature request")]
    UserRejected,
    #[error("a wallet request is already pending")]
    AlreadyPending,
    #[error("recipient address is empty")]
    EmptyRecipient,
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),
    #[error("unknown product {0:?}")]
    UnknownProduct(String),
    #[error("operation not available in step {0:?}")]
    NotReady(Step),
    #[error("transaction failed: {0}")]
    Submission(String),
}

impl TxError {
    pub fn severity(&self) -> Severity {
        match self {
            TxError::AlreadyPending => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// Validation failures are raised before any collaborator is called.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TxError::EmptyRecipient
                | TxError::ZeroAmount
                | TxError::InvalidAmount(_)
                | TxError::UnknownProduct(_)
                | TxError::NotReady(_)
        )
    }
}

impl From<WalletError> for TxError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::UserRejected => TxError::UserRejected,
            WalletError::AlreadyPending => TxError::AlreadyPending,
            WalletError::Submission(msg) => TxError::Submission(msg),
        }
    }
}

/// Snapshot could not be read or written.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("confirm stagger ({confirm_ms}ms) must exceed syncing stagger ({syncing_ms}ms)")]
    StaggerOrder { syncing_ms: u128, confirm_ms: u128 },
    #[error("sync timeout must be non-zero")]
    ZeroTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_codes_map_to_taxonomy() {
        assert_eq!(WalletError::from_code(4001, ""), WalletError::UserRejected);
        assert_eq!(WalletError::from_code(-32002, ""), WalletError::AlreadyPending);
        assert_eq!(
            WalletError::from_code(-32000, "revert"),
            WalletError::Submission("revert".into())
        );
    }

    #[test]
    fn already_pending_is_informational() {
        assert_eq!(TxError::AlreadyPending.severity(), Severity::Info);
        assert_eq!(TxError::UserRejected.severity(), Severity::Error);
        assert_eq!(TxError::from(WalletError::AlreadyPending), TxError::AlreadyPending);
    }
}
