use async_trait::async_trait;

use crate::error::WalletError;

/// Wallet / account provider.
///
/// Every call may suspend while the operator confirms in the wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Asks the wallet for the active account address.
    async fn request_accounts(&self) -> Result<String, WalletError>;

    /// Plain value transfer. Returns the transaction hash.
    async fn send_transaction(
        &self,
        to: &str,
        from: &str,
        value_wei: u128,
    ) -> Result<String, WalletError>;
}

/// Payment contract used by catalog checkouts.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Calls `initiatePayment` on `contract` attaching `amount_wei`.
    /// Returns the transaction hash.
    async fn initiate_payment(
        &self,
        contract: &str,
        from: &str,
        amount_wei: u128,
    ) -> Result<String, WalletError>;
}
