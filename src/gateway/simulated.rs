use async_trait::async_trait;

use crate::error::WalletError;
use crate::gateway::api::{ContractGateway, WalletProvider};

/// Local stand-in for a browser wallet: signs nothing, mints random hashes.
#[derive(Debug, Clone)]
pub struct SimulatedWallet {
    account: String,
    reject: bool,
}

impl SimulatedWallet {
    pub fn new(account: Option<String>) -> Self {
        Self {
            account: account.unwrap_or_else(random_account),
            reject: false,
        }
    }

    /// Every signing request is declined, as if the operator pressed "Reject".
    pub fn rejecting(mut self, reject: bool) -> Self {
        self.reject = reject;
        self
    }

    fn sign(&self, what: &str) -> Result<String, WalletError> {
        if self.reject {
            log::info!("[WALLET] {} rejected by operator", what);
            return Err(WalletError::UserRejected);
        }
        let hash = format!("0x{}", hex::encode(rand::random::<[u8; 32]>()));
        log::info!("[WALLET] {} signed: {}", what, hash);
        Ok(hash)
    }
}

fn random_account() -> String {
    format!("0x{}", hex::encode(rand::random::<[u8; 20]>()))
}

#[async_trait]
impl WalletProvider for SimulatedWallet {
    async fn request_accounts(&self) -> Result<String, WalletError> {
        if self.reject {
            return Err(WalletError::UserRejected);
        }
        Ok(self.account.clone())
    }

    async fn send_transaction(
        &self,
        to: &str,
        from: &str,
        value_wei: u128,
    ) -> Result<String, WalletError> {
        log::debug!("[WALLET] eth_sendTransaction {} -> {} ({} wei)", from, to, value_wei);
        self.sign("transfer")
    }
}

#[async_trait]
impl ContractGateway for SimulatedWallet {
    async fn initiate_payment(
        &self,
        contract: &str,
        from: &str,
        amount_wei: u128,
    ) -> Result<String, WalletError> {
        log::debug!(
            "[WALLET] initiatePayment on {} from {} ({} wei)",
            contract,
            from,
            amount_wei
        );
        self.sign("contract payment")
    }
}
