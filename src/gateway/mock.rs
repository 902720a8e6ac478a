use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::WalletError;
use crate::gateway::api::{ContractGateway, WalletProvider};

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    RequestAccounts,
    Send { to: String, from: String, value_wei: u128 },
    Contract { contract: String, from: String, amount_wei: u128 },
}

/// Scripted wallet + contract collaborator for tests.
///
/// Each submission pops the next scripted outcome; when the script is empty
/// it answers with `0xhash<N>`.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    pub account: Option<String>,
    outcomes: Arc<Mutex<VecDeque<Result<String, WalletError>>>>,
    calls: Arc<Mutex<Vec<GatewayCall>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            account: Some("0xmerchant".to_string()),
            ..Self::default()
        }
    }

    pub fn push_outcome(&self, outcome: Result<String, WalletError>) {
        if let Ok(mut g) = self.outcomes.lock() {
            g.push_back(outcome);
        }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn record(&self, call: GatewayCall) -> usize {
        match self.calls.lock() {
            Ok(mut g) => {
                g.push(call);
                g.len()
            }
            Err(_) => 0,
        }
    }

    fn next_outcome(&self, n: usize) -> Result<String, WalletError> {
        self.outcomes
            .lock()
            .ok()
            .and_then(|mut g| g.pop_front())
            .unwrap_or_else(|| Ok(format!("0xhash{}", n)))
    }
}

#[async_trait]
impl WalletProvider for MockGateway {
    async fn request_accounts(&self) -> Result<String, WalletError> {
        self.record(GatewayCall::RequestAccounts);
        self.account
            .clone()
            .ok_or_else(|| WalletError::Submission("no accounts".into()))
    }

    async fn send_transaction(
        &self,
        to: &str,
        from: &str,
        value_wei: u128,
    ) -> Result<String, WalletError> {
        let n = self.record(GatewayCall::Send {
            to: to.to_string(),
            from: from.to_string(),
            value_wei,
        });
        self.next_outcome(n)
    }
}

#[async_trait]
impl ContractGateway for MockGateway {
    async fn initiate_payment(
        &self,
        contract: &str,
        from: &str,
        amount_wei: u128,
    ) -> Result<String, WalletError> {
        let n = self.record(GatewayCall::Contract {
            contract: contract.to_string(),
            from: from.to_string(),
            amount_wei,
        });
        self.next_outcome(n)
    }
}
