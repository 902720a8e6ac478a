//! Narrow interfaces to the wallet and the payment contract.

pub mod api;
pub mod mock;
pub mod simulated;

pub use api::{ContractGateway, WalletProvider};
pub use mock::{GatewayCall, MockGateway};
pub use simulated::SimulatedWallet;
