//! Stepwise payment builder.
//!
//! `Recipient` -> (`Catalog` | `Manual`) -> submit. Going back from any later
//! step returns to `Recipient` and clears method, amount and selections.
//! A failed submission leaves every field untouched so the operator can retry.

pub mod amount;
pub mod catalog;

#[cfg(test)]
mod tests;

use rust_decimal::Decimal;

use crate::error::TxError;
use crate::gateway::{ContractGateway, WalletProvider};
use crate::ledger::TransactionRecord;

pub use catalog::{Catalog, Product, PRESET_AMOUNTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Recipient,
    Catalog,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Catalog,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecipient {
    pub address: String,
    pub display_name: String,
}

/// Maps an address to something a cashier can read.
pub trait RecipientResolver {
    fn display_name(&self, address: &str) -> String;
}

/// Placeholder identity lookup: every address is a private user.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivateUserResolver;

impl RecipientResolver for PrivateUserResolver {
    fn display_name(&self, _address: &str) -> String {
        "Usuario Privado".to_string()
    }
}

/// Validated payment, ready for the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub method: PaymentMethod,
    pub recipient: String,
    /// ETH, as it will be stored in the record
    pub amount: String,
    pub amount_wei: u128,
}

pub type Timestamp = fn() -> String;

fn local_timestamp() -> String {
    chrono::Local::now().format("%-d/%-m/%Y, %H:%M:%S").to_string()
}

#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    step: Step,
    recipient: String,
    resolved: Option<ResolvedRecipient>,

    catalog: Catalog,
    /// Selected product names, in selection order
    selected: Vec<String>,
    /// Running sum of selected prices
    total: Decimal,

    amount: String,

    clock: Timestamp,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new(Catalog::default())
    }
}

impl TransactionBuilder {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            step: Step::Recipient,
            recipient: String::new(),
            resolved: None,
            catalog,
            selected: Vec::new(),
            total: Decimal::ZERO,
            amount: String::new(),
            clock: local_timestamp,
        }
    }

    /// Overrides the record timestamp source.
    pub fn with_clock(mut self, clock: Timestamp) -> Self {
        self.clock = clock;
        self
    }

    // ================================
    // Step 1: recipient
    // ================================

    pub fn set_recipient(&mut self, input: impl Into<String>) -> Result<(), TxError> {
        // The field locks once resolved; `back` unlocks it.
        if self.step != Step::Recipient || self.resolved.is_some() {
            return Err(TxError::NotReady(self.step));
        }
        self.recipient = input.into();
        Ok(())
    }

    pub fn submit_recipient(
        &mut self,
        resolver: &dyn RecipientResolver,
    ) -> Result<&ResolvedRecipient, TxError> {
        if self.step != Step::Recipient {
            return Err(TxError::NotReady(self.step));
        }
        let address = self.recipient.trim().to_string();
        if address.is_empty() {
            return Err(TxError::EmptyRecipient);
        }

        let display_name = resolver.display_name(&address);
        log::debug!("[BUILDER] recipient {} resolved as {:?}", address, display_name);

        Ok(&*self.resolved.insert(ResolvedRecipient {
            address,
            display_name,
        }))
    }

    pub fn choose(&mut self, method: PaymentMethod) -> Result<(), TxError> {
        if self.step != Step::Recipient || self.resolved.is_none() {
            return Err(TxError::NotReady(self.step));
        }
        self.step = match method {
            PaymentMethod::Catalog => Step::Catalog,
            PaymentMethod::Manual => Step::Manual,
        };
        Ok(())
    }

    /// Back to step 1. Keeps the typed address, drops everything else.
    pub fn back(&mut self) {
        self.step = Step::Recipient;
        self.resolved = None;
        self.clear_payment();
    }

    // ================================
    // Step 2: catalog
    // ================================

    /// Selects or deselects a product. Returns the new total.
    pub fn toggle_product(&mut self, name: &str) -> Result<Decimal, TxError> {
        if self.step != Step::Catalog {
            return Err(TxError::NotReady(self.step));
        }
        let price = self
            .catalog
            .find(name)
            .map(|p| p.price)
            .ok_or_else(|| TxError::UnknownProduct(name.to_string()))?;

        if let Some(pos) = self.selected.iter().position(|n| n == name) {
            self.selected.remove(pos);
            self.total -= price;
        } else {
            self.selected.push(name.to_string());
            self.total += price;
        }
        Ok(self.total)
    }

    // ================================
    // Step 3: manual
    // ================================

    pub fn set_amount(&mut self, amount: impl Into<String>) -> Result<(), TxError> {
        if self.step != Step::Manual {
            return Err(TxError::NotReady(self.step));
        }
        self.amount = amount.into();
        Ok(())
    }

    pub fn pick_preset(&mut self, preset: &str) -> Result<(), TxError> {
        if !PRESET_AMOUNTS.contains(&preset) {
            return Err(TxError::InvalidAmount(preset.to_string()));
        }
        self.set_amount(preset)
    }

    // ================================
    // Submission
    // ================================

    /// Validates the current state without calling anything external.
    pub fn prepare(&self) -> Result<PaymentIntent, TxError> {
        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err(TxError::EmptyRecipient);
        }

        let (method, eth) = match self.step {
            Step::Recipient => return Err(TxError::NotReady(self.step)),
            Step::Catalog => {
                if self.total <= Decimal::ZERO {
                    return Err(TxError::ZeroAmount);
                }
                (PaymentMethod::Catalog, self.total)
            }
            Step::Manual => (PaymentMethod::Manual, amount::parse_eth(&self.amount)?),
        };

        let text = match method {
            PaymentMethod::Catalog => amount::format_eth(eth),
            PaymentMethod::Manual => self.amount.trim().to_string(),
        };

        Ok(PaymentIntent {
            method,
            recipient: recipient.to_string(),
            amount: text,
            amount_wei: amount::to_wei(eth)?,
        })
    }

    pub fn can_submit(&self) -> bool {
        self.prepare().is_ok()
    }

    /// Sends the payment through the collaborator matching the current step.
    ///
    /// On success the record is returned and the builder resets to step 1.
    /// On any failure nothing changes.
    pub async fn submit(
        &mut self,
        wallet: Option<&dyn WalletProvider>,
        contract: &dyn ContractGateway,
    ) -> Result<TransactionRecord, TxError> {
        let wallet = wallet.ok_or(TxError::WalletUnavailable)?;
        let intent = self.prepare()?;

        let from = wallet.request_accounts().await?;
        log::info!(
            "[BUILDER] submitting {:?} payment of {} ETH to {}",
            intent.method,
            intent.amount,
            intent.recipient
        );

        let hash = match intent.method {
            PaymentMethod::Catalog => {
                contract
                    .initiate_payment(&intent.recipient, &from, intent.amount_wei)
                    .await
            }
            PaymentMethod::Manual => {
                wallet
                    .send_transaction(&intent.recipient, &from, intent.amount_wei)
                    .await
            }
        }
        .map_err(|e| {
            log::warn!("[BUILDER] submission failed: {}", e);
            TxError::from(e)
        })?;

        let record = TransactionRecord::new(intent.recipient, intent.amount, (self.clock)(), hash);
        self.reset();
        Ok(record)
    }

    /// Full reset to an empty step 1.
    pub fn reset(&mut self) {
        self.back();
        self.recipient.clear();
    }

    fn clear_payment(&mut self) {
        self.selected.clear();
        self.total = Decimal::ZERO;
        self.amount.clear();
    }

    // ================================
    // Accessors
    // ================================

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn resolved(&self) -> Option<&ResolvedRecipient> {
        self.resolved.as_ref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }
}
