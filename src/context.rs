//! Application context.
//!
//! One value created at startup that owns every piece of mutable state:
//! preferences, ledger, feed, builder, sync orchestrator and collaborators.
//! Components are reached through accessor methods; there are no globals.

use std::path::Path;

use tokio::sync::broadcast;

use crate::builder::{PaymentMethod, PrivateUserResolver, RecipientResolver, ResolvedRecipient, TransactionBuilder};
use crate::error::{ConfigError, TxError, WalletError};
use crate::gateway::{ContractGateway, WalletProvider};
use crate::ledger::{LedgerStore, TransactionRecord};
use crate::notice::Notice;
use crate::persistence::{JsonFileStore, LedgerPersistence, FEED_FILE, LEDGER_FILE, SETTINGS_FILE};
use crate::settings::{Language, Preferences, SyncPolicy};
use crate::sync::{SyncOrchestrator, SyncProgress, TimerQueue, TransactionFeed};

const EVENT_CAPACITY: usize = 64;

/// Published after a submitted transaction has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// Appended to the ledger (online).
    NewTransaction(TransactionRecord),
    /// Captured in the emergency buffer only (offline); picked up by the next sync.
    Buffered(TransactionRecord),
}

/// A successful submission plus any non-fatal warnings.
#[derive(Debug)]
pub struct Submitted {
    pub record: TransactionRecord,
    pub notices: Vec<Notice>,
}

/// Everything needed to assemble an `AppContext`.
pub struct ContextParts {
    pub prefs: Preferences,
    pub ledger: Box<dyn LedgerPersistence>,
    pub feed: Box<dyn LedgerPersistence>,
    pub policy: SyncPolicy,
    pub timers: TimerQueue,
    pub wallet: Option<Box<dyn WalletProvider>>,
    pub contract: Box<dyn ContractGateway>,
    pub offline: bool,
}

pub struct AppContext {
    prefs: Preferences,
    ledger: LedgerStore,
    feed: TransactionFeed,
    builder: TransactionBuilder,
    resolver: Box<dyn RecipientResolver>,
    sync: SyncOrchestrator,
    wallet: Option<Box<dyn WalletProvider>>,
    contract: Box<dyn ContractGateway>,
    offline: bool,
    events: broadcast::Sender<LedgerEvent>,
}

impl AppContext {
    pub fn new(parts: ContextParts) -> Result<Self, ConfigError> {
        parts.policy.validate()?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        log::info!(
            "[CTX] starting ({} mode, merge trigger {:?})",
            if parts.offline { "offline" } else { "online" },
            parts.policy.merge_trigger
        );

        Ok(Self {
            prefs: parts.prefs,
            ledger: LedgerStore::open(parts.ledger),
            feed: TransactionFeed::open(parts.feed),
            builder: TransactionBuilder::default(),
            resolver: Box::new(PrivateUserResolver),
            sync: SyncOrchestrator::new(parts.policy, parts.timers),
            wallet: parts.wallet,
            contract: parts.contract,
            offline: parts.offline,
            events,
        })
    }

    /// File-backed context rooted at `data_dir`.
    pub fn open(
        data_dir: &Path,
        policy: SyncPolicy,
        wallet: Option<Box<dyn WalletProvider>>,
        contract: Box<dyn ContractGateway>,
        offline: bool,
    ) -> Result<Self, ConfigError> {
        Self::new(ContextParts {
            prefs: Preferences::load(data_dir.join(SETTINGS_FILE)),
            ledger: Box::new(JsonFileStore::new(data_dir.join(LEDGER_FILE))),
            feed: Box::new(JsonFileStore::new(data_dir.join(FEED_FILE))),
            policy,
            timers: TimerQueue::real(),
            wallet,
            contract,
            offline,
        })
    }

    pub fn with_resolver(mut self, resolver: Box<dyn RecipientResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    // ================================
    // Subscriptions
    // ================================

    pub fn on_new_transaction(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub fn sync_progress(&self) -> broadcast::Receiver<SyncProgress> {
        self.sync.subscribe()
    }

    // ================================
    // Preferences / account
    // ================================

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn prefs_mut(&mut self) -> &mut Preferences {
        &mut self.prefs
    }

    pub fn language(&self) -> Language {
        self.prefs.language()
    }

    pub fn set_language(&mut self, language: Language) -> Option<Notice> {
        self.prefs
            .set_language(language)
            .err()
            .map(|e| Notice::persistence_warning(&e, language))
    }

    /// Asks the wallet for an account and remembers it.
    pub async fn connect(&mut self) -> Result<String, Notice> {
        let lang = self.language();
        let wallet = self
            .wallet
            .as_deref()
            .ok_or_else(|| Notice::from_tx_error(&TxError::WalletUnavailable, lang))?;

        let account = wallet
            .request_accounts()
            .await
            .map_err(|e: WalletError| Notice::from_tx_error(&e.into(), lang))?;

        if let Err(e) = self.prefs.set_connected(Some(account.clone())) {
            log::warn!("[CTX] could not persist account: {}", e);
        }
        log::info!("[CTX] connected as {}", account);
        Ok(account)
    }

    pub fn disconnect(&mut self) {
        if let Err(e) = self.prefs.set_connected(None) {
            log::warn!("[CTX] could not persist disconnect: {}", e);
        }
    }

    // ================================
    // Ledger
    // ================================

    pub fn list_ledger(&self) -> &[TransactionRecord] {
        self.ledger.all()
    }

    pub fn search_ledger(&self, term: &str) -> Vec<TransactionRecord> {
        self.ledger.search(term)
    }

    pub fn feed(&self) -> &TransactionFeed {
        &self.feed
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    // ================================
    // Transaction building
    // ================================

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut TransactionBuilder {
        &mut self.builder
    }

    /// Step 1: type and resolve the recipient.
    pub fn enter_recipient(&mut self, address: &str) -> Result<ResolvedRecipient, TxError> {
        self.builder.set_recipient(address)?;
        self.builder.submit_recipient(self.resolver.as_ref()).cloned()
    }

    /// One-shot catalog checkout.
    pub async fn submit_catalog_transaction(
        &mut self,
        recipient: &str,
        products: &[&str],
    ) -> Result<Submitted, TxError> {
        self.builder.reset();
        self.enter_recipient(recipient)?;
        self.builder.choose(PaymentMethod::Catalog)?;
        for name in products {
            self.builder.toggle_product(name)?;
        }
        self.submit_current().await
    }

    /// One-shot manual transfer.
    pub async fn submit_manual_transaction(
        &mut self,
        recipient: &str,
        amount: &str,
    ) -> Result<Submitted, TxError> {
        self.builder.reset();
        self.enter_recipient(recipient)?;
        self.builder.choose(PaymentMethod::Manual)?;
        self.builder.set_amount(amount)?;
        self.submit_current().await
    }

    /// Submits whatever the builder currently holds and stores the result.
    pub async fn submit_current(&mut self) -> Result<Submitted, TxError> {
        let record = self
            .builder
            .submit(self.wallet.as_deref(), self.contract.as_ref())
            .await?;

        let lang = self.language();
        let mut notices = vec![Notice::transaction_success(lang)];

        if let Err(e) = self.feed.record(record.clone()) {
            log::warn!("[CTX] feed not persisted: {}", e);
            notices.push(Notice::persistence_warning(&e, lang));
        }

        let event = if self.offline {
            log::info!("[CTX] offline: {} buffered for the next sync", record.hash);
            LedgerEvent::Buffered(record.clone())
        } else {
            let commit = self.ledger.append(record.clone());
            if let Some(e) = commit.warning {
                notices.push(Notice::persistence_warning(&e, lang));
            }
            LedgerEvent::NewTransaction(record.clone())
        };
        let _ = self.events.send(event);

        Ok(Submitted { record, notices })
    }

    pub fn notice_for(&self, err: &TxError) -> Notice {
        Notice::from_tx_error(err, self.language())
    }

    // ================================
    // Sync
    // ================================

    /// Starts reconciling the feed into the ledger. Returns the candidate count.
    pub fn initiate_sync(&mut self) -> usize {
        self.sync.initiate(&self.feed, &mut self.ledger)
    }

    pub fn dismiss_sync(&mut self) {
        self.sync.dismiss(&mut self.ledger);
    }

    /// Waits (real clock) until the live session has merged.
    pub async fn drive_sync(&mut self) {
        self.sync.drive(&mut self.ledger).await;
    }

    /// Fires due timers without waiting.
    pub fn poll_sync(&mut self) -> usize {
        self.sync.fire_due(&mut self.ledger)
    }

    /// Runs the session to completion. Instant on a virtual clock; blocks
    /// the thread between deadlines on a real one.
    pub fn run_sync_until_idle(&mut self) {
        self.sync.run_until_idle(&mut self.ledger);
    }

    pub fn sync_snapshot(&self) -> Vec<(String, crate::sync::ItemState)> {
        self.sync.engine().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletError;
    use crate::gateway::MockGateway;
    use crate::persistence::MemoryStore;
    use crate::settings::PreferenceValues;

    struct Fixture {
        ctx: AppContext,
        gw: MockGateway,
        ledger: MemoryStore,
    }

    fn fixture(offline: bool) -> Fixture {
        let gw = MockGateway::new();
        let ledger = MemoryStore::new();
        let ctx = AppContext::new(ContextParts {
            prefs: Preferences::in_memory(PreferenceValues::default()),
            ledger: Box::new(ledger.clone()),
            feed: Box::new(MemoryStore::new()),
            policy: SyncPolicy::default(),
            timers: TimerQueue::manual(),
            wallet: Some(Box::new(gw.clone())),
            contract: Box::new(gw.clone()),
            offline,
        })
        .unwrap();
        Fixture { ctx, gw, ledger }
    }

    #[tokio::test]
    async fn online_payment_lands_in_ledger_and_notifies() {
        let mut f = fixture(false);
        let mut rx = f.ctx.on_new_transaction();

        let done = f.ctx.submit_manual_transaction("0xShop", "2").await.unwrap();

        assert_eq!(f.ctx.list_ledger(), &[done.record.clone()]);
        assert_eq!(f.ctx.feed().len(), 1);
        assert_eq!(done.notices[0].severity, crate::error::Severity::Success);
        assert_eq!(rx.try_recv().unwrap(), LedgerEvent::NewTransaction(done.record));
    }

    #[tokio::test]
    async fn offline_payment_waits_for_sync() {
        let mut f = fixture(true);

        let done = f
            .ctx
            .submit_catalog_transaction("0xShop", &["Pan", "Leche"])
            .await
            .unwrap();
        assert!(f.ctx.list_ledger().is_empty());

        assert_eq!(f.ctx.initiate_sync(), 1);
        f.ctx.run_sync_until_idle();

        assert_eq!(f.ctx.list_ledger(), &[done.record]);
        assert_eq!(f.ctx.initiate_sync(), 0);
    }

    #[tokio::test]
    async fn rejected_payment_appends_nothing() {
        let mut f = fixture(false);
        let mut rx = f.ctx.on_new_transaction();
        f.gw.push_outcome(Err(WalletError::UserRejected));
        let saves = f.ledger.save_count();

        let err = f.ctx.submit_manual_transaction("0xShop", "5").await.unwrap_err();

        assert_eq!(err, TxError::UserRejected);
        assert!(f.ctx.list_ledger().is_empty());
        assert_eq!(f.ledger.save_count(), saves);
        assert!(rx.try_recv().is_err());
        assert_eq!(f.ctx.builder().amount(), "5");

        // retry from the preserved state
        assert!(f.ctx.submit_current().await.is_ok());
        assert_eq!(f.ctx.list_ledger().len(), 1);
    }

    #[tokio::test]
    async fn dismissed_sync_still_merges_by_default() {
        let mut f = fixture(true);
        f.ctx.submit_manual_transaction("0xShop", "1").await.unwrap();

        f.ctx.initiate_sync();
        f.ctx.dismiss_sync();
        assert_eq!(f.ctx.poll_sync(), 0);
        assert_eq!(f.ctx.sync_snapshot().len(), 1);

        f.ctx.run_sync_until_idle();
        assert_eq!(f.ctx.list_ledger().len(), 1);
        assert!(f.ctx.sync_snapshot().is_empty());
    }

    #[tokio::test]
    async fn run_until_idle_works_with_the_wall_clock() {
        let gw = MockGateway::new();
        let mut ctx = AppContext::new(ContextParts {
            prefs: Preferences::in_memory(PreferenceValues::default()),
            ledger: Box::new(MemoryStore::new()),
            feed: Box::new(MemoryStore::new()),
            policy: SyncPolicy {
                syncing_stagger: std::time::Duration::from_millis(2),
                confirm_stagger: std::time::Duration::from_millis(5),
                merge_timeout: std::time::Duration::from_millis(20),
                ..SyncPolicy::default()
            },
            timers: TimerQueue::real(),
            wallet: Some(Box::new(gw.clone())),
            contract: Box::new(gw),
            offline: true,
        })
        .unwrap();
        ctx.submit_manual_transaction("0xShop", "1").await.unwrap();

        assert_eq!(ctx.initiate_sync(), 1);
        ctx.run_sync_until_idle();

        assert_eq!(ctx.list_ledger().len(), 1);
    }

    #[tokio::test]
    async fn search_goes_through_the_ledger() {
        let mut f = fixture(false);
        f.ctx.submit_manual_transaction("0xAbCd", "1").await.unwrap();
        f.ctx.submit_manual_transaction("0x9999", "1").await.unwrap();

        assert_eq!(f.ctx.search_ledger("abcd").len(), 1);
        assert_eq!(f.ctx.search_ledger("").len(), 2);
    }

    #[tokio::test]
    async fn connect_remembers_the_account() {
        let mut f = fixture(false);

        assert_eq!(f.ctx.connect().await.unwrap(), "0xmerchant");
        assert_eq!(f.ctx.prefs().account(), Some("0xmerchant"));

        f.ctx.disconnect();
        assert_eq!(f.ctx.prefs().account(), None);
    }

    #[tokio::test]
    async fn connect_without_wallet_is_an_error_notice() {
        let mut ctx = AppContext::new(ContextParts {
            prefs: Preferences::in_memory(PreferenceValues::default()),
            ledger: Box::new(MemoryStore::new()),
            feed: Box::new(MemoryStore::new()),
            policy: SyncPolicy::default(),
            timers: TimerQueue::manual(),
            wallet: None,
            contract: Box::new(MockGateway::new()),
            offline: false,
        })
        .unwrap();

        let notice = ctx.connect().await.unwrap_err();
        assert_eq!(notice.severity, crate::error::Severity::Error);
    }
}
