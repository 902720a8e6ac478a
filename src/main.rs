use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use nexcoin_pos::builder::{PaymentMethod, PRESET_AMOUNTS};
use nexcoin_pos::gateway::SimulatedWallet;
use nexcoin_pos::notice::item_status;
use nexcoin_pos::persistence::SETTINGS_FILE;
use nexcoin_pos::settings::{DismissBehavior, Language, MergeTrigger, Preferences, SyncPolicy, Theme};
use nexcoin_pos::sync::{OfflineSource, SyncProgress};
use nexcoin_pos::{AppContext, Notice, Submitted, TxError};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = ".nexcoin")]
    data_dir: PathBuf,

    /// Buffer new payments in the transaction feed instead of the ledger.
    #[arg(long)]
    offline: bool,

    #[arg(long, value_enum)]
    lang: Option<Language>,

    #[arg(long, default_value_t = 1000)]
    sync_stagger_ms: u64,

    #[arg(long, default_value_t = 4000)]
    sync_confirm_ms: u64,

    #[arg(long, default_value_t = 5000)]
    sync_timeout_ms: u64,

    #[arg(long, value_enum, default_value_t = MergeTrigger::Timeout)]
    merge_trigger: MergeTrigger,

    #[arg(long, value_enum, default_value_t = DismissBehavior::Continue)]
    on_dismiss: DismissBehavior,

    /// The simulated wallet declines every signature request.
    #[arg(long)]
    simulate_reject: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the ledger, optionally filtered by recipient.
    History {
        #[arg(long)]
        search: Option<String>,
    },
    /// Reconcile the transaction feed into the ledger.
    Sync,
    /// Show products and preset amounts.
    Catalog,
    /// Charge a catalog selection through the payment contract.
    PayCatalog {
        #[arg(long)]
        to: String,
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },
    /// Send a plain transfer.
    PayManual {
        #[arg(long)]
        to: String,
        #[arg(long, conflicts_with = "preset")]
        amount: Option<String>,
        #[arg(long)]
        preset: Option<String>,
    },
    Connect,
    Disconnect,
    /// Show or change preferences.
    Settings {
        #[arg(long, value_enum)]
        theme: Option<Theme>,
    },
}

impl Args {
    fn policy(&self) -> SyncPolicy {
        SyncPolicy {
            syncing_stagger: Duration::from_millis(self.sync_stagger_ms),
            confirm_stagger: Duration::from_millis(self.sync_confirm_ms),
            merge_timeout: Duration::from_millis(self.sync_timeout_ms),
            merge_trigger: self.merge_trigger,
            on_dismiss: self.on_dismiss,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Keep the simulated account stable across runs.
    let known_account = Preferences::load(args.data_dir.join(SETTINGS_FILE))
        .account()
        .map(str::to_string);
    let wallet = SimulatedWallet::new(known_account).rejecting(args.simulate_reject);

    let mut ctx = AppContext::open(
        &args.data_dir,
        args.policy(),
        Some(Box::new(wallet.clone())),
        Box::new(wallet),
        args.offline,
    )?;

    if let Some(lang) = args.lang {
        if let Some(warning) = ctx.set_language(lang) {
            println!("{}", warning);
        }
    }

    match args.command {
        Command::History { search } => print_history(&ctx, search.as_deref()),
        Command::Sync => run_sync(&mut ctx).await,
        Command::Catalog => print_catalog(&ctx),
        Command::PayCatalog { to, items } => {
            let items: Vec<&str> = items.iter().map(String::as_str).collect();
            let result = ctx.submit_catalog_transaction(&to, &items).await;
            report(&ctx, result);
        }
        Command::PayManual { to, amount, preset } => {
            let result = pay_manual(&mut ctx, &to, amount, preset).await;
            report(&ctx, result);
        }
        Command::Connect => match ctx.connect().await {
            Ok(account) => println!("{}", Notice::connected(ctx.language(), &account)),
            Err(notice) => println!("{}", notice),
        },
        Command::Disconnect => ctx.disconnect(),
        Command::Settings { theme } => {
            if let Some(theme) = theme {
                if let Err(e) = ctx.prefs_mut().set_theme(theme) {
                    println!("{}", Notice::persistence_warning(&e, ctx.language()));
                }
            }
            println!("{}", serde_json::to_string_pretty(ctx.prefs().values())?);
        }
    }

    Ok(())
}

async fn pay_manual(
    ctx: &mut AppContext,
    to: &str,
    amount: Option<String>,
    preset: Option<String>,
) -> Result<Submitted, TxError> {
    ctx.builder_mut().reset();
    ctx.enter_recipient(to)?;

    let builder = ctx.builder_mut();
    builder.choose(PaymentMethod::Manual)?;
    match (amount, preset) {
        (_, Some(preset)) => builder.pick_preset(&preset)?,
        (Some(amount), None) => builder.set_amount(amount)?,
        (None, None) => {}
    }

    ctx.submit_current().await
}

fn report(ctx: &AppContext, result: Result<Submitted, TxError>) {
    match result {
        Ok(done) => {
            for notice in &done.notices {
                println!("{}", notice);
            }
            println!("Hash:     {}", done.record.hash);
            println!("Explorer: {}", done.record.explorer_url());
        }
        Err(e) => {
            log::debug!("[MAIN] submission failed: {:?}", e);
            println!("{}", ctx.notice_for(&e));
        }
    }
}

fn print_history(ctx: &AppContext, search: Option<&str>) {
    let records = match search {
        Some(term) => ctx.search_ledger(term),
        None => ctx.list_ledger().to_vec(),
    };

    if records.is_empty() {
        println!("{}", Notice::no_transactions(ctx.language()));
        return;
    }

    println!("{:<22} | {:<44} | {:>10} | {}", "Date", "Recipient", "ETH", "Hash");
    println!("{}", "-".repeat(120));
    for r in &records {
        println!(
            "{:<22} | {:<44} | {:>10} | {}",
            r.date,
            r.recipient,
            r.amount,
            r.short_hash()
        );
    }
}

fn print_catalog(ctx: &AppContext) {
    println!("-----------------------------------");
    for p in ctx.builder().catalog().products() {
        println!("{:<12} {:>6} ETH", p.name, p.price);
    }
    println!("-----------------------------------");
    println!("Presets: {} ETH", PRESET_AMOUNTS.join(", "));
}

async fn run_sync(ctx: &mut AppContext) {
    let lang = ctx.language();
    let mut rx = ctx.sync_progress();

    if ctx.initiate_sync() == 0 {
        println!("{}", Notice::nothing_pending(lang));
        return;
    }

    let recipients: HashMap<String, String> = ctx
        .feed()
        .fetch_known_transactions()
        .into_iter()
        .map(|r| (r.hash.clone(), r.short_recipient()))
        .collect();

    let printer = async move {
        loop {
            match rx.recv().await {
                Ok(progress) => {
                    print_progress(&progress, &recipients, lang);
                    if progress.is_terminal() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => log::warn!("[MAIN] skipped {} progress updates", n),
                Err(RecvError::Closed) => break,
            }
        }
    };

    tokio::join!(ctx.drive_sync(), printer);
}

fn print_progress(progress: &SyncProgress, recipients: &HashMap<String, String>, lang: Language) {
    match progress {
        SyncProgress::NothingPending => println!("{}", Notice::nothing_pending(lang)),
        SyncProgress::Started { hashes, .. } => {
            println!("[SYNC] {} pending transaction(s)", hashes.len())
        }
        SyncProgress::Item { index, hash, state, .. } => {
            let to = recipients.get(hash).map(String::as_str).unwrap_or("?");
            println!("[SYNC] #{} {} {}", index + 1, to, item_status(*state, lang))
        }
        SyncProgress::Merged { added, warning, .. } => {
            println!("[SYNC] merged {} new record(s) into the ledger", added);
            if let Some(w) = warning {
                println!("[SYNC] warning: {}", w);
            }
        }
        SyncProgress::Aborted { .. } => println!("[SYNC] aborted"),
    }
}
