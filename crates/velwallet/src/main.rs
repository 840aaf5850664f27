use clap::{Parser, Subcommand};
use eyre::Context as _;
use secrecy::{ExposeSecret as _, SecretString};
use std::{io::Write as _, process::ExitCode};
use tracing_subscriber::prelude::*;
use zeroize::Zeroizing;

mod address;
mod amount;
mod cli_output;
mod config;
mod errors;
mod fsutil;
mod keys;
mod kv;
mod node;
mod paths;
mod signer;
mod store;
mod transfer;
mod wallet;

use crate::{
    errors::{CliError, VelwalletError},
    keys::WalletIdentity,
    kv::FileKv,
    node::{HttpNode, LedgerNode as _},
    paths::VelwalletPaths,
    store::ConfigStore,
    transfer::TransferCoordinator,
    wallet::{HistoryEntry, SessionState, WalletStore},
};

#[derive(Parser, Debug)]
#[command(name = "velwallet", version)]
struct Cli {
    /// On failure, print `{"code", "message"}` to stdout instead of an error report.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new key pair and make it the active wallet.
    ///
    /// Replaces any active wallet. Local history is kept.
    Create {
        /// Include the private key in the output.
        #[arg(long, default_value_t = false)]
        show_private_key: bool,
    },

    /// Import a wallet from its private key and address.
    ///
    /// The address is stored exactly as given; it is not checked against the key.
    Import {
        #[arg(long)]
        address: String,

        /// Hex private key (optional `0x` prefix). Prompted for without echo when omitted,
        /// which keeps it out of shell history and process listings.
        #[arg(long)]
        private_key: Option<String>,
    },

    /// Print whether a wallet is loaded and how much history is recorded.
    Status,

    /// Print the active wallet.
    Show {
        #[arg(long, default_value_t = false)]
        show_private_key: bool,
    },

    /// Ask the node for the active wallet's balance.
    Balance,

    /// Sign and submit a transfer from the active wallet.
    Send {
        #[arg(long)]
        to: String,

        /// Plain decimal amount, e.g. `10` or `2.5`.
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
    },

    /// Print recorded transfers, newest first.
    History {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Remove all recorded transfers.
    ClearHistory,

    /// Forget the active wallet. Recorded history is kept.
    Logout,

    /// Check a transfer signature offline.
    Verify {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        signature: String,
        #[arg(long)]
        public_key: String,
    },

    /// Print resolved paths (useful for debugging).
    Paths,
}

fn init_logging(paths: &VelwalletPaths) -> tracing_appender::non_blocking::WorkerGuard {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let file_name = paths
        .log_file
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("velwallet.log.jsonl");
    let file_appender = tracing_appender::rolling::never(&paths.data_dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone());
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn print_json(v: &impl serde::Serialize) -> eyre::Result<()> {
    // Output may carry key material; wipe the rendered buffer once written.
    let s = Zeroizing::new(serde_json::to_string_pretty(v).context("serialize output")?);
    writeln!(std::io::stdout().lock(), "{}", s.as_str()).context("write output")?;
    Ok(())
}

/// Borrowed view of an identity for output. The private key is only included on request.
#[derive(serde::Serialize)]
struct IdentityView<'a> {
    address: &'a str,
    public_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    private_key: Option<&'a str>,
}

impl<'a> IdentityView<'a> {
    fn new(id: &'a WalletIdentity, show_private_key: bool) -> Self {
        Self {
            address: &id.address,
            public_key: &id.public_key,
            private_key: show_private_key.then_some(id.private_key.as_str()),
        }
    }
}

fn open_wallet_store(paths: &VelwalletPaths) -> WalletStore<FileKv> {
    WalletStore::open(FileKv::new(paths.state_dir()))
}

fn open_node(paths: &VelwalletPaths) -> eyre::Result<HttpNode> {
    let cfg = ConfigStore::new(paths).load_or_init_default()?;
    HttpNode::new(&cfg.node.base_url, cfg.node.timeout())
}

async fn send(paths: &VelwalletPaths, to: &str, amount: &str) -> eyre::Result<()> {
    // Busy-state gate: one in-flight send per data dir.
    let _gate = fsutil::try_lock_exclusive(&paths.send_lock_path())?;

    let mut store = open_wallet_store(paths);
    let identity = store.require_identity()?.clone();

    // Recipient and amount problems are reported before any network round-trip.
    transfer::validate(&identity, to, amount, rust_decimal::Decimal::MAX)?;

    let coordinator = TransferCoordinator::new(open_node(paths)?);
    let balance = coordinator.node().balance(&identity.address).await?;
    let entry = coordinator.send(&identity, to, amount, balance).await?;

    let tx_hash = entry.tx_hash.clone();
    store.append_history(entry.clone()).with_context(|| {
        format!("transfer {tx_hash} was accepted by the node but could not be recorded locally")
    })?;
    print_json(&entry)
}

async fn run(cmd: Command, paths: &VelwalletPaths) -> eyre::Result<()> {
    match cmd {
        Command::Create { show_private_key } => {
            let mut store = open_wallet_store(paths);
            let id = store.create()?;
            cli_output::print_backup_warning(show_private_key);
            print_json(&IdentityView::new(id, show_private_key))
        }
        Command::Import {
            address,
            private_key,
        } => {
            let secret: SecretString = match private_key {
                Some(k) => SecretString::new(k.into()),
                None => cli_output::prompt_private_key()?,
            };
            let mut store = open_wallet_store(paths);
            let id = store.import(secret.expose_secret(), &address)?;
            print_json(&IdentityView::new(id, false))
        }
        Command::Status => {
            let store = open_wallet_store(paths);
            let logged_in = store.state() == SessionState::LoggedIn;
            print_json(&serde_json::json!({
                "logged_in": logged_in,
                "address": store.identity().map(|id| id.address.as_str()),
                "history_len": store.history().len(),
            }))
        }
        Command::Show { show_private_key } => {
            let store = open_wallet_store(paths);
            let id = store.require_identity()?;
            print_json(&IdentityView::new(id, show_private_key))
        }
        Command::Balance => {
            let store = open_wallet_store(paths);
            let id = store.require_identity()?;
            let balance = open_node(paths)?.balance(&id.address).await?;
            print_json(&serde_json::json!({
                "address": id.address,
                "balance": amount::canonical_amount(balance),
            }))
        }
        Command::Send { to, amount } => send(paths, &to, &amount).await,
        Command::History { limit } => {
            let store = open_wallet_store(paths);
            let shown: Vec<&HistoryEntry> = store
                .history()
                .iter()
                .take(limit.unwrap_or(usize::MAX))
                .collect();
            print_json(&shown)
        }
        Command::ClearHistory => {
            let mut store = open_wallet_store(paths);
            store.clear_history()?;
            cli_output::print_history_cleared();
            print_json(&serde_json::json!({ "ok": true }))
        }
        Command::Logout => {
            let mut store = open_wallet_store(paths);
            store.logout()?;
            cli_output::print_logged_out(store.history().len());
            print_json(&serde_json::json!({ "ok": true }))
        }
        Command::Verify {
            from,
            to,
            amount,
            signature,
            public_key,
        } => {
            let amount = amount::parse_plain_decimal(&amount)?;
            let valid = signer::verify(&public_key, &from, &to, amount, &signature);
            print_json(&serde_json::json!({
                "message": signer::build_message(&from, &to, amount),
                "valid": valid,
            }))
        }
        Command::Paths => print_json(&serde_json::json!({
            "config_dir": paths.config_dir,
            "data_dir": paths.data_dir,
            "state_dir": paths.state_dir(),
            "log_file": paths.log_file,
        })),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let paths = VelwalletPaths::discover()?;
    paths.ensure_private_dirs()?;
    let _log_guard = init_logging(&paths);

    match run(cli.cmd, &paths).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if cli.json => {
            let local = e
                .downcast_ref::<VelwalletError>()
                .is_some_and(VelwalletError::is_local_validation);
            if local {
                tracing::info!(error = %e, "input rejected");
            } else {
                tracing::error!(error = %format!("{e:#}"), "command failed");
            }
            print_json(&CliError::from(&e))?;
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e),
    }
}
