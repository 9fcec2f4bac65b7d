//! CLI framework for the signet vault client

use crate::config::{ClientConfig, ConfigError};
use crate::coordinator::{can_execute, SubmitOutcome};
use crate::history::ViewEntry;
use crate::poller::VaultSnapshot;
use crate::rpc::HttpConnector;
use crate::service::ServiceError;
use crate::session::{missing_identity, Session, TokenDisplay};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use signet_errors::Error;
use signet_log::{debug, info, warn, LogFormat};
use signet_types::{format_units, SignerId, TokenDescriptor, TokenId, NATIVE_TOKEN};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the command line front end
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Signet(#[from] Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("json output failed:: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to initialize logging:: {0}")]
    Logging(String),
}

impl CliError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Signet(err) => err.code() as i32,
            _ => 1,
        }
    }
}

pub type CliResult<T> = std::result::Result<T, CliError>;

impl GlobalOpts {
    /// Get the effective node URL (from CLI arg or config)
    pub fn get_node_url(&self, config: &ClientConfig) -> String {
        self.node.clone().unwrap_or_else(|| config.node.clone())
    }

    /// Get the effective identity (from CLI arg or config)
    pub fn get_identity(&self, config: &ClientConfig) -> Option<String> {
        self.identity.clone().or_else(|| config.identity.clone())
    }

    /// Get the effective output format (from CLI arg or config)
    pub fn get_output(&self, config: &ClientConfig) -> String {
        self.output.clone().unwrap_or_else(|| config.output.clone())
    }

    /// Get the home directory (from CLI arg or default)
    pub fn get_home(&self) -> PathBuf {
        self.home
            .clone()
            .unwrap_or_else(ClientConfig::default_config_dir)
    }
}

/// Signet multisig vault client CLI
#[derive(Parser, Debug)]
#[command(name = "signet")]
#[command(about = "A client for signet multisig custody vaults")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global_opts: GlobalOpts,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global CLI options
#[derive(Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Vault service RPC endpoint
    #[arg(long, global = true)]
    pub node: Option<String>,

    /// Signer identity to act as
    #[arg(long, global = true)]
    pub identity: Option<String>,

    /// Home directory for configuration
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format (text, json)
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Output format (json, text)
    #[arg(long, global = true)]
    pub output: Option<String>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration management
    Config(ConfigCmd),

    /// Token identifier utilities
    Token(TokenCmd),

    /// Vault state and settings
    Vault(VaultCmd),

    /// Transaction commands
    Tx(TxCmd),
}

/// Config command
#[derive(Parser, Debug)]
pub struct ConfigCmd {
    /// Config subcommands
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set(ConfigSetCmd),

    /// Initialize default configuration
    Init(ConfigInitCmd),
}

/// Config set command
#[derive(Parser, Debug)]
pub struct ConfigSetCmd {
    /// Configuration key
    pub key: String,

    /// Configuration value
    pub value: String,
}

/// Config init command
#[derive(Parser, Debug)]
pub struct ConfigInitCmd {
    /// Overwrite existing configuration
    #[arg(long)]
    pub overwrite: bool,
}

/// Token command
#[derive(Parser, Debug)]
pub struct TokenCmd {
    #[command(subcommand)]
    pub action: TokenAction,
}

#[derive(Subcommand, Debug)]
pub enum TokenAction {
    /// Split a token identifier into network, standard and address
    Parse(TokenParseCmd),
}

#[derive(Parser, Debug)]
pub struct TokenParseCmd {
    /// Token identifier, e.g. icp:native or icp:icrc1:<canister>
    pub token: String,
}

/// Vault command
#[derive(Parser, Debug)]
pub struct VaultCmd {
    #[command(subcommand)]
    pub action: VaultAction,
}

#[derive(Subcommand, Debug)]
pub enum VaultAction {
    /// Show threshold, signers and native balance
    Info(VaultArg),

    /// Change the number of approvals required
    SetThreshold(SetThresholdCmd),

    /// Add a signer identity
    AddSigner(AddSignerCmd),

    /// Show the vault's balance of a token
    Balance(BalanceCmd),

    /// List the vault's native and tracked tokens with balances
    Tokens(VaultArg),

    /// Start tracking a token, e.g. icp:icrc1:<canister>
    AddToken(AddTokenCmd),

    /// Keep printing vault state as it changes
    Watch(WatchCmd),
}

#[derive(Parser, Debug)]
pub struct VaultArg {
    /// Vault address
    pub vault: String,
}

#[derive(Parser, Debug)]
pub struct SetThresholdCmd {
    /// Vault address
    pub vault: String,

    /// New threshold
    pub threshold: u32,
}

#[derive(Parser, Debug)]
pub struct AddSignerCmd {
    /// Vault address
    pub vault: String,

    /// Signer identity to add
    pub signer: String,
}

#[derive(Parser, Debug)]
pub struct AddTokenCmd {
    /// Vault address
    pub vault: String,

    /// Token identifier
    pub token: String,
}

#[derive(Parser, Debug)]
pub struct BalanceCmd {
    /// Vault address
    pub vault: String,

    /// Token identifier
    #[arg(long, default_value = NATIVE_TOKEN)]
    pub token: String,
}

#[derive(Parser, Debug)]
pub struct WatchCmd {
    /// Vault address
    pub vault: String,

    /// Stop after this many updates
    #[arg(long)]
    pub count: Option<usize>,
}

/// Transaction command
#[derive(Parser, Debug)]
pub struct TxCmd {
    #[command(subcommand)]
    pub action: TxAction,
}

#[derive(Subcommand, Debug)]
pub enum TxAction {
    /// Propose a transfer, executing it when one approval is enough
    Send(SendCmd),

    /// List executed and pending transactions, newest first
    List(VaultArg),

    /// Execute a pending proposal
    Execute(ExecuteCmd),
}

#[derive(Parser, Debug)]
pub struct SendCmd {
    /// Vault address
    pub vault: String,

    /// Recipient account
    pub to: String,

    /// Amount in the token's base unit
    pub amount: String,

    /// Token identifier
    #[arg(long, default_value = NATIVE_TOKEN)]
    pub token: String,

    /// Sending account; defaults to the vault's subaccount for the token
    #[arg(long)]
    pub from: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ExecuteCmd {
    /// Vault address
    pub vault: String,

    /// Proposal id
    pub id: u64,
}

/// CLI command handler
pub struct CliHandler {
    /// Global options
    pub global_opts: GlobalOpts,
    /// Configuration
    pub config: ClientConfig,
}

impl CliHandler {
    /// Create a new CLI handler
    pub fn new(global_opts: GlobalOpts) -> CliResult<Self> {
        let config = ClientConfig::load_or_default(&global_opts.get_home())?;
        Ok(Self {
            global_opts,
            config,
        })
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: Commands) -> CliResult<()> {
        match command {
            Commands::Config(cmd) => self.handle_config(cmd),
            Commands::Token(cmd) => self.handle_token(cmd),
            Commands::Vault(cmd) => self.handle_vault(cmd).await,
            Commands::Tx(cmd) => self.handle_tx(cmd).await,
        }
    }

    fn json_output(&self) -> bool {
        self.global_opts.get_output(&self.config) == "json"
    }

    fn session(&self) -> CliResult<Session<HttpConnector>> {
        let identity = self
            .global_opts
            .get_identity(&self.config)
            .ok_or_else(missing_identity)?;
        let identity = SignerId::parse(&identity)?;

        let mut config = self.config.clone();
        config.node = self.global_opts.get_node_url(&self.config);
        let connector = HttpConnector::new(&config.node, config.call_options().timeout)?;
        debug!(node = %config.node, identity = %identity, "opening session");

        Ok(Session::new(&config, identity, connector))
    }

    fn print_json(&self, value: &impl serde::Serialize) -> CliResult<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Handle config command
    #[tracing::instrument(skip(self))]
    fn handle_config(&self, cmd: ConfigCmd) -> CliResult<()> {
        let home = self.global_opts.get_home();
        match cmd.action {
            ConfigAction::Show => {
                if self.json_output() {
                    return self.print_json(&self.config);
                }
                println!("Configuration ({})", ClientConfig::config_file_in(&home).display());
                println!("  node:: {}", self.global_opts.get_node_url(&self.config));
                println!(
                    "  identity:: {}",
                    self.global_opts
                        .get_identity(&self.config)
                        .unwrap_or_else(|| "<unset>".to_string())
                );
                println!("  timeout:: {}s", self.config.timeout);
                println!("  poll_interval:: {}s", self.config.poll_interval);
                println!("  output:: {}", self.global_opts.get_output(&self.config));
                Ok(())
            }
            ConfigAction::Set(set_cmd) => {
                info!(key = %set_cmd.key, value = %set_cmd.value, "Setting configuration");
                let mut config = self.config.clone();
                config.set(&set_cmd.key, &set_cmd.value)?;
                ClientConfig::init(&home, false)?;
                config.save_to_file(ClientConfig::config_file_in(&home))?;
                println!("{} = {}", set_cmd.key, set_cmd.value);
                Ok(())
            }
            ConfigAction::Init(init_cmd) => {
                if init_cmd.overwrite {
                    warn!("Overwriting existing configuration...");
                }
                ClientConfig::init(&home, init_cmd.overwrite)?;
                println!(
                    "Configuration written to {}",
                    ClientConfig::config_file_in(&home).display()
                );
                Ok(())
            }
        }
    }

    fn handle_token(&self, cmd: TokenCmd) -> CliResult<()> {
        match cmd.action {
            TokenAction::Parse(parse_cmd) => {
                let descriptor = TokenDescriptor::parse(&parse_cmd.token)?;
                if self.json_output() {
                    return self.print_json(&json!({
                        "token": descriptor.to_string(),
                        "network": descriptor.network.as_str(),
                        "standard": descriptor.standard.as_str(),
                        "address": descriptor.address,
                        "needs_subaccount": descriptor.needs_subaccount(),
                    }));
                }
                println!("network:: {}", descriptor.network);
                println!("standard:: {}", descriptor.standard);
                println!(
                    "address:: {}",
                    descriptor.address.as_deref().unwrap_or("-")
                );
                println!("needs subaccount:: {}", descriptor.needs_subaccount());
                Ok(())
            }
        }
    }

    /// Handle vault command
    #[tracing::instrument(skip(self))]
    async fn handle_vault(&self, cmd: VaultCmd) -> CliResult<()> {
        match cmd.action {
            VaultAction::Info(arg) => {
                let mut session = self.session()?;
                let snapshot = session.vault_info(&arg.vault).await?;
                if self.json_output() {
                    return self.print_json(&snapshot);
                }
                print_snapshot(&snapshot);
                Ok(())
            }
            VaultAction::SetThreshold(set_cmd) => {
                let mut session = self.session()?;
                let vault = session
                    .set_threshold(&set_cmd.vault, set_cmd.threshold)
                    .await?;
                println!(
                    "Threshold set to {} of {} signers",
                    vault.threshold(),
                    vault.signers().len()
                );
                Ok(())
            }
            VaultAction::AddSigner(add_cmd) => {
                // Reject malformed identities before opening a session.
                SignerId::parse(&add_cmd.signer)?;
                let mut session = self.session()?;
                let signer = session.add_signer(&add_cmd.vault, &add_cmd.signer).await?;
                println!("Added signer {signer}");
                Ok(())
            }
            VaultAction::Balance(balance_cmd) => {
                TokenDescriptor::parse(&balance_cmd.token)?;
                let mut session = self.session()?;
                let balance = session
                    .balance(&balance_cmd.vault, &balance_cmd.token)
                    .await?;
                let display = session
                    .token_display(&balance_cmd.vault, &balance_cmd.token)
                    .await?;
                if self.json_output() {
                    return self.print_json(&json!({
                        "token": balance_cmd.token,
                        "balance": balance,
                        "symbol": display.symbol,
                        "decimals": display.decimals,
                    }));
                }
                println!(
                    "{} {}",
                    format_units(balance, display.decimals),
                    display.symbol
                );
                Ok(())
            }
            VaultAction::Tokens(arg) => {
                let mut session = self.session()?;
                let assets = session.assets(&arg.vault).await?;
                if self.json_output() {
                    return self.print_json(&assets);
                }
                for asset in &assets {
                    println!(
                        "{:<10} {:>20}  {}",
                        asset.display.symbol,
                        format_units(asset.balance, asset.display.decimals),
                        asset.token
                    );
                }
                Ok(())
            }
            VaultAction::AddToken(add_cmd) => {
                TokenDescriptor::parse(&add_cmd.token)?;
                let mut session = self.session()?;
                let token = session.add_token(&add_cmd.vault, &add_cmd.token).await?;
                println!("Tracking {token}");
                Ok(())
            }
            VaultAction::Watch(watch_cmd) => self.watch(watch_cmd).await,
        }
    }

    async fn watch(&self, cmd: WatchCmd) -> CliResult<()> {
        let mut session = self.session()?;
        let mut poller = session.watch(&cmd.vault)?;
        let mut updates = poller.subscribe();
        let mut seen = 0usize;

        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let update = updates.borrow_and_update().clone();
                    let Some(update) = update else { continue };
                    match &update.result {
                        Ok(snapshot) if self.json_output() => self.print_json(snapshot)?,
                        Ok(snapshot) => print_snapshot(snapshot),
                        Err(err) => eprintln!("refresh failed: {err}"),
                    }
                    seen += 1;
                    if cmd.count.is_some_and(|limit| seen >= limit) {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                    break;
                }
            }
        }

        poller.stop().await;
        Ok(())
    }

    /// Handle transaction command
    #[tracing::instrument(skip(self))]
    async fn handle_tx(&self, cmd: TxCmd) -> CliResult<()> {
        match cmd.action {
            TxAction::Send(send_cmd) => {
                // Validate locally so bad input never needs a session.
                crate::intent::IntentDraft::parse(&send_cmd.amount, &send_cmd.token, &send_cmd.to)?;
                let mut session = self.session()?;
                let outcome = session
                    .send(
                        &send_cmd.vault,
                        &send_cmd.amount,
                        &send_cmd.token,
                        &send_cmd.to,
                        send_cmd.from.as_deref(),
                    )
                    .await?;
                self.print_outcome(&outcome)
            }
            TxAction::List(arg) => {
                let mut session = self.session()?;
                let view = session.history(&arg.vault).await?;
                if self.json_output() {
                    return self.print_json(&view);
                }
                let snapshot = session.vault_info(&arg.vault).await?;
                let displays = session
                    .token_displays(&arg.vault, view.iter().map(|entry| &entry.intent().token))
                    .await;
                print_history(&view, &snapshot, &displays);
                Ok(())
            }
            TxAction::Execute(execute_cmd) => {
                let mut session = self.session()?;
                let status = session.execute(&execute_cmd.vault, execute_cmd.id).await?;
                if self.json_output() {
                    return self.print_json(&json!({ "id": execute_cmd.id, "status": status }));
                }
                println!("Proposal {}:: {}", execute_cmd.id, status);
                Ok(())
            }
        }
    }

    fn print_outcome(&self, outcome: &SubmitOutcome) -> CliResult<()> {
        match outcome {
            SubmitOutcome::PendingApproval {
                proposal,
                threshold,
            } => {
                if self.json_output() {
                    return self.print_json(&json!({
                        "outcome": "pending_approval",
                        "proposal": proposal,
                        "threshold": threshold,
                    }));
                }
                println!(
                    "Proposal {} recorded, {}/{} approvals",
                    proposal.id,
                    proposal.approvals(),
                    threshold
                );
            }
            SubmitOutcome::Executed { proposal, status } => {
                if self.json_output() {
                    return self.print_json(&json!({
                        "outcome": "executed",
                        "proposal": proposal,
                        "status": status,
                    }));
                }
                println!("Proposal {} executed:: {}", proposal.id, status);
            }
        }
        Ok(())
    }
}

fn print_snapshot(snapshot: &VaultSnapshot) {
    println!("Vault {}", snapshot.vault);
    println!("  threshold:: {}/{}", snapshot.threshold, snapshot.signers.len());
    for signer in &snapshot.signers {
        println!("  signer:: {signer}");
    }
    println!(
        "  balance:: {} ICP",
        format_units(snapshot.native_balance, signet_types::NATIVE_DECIMALS)
    );
}

fn print_history(
    view: &[ViewEntry],
    snapshot: &VaultSnapshot,
    displays: &HashMap<TokenId, TokenDisplay>,
) {
    if view.is_empty() {
        println!("No transactions");
        return;
    }
    let vault = snapshot.to_vault().ok();

    for entry in view {
        let intent = entry.intent();
        let amount = match displays.get(&intent.token) {
            Some(display) => format!(
                "{} {}",
                format_units(intent.amount, display.decimals),
                display.symbol
            ),
            None => format!("{} {}", intent.amount, intent.token),
        };

        match entry {
            ViewEntry::Executed(tx) => {
                println!("executed  {amount} -> {}  [{}]", intent.recipient, tx.status);
            }
            ViewEntry::Proposed(proposal) => {
                let ready = vault
                    .as_ref()
                    .is_some_and(|vault| can_execute(proposal, vault));
                println!(
                    "#{:<7} {amount} -> {}  [{}/{} approvals{}]",
                    proposal.id,
                    intent.recipient,
                    proposal.approvals(),
                    snapshot.threshold,
                    if ready { ", ready" } else { "" }
                );
            }
        }
    }
}

/// Parse CLI arguments and execute commands
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let format = cli.global_opts.log_format;
    let initialized = if cli.global_opts.verbose {
        signet_log::init_tracing_with_level("debug", format)
    } else if std::env::var_os("RUST_LOG").is_some() {
        signet_log::init_tracing(format)
    } else {
        signet_log::init_tracing_with_level("warn", format)
    };
    initialized.map_err(|e| CliError::Logging(e.to_string()))?;

    let handler = CliHandler::new(cli.global_opts)?;
    handler.execute(cli.command).await
}
