//! Assetwatch CLI - inspect descriptors, classify errors, simulate sessions
//!
//!   assetwatch descriptors [--origin <url>]      → chain/token + exact RPC payloads
//!   assetwatch classify --code 4902 --message M  → ErrorRecord as JSON
//!   assetwatch simulate --scenario add-chain     → one JSON snapshot per line
//!
//! Logging goes to stderr: `RUST_LOG` filters, `ASSETWATCH_LOG_JSON=1` or
//! `--log-format json` switches to JSON.

use anyhow::{anyhow, bail, Context, Result};
use assetwatch::core::methods::{eth, wallet};
use assetwatch::provider::TEST_ACCOUNT;
use assetwatch::{
    classify, init_logging, ChainDescriptor, ConnectionController, ImmediateTimer, LogFormat, MemoryProvider,
    ProviderError, SessionConfig, Snapshot, StaticBridge, Timer, TokenDescriptor, TokioTimer,
    WatchAsset,
};
use clap::{Parser, Subcommand, ValueEnum};
use futures::channel::mpsc::UnboundedReceiver;
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::io::IsTerminal;
use std::rc::Rc;

#[derive(Parser, Debug)]
#[command(name = "assetwatch", version, about = "Wallet session controller toolbox")]
struct Cli {
    /// pretty | compact | json
    #[arg(long, global = true, env = "ASSETWATCH_LOG_FORMAT")]
    log_format: Option<String>,

    /// Pretty-print JSON output (default when stdout is a terminal)
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the target chain, the token and the payloads sent to the wallet
    Descriptors {
        /// Page origin used to resolve the token image
        #[arg(long)]
        origin: Option<String>,
    },
    /// Classify a raw provider error
    Classify {
        #[arg(long, allow_hyphen_values = true)]
        code: Option<i64>,
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long, default_value = "cli")]
        context: String,
    },
    /// Run the controller against an in-memory wallet
    Simulate {
        #[arg(long, value_enum, default_value_t = Scenario::Ready)]
        scenario: Scenario,
        /// Skip the retry delay
        #[arg(long)]
        no_delay: bool,
        #[arg(long)]
        origin: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Scenario {
    /// Authorized wallet already on the target chain
    Ready,
    /// Wallet on Ethereum that knows the target chain
    Switch,
    /// Wallet that has never seen the target chain
    AddChain,
    /// User cancels the connection prompt
    RejectConnect,
    /// Wallet without wallet_watchAsset image support or the method at all
    LegacyToken,
    /// Chain reads time out twice before the wallet answers
    Flaky,
    /// User revokes the accounts after connecting
    Revoke,
    /// User picks another chain in the wallet after connecting
    Drift,
    /// No injected wallet
    NoWallet,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = match cli.log_format.as_deref() {
        Some(value) => value.parse::<LogFormat>().map_err(|e| anyhow!(e))?,
        None => LogFormat::from_env(),
    };
    init_logging(format);
    let pretty = cli.pretty || std::io::stdout().is_terminal();

    match cli.command {
        Command::Descriptors { origin } => cmd_descriptors(origin.as_deref(), pretty),
        Command::Classify { code, message, context } => cmd_classify(code, message, &context, pretty),
        Command::Simulate { scenario, no_delay, origin } => cmd_simulate(scenario, no_delay, origin, pretty).await,
    }
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? };
    println!("{}", text);
    Ok(())
}

fn cmd_descriptors(origin: Option<&str>, pretty: bool) -> Result<()> {
    let chain = ChainDescriptor::bsc();
    let token = TokenDescriptor::usdt();
    chain.validate().context("target chain")?;
    token.validate().context("token")?;

    let output = json!({
        "chain": chain,
        "token": token,
        (wallet::ADD_CHAIN): [chain],
        (wallet::WATCH_ASSET): WatchAsset::full(&token, origin).to_params(),
    });
    emit(&output, pretty)
}

fn cmd_classify(code: Option<i64>, message: String, context: &str, pretty: bool) -> Result<()> {
    let error = match code {
        Some(code) => ProviderError::rpc(code, message),
        None if message.is_empty() => bail!("give --code, --message or both"),
        None => ProviderError::Message(message),
    };
    emit(&classify(&error, context), pretty)
}

/// Builds the wallet for a scenario, plus what the user does once the
/// session is up.
fn scenario_wallet(scenario: Scenario) -> (MemoryProvider, Option<Box<dyn Fn(&MemoryProvider)>>) {
    let bsc = ChainDescriptor::bsc().chain_id;
    match scenario {
        Scenario::Ready => {
            let provider = MemoryProvider::new().on_chain(&bsc).authorized().with_balance(TEST_ACCOUNT, "0x1bc16d674ec80000");
            (provider, None)
        }
        Scenario::Switch => (MemoryProvider::new().with_known_chain(&bsc), None),
        Scenario::AddChain => (MemoryProvider::new().auto_switch_on_add(), None),
        Scenario::RejectConnect => {
            let provider = MemoryProvider::new();
            provider.fail_next(eth::REQUEST_ACCOUNTS, ProviderError::user_rejected());
            (provider, None)
        }
        Scenario::LegacyToken => {
            let provider = MemoryProvider::new().on_chain(&bsc);
            provider.fail_next(wallet::WATCH_ASSET, ProviderError::Message("Invalid image url".into()));
            provider.fail_next(wallet::WATCH_ASSET, ProviderError::method_not_found(wallet::WATCH_ASSET));
            (provider, None)
        }
        Scenario::Flaky => {
            let provider = MemoryProvider::new().with_known_chain(&bsc);
            provider.fail_next(eth::CHAIN_ID, ProviderError::Message("request timeout".into()));
            provider.fail_next(eth::CHAIN_ID, ProviderError::Message("network unreachable".into()));
            (provider, None)
        }
        Scenario::Revoke => (MemoryProvider::new().on_chain(&bsc), then(|p| p.user_switches_accounts(Vec::new()))),
        Scenario::Drift => (MemoryProvider::new().on_chain(&bsc), then(|p| p.user_switches_chain("0x1"))),
        Scenario::NoWallet => (MemoryProvider::new(), None),
    }
}

fn then(action: impl Fn(&MemoryProvider) + 'static) -> Option<Box<dyn Fn(&MemoryProvider)>> {
    Some(Box::new(action))
}

async fn cmd_simulate(scenario: Scenario, no_delay: bool, origin: Option<String>, pretty: bool) -> Result<()> {
    let (provider, afterwards) = scenario_wallet(scenario);
    let bridge = match scenario {
        Scenario::NoWallet => StaticBridge::absent(),
        _ => StaticBridge::present(provider.clone()),
    };
    let timer: Rc<dyn Timer> = if no_delay { Rc::new(ImmediateTimer) } else { Rc::new(TokioTimer) };
    let mut config = SessionConfig::new();
    if let Some(origin) = origin {
        config = config.with_origin(origin);
    }

    let (mut controller, handle) = ConnectionController::new(&bridge, config, timer)?;
    let mut updates = handle.subscribe();
    tracing::info!(?scenario, "simulating");

    controller.start().await;
    if handle.available() && !handle.snapshot().session.connected {
        handle.connect()?;
    }
    controller.run_until_idle().await;
    if handle.available() {
        handle.add_token()?;
        controller.run_until_idle().await;
    }
    if let Some(user_action) = afterwards {
        user_action(&provider);
        controller.run_until_idle().await;
    }

    for snapshot in drain(&mut updates) {
        emit(&snapshot, pretty)?;
    }
    eprintln!("{}", handle.snapshot().status.message());
    Ok(())
}

fn drain(updates: &mut UnboundedReceiver<Snapshot>) -> Vec<Snapshot> {
    let mut snapshots = Vec::new();
    while let Some(Some(snapshot)) = updates.next().now_or_never() {
        snapshots.push(snapshot);
    }
    snapshots
}
