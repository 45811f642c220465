//! ConnectionController - the session state machine
//!
//! # Architecture
//!
//! ```text
//! ControllerHandle ──┐                       ┌── NetworkReconciler
//!   connect()        │   ordered command     │
//!   disconnect()     ├──► queue (mpsc) ─────►├── TokenRegistrar
//!   add_token() ...  │   one at a time       │
//! EventSubscriber ───┘         │             └── RetryCoordinator
//!   chainChanged               ▼
//!   accountsChanged     ConnectionController ──► StatusBoard ──► presentation
//!                       (only writer of Session)
//! ```
//!
//! # States
//!
//! ```text
//! Disconnected ──connect──► Connecting ──accounts──► Connected ◄──┐
//!      ▲                        │                       │         │
//!      │                        │ rejected              ▼         │
//!      └────────────────────────┴──────────────── Reconciling ────┤
//!                                                       │         │
//!                                                       ▼         │
//!                                                     Error ──────┘
//! ```
//!
//! `Error` is published and then settled: back to `Connected` while an
//! address is known, otherwise `Disconnected`.
//!
//! Before a finished operation is applied, commands that queued up meanwhile
//! are pulled into a backlog. A queued disconnect, or an account change to a
//! different address, means the result belongs to a session that no longer
//! exists, so it is dropped.

mod config;
mod session;
mod status;

pub use config::SessionConfig;
pub use session::{ConnectionState, Session};
pub use status::{Snapshot, Status, StatusBoard};

use crate::classify::{classify, ErrorKind, ErrorRecord};
use crate::core::chain::{canonical_chain_id, ConfigError};
use crate::core::methods::op;
use crate::core::units::{format_balance, ZERO_BALANCE};
use crate::events::EventSubscriber;
use crate::network::NetworkReconciler;
use crate::provider::{Provider, ProviderBridge};
use crate::retry::{RetryCoordinator, RetryOutcome};
use crate::runtime::Timer;
use crate::token::{RegistrationResult, TokenRegistrar};
use futures::channel::mpsc;
use futures::{FutureExt, StreamExt};
use session::same_address;
use std::collections::VecDeque;
use std::rc::Rc;
use thiserror::Error;

/// Everything that can change the session, from the user or the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Reconcile,
    RegisterToken,
    ChainChanged(String),
    AccountsChanged(Vec<String>),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("wallet not detected")]
    WalletNotDetected,
    #[error("controller stopped")]
    Stopped,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Cheap, cloneable front door to a running controller.
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
    board: Rc<StatusBoard>,
    retry: Rc<RetryCoordinator>,
    available: bool,
}

impl ControllerHandle {
    /// False when no provider was detected. Nothing will ever change that.
    pub fn available(&self) -> bool { self.available }

    pub fn connect(&self) -> Result<(), ControllerError> {
        self.require_wallet()?;
        self.send(Command::Connect)
    }

    /// Local reset. A pending retry delay is cancelled right away.
    pub fn disconnect(&self) -> Result<(), ControllerError> {
        self.retry.cancel();
        self.send(Command::Disconnect)
    }

    pub fn switch_network(&self) -> Result<(), ControllerError> {
        self.require_wallet()?;
        self.send(Command::Reconcile)
    }

    pub fn add_token(&self) -> Result<(), ControllerError> {
        self.require_wallet()?;
        self.send(Command::RegisterToken)
    }

    pub fn shutdown(&self) {
        let _ = self.send(Command::Shutdown);
    }

    pub fn snapshot(&self) -> Snapshot { self.board.current() }
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Snapshot> { self.board.subscribe() }

    fn require_wallet(&self) -> Result<(), ControllerError> {
        if self.available { Ok(()) } else { Err(ControllerError::WalletNotDetected) }
    }

    fn send(&self, command: Command) -> Result<(), ControllerError> {
        self.commands.unbounded_send(command).map_err(|_| ControllerError::Stopped)
    }
}

pub struct ConnectionController<P: Provider> {
    provider: Option<Rc<P>>,
    config: SessionConfig,
    session: Session,
    state: ConnectionState,
    reconciler: NetworkReconciler,
    registrar: TokenRegistrar,
    retry: Rc<RetryCoordinator>,
    board: Rc<StatusBoard>,
    commands: mpsc::UnboundedReceiver<Command>,
    backlog: VecDeque<Command>,
}

impl<P: Provider> ConnectionController<P> {
    pub fn new<B>(bridge: &B, config: SessionConfig, timer: Rc<dyn Timer>) -> Result<(Self, ControllerHandle), ControllerError>
    where
        B: ProviderBridge<Provider = P>,
    {
        config.validate()?;
        let (tx, rx) = mpsc::unbounded();
        let board = Rc::new(StatusBoard::new());

        let retry_board = board.clone();
        let retry = RetryCoordinator::new(config.retry, timer)
            .with_observer(Box::new(move |retry| retry_board.update_status(Status::Retrying { retry })));
        let retry = Rc::new(retry);

        let provider = bridge.detect().map(Rc::new);
        match &provider {
            Some(provider) => {
                EventSubscriber::attach(provider.as_ref(), tx.clone());
                tracing::info!(target_chain = %config.target.chain_id, token = %config.token.symbol, "wallet provider detected");
            }
            None => {
                tracing::warn!("no wallet provider detected");
                board.update_status(Status::WalletNotDetected);
            }
        }

        let handle = ControllerHandle { commands: tx, board: board.clone(), retry: retry.clone(), available: provider.is_some() };
        let controller = Self {
            provider,
            registrar: TokenRegistrar::new(config.origin.clone()),
            config,
            session: Session::default(),
            state: ConnectionState::Disconnected,
            reconciler: NetworkReconciler::new(),
            retry,
            board,
            commands: rx,
            backlog: VecDeque::new(),
        };
        Ok((controller, handle))
    }

    pub fn session(&self) -> &Session { &self.session }
    pub fn state(&self) -> ConnectionState { self.state }
    pub fn config(&self) -> &SessionConfig { &self.config }

    /// Restore, then process commands until `Shutdown`.
    pub async fn run(mut self) {
        self.start().await;
        while let Some(command) = self.next_command().await {
            if command == Command::Shutdown {
                break;
            }
            self.dispatch(command).await;
        }
        tracing::info!("controller stopped");
    }

    /// Rebuild the session from provider state without prompting the user.
    pub async fn start(&mut self) {
        let Some(provider) = self.provider.clone() else {
            self.publish(Status::WalletNotDetected);
            return;
        };

        let accounts = match provider.accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                let record = classify(&e, op::RESTORE);
                tracing::warn!(op = op::RESTORE, kind = %record.kind, error = %record.raw_message, "could not read accounts");
                Vec::new()
            }
        };
        match provider.chain_id().await {
            Ok(chain_id) => {
                self.reconciler.observe(&chain_id);
                self.session.chain_id = Some(chain_id);
            }
            Err(e) => tracing::debug!(op = op::RESTORE, error = %e, "could not read chain"),
        }

        match accounts.into_iter().next() {
            Some(address) => {
                tracing::info!(op = op::RESTORE, address = %address, "restoring authorized session");
                self.apply_connected(&provider, address).await;
            }
            None => self.publish(Status::Idle),
        }
    }

    /// Process every command already queued, then return.
    pub async fn run_until_idle(&mut self) {
        loop {
            let command = match self.backlog.pop_front() {
                Some(command) => command,
                None => match self.commands.next().now_or_never() {
                    Some(Some(command)) => command,
                    _ => return,
                },
            };
            if command == Command::Shutdown {
                return;
            }
            self.dispatch(command).await;
        }
    }

    async fn next_command(&mut self) -> Option<Command> {
        match self.backlog.pop_front() {
            Some(command) => Some(command),
            None => self.commands.next().await,
        }
    }

    pub async fn dispatch(&mut self, command: Command) {
        tracing::debug!(?command, state = self.state.as_str(), "command");
        let Some(provider) = self.provider.clone() else {
            self.publish(Status::WalletNotDetected);
            return;
        };
        match command {
            Command::Connect => self.connect(&provider).await,
            Command::Disconnect => self.disconnect(),
            Command::Reconcile => self.reconcile(&provider).await,
            Command::RegisterToken => self.register_token(&provider).await,
            Command::ChainChanged(chain_id) => self.on_chain_changed(&provider, &chain_id).await,
            Command::AccountsChanged(accounts) => self.on_accounts_changed(&provider, accounts).await,
            Command::Shutdown => {}
        }
    }

    async fn connect(&mut self, provider: &P) {
        if self.state != ConnectionState::Disconnected {
            tracing::debug!(op = op::CONNECT, state = self.state.as_str(), "already connected");
            return;
        }
        self.state = ConnectionState::Connecting;
        self.publish(Status::Connecting);

        let outcome = self.retry.run(op::CONNECT, move |_| first_account(provider)).await;
        let address = match outcome {
            RetryOutcome::Succeeded { value, .. } => value,
            RetryOutcome::Cancelled => {
                self.state = ConnectionState::Disconnected;
                return;
            }
            failed => return self.fail(failed),
        };
        if self.superseded(Some(&address)) {
            tracing::info!(op = op::CONNECT, address = %address, "session changed while connecting, result dropped");
            self.state = ConnectionState::Disconnected;
            self.publish(Status::Idle);
            return;
        }

        tracing::info!(op = op::CONNECT, address = %address, "connected");
        self.reconciler.forget();
        self.apply_connected(provider, address).await;
    }

    async fn apply_connected(&mut self, provider: &P, address: String) {
        self.session.connect(address.clone());
        self.state = ConnectionState::Connected;
        self.refresh_balance(provider).await;
        self.publish(Status::Connected { address });
        self.reconcile(provider).await;
    }

    /// Failures show as a zero balance, never as an error.
    async fn refresh_balance(&mut self, provider: &P) {
        let Some(address) = self.session.address.clone() else { return };
        let decimals = self.config.target.native_currency.decimals;
        self.session.balance = match provider.balance(&address).await {
            Ok(raw) => format_balance(&raw, decimals).unwrap_or_else(|| {
                tracing::debug!(op = op::BALANCE, raw = %raw, "unreadable balance");
                ZERO_BALANCE.into()
            }),
            Err(e) => {
                tracing::debug!(op = op::BALANCE, error = %e, "balance unavailable");
                ZERO_BALANCE.into()
            }
        };
    }

    async fn reconcile(&mut self, provider: &P) {
        if !self.session.connected {
            self.publish(Status::NotConnected);
            return;
        }
        let address = self.session.address.clone();
        self.state = ConnectionState::Reconciling;
        self.publish(Status::SwitchingNetwork);

        let (reconciler, target) = (&self.reconciler, &self.config.target);
        let outcome = self.retry.run(op::SWITCH_CHAIN, move |_| reconciler.reconcile(provider, target)).await;
        self.session.chain_id = self.reconciler.known_chain();

        if self.dropped(&outcome, address.as_deref()) {
            return;
        }
        match outcome {
            RetryOutcome::Succeeded { .. } => {
                self.state = ConnectionState::Connected;
                self.publish(Status::NetworkReady);
            }
            failed => self.fail(failed),
        }
    }

    async fn register_token(&mut self, provider: &P) {
        if !self.session.connected {
            tracing::info!(op = op::REGISTER_TOKEN, "not connected");
            self.publish(Status::NotConnected);
            return;
        }
        let address = self.session.address.clone();
        self.state = ConnectionState::Reconciling;
        self.publish(Status::AddingToken);

        let (reconciler, registrar) = (&self.reconciler, &self.registrar);
        let (target, token) = (&self.config.target, &self.config.token);
        let outcome = self
            .retry
            .run(op::REGISTER_TOKEN, move |_| async move {
                // A chainChanged may still be queued behind this command, so the
                // cached chain cannot be trusted here.
                reconciler.forget();
                if let Err(error) = reconciler.reconcile(provider, target).await {
                    return Err(error);
                }
                match registrar.register(provider, token).await {
                    RegistrationResult::Failed(error) => Err(error),
                    answered => Ok(answered),
                }
            })
            .await;
        self.session.chain_id = self.reconciler.known_chain();

        if self.dropped(&outcome, address.as_deref()) {
            return;
        }
        let status = match outcome {
            RetryOutcome::Succeeded { value: RegistrationResult::Added, .. } => Status::TokenAdded,
            RetryOutcome::Succeeded { value: RegistrationResult::Unsupported(error), .. } => Status::TokenUnsupported { error },
            RetryOutcome::Succeeded { .. } => Status::TokenRejected,
            failed => return self.fail(failed),
        };
        self.state = ConnectionState::Connected;
        self.publish(status);
    }

    async fn on_chain_changed(&mut self, provider: &P, raw: &str) {
        let Some(chain_id) = canonical_chain_id(raw) else {
            tracing::warn!(chain_id = raw, "ignoring unparseable chain id");
            return;
        };
        self.reconciler.observe(&chain_id);
        self.session.chain_id = Some(chain_id.clone());

        if self.session.connected && !self.config.target.matches(&chain_id) {
            tracing::info!(chain_id = %chain_id, target_chain = %self.config.target.chain_id, "left target chain, switching back");
            self.reconcile(provider).await;
        } else {
            self.republish();
        }
    }

    async fn on_accounts_changed(&mut self, provider: &P, accounts: Vec<String>) {
        if !self.session.connected {
            tracing::debug!("accounts changed while disconnected, ignored");
            return;
        }
        match accounts.into_iter().next() {
            None => {
                tracing::info!("wallet revoked accounts");
                self.session.clear();
                self.state = ConnectionState::Disconnected;
                self.publish(Status::Idle);
            }
            Some(address) if self.session.is_address(&address) => {}
            Some(address) => {
                tracing::info!(address = %address, "account changed");
                self.apply_connected(provider, address).await;
            }
        }
    }

    fn disconnect(&mut self) {
        self.retry.cancel();
        self.session.clear();
        self.reconciler.forget();
        self.state = ConnectionState::Disconnected;
        tracing::info!("disconnected");
        self.publish(Status::Idle);
    }

    /// True when the outcome must not be applied: cancelled, or the session
    /// moved on while it was in flight.
    fn dropped<T>(&mut self, outcome: &RetryOutcome<T>, address: Option<&str>) -> bool {
        let dropped = match outcome {
            RetryOutcome::Cancelled => true,
            _ if self.superseded(address) => {
                tracing::info!("session changed during operation, result dropped");
                true
            }
            _ => false,
        };
        if dropped {
            self.state = self.resting_state();
        }
        dropped
    }

    /// Pull queued commands into the backlog and look for a session change.
    fn superseded(&mut self, address: Option<&str>) -> bool {
        while let Some(Some(command)) = self.commands.next().now_or_never() {
            self.backlog.push_back(command);
        }
        self.backlog.iter().any(|command| match command {
            Command::Disconnect => true,
            Command::AccountsChanged(accounts) => match (accounts.first(), address) {
                (None, _) => true,
                (Some(next), Some(current)) => !same_address(next, current),
                (Some(_), None) => false,
            },
            _ => false,
        })
    }

    /// Publish the failure, then settle out of `Error`.
    fn fail<T>(&mut self, outcome: RetryOutcome<T>) {
        let status = match outcome {
            RetryOutcome::Failed { attempts, error } => Status::FailedAfter { attempts, error },
            RetryOutcome::Stopped { error, .. } if is_chain_op(&error) => Status::WrongNetwork { error },
            RetryOutcome::Stopped { error, .. } => Status::Error { error },
            RetryOutcome::Succeeded { .. } | RetryOutcome::Cancelled => return,
        };
        self.state = ConnectionState::Error;
        self.publish(status);
        self.state = self.resting_state();
        self.republish();
    }

    fn resting_state(&self) -> ConnectionState {
        if self.session.connected { ConnectionState::Connected } else { ConnectionState::Disconnected }
    }

    fn publish(&self, status: Status) {
        self.board.publish(Snapshot { state: self.state, session: self.session.clone(), status });
    }

    /// Same status, fresh state and session.
    fn republish(&self) {
        self.publish(self.board.current().status);
    }
}

async fn first_account<P: Provider + ?Sized>(provider: &P) -> Result<String, ErrorRecord> {
    let accounts = provider.request_accounts().await.map_err(|e| classify(&e, op::CONNECT))?;
    accounts
        .into_iter()
        .next()
        .ok_or_else(|| ErrorRecord::new(ErrorKind::UserRejected, "wallet returned no accounts", op::CONNECT))
}

fn is_chain_op(error: &ErrorRecord) -> bool {
    [op::READ_CHAIN, op::SWITCH_CHAIN, op::ADD_CHAIN, op::VERIFY_CHAIN].contains(&error.context.as_str())
}
