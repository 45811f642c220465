//! In-memory wallet provider for tests and the simulator
//!
//! Behaves like an injected EIP-1193 wallet: it knows a set of chains, holds
//! accounts, emits `chainChanged`/`accountsChanged` to subscribers, and can be
//! scripted to fail specific methods or emit events while a request is in flight.
//! Every request is recorded so callers can assert on the exact call sequence.

use super::{EventListener, Provider, ProviderBridge, ProviderError, ProviderEvent};
use crate::core::chain::{canonical_chain_id, ChainDescriptor};
use crate::core::methods::{eth, wallet};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

/// Well-known test account (never holds real funds)
pub const TEST_ACCOUNT: &str = "0x9858effd232b4033e47d90003d41ec34ecaeda94";

/// One recorded request
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    pub method: String,
    pub params: Value,
}

struct MemoryWallet {
    chain_id: String,
    known_chains: BTreeSet<String>,
    accounts: Vec<String>,
    authorized: bool,
    balances: HashMap<String, String>,
    auto_switch_on_add: bool,
    ignore_switch: bool,
    watch_asset_result: Value,
    failures: HashMap<String, VecDeque<ProviderError>>,
    emit_during: HashMap<String, VecDeque<ProviderEvent>>,
    added_chains: Vec<ChainDescriptor>,
    watched_assets: Vec<Value>,
    calls: Vec<RpcCall>,
}

impl MemoryWallet {
    fn handle(&mut self, method: &str, params: &Value, events: &mut Vec<ProviderEvent>) -> Result<Value, ProviderError> {
        match method {
            eth::CHAIN_ID => Ok(json!(self.chain_id)),
            eth::ACCOUNTS => Ok(if self.authorized { json!(self.accounts) } else { json!([]) }),
            eth::REQUEST_ACCOUNTS => {
                if !self.accounts.is_empty() && !self.authorized {
                    self.authorized = true;
                    events.push(ProviderEvent::AccountsChanged(self.accounts.clone()));
                }
                Ok(json!(self.accounts))
            }
            eth::GET_BALANCE => {
                let address = params[0].as_str().unwrap_or_default().to_ascii_lowercase();
                Ok(json!(self.balances.get(&address).cloned().unwrap_or_else(|| "0x0".into())))
            }
            wallet::SWITCH_CHAIN => {
                let requested = params[0]["chainId"].as_str().unwrap_or_default();
                let chain_id = canonical_chain_id(requested)
                    .ok_or_else(|| ProviderError::rpc(-32602, format!("invalid chainId {}", requested)))?;
                if !self.known_chains.contains(&chain_id) {
                    return Err(ProviderError::unrecognized_chain(&chain_id));
                }
                if !self.ignore_switch {
                    self.move_to(chain_id, events);
                }
                Ok(Value::Null)
            }
            wallet::ADD_CHAIN => {
                let chain: ChainDescriptor = serde_json::from_value(params[0].clone())
                    .map_err(|e| ProviderError::rpc(-32602, e.to_string()))?;
                let chain_id = canonical_chain_id(&chain.chain_id)
                    .ok_or_else(|| ProviderError::rpc(-32602, format!("invalid chainId {}", chain.chain_id)))?;
                self.known_chains.insert(chain_id.clone());
                self.added_chains.push(chain);
                if self.auto_switch_on_add {
                    self.move_to(chain_id, events);
                }
                Ok(Value::Null)
            }
            wallet::WATCH_ASSET => {
                self.watched_assets.push(params.clone());
                Ok(self.watch_asset_result.clone())
            }
            other => Err(ProviderError::method_not_found(other)),
        }
    }

    fn move_to(&mut self, chain_id: String, events: &mut Vec<ProviderEvent>) {
        if self.chain_id != chain_id {
            self.chain_id = chain_id.clone();
            events.push(ProviderEvent::ChainChanged(chain_id));
        }
    }
}

/// Scriptable in-memory provider. Clones share the same wallet.
#[derive(Clone)]
pub struct MemoryProvider {
    wallet: Rc<RefCell<MemoryWallet>>,
    listeners: Rc<RefCell<Vec<EventListener>>>,
}

impl Default for MemoryProvider {
    fn default() -> Self { Self::new() }
}

impl MemoryProvider {
    /// Ethereum mainnet wallet with one unauthorized test account.
    pub fn new() -> Self {
        let wallet = MemoryWallet {
            chain_id: "0x1".into(),
            known_chains: BTreeSet::from(["0x1".to_string()]),
            accounts: vec![TEST_ACCOUNT.into()],
            authorized: false,
            balances: HashMap::new(),
            auto_switch_on_add: false,
            ignore_switch: false,
            watch_asset_result: json!(true),
            failures: HashMap::new(),
            emit_during: HashMap::new(),
            added_chains: Vec::new(),
            watched_assets: Vec::new(),
            calls: Vec::new(),
        };
        Self { wallet: Rc::new(RefCell::new(wallet)), listeners: Rc::new(RefCell::new(Vec::new())) }
    }

    // Setup (builder style)

    /// Active chain; the chain becomes known if it was not.
    pub fn on_chain(self, chain_id: &str) -> Self {
        {
            let mut w = self.wallet.borrow_mut();
            let id = canonical_chain_id(chain_id).unwrap_or_else(|| chain_id.to_string());
            w.known_chains.insert(id.clone());
            w.chain_id = id;
        }
        self
    }
    pub fn with_known_chain(self, chain_id: &str) -> Self {
        if let Some(id) = canonical_chain_id(chain_id) { self.wallet.borrow_mut().known_chains.insert(id); }
        self
    }
    pub fn with_accounts(self, accounts: Vec<String>) -> Self { self.wallet.borrow_mut().accounts = accounts; self }
    /// Accounts are already authorized, as after a previous visit.
    pub fn authorized(self) -> Self { self.wallet.borrow_mut().authorized = true; self }
    pub fn with_balance(self, address: &str, hex: &str) -> Self {
        self.wallet.borrow_mut().balances.insert(address.to_ascii_lowercase(), hex.into());
        self
    }
    /// `wallet_addEthereumChain` also switches to the added chain.
    pub fn auto_switch_on_add(self) -> Self { self.wallet.borrow_mut().auto_switch_on_add = true; self }
    /// `wallet_switchEthereumChain` succeeds without changing the chain.
    pub fn ignore_switch(self) -> Self { self.wallet.borrow_mut().ignore_switch = true; self }
    pub fn with_watch_asset_result(self, result: Value) -> Self { self.wallet.borrow_mut().watch_asset_result = result; self }

    // Scripting

    /// Fail the next call to `method` with `error`. Calls queue in order.
    pub fn fail_next(&self, method: &str, error: ProviderError) {
        self.wallet.borrow_mut().failures.entry(method.into()).or_default().push_back(error);
    }

    /// Emit `event` while the next call to `method` is in flight.
    pub fn emit_during(&self, method: &str, event: ProviderEvent) {
        self.wallet.borrow_mut().emit_during.entry(method.into()).or_default().push_back(event);
    }

    /// The user picks another chain inside the wallet.
    pub fn user_switches_chain(&self, chain_id: &str) {
        let id = canonical_chain_id(chain_id).unwrap_or_else(|| chain_id.to_string());
        {
            let mut w = self.wallet.borrow_mut();
            w.known_chains.insert(id.clone());
            w.chain_id = id.clone();
        }
        self.emit(ProviderEvent::ChainChanged(id));
    }

    /// The user switches or revokes accounts inside the wallet.
    pub fn user_switches_accounts(&self, accounts: Vec<String>) {
        {
            let mut w = self.wallet.borrow_mut();
            w.authorized = !accounts.is_empty();
            w.accounts = accounts.clone();
        }
        self.emit(ProviderEvent::AccountsChanged(accounts));
    }

    pub fn emit(&self, event: ProviderEvent) {
        for listener in self.listeners.borrow().iter() {
            listener(event.clone());
        }
    }

    // Inspection

    pub fn calls(&self) -> Vec<RpcCall> { self.wallet.borrow().calls.clone() }
    pub fn methods(&self) -> Vec<String> { self.wallet.borrow().calls.iter().map(|c| c.method.clone()).collect() }
    pub fn calls_to(&self, method: &str) -> Vec<RpcCall> {
        self.wallet.borrow().calls.iter().filter(|c| c.method == method).cloned().collect()
    }
    pub fn clear_calls(&self) { self.wallet.borrow_mut().calls.clear(); }
    pub fn current_chain(&self) -> String { self.wallet.borrow().chain_id.clone() }
    pub fn added_chains(&self) -> Vec<ChainDescriptor> { self.wallet.borrow().added_chains.clone() }
    pub fn watched_assets(&self) -> Vec<Value> { self.wallet.borrow().watched_assets.clone() }
    pub fn listener_count(&self) -> usize { self.listeners.borrow().len() }
}

#[async_trait(?Send)]
impl Provider for MemoryProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let (result, events) = {
            let mut w = self.wallet.borrow_mut();
            w.calls.push(RpcCall { method: method.into(), params: params.clone() });
            let mut events: Vec<ProviderEvent> =
                w.emit_during.get_mut(method).and_then(VecDeque::pop_front).into_iter().collect();
            let result = match w.failures.get_mut(method).and_then(VecDeque::pop_front) {
                Some(error) => Err(error),
                None => w.handle(method, &params, &mut events),
            };
            (result, events)
        };
        for event in events {
            self.emit(event);
        }
        result
    }

    fn subscribe(&self, listener: EventListener) {
        self.listeners.borrow_mut().push(listener);
    }
}

/// Bridge over a fixed answer: a provider, or none at all.
pub struct StaticBridge<P> {
    provider: Option<P>,
}

impl<P> StaticBridge<P> {
    pub fn present(provider: P) -> Self { Self { provider: Some(provider) } }
    pub fn absent() -> Self { Self { provider: None } }
}

impl<P: Provider + Clone> ProviderBridge for StaticBridge<P> {
    type Provider = P;

    fn detect(&self) -> Option<P> { self.provider.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::methods::codes;

    #[tokio::test]
    async fn unknown_chain_then_add() {
        let provider = MemoryProvider::new();
        let err = provider.switch_chain("0x38").await.unwrap_err();
        assert_eq!(err.code(), Some(codes::UNRECOGNIZED_CHAIN));

        provider.add_chain(&ChainDescriptor::bsc()).await.unwrap();
        assert_eq!(provider.current_chain(), "0x1");
        provider.switch_chain("0x38").await.unwrap();
        assert_eq!(provider.chain_id().await.unwrap(), "0x38");
    }

    #[tokio::test]
    async fn events_reach_subscribers() {
        let provider = MemoryProvider::new().with_known_chain("0x38");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        provider.subscribe(Box::new(move |event| sink.borrow_mut().push(event)));

        provider.request_accounts().await.unwrap();
        provider.switch_chain("0x38").await.unwrap();
        provider.switch_chain("0x38").await.unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                ProviderEvent::AccountsChanged(vec![TEST_ACCOUNT.into()]),
                ProviderEvent::ChainChanged("0x38".into()),
            ]
        );
    }

    #[tokio::test]
    async fn scripted_failure_applies_once() {
        let provider = MemoryProvider::new();
        provider.fail_next(eth::CHAIN_ID, ProviderError::Message("request timeout".into()));
        assert!(provider.chain_id().await.is_err());
        assert_eq!(provider.chain_id().await.unwrap(), "0x1");
        assert_eq!(provider.calls_to(eth::CHAIN_ID).len(), 2);
    }

    #[tokio::test]
    async fn eth_accounts_needs_authorization() {
        let provider = MemoryProvider::new();
        assert!(provider.accounts().await.unwrap().is_empty());
        let authorized = MemoryProvider::new().authorized();
        assert_eq!(authorized.accounts().await.unwrap(), vec![TEST_ACCOUNT.to_string()]);
    }
}
