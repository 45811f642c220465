//! Provider - the injected wallet as seen by the controller
//!
//! # Architecture
//!
//! ```text
//! ProviderBridge::detect()
//!     │
//!     ▼
//! Provider (trait)
//!     ├── request(method, params)     ← one required RPC entry point
//!     ├── chain_id / accounts / ...   ← typed helpers over request()
//!     └── subscribe(listener)         ← chainChanged / accountsChanged
//!           │
//!           ├── InjectedProvider (wasm, window.ethereum)
//!           └── MemoryProvider   (tests, simulator)
//! ```

mod memory;

pub use memory::{MemoryProvider, RpcCall, StaticBridge, TEST_ACCOUNT};

use crate::core::chain::{canonical_chain_id, ChainDescriptor};
use crate::core::methods::{codes, eth, wallet};
use crate::token::WatchAsset;
use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

/// Raw error as reported by the provider, before classification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// EIP-1193 style error object with a numeric code
    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String, data: Option<Value> },
    /// Error without a code (a plain thrown error)
    #[error("{0}")]
    Message(String),
    /// The provider answered, but not in the documented shape
    #[error("unexpected response to {method}: {detail}")]
    Decode { method: String, detail: String },
}

impl ProviderError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc { code, message: message.into(), data: None }
    }

    pub fn with_data(self, data: Value) -> Self {
        match self {
            Self::Rpc { code, message, .. } => Self::Rpc { code, message, data: Some(data) },
            other => other,
        }
    }

    pub fn user_rejected() -> Self { Self::rpc(codes::USER_REJECTED, "User rejected the request.") }

    pub fn unrecognized_chain(chain_id: &str) -> Self {
        Self::rpc(codes::UNRECOGNIZED_CHAIN, format!("Unrecognized chain ID \"{}\".", chain_id))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::rpc(codes::METHOD_NOT_FOUND, format!("The method \"{}\" does not exist / is not available.", method))
    }

    pub(crate) fn decode(method: &str, detail: impl Into<String>) -> Self {
        Self::Decode { method: method.into(), detail: detail.into() }
    }

    pub fn code(&self) -> Option<i64> {
        match self { Self::Rpc { code, .. } => Some(*code), _ => None }
    }

    /// Code wrapped inside `data` (`data.originalError.code` or `data.code`).
    pub fn nested_code(&self) -> Option<i64> {
        let data = match self { Self::Rpc { data: Some(data), .. } => data, _ => return None };
        data.pointer("/originalError/code").or_else(|| data.get("code")).and_then(Value::as_i64)
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Rpc { message, .. } | Self::Message(message) => message,
            Self::Decode { detail, .. } => detail,
        }
    }
}

/// Notifications the provider pushes on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    ChainChanged(String),
    AccountsChanged(Vec<String>),
}

pub type EventListener = Box<dyn Fn(ProviderEvent)>;

/// JavaScript-style truthiness of a JSON result.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn decode_accounts(method: &str, value: Value) -> Result<Vec<String>, ProviderError> {
    serde_json::from_value(value).map_err(|e| ProviderError::decode(method, e.to_string()))
}

/// Single-threaded EIP-1193 provider. Every call is a suspension point.
#[async_trait(?Send)]
pub trait Provider {
    /// `params == Value::Null` means the method takes no parameters.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    fn subscribe(&self, listener: EventListener);

    /// Active chain, canonicalized.
    async fn chain_id(&self) -> Result<String, ProviderError> {
        let value = self.request(eth::CHAIN_ID, Value::Null).await?;
        value
            .as_str()
            .and_then(canonical_chain_id)
            .ok_or_else(|| ProviderError::decode(eth::CHAIN_ID, value.to_string()))
    }

    /// Accounts already authorized for this origin (never prompts).
    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        decode_accounts(eth::ACCOUNTS, self.request(eth::ACCOUNTS, Value::Null).await?)
    }

    /// Prompts the user to authorize accounts.
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        decode_accounts(eth::REQUEST_ACCOUNTS, self.request(eth::REQUEST_ACCOUNTS, Value::Null).await?)
    }

    /// Raw hex balance in the smallest unit.
    async fn balance(&self, address: &str) -> Result<String, ProviderError> {
        let value = self.request(eth::GET_BALANCE, json!([address, eth::LATEST])).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::decode(eth::GET_BALANCE, value.to_string()))
    }

    async fn switch_chain(&self, chain_id: &str) -> Result<(), ProviderError> {
        self.request(wallet::SWITCH_CHAIN, json!([{ "chainId": chain_id }])).await.map(|_| ())
    }

    async fn add_chain(&self, chain: &ChainDescriptor) -> Result<(), ProviderError> {
        let params = serde_json::to_value(chain).map_err(|e| ProviderError::decode(wallet::ADD_CHAIN, e.to_string()))?;
        self.request(wallet::ADD_CHAIN, json!([params])).await.map(|_| ())
    }

    /// True when the wallet reports the asset as added.
    async fn watch_asset(&self, asset: &WatchAsset) -> Result<bool, ProviderError> {
        let value = self.request(wallet::WATCH_ASSET, asset.to_params()).await?;
        Ok(is_truthy(&value))
    }
}

/// Finds the injected provider, if any. Absence is permanent for the session.
pub trait ProviderBridge {
    type Provider: Provider;

    fn detect(&self) -> Option<Self::Provider>;
}
