//! Session value and connection states

use crate::core::units::ZERO_BALANCE;
use serde::Serialize;

/// What the presentation layer knows about the wallet.
///
/// `address` is set exactly when `connected` is true. `chain_id` is canonical
/// hex or absent. Never persisted: rebuilt from the provider on every start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub address: Option<String>,
    pub connected: bool,
    pub chain_id: Option<String>,
    pub balance: String,
}

impl Default for Session {
    fn default() -> Self {
        Self { address: None, connected: false, chain_id: None, balance: ZERO_BALANCE.into() }
    }
}

impl Session {
    pub fn connect(&mut self, address: impl Into<String>) {
        self.address = Some(address.into());
        self.connected = true;
        self.balance = ZERO_BALANCE.into();
    }

    /// Local reset. The chain id is a provider fact and stays.
    pub fn clear(&mut self) {
        self.address = None;
        self.connected = false;
        self.balance = ZERO_BALANCE.into();
    }

    /// Case-insensitive, addresses come back checksummed or lowercased.
    pub fn is_address(&self, candidate: &str) -> bool {
        self.address.as_deref().map_or(false, |a| same_address(a, candidate))
    }
}

pub(crate) fn same_address(a: &str, b: &str) -> bool { a.eq_ignore_ascii_case(b) }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconciling,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconciling => "reconciling",
            ConnectionState::Error => "error",
        }
    }
}
