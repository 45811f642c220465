//! Chain and token descriptors - immutable configuration handed to the wallet
//!
//! Both descriptors serialize in the exact camelCase shape the provider expects,
//! so `wallet_addEthereumChain` receives a `ChainDescriptor` as-is.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// BNB Smart Chain mainnet, the one supported target chain.
pub mod bsc {
    pub const CHAIN_ID: &str = "0x38";
    pub const CHAIN_NAME: &str = "BNB Smart Chain";
    pub const CURRENCY_NAME: &str = "BNB";
    pub const CURRENCY_SYMBOL: &str = "BNB";
    pub const CURRENCY_DECIMALS: u8 = 18;
    pub const RPC_URL: &str = "https://bsc-dataseed.binance.org/";
    pub const EXPLORER_URL: &str = "https://bscscan.com";
}

/// Tether USD (BEP-20) on BNB Smart Chain, the one registrable token.
pub mod usdt {
    pub const ADDRESS: &str = "0x55d398326f99059fF775485246999027B3197955";
    pub const SYMBOL: &str = "USDT";
    pub const NAME: &str = "Tether USD";
    pub const DECIMALS: u8 = 18;
    pub const IMAGE_PATH: &str = "/usdt.png";
}

// wallet_watchAsset limits enforced by the common providers
const MAX_SYMBOL_LEN: usize = 11;
const MAX_DECIMALS: u8 = 36;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid chain id: {0}")]
    InvalidChainId(String),
    #[error("chain {0} has no rpc url")]
    MissingRpcUrl(String),
    #[error("invalid token address: {0}")]
    InvalidTokenAddress(String),
    #[error("invalid token symbol: {0:?}")]
    InvalidSymbol(String),
    #[error("token decimals {0} out of range")]
    InvalidDecimals(u8),
}

/// Canonical chain id: lowercase `0x` hex without leading zeros.
///
/// Accepts `0x`-prefixed hex in any case (zero padding allowed) or a plain
/// decimal string, since providers are not consistent about either.
pub fn canonical_chain_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() => u64::from_str_radix(hex, 16).ok()?,
        Some(_) => return None,
        None => raw.parse::<u64>().ok()?,
    };
    Some(format!("{:#x}", value))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Everything `wallet_addEthereumChain` needs to know about the target chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl Default for ChainDescriptor {
    fn default() -> Self { Self::bsc() }
}

impl ChainDescriptor {
    pub fn bsc() -> Self {
        Self {
            chain_id: bsc::CHAIN_ID.into(),
            chain_name: bsc::CHAIN_NAME.into(),
            native_currency: NativeCurrency {
                name: bsc::CURRENCY_NAME.into(),
                symbol: bsc::CURRENCY_SYMBOL.into(),
                decimals: bsc::CURRENCY_DECIMALS,
            },
            rpc_urls: vec![bsc::RPC_URL.into()],
            block_explorer_urls: vec![bsc::EXPLORER_URL.into()],
        }
    }

    /// True when `chain_id` (any accepted spelling) names this chain.
    pub fn matches(&self, chain_id: &str) -> bool {
        canonical_chain_id(chain_id).as_deref() == Some(self.chain_id.as_str())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if canonical_chain_id(&self.chain_id).as_deref() != Some(self.chain_id.as_str()) {
            return Err(ConfigError::InvalidChainId(self.chain_id.clone()));
        }
        if self.rpc_urls.iter().all(|u| u.trim().is_empty()) {
            return Err(ConfigError::MissingRpcUrl(self.chain_id.clone()));
        }
        Ok(())
    }
}

/// The token registered through `wallet_watchAsset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

impl Default for TokenDescriptor {
    fn default() -> Self { Self::usdt() }
}

impl TokenDescriptor {
    pub fn usdt() -> Self {
        Self {
            address: usdt::ADDRESS.into(),
            symbol: usdt::SYMBOL.into(),
            decimals: usdt::DECIMALS,
            name: usdt::NAME.into(),
            image_uri: Some(usdt::IMAGE_PATH.into()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let hex = self.address.strip_prefix("0x").unwrap_or_default();
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidTokenAddress(self.address.clone()));
        }
        if self.symbol.is_empty() || self.symbol.len() > MAX_SYMBOL_LEN {
            return Err(ConfigError::InvalidSymbol(self.symbol.clone()));
        }
        if self.decimals > MAX_DECIMALS {
            return Err(ConfigError::InvalidDecimals(self.decimals));
        }
        Ok(())
    }

    /// Image URI as the wallet should see it.
    ///
    /// Absolute URIs pass through, relative paths are joined to the page
    /// origin, and without an origin there is nothing the wallet could fetch.
    pub fn resolve_image(&self, origin: Option<&str>) -> Option<String> {
        let image = self.image_uri.as_deref()?.trim();
        if image.is_empty() {
            return None;
        }
        if image.starts_with("https://") || image.starts_with("http://") || image.starts_with("data:") {
            return Some(image.to_string());
        }
        let origin = origin?.trim_end_matches('/');
        if origin.is_empty() {
            return None;
        }
        Some(format!("{}/{}", origin, image.trim_start_matches('/')))
    }
}
