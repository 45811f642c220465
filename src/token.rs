//! TokenRegistrar - `wallet_watchAsset` with a degraded fallback
//!
//! ```text
//! full request (with image)
//!     ├── truthy      → Added
//!     ├── falsy       → Rejected
//!     ├── 4001        → Rejected
//!     └── other error → degraded request (no image)
//!                           ├── truthy → Added
//!                           ├── falsy / 4001 → Rejected
//!                           ├── -32601 → Unsupported
//!                           └── other  → Failed
//! ```
//!
//! Callers must only register on a connected session that is already on the
//! target chain.

use crate::classify::{classify, ErrorKind, ErrorRecord};
use crate::core::chain::TokenDescriptor;
use crate::core::methods::{op, wallet};
use crate::provider::{Provider, ProviderError};
use serde::Serialize;
use serde_json::{json, Value};

/// Options of an EIP-747 `wallet_watchAsset` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchAsset {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl WatchAsset {
    /// Full-featured request; the image is resolved against `origin`.
    pub fn full(token: &TokenDescriptor, origin: Option<&str>) -> Self {
        Self {
            address: token.address.clone(),
            symbol: token.symbol.clone(),
            decimals: token.decimals,
            name: token.name.clone(),
            image: token.resolve_image(origin),
        }
    }

    /// Same request without the image, for providers that reject it.
    pub fn degraded(&self) -> Self {
        Self { image: None, ..self.clone() }
    }

    pub fn to_params(&self) -> Value {
        json!({ "type": wallet::ASSET_TYPE_ERC20, "options": self })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationResult {
    Added,
    Rejected,
    Unsupported(ErrorRecord),
    Failed(ErrorRecord),
}

impl RegistrationResult {
    pub fn is_added(&self) -> bool { matches!(self, RegistrationResult::Added) }
}

pub struct TokenRegistrar {
    origin: Option<String>,
}

impl TokenRegistrar {
    pub fn new(origin: Option<String>) -> Self { Self { origin } }

    pub fn origin(&self) -> Option<&str> { self.origin.as_deref() }

    pub async fn register<P: Provider + ?Sized>(&self, provider: &P, token: &TokenDescriptor) -> RegistrationResult {
        let request = WatchAsset::full(token, self.origin());
        tracing::info!(op = op::WATCH_ASSET, symbol = %token.symbol, address = %token.address, image = request.image.is_some(), "requesting asset watch");

        let first = match provider.watch_asset(&request).await {
            Ok(added) => return Self::answered(added, &token.symbol),
            Err(e) => classify(&e, op::WATCH_ASSET),
        };
        if first.kind == ErrorKind::UserRejected {
            tracing::info!(op = op::WATCH_ASSET, symbol = %token.symbol, "asset watch rejected by user");
            return RegistrationResult::Rejected;
        }

        tracing::warn!(op = op::WATCH_ASSET, kind = %first.kind, error = %first.raw_message, "full request failed, retrying without image");
        match provider.watch_asset(&request.degraded()).await {
            Ok(added) => Self::answered(added, &token.symbol),
            Err(e) => Self::fallback_failed(&e),
        }
    }

    fn answered(added: bool, symbol: &str) -> RegistrationResult {
        if added {
            tracing::info!(op = op::WATCH_ASSET, symbol, "asset added");
            RegistrationResult::Added
        } else {
            tracing::info!(op = op::WATCH_ASSET, symbol, "asset declined");
            RegistrationResult::Rejected
        }
    }

    fn fallback_failed(error: &ProviderError) -> RegistrationResult {
        let record = classify(error, op::WATCH_ASSET);
        tracing::warn!(op = op::WATCH_ASSET, kind = %record.kind, error = %record.raw_message, "degraded request failed");
        match record.kind {
            ErrorKind::UserRejected => RegistrationResult::Rejected,
            ErrorKind::MethodUnsupported => RegistrationResult::Unsupported(record),
            _ => RegistrationResult::Failed(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape_matches_eip747() {
        let request = WatchAsset::full(&TokenDescriptor::usdt(), Some("https://app.example"));
        let params = request.to_params();
        assert_eq!(params["type"], "ERC20");
        assert_eq!(params["options"]["symbol"], "USDT");
        assert_eq!(params["options"]["decimals"], 18);
        assert_eq!(params["options"]["image"], "https://app.example/usdt.png");

        let degraded = request.degraded().to_params();
        assert!(degraded["options"].get("image").is_none());
        assert_eq!(degraded["options"]["address"], params["options"]["address"]);
    }
}
