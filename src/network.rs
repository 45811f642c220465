//! NetworkReconciler - pin the provider to the target chain
//!
//! ```text
//! current == target ──────────────────────────────► ok (no calls if cached)
//!     │ no
//!     ▼
//! wallet_switchEthereumChain ──ok──────────────────► verify
//!     │ 4902
//!     ▼
//! wallet_addEthereumChain ──► eth_chainId == target ► ok (auto-switched)
//!                                  │ no
//!                                  ▼
//!                        wallet_switchEthereumChain ► verify
//!
//! verify: eth_chainId must equal target, a silent no-op switch is a failure
//! ```
//!
//! The last chain id read or observed is cached, so asking again while already
//! on target costs nothing. The controller feeds `chainChanged` into the cache.

use crate::classify::{classify, ErrorKind, ErrorRecord};
use crate::core::chain::ChainDescriptor;
use crate::core::methods::op;
use crate::provider::Provider;
use std::cell::RefCell;

#[derive(Default)]
pub struct NetworkReconciler {
    known_chain: RefCell<Option<String>>,
}

impl NetworkReconciler {
    pub fn new() -> Self { Self::default() }

    /// Record a chain id learned elsewhere (a `chainChanged` event).
    pub fn observe(&self, chain_id: &str) {
        *self.known_chain.borrow_mut() = Some(chain_id.to_string());
    }

    /// Drop the cached chain so the next check reads from the provider.
    pub fn forget(&self) {
        self.known_chain.borrow_mut().take();
    }

    pub fn known_chain(&self) -> Option<String> {
        self.known_chain.borrow().clone()
    }

    /// True once the provider is verifiably on `target`.
    pub async fn ensure<P: Provider + ?Sized>(&self, provider: &P, target: &ChainDescriptor) -> bool {
        self.reconcile(provider, target).await.is_ok()
    }

    /// Like [`ensure`](Self::ensure), keeping the classified failure.
    pub async fn reconcile<P: Provider + ?Sized>(&self, provider: &P, target: &ChainDescriptor) -> Result<(), ErrorRecord> {
        let current = match self.known_chain() {
            Some(chain_id) => chain_id,
            None => self.read(provider, op::READ_CHAIN).await?,
        };
        if target.matches(&current) {
            tracing::debug!(op = op::READ_CHAIN, chain_id = %current, "already on target chain");
            return Ok(());
        }

        tracing::info!(op = op::SWITCH_CHAIN, from = %current, to = %target.chain_id, "switching chain");
        if let Err(e) = provider.switch_chain(&target.chain_id).await {
            let record = classify(&e, op::SWITCH_CHAIN);
            if record.kind != ErrorKind::NetworkUnknown {
                return Err(Self::failed(record));
            }

            tracing::info!(op = op::ADD_CHAIN, chain_id = %target.chain_id, name = %target.chain_name, "chain unknown to wallet, adding");
            provider
                .add_chain(target)
                .await
                .map_err(|e| Self::failed(classify(&e, op::ADD_CHAIN)))?;

            let after_add = self.read(provider, op::VERIFY_CHAIN).await?;
            if target.matches(&after_add) {
                tracing::info!(op = op::ADD_CHAIN, chain_id = %after_add, "wallet switched on add");
                return Ok(());
            }
            provider
                .switch_chain(&target.chain_id)
                .await
                .map_err(|e| Self::failed(classify(&e, op::SWITCH_CHAIN)))?;
        }

        let verified = self.read(provider, op::VERIFY_CHAIN).await?;
        if target.matches(&verified) {
            tracing::info!(op = op::VERIFY_CHAIN, chain_id = %verified, "on target chain");
            Ok(())
        } else {
            Err(Self::failed(ErrorRecord::new(
                ErrorKind::Unknown,
                format!("wallet reports {} after switching to {}", verified, target.chain_id),
                op::VERIFY_CHAIN,
            )))
        }
    }

    async fn read<P: Provider + ?Sized>(&self, provider: &P, context: &str) -> Result<String, ErrorRecord> {
        match provider.chain_id().await {
            Ok(chain_id) => {
                self.observe(&chain_id);
                Ok(chain_id)
            }
            Err(e) => Err(Self::failed(classify(&e, context))),
        }
    }

    fn failed(record: ErrorRecord) -> ErrorRecord {
        tracing::warn!(op = %record.context, kind = %record.kind, error = %record.raw_message, "reconciliation failed");
        record
    }
}
