//! Network reconciliation against the in-memory wallet
//!
//! These tests verify:
//! 1. Being on target costs one read, then nothing
//! 2. switch → verify, and switch(4902) → add → verify
//! 3. A switch that silently does nothing is a failure
//! 4. Chain ids learned from events replace the cached one

use assetwatch::core::methods::{codes, eth, wallet};
use assetwatch::{ChainDescriptor, ErrorKind, MemoryProvider, NetworkReconciler, ProviderError};
use pretty_assertions::assert_eq;
use serde_json::json;

fn target() -> ChainDescriptor { ChainDescriptor::bsc() }

/// Test: ensure twice on target, second call makes zero requests
#[tokio::test]
async fn ensure_is_idempotent_on_target() {
    let provider = MemoryProvider::new().on_chain("0x38");
    let reconciler = NetworkReconciler::new();

    assert!(reconciler.ensure(&provider, &target()).await);
    assert_eq!(provider.methods(), vec![eth::CHAIN_ID]);

    provider.clear_calls();
    assert!(reconciler.ensure(&provider, &target()).await);
    assert!(provider.calls().is_empty());
}

/// Test: known chain is switched to and verified
#[tokio::test]
async fn switches_and_verifies() {
    let provider = MemoryProvider::new().with_known_chain("0x38");
    let reconciler = NetworkReconciler::new();

    assert!(reconciler.ensure(&provider, &target()).await);
    assert_eq!(provider.methods(), vec![eth::CHAIN_ID, wallet::SWITCH_CHAIN, eth::CHAIN_ID]);
    assert_eq!(provider.calls_to(wallet::SWITCH_CHAIN)[0].params, json!([{"chainId": "0x38"}]));
    assert_eq!(reconciler.known_chain().as_deref(), Some("0x38"));
}

/// Test: unknown chain, wallet switches on add
#[tokio::test]
async fn unknown_chain_is_added_with_full_descriptor() {
    let provider = MemoryProvider::new().auto_switch_on_add();
    let reconciler = NetworkReconciler::new();

    assert!(reconciler.ensure(&provider, &target()).await);
    assert_eq!(
        provider.methods(),
        vec![eth::CHAIN_ID, wallet::SWITCH_CHAIN, wallet::ADD_CHAIN, eth::CHAIN_ID]
    );
    assert_eq!(provider.added_chains(), vec![target()]);

    let params = &provider.calls_to(wallet::ADD_CHAIN)[0].params;
    assert_eq!(params[0]["chainId"], "0x38");
    assert_eq!(params[0]["nativeCurrency"]["symbol"], "BNB");
    assert_eq!(params[0]["rpcUrls"], json!(["https://bsc-dataseed.binance.org/"]));
    assert_eq!(params[0]["blockExplorerUrls"], json!(["https://bscscan.com"]));
}

/// Test: unknown chain, wallet only adds; a second switch follows
#[tokio::test]
async fn add_then_switch_when_wallet_stays() {
    let provider = MemoryProvider::new();
    let reconciler = NetworkReconciler::new();

    assert!(reconciler.ensure(&provider, &target()).await);
    assert_eq!(
        provider.methods(),
        vec![
            eth::CHAIN_ID,
            wallet::SWITCH_CHAIN,
            wallet::ADD_CHAIN,
            eth::CHAIN_ID,
            wallet::SWITCH_CHAIN,
            eth::CHAIN_ID,
        ]
    );
    assert_eq!(provider.current_chain(), "0x38");
}

/// Test: 4902 wrapped inside an internal error still leads to add
#[tokio::test]
async fn nested_unrecognized_chain_leads_to_add() {
    let provider = MemoryProvider::new();
    provider.fail_next(
        wallet::SWITCH_CHAIN,
        ProviderError::rpc(codes::INTERNAL_ERROR, "Internal JSON-RPC error.")
            .with_data(json!({"originalError": {"code": 4902, "message": "Unrecognized chain ID"}})),
    );
    let reconciler = NetworkReconciler::new();

    assert!(reconciler.ensure(&provider, &target()).await);
    assert_eq!(provider.added_chains().len(), 1);
}

/// Test: a switch that returns fine but leaves the chain alone fails the post-check
#[tokio::test]
async fn ineffective_switch_fails_verification() {
    let provider = MemoryProvider::new().with_known_chain("0x38").ignore_switch();
    let reconciler = NetworkReconciler::new();

    let record = reconciler.reconcile(&provider, &target()).await.unwrap_err();
    assert_eq!(record.kind, ErrorKind::Unknown);
    assert_eq!(record.context, "verify-chain");
    assert!(record.raw_message.contains("0x1"));
    assert!(!reconciler.ensure(&provider, &target()).await);
}

/// Test: user rejects the switch; no add is attempted
#[tokio::test]
async fn rejected_switch_is_classified() {
    let provider = MemoryProvider::new().with_known_chain("0x38");
    provider.fail_next(wallet::SWITCH_CHAIN, ProviderError::user_rejected());
    let reconciler = NetworkReconciler::new();

    let record = reconciler.reconcile(&provider, &target()).await.unwrap_err();
    assert_eq!(record.kind, ErrorKind::UserRejected);
    assert_eq!(record.context, "switch-chain");
    assert!(provider.calls_to(wallet::ADD_CHAIN).is_empty());
}

/// Test: add-chain rejection stops there
#[tokio::test]
async fn rejected_add_is_classified() {
    let provider = MemoryProvider::new();
    provider.fail_next(wallet::ADD_CHAIN, ProviderError::user_rejected());
    let reconciler = NetworkReconciler::new();

    let record = reconciler.reconcile(&provider, &target()).await.unwrap_err();
    assert_eq!(record.kind, ErrorKind::UserRejected);
    assert_eq!(record.context, "add-chain");
    assert_eq!(provider.current_chain(), "0x1");
}

/// Test: an observed chain change invalidates the cached target
#[tokio::test]
async fn observed_chain_replaces_cache() {
    let provider = MemoryProvider::new().on_chain("0x38").with_known_chain("0x1");
    let reconciler = NetworkReconciler::new();
    assert!(reconciler.ensure(&provider, &target()).await);

    provider.user_switches_chain("0x1");
    reconciler.observe("0x1");
    provider.clear_calls();

    assert!(reconciler.ensure(&provider, &target()).await);
    assert_eq!(provider.methods(), vec![wallet::SWITCH_CHAIN, eth::CHAIN_ID]);
}

/// Test: forget() makes the next check read again
#[tokio::test]
async fn forget_drops_cache() {
    let provider = MemoryProvider::new().on_chain("0x38");
    let reconciler = NetworkReconciler::new();
    assert!(reconciler.ensure(&provider, &target()).await);

    reconciler.forget();
    provider.clear_calls();
    assert!(reconciler.ensure(&provider, &target()).await);
    assert_eq!(provider.methods(), vec![eth::CHAIN_ID]);
}
