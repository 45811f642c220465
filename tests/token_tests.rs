//! Token registration: full request, degraded fallback, outcomes

use assetwatch::core::methods::wallet;
use assetwatch::{ErrorKind, MemoryProvider, ProviderError, RegistrationResult, TokenDescriptor, TokenRegistrar};
use pretty_assertions::assert_eq;
use serde_json::json;

const ORIGIN: &str = "https://app.example";

fn registrar() -> TokenRegistrar { TokenRegistrar::new(Some(ORIGIN.into())) }

fn token() -> TokenDescriptor { TokenDescriptor::usdt() }

/// Test: truthy answer to the full request
#[tokio::test]
async fn full_request_added() {
    let provider = MemoryProvider::new().on_chain("0x38");

    assert_eq!(registrar().register(&provider, &token()).await, RegistrationResult::Added);

    let watched = provider.watched_assets();
    assert_eq!(watched.len(), 1);
    assert_eq!(
        watched[0],
        json!({
            "type": "ERC20",
            "options": {
                "address": "0x55d398326f99059fF775485246999027B3197955",
                "symbol": "USDT",
                "decimals": 18,
                "name": "Tether USD",
                "image": "https://app.example/usdt.png",
            }
        })
    );
}

/// Test: falsy answer means the user declined, no fallback
#[tokio::test]
async fn falsy_answer_is_rejected() {
    let provider = MemoryProvider::new().with_watch_asset_result(json!(false));

    assert_eq!(registrar().register(&provider, &token()).await, RegistrationResult::Rejected);
    assert_eq!(provider.calls_to(wallet::WATCH_ASSET).len(), 1);
}

/// Test: user cancel on the full request, no fallback
#[tokio::test]
async fn user_cancel_is_rejected_without_fallback() {
    let provider = MemoryProvider::new();
    provider.fail_next(wallet::WATCH_ASSET, ProviderError::user_rejected());

    assert_eq!(registrar().register(&provider, &token()).await, RegistrationResult::Rejected);
    assert_eq!(provider.calls_to(wallet::WATCH_ASSET).len(), 1);
}

/// Test: generic failure → exactly one fallback without the image
#[tokio::test]
async fn generic_failure_falls_back_once() {
    let provider = MemoryProvider::new();
    provider.fail_next(wallet::WATCH_ASSET, ProviderError::Message("Invalid image".into()));

    assert_eq!(registrar().register(&provider, &token()).await, RegistrationResult::Added);

    let calls = provider.calls_to(wallet::WATCH_ASSET);
    assert_eq!(calls.len(), 2);
    assert!(calls[0].params["options"].get("image").is_some());
    assert!(calls[1].params["options"].get("image").is_none());
    assert_eq!(calls[1].params["options"]["symbol"], "USDT");
}

/// Test: generic failure, then method unsupported → Unsupported
#[tokio::test]
async fn fallback_unsupported() {
    let provider = MemoryProvider::new();
    provider.fail_next(wallet::WATCH_ASSET, ProviderError::Message("something broke".into()));
    provider.fail_next(wallet::WATCH_ASSET, ProviderError::method_not_found(wallet::WATCH_ASSET));

    match registrar().register(&provider, &token()).await {
        RegistrationResult::Unsupported(record) => {
            assert_eq!(record.kind, ErrorKind::MethodUnsupported);
            assert_eq!(record.context, "watch-asset");
        }
        other => panic!("expected Unsupported, got {:?}", other),
    }
    assert_eq!(provider.calls_to(wallet::WATCH_ASSET).len(), 2);
}

/// Test: unsupported on the first request still gets its fallback
#[tokio::test]
async fn unsupported_first_request_still_falls_back() {
    let provider = MemoryProvider::new();
    provider.fail_next(wallet::WATCH_ASSET, ProviderError::method_not_found(wallet::WATCH_ASSET));

    assert!(registrar().register(&provider, &token()).await.is_added());
    assert_eq!(provider.calls_to(wallet::WATCH_ASSET).len(), 2);
}

/// Test: two generic failures → Failed with the second error
#[tokio::test]
async fn two_failures_fail() {
    let provider = MemoryProvider::new();
    provider.fail_next(wallet::WATCH_ASSET, ProviderError::Message("first".into()));
    provider.fail_next(wallet::WATCH_ASSET, ProviderError::Message("request timeout".into()));

    match registrar().register(&provider, &token()).await {
        RegistrationResult::Failed(record) => assert_eq!(record.kind, ErrorKind::Timeout),
        other => panic!("expected Failed, got {:?}", other),
    }
}

/// Test: no origin, relative image is left out of both requests
#[tokio::test]
async fn no_origin_no_image() {
    let provider = MemoryProvider::new();
    let registrar = TokenRegistrar::new(None);

    assert!(registrar.register(&provider, &token()).await.is_added());
    assert!(provider.watched_assets()[0]["options"].get("image").is_none());
}
