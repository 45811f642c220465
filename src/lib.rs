//! Assetwatch: wallet session controller. Connect, pin the chain, register the token.
//!
//! # Architecture
//!
//! ```text
//! ProviderBridge (detect injected wallet)
//!   │
//!   └── ConnectionController (single writer of Session)
//!         │   ordered command queue ◄── EventSubscriber (chainChanged, accountsChanged)
//!         │
//!         ├── RetryCoordinator (3 attempts, 2s apart, cancel and replace)
//!         ├── NetworkReconciler (switch, or add then switch, then verify)
//!         ├── TokenRegistrar (wallet_watchAsset, degraded fallback)
//!         └── StatusBoard ──► presentation layer
//!
//! ErrorClassifier: every provider failure → ErrorKind + user message
//! ```
//!
//! # Features
//!
//! - `native` - tokio timer, terminal logging, `assetwatch` CLI and simulator
//! - `wasm` - browser bindings over `window.ethereum`
//!
//! # Usage
//!
//! ```ignore
//! use assetwatch::{ConnectionController, MemoryProvider, SessionConfig, StaticBridge, TokioTimer};
//!
//! let bridge = StaticBridge::present(MemoryProvider::new());
//! let (controller, handle) = ConnectionController::new(&bridge, SessionConfig::new(), Rc::new(TokioTimer))?;
//! handle.connect()?;
//! handle.add_token()?;
//! handle.shutdown();
//! controller.run().await;
//!
//! println!("{}", handle.snapshot().status.message());
//! ```

// =============================================================================
// Shared modules (compile everywhere)
// =============================================================================
pub mod classify;
pub mod controller;
pub mod core;
pub mod events;
pub mod network;
pub mod provider;
pub mod retry;
pub mod runtime;
pub mod token;

// =============================================================================
// Native-only modules
// =============================================================================
#[cfg(feature = "native")]
pub mod logging;

// =============================================================================
// WASM-only modules (browser, wasm-bindgen)
// =============================================================================
#[cfg(feature = "wasm")]
pub mod wasm;

// =============================================================================
// Re-exports: Shared
// =============================================================================
pub use classify::{classify, kind_of, ErrorKind, ErrorRecord};
pub use controller::{
    Command, ConnectionController, ConnectionState, ControllerError, ControllerHandle, Session, SessionConfig,
    Snapshot, Status, StatusBoard,
};
pub use crate::core::{canonical_chain_id, ChainDescriptor, ConfigError, NativeCurrency, TokenDescriptor};
pub use events::EventSubscriber;
pub use network::NetworkReconciler;
pub use provider::{MemoryProvider, Provider, ProviderBridge, ProviderError, ProviderEvent, StaticBridge};
pub use retry::{RetryCoordinator, RetryOutcome, RetryPolicy, RetryState};
pub use runtime::{ImmediateTimer, Timer};
pub use token::{RegistrationResult, TokenRegistrar, WatchAsset};

// =============================================================================
// Re-exports: Native
// =============================================================================
#[cfg(feature = "native")]
pub use logging::{init_logging, LogFormat};
#[cfg(feature = "native")]
pub use runtime::TokioTimer;

// =============================================================================
// Re-exports: WASM
// =============================================================================
#[cfg(feature = "wasm")]
pub use wasm::{BrowserTimer, InjectedBridge, InjectedProvider, WalletSession};
