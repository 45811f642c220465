//! Shared, platform-independent building blocks

pub mod chain;
pub mod methods;
pub mod units;

pub use chain::{canonical_chain_id, ChainDescriptor, ConfigError, NativeCurrency, TokenDescriptor};
