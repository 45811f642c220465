//! RPC method, event and error-code constants for the injected provider
//!
//! Centralized registry so no component spells a method name twice.

/// Read-only RPC methods
pub mod eth {
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const GET_BALANCE: &str = "eth_getBalance";

    pub const LATEST: &str = "latest";
}

/// Administrative wallet methods (EIP-3085, EIP-3326, EIP-747)
pub mod wallet {
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
    pub const WATCH_ASSET: &str = "wallet_watchAsset";

    pub const ASSET_TYPE_ERC20: &str = "ERC20";
}

/// Provider-emitted events (EIP-1193)
pub mod events {
    pub const CHAIN_CHANGED: &str = "chainChanged";
    pub const ACCOUNTS_CHANGED: &str = "accountsChanged";
}

/// Provider error codes the classifier understands
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Operation names used as log/record context
pub mod op {
    pub const CONNECT: &str = "connect";
    pub const RESTORE: &str = "restore";
    pub const BALANCE: &str = "balance";
    pub const READ_CHAIN: &str = "read-chain";
    pub const SWITCH_CHAIN: &str = "switch-chain";
    pub const ADD_CHAIN: &str = "add-chain";
    pub const VERIFY_CHAIN: &str = "verify-chain";
    pub const WATCH_ASSET: &str = "watch-asset";
    pub const REGISTER_TOKEN: &str = "register-token";
}
