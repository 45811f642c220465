//! Session configuration - built in code by the embedding layer

use crate::core::chain::{ChainDescriptor, ConfigError, TokenDescriptor};
use crate::retry::RetryPolicy;

/// Everything the controller needs to know up front. Defaults to BNB Smart
/// Chain and USDT with three attempts two seconds apart.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub target: ChainDescriptor,
    pub token: TokenDescriptor,
    /// Page origin, used to resolve a relative token image
    pub origin: Option<String>,
    pub retry: RetryPolicy,
}

impl SessionConfig {
    pub fn new() -> Self { Self::default() }
    pub fn with_target(mut self, target: ChainDescriptor) -> Self { self.target = target; self }
    pub fn with_token(mut self, token: TokenDescriptor) -> Self { self.token = token; self }
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self { self.origin = Some(origin.into()); self }
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self { self.retry = retry; self }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        self.token.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_are_bsc_and_usdt() {
        let config = SessionConfig::new();
        assert_eq!(config.target.chain_id, "0x38");
        assert_eq!(config.token.symbol, "USDT");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay, Duration::from_millis(2000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_token_is_reported() {
        let token = TokenDescriptor { address: "0x1234".into(), ..TokenDescriptor::usdt() };
        let config = SessionConfig::new().with_token(token).with_origin("https://app.example");
        assert_eq!(config.validate(), Err(ConfigError::InvalidTokenAddress("0x1234".into())));
    }
}
