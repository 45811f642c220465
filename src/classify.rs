//! ErrorClassifier - raw provider errors -> closed taxonomy
//!
//! | Condition | Kind |
//! |-----------|------|
//! | code 4001 | `UserRejected` |
//! | code -32601 | `MethodUnsupported` |
//! | code 4902 (top level or nested) | `NetworkUnknown` |
//! | message contains "network" | `NetworkError` |
//! | message contains "timeout" | `Timeout` |
//! | anything else | `Unknown` |
//!
//! Classification is pure: it inspects and returns, nothing else. Downstream
//! code only ever matches on [`ErrorKind`].

use crate::core::methods::codes;
use crate::provider::ProviderError;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UserRejected,
    MethodUnsupported,
    NetworkUnknown,
    NetworkError,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UserRejected => "user-rejected",
            ErrorKind::MethodUnsupported => "method-unsupported",
            ErrorKind::NetworkUnknown => "network-unknown",
            ErrorKind::NetworkError => "network-error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::UserRejected => "Request cancelled in your wallet. You can try again.",
            ErrorKind::MethodUnsupported => "Your wallet does not support this feature.",
            ErrorKind::NetworkUnknown => "The network is not configured in your wallet yet. Adding it now.",
            ErrorKind::NetworkError => "Network connectivity problem. Check your connection.",
            ErrorKind::Timeout => "Your wallet took too long to respond. Please retry.",
            ErrorKind::Unknown => "Something went wrong. Please try again.",
        }
    }

    /// Whether repeating the same request could succeed without the user
    /// doing anything different.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorKind::UserRejected | ErrorKind::MethodUnsupported)
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            codes::USER_REJECTED => Some(ErrorKind::UserRejected),
            codes::METHOD_NOT_FOUND => Some(ErrorKind::MethodUnsupported),
            codes::UNRECOGNIZED_CHAIN => Some(ErrorKind::NetworkUnknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified error, ready for the status surface. Lives for one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub raw_message: String,
    pub user_message: String,
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, raw_message: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            kind,
            raw_message: raw_message.into(),
            user_message: kind.user_message().into(),
            context: context.into(),
            timestamp: Utc::now(),
        }
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.context, self.kind, self.raw_message)
    }
}

/// Map a raw error to its kind. Total: falls back to `Unknown`.
pub fn kind_of(error: &ProviderError) -> ErrorKind {
    if let Some(kind) = error.code().and_then(ErrorKind::from_code) {
        return kind;
    }
    if let Some(kind) = error.nested_code().and_then(ErrorKind::from_code) {
        return kind;
    }
    let message = error.message().to_ascii_lowercase();
    if message.contains("network") {
        ErrorKind::NetworkError
    } else if message.contains("timeout") {
        ErrorKind::Timeout
    } else {
        ErrorKind::Unknown
    }
}

/// Classify `error` raised by the operation named `context`.
pub fn classify(error: &ProviderError, context: &str) -> ErrorRecord {
    ErrorRecord::new(kind_of(error), error.to_string(), context)
}
