//! StatusBoard - the read side for the presentation layer
//!
//! The controller publishes a [`Snapshot`] after every transition. Consumers
//! either poll [`StatusBoard::current`] or hold a receiver from
//! [`StatusBoard::subscribe`].

use super::session::{ConnectionState, Session};
use crate::classify::ErrorRecord;
use crate::retry::{exhausted_message, RetryState};
use futures::channel::mpsc;
use serde::Serialize;
use std::cell::RefCell;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Status {
    WalletNotDetected,
    Idle,
    Connecting,
    Connected { address: String },
    SwitchingNetwork,
    NetworkReady,
    WrongNetwork { error: ErrorRecord },
    AddingToken,
    TokenAdded,
    TokenRejected,
    TokenUnsupported { error: ErrorRecord },
    Retrying { retry: RetryState },
    FailedAfter { attempts: u32, error: ErrorRecord },
    NotConnected,
    Error { error: ErrorRecord },
}

impl Status {
    /// One line for the user.
    pub fn message(&self) -> String {
        match self {
            Status::WalletNotDetected => "wallet not detected".into(),
            Status::Idle => "idle".into(),
            Status::Connecting => "connecting".into(),
            Status::Connected { address } => format!("connected {}", address),
            Status::SwitchingNetwork => "switching network".into(),
            Status::NetworkReady => "network ready".into(),
            Status::WrongNetwork { error } => format!("wrong network: {}", error.user_message),
            Status::AddingToken => "adding token".into(),
            Status::TokenAdded => "token added".into(),
            Status::TokenRejected => "token rejected".into(),
            Status::TokenUnsupported { error } => format!("token unsupported: {}", error.user_message),
            Status::Retrying { retry } => format!("retrying ({}/{})", retry.attempt, retry.max),
            Status::FailedAfter { attempts, .. } => exhausted_message(*attempts),
            Status::NotConnected => "not connected".into(),
            Status::Error { error } => error.user_message.clone(),
        }
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            Status::WrongNetwork { error }
            | Status::TokenUnsupported { error }
            | Status::FailedAfter { error, .. }
            | Status::Error { error } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub state: ConnectionState,
    pub session: Session,
    pub status: Status,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self { state: ConnectionState::Disconnected, session: Session::default(), status: Status::Idle }
    }
}

#[derive(Default)]
pub struct StatusBoard {
    current: RefCell<Snapshot>,
    watchers: RefCell<Vec<mpsc::UnboundedSender<Snapshot>>>,
}

impl StatusBoard {
    pub fn new() -> Self { Self::default() }

    pub fn current(&self) -> Snapshot { self.current.borrow().clone() }

    pub fn publish(&self, snapshot: Snapshot) {
        tracing::debug!(state = snapshot.state.as_str(), status = %snapshot.status.message(), "status");
        *self.current.borrow_mut() = snapshot.clone();
        self.watchers.borrow_mut().retain(|tx| tx.unbounded_send(snapshot.clone()).is_ok());
    }

    /// Republish the last snapshot with a new status.
    pub fn update_status(&self, status: Status) {
        let mut snapshot = self.current();
        snapshot.status = status;
        self.publish(snapshot);
    }

    /// Receives every snapshot published from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Snapshot> {
        let (tx, rx) = mpsc::unbounded();
        self.watchers.borrow_mut().push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorKind;
    use futures::StreamExt;

    #[test]
    fn messages() {
        assert_eq!(Status::WalletNotDetected.message(), "wallet not detected");
        assert_eq!(Status::Retrying { retry: RetryState { attempt: 2, max: 3 } }.message(), "retrying (2/3)");
        let error = ErrorRecord::new(ErrorKind::Timeout, "timeout", "connect");
        assert_eq!(Status::FailedAfter { attempts: 3, error }.message(), "failed after 3 attempts");
    }

    #[test]
    fn status_serializes_tagged() {
        let value = serde_json::to_value(Status::Connected { address: "0xabc".into() }).unwrap();
        assert_eq!(value, serde_json::json!({"status": "connected", "address": "0xabc"}));
        let value = serde_json::to_value(Status::WalletNotDetected).unwrap();
        assert_eq!(value["status"], "wallet-not-detected");
    }

    #[tokio::test]
    async fn subscribers_get_updates_and_closed_ones_are_dropped() {
        let board = StatusBoard::new();
        let mut rx = board.subscribe();
        drop(board.subscribe());

        board.update_status(Status::Connecting);
        assert_eq!(board.watchers.borrow().len(), 1);
        assert_eq!(rx.next().await.map(|s| s.status), Some(Status::Connecting));
        assert_eq!(board.current().status, Status::Connecting);
    }
}
