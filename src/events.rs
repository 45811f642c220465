//! EventSubscriber - provider notifications onto the command queue
//!
//! Provider callbacks never touch the session. They become [`Command`]s on the
//! same ordered queue as user actions, so an event that fires while a request
//! is in flight waits its turn.

use crate::controller::Command;
use crate::provider::{Provider, ProviderEvent};
use futures::channel::mpsc::UnboundedSender;

impl From<ProviderEvent> for Command {
    fn from(event: ProviderEvent) -> Self {
        match event {
            ProviderEvent::ChainChanged(chain_id) => Command::ChainChanged(chain_id),
            ProviderEvent::AccountsChanged(accounts) => Command::AccountsChanged(accounts),
        }
    }
}

pub struct EventSubscriber;

impl EventSubscriber {
    /// Forward every provider event to `commands` for the provider's lifetime.
    pub fn attach<P: Provider + ?Sized>(provider: &P, commands: UnboundedSender<Command>) {
        provider.subscribe(Box::new(move |event| {
            tracing::debug!(?event, "provider event");
            if commands.unbounded_send(event.into()).is_err() {
                tracing::debug!("controller stopped, provider event dropped");
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;
    use futures::channel::mpsc;
    use futures::StreamExt;

    #[tokio::test]
    async fn events_become_commands_in_order() {
        let provider = MemoryProvider::new();
        let (tx, mut rx) = mpsc::unbounded();
        EventSubscriber::attach(&provider, tx);

        provider.user_switches_chain("0x61");
        provider.user_switches_accounts(vec![]);

        assert_eq!(rx.next().await, Some(Command::ChainChanged("0x61".into())));
        assert_eq!(rx.next().await, Some(Command::AccountsChanged(vec![])));
    }
}
