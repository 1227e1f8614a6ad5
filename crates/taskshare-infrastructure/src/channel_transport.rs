//! In-process push transport.
//!
//! Fans raw messages out to every connected receiver. Used by hosts that own
//! the actual socket (a desktop shell, a test harness) and forward its
//! frames into the client.

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use std::sync::{Arc, Mutex};
use taskshare_core::error::{Result, TaskShareError};
use taskshare_core::{AuthToken, ChangeEvent, PushStream, PushTransport};

type Subscriber = mpsc::UnboundedSender<Result<String>>;

#[derive(Clone, Default)]
pub struct ChannelPushTransport {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl ChannelPushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a raw message to every open connection. Returns how many
    /// connections received it.
    pub fn publish(&self, raw: impl Into<String>) -> usize {
        let raw = raw.into();
        self.broadcast(|| Ok(raw.clone()))
    }

    /// Encodes and delivers a change event.
    pub fn publish_event(&self, event: &ChangeEvent) -> Result<usize> {
        Ok(self.publish(event.to_json()?))
    }

    /// Reports a transport failure to every open connection.
    pub fn fail(&self, message: &str) -> usize {
        self.broadcast(|| Err(TaskShareError::transport(message)))
    }

    /// Number of connections whose receiver is still alive.
    pub fn connection_count(&self) -> usize {
        match self.subscribers.lock() {
            Ok(mut subscribers) => {
                subscribers.retain(|s| !s.is_closed());
                subscribers.len()
            }
            Err(_) => 0,
        }
    }

    fn broadcast(&self, item: impl Fn() -> Result<String>) -> usize {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return 0;
        };
        subscribers.retain(|s| s.unbounded_send(item()).is_ok());
        subscribers.len()
    }
}

#[async_trait]
impl PushTransport for ChannelPushTransport {
    async fn connect(&self, token: &AuthToken) -> Result<PushStream> {
        if token.is_empty() {
            return Err(TaskShareError::transport("empty push token"));
        }
        let (tx, rx) = mpsc::unbounded();
        self.subscribers
            .lock()
            .map_err(|_| TaskShareError::transport("push transport poisoned"))?
            .push(tx);
        tracing::debug!("[ChannelPushTransport] Connection opened");
        Ok(rx.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_connection() {
        let transport = ChannelPushTransport::new();
        let mut a = transport.connect(&AuthToken::new("t")).await.unwrap();
        let mut b = transport.connect(&AuthToken::new("t")).await.unwrap();

        assert_eq!(transport.publish("7"), 2);
        assert_eq!(a.next().await.unwrap().unwrap(), "7");
        assert_eq!(b.next().await.unwrap().unwrap(), "7");
    }

    #[tokio::test]
    async fn test_dropped_connections_are_pruned() {
        let transport = ChannelPushTransport::new();
        let stream = transport.connect(&AuthToken::new("t")).await.unwrap();
        let _kept = transport.connect(&AuthToken::new("t")).await.unwrap();
        drop(stream);

        assert_eq!(transport.connection_count(), 1);
        assert_eq!(transport.publish_event(&ChangeEvent::Remove { id: 1 }).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fail_delivers_transport_error() {
        let transport = ChannelPushTransport::new();
        let mut stream = transport.connect(&AuthToken::new("t")).await.unwrap();

        transport.fail("socket closed");
        assert!(stream.next().await.unwrap().unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_empty_token_rejected() {
        let transport = ChannelPushTransport::new();
        assert!(transport.connect(&AuthToken::new("")).await.is_err());
    }
}
