use std::fmt;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use rollcall_model::AccountEvent;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EventPublishError {
    #[error("failed to encode event: {0}")]
    Encode(String),
    #[error("failed to publish event: {0}")]
    Transport(String),
}

/// Fan-out of account mutations to interested subscribers.
#[async_trait]
pub trait AccountEventPublisher: Send + Sync {
    async fn publish(
        &self,
        event: &AccountEvent,
    ) -> Result<(), EventPublishError>;
}

/// Publisher that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventPublisher;

#[async_trait]
impl AccountEventPublisher for NullEventPublisher {
    async fn publish(
        &self,
        _event: &AccountEvent,
    ) -> Result<(), EventPublishError> {
        Ok(())
    }
}

/// In-process broadcast of account events.
#[derive(Debug)]
pub struct AccountEventBus {
    tx: broadcast::Sender<AccountEvent>,
}

impl AccountEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AccountEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl AccountEventPublisher for AccountEventBus {
    async fn publish(
        &self,
        event: &AccountEvent,
    ) -> Result<(), EventPublishError> {
        // No subscribers is not an error.
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

/// Publishes events as JSON on the Redis channel named by
/// [`AccountEvent::topic`].
#[derive(Clone)]
pub struct RedisEventPublisher {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisEventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisEventPublisher")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisEventPublisher {
    pub async fn connect(redis_url: &str) -> Result<Self, EventPublishError> {
        info!("Connecting to Redis for account events at {}", redis_url);

        let client = redis::Client::open(redis_url).map_err(|e| {
            EventPublishError::Transport(format!(
                "Failed to create Redis client: {e}"
            ))
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            EventPublishError::Transport(format!(
                "Failed to connect to Redis: {e}"
            ))
        })?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl AccountEventPublisher for RedisEventPublisher {
    async fn publish(
        &self,
        event: &AccountEvent,
    ) -> Result<(), EventPublishError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| EventPublishError::Encode(e.to_string()))?;

        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(event.topic(), payload)
            .await
            .map_err(|e| EventPublishError::Transport(e.to_string()))?;

        debug!("Published {} to {} subscriber(s)", event.topic(), receivers);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rollcall_model::{AccountId, AccountEventKind, NewAccount};

    use super::*;

    fn event() -> AccountEvent {
        let account = NewAccount {
            name: "Alex".into(),
            email: "a@x.com".into(),
            ..Default::default()
        }
        .into_account(AccountId::generate(), Utc::now());
        AccountEvent::created(account.details())
    }

    #[tokio::test]
    async fn bus_delivers_to_subscribers() {
        let bus = AccountEventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(&event()).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, AccountEventKind::Created);
        assert_eq!(received.topic(), "account_service.created");
    }

    #[tokio::test]
    async fn bus_without_subscribers_is_fine() {
        let bus = AccountEventBus::new(1);
        assert_eq!(bus.receiver_count(), 0);
        assert!(bus.publish(&event()).await.is_ok());
    }

    #[test]
    fn payload_excludes_secrets() {
        let json = serde_json::to_string(&event()).unwrap();
        assert!(json.contains("\"kind\":\"created\""));
        assert!(!json.contains("hashed_password"));
    }
}
