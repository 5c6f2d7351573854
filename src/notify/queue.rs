use anyhow::Context;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{info, warn};

use super::{RegistrationMessage, REGISTRATION_QUEUE};

#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, queue: &str, payload: String) -> anyhow::Result<()>;
}

/// LPUSH onto a Redis list; consumers BRPOP from the other end.
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
}

impl RedisQueue {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl MessagePublisher for RedisQueue {
    async fn publish(&self, queue: &str, payload: String) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(queue, payload).await.context("redis LPUSH")?;
        Ok(())
    }
}

/// Fire-and-forget: a lost welcome email never undoes a registration.
pub async fn publish_registration(publisher: &dyn MessagePublisher, msg: &RegistrationMessage) {
    let payload = match serde_json::to_string(msg) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "registration message serialization failed");
            return;
        }
    };
    match publisher.publish(REGISTRATION_QUEUE, payload).await {
        Ok(()) => info!(login = %msg.login, "registration message queued"),
        Err(e) => warn!(error = %e, login = %msg.login, "registration message not queued"),
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records published messages; optionally fails every publish.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    impl RecordingPublisher {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl MessagePublisher for RecordingPublisher {
        async fn publish(&self, queue: &str, payload: String) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("queue unavailable");
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((queue.to_string(), payload));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingPublisher;
    use super::*;

    #[tokio::test]
    async fn publishes_email_and_login_as_json() {
        let publisher = RecordingPublisher::default();
        let msg = RegistrationMessage {
            email: "bob@example.com".into(),
            login: "bob".into(),
        };
        publish_registration(&publisher, &msg).await;

        let sent = publisher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "registration_queue");
        let back: RegistrationMessage = serde_json::from_str(&sent[0].1).unwrap();
        assert_eq!(back, msg);
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed() {
        let publisher = RecordingPublisher::failing();
        let msg = RegistrationMessage {
            email: "bob@example.com".into(),
            login: "bob".into(),
        };
        publish_registration(&publisher, &msg).await;
        assert!(publisher.sent().is_empty());
    }
}
