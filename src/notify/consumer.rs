use std::{sync::Arc, time::Duration};

use anyhow::Context;
use redis::{aio::MultiplexedConnection, Client};
use tracing::{error, info, warn};

use super::{mailer::render_welcome, Mailer, RegistrationMessage, REGISTRATION_QUEUE};

const POP_TIMEOUT_SECS: f64 = 5.0;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Background task: pops registration messages and sends welcome emails.
///
/// Uses its own connection because BRPOP blocks it for up to
/// `POP_TIMEOUT_SECS`. Connection errors back off and reconnect.
pub async fn run_welcome_consumer(redis_url: String, mailer: Arc<dyn Mailer>) {
    info!(queue = REGISTRATION_QUEUE, "welcome consumer started");
    loop {
        let mut conn = match connect(&redis_url).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "welcome consumer cannot reach redis");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        loop {
            let popped: Option<(String, String)> = match redis::cmd("BRPOP")
                .arg(REGISTRATION_QUEUE)
                .arg(POP_TIMEOUT_SECS)
                .query_async(&mut conn)
                .await
            {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "BRPOP failed, reconnecting");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    break;
                }
            };

            if let Some((_, payload)) = popped {
                handle_message(mailer.as_ref(), &payload).await;
            }
        }
    }
}

async fn connect(redis_url: &str) -> anyhow::Result<MultiplexedConnection> {
    let client = Client::open(redis_url).context("parse redis url")?;
    client
        .get_multiplexed_async_connection()
        .await
        .context("connect to redis")
}

async fn handle_message(mailer: &dyn Mailer, payload: &str) {
    let msg: RegistrationMessage = match serde_json::from_str(payload) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, payload, "dropping malformed registration message");
            return;
        }
    };

    let email = render_welcome(&msg);
    match mailer.send(&email).await {
        Ok(()) => info!(login = %msg.login, "welcome email sent"),
        Err(e) => error!(error = %e, login = %msg.login, "welcome email failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::notify::mailer::OutgoingEmail;

    #[derive(Default)]
    struct CapturingMailer(Mutex<Vec<OutgoingEmail>>);

    #[async_trait]
    impl Mailer for CapturingMailer {
        async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn valid_message_is_mailed() {
        let mailer = CapturingMailer::default();
        handle_message(&mailer, r#"{"email":"ann@example.com","login":"ann"}"#).await;
        let sent = mailer.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ann@example.com");
    }

    #[tokio::test]
    async fn malformed_message_is_dropped() {
        let mailer = CapturingMailer::default();
        handle_message(&mailer, "not json").await;
        handle_message(&mailer, r#"{"email":"ann@example.com"}"#).await;
        assert!(mailer.0.lock().unwrap().is_empty());
    }
}
