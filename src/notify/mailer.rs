use async_trait::async_trait;
use tracing::info;

use super::RegistrationMessage;

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()>;
}

/// Writes emails to the log instead of an SMTP relay.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, body = %email.body, "email sent");
        Ok(())
    }
}

pub fn render_welcome(msg: &RegistrationMessage) -> OutgoingEmail {
    OutgoingEmail {
        to: msg.email.clone(),
        subject: "Welcome to Food Diary".to_string(),
        body: format!(
            "Hi {},\n\nyour account is ready. Log your meals, track your weight \
             and check your daily recommendation in the app.\n\nFood Diary",
            msg.login
        ),
    }
}
