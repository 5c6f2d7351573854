//! Registration notifications: the service publishes onto a Redis list and a
//! background consumer turns each message into a welcome email.

pub mod consumer;
pub mod mailer;
pub mod queue;

use serde::{Deserialize, Serialize};

pub use mailer::{LogMailer, Mailer};
pub use queue::{MessagePublisher, RedisQueue};

pub const REGISTRATION_QUEUE: &str = "registration_queue";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationMessage {
    pub email: String,
    pub login: String,
}
