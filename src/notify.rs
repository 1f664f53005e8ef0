//! Notification delivery boundary.
//!
//! The loop hands terminal messages to a [`Notifier`] and moves on;
//! delivery failure is logged, never fed back into the loop's state.
//! Quick replies to a delivered notification come back through
//! [`crate::runtime::IngestMessage::QuickReply`].

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Capability interface for delivering a terminal message to the user.
#[async_trait]
pub trait Notifier: Send {
    async fn deliver(&self, text: &str) -> Result<(), NotifyError>;
}

/// Notifier that writes the message to the log, for CLI use.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(message = text, "agent reply");
        println!("\n🤖 {text}\n");
        Ok(())
    }
}
