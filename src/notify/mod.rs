//! Notification module for mailing artifacts
//!
//! A notification is best effort: whatever goes wrong here is reported as a
//! `NotifyError` and never undoes the artifact that was already persisted.

mod mailer;

pub use mailer::{build_message, SmtpNotifier};

use crate::config::MailConfig;
use crate::persist::Artifact;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Number of Bcc recipients a message was submitted for
pub type SentCount = usize;

/// Subject timestamp layout
pub const SUBJECT_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Errors that can occur while sending a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid mail address '{address}': {source}")]
    Address {
        address: String,
        source: lettre::address::AddressError,
    },

    #[error("Failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid content type: {0}")]
    ContentType(String),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// One send attempt for one artifact
#[derive(Debug, Clone)]
pub struct NotificationJob<'a> {
    pub artifact: &'a Artifact,
    /// Sending account, shown as both From and To
    pub sender: &'a str,
    /// Delivered as Bcc only
    pub recipients: &'a [String],
    pub subject: String,
    pub body: String,
}

impl<'a> NotificationJob<'a> {
    pub fn new(artifact: &'a Artifact, mail: &'a MailConfig) -> Self {
        let subject = format!(
            "{} - {}",
            mail.subject_prefix,
            artifact.captured_at.format(SUBJECT_TIME_FORMAT)
        );
        let body = format!("JSON file attached: {}", artifact.file_name);

        Self {
            artifact,
            sender: &mail.user,
            recipients: &mail.recipients,
            subject,
            body,
        }
    }
}

/// Delivers a rendered job to its recipients
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, job: &NotificationJob<'_>) -> Result<SentCount, NotifyError>;
}
