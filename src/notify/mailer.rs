use crate::config::MailConfig;
use crate::notify::{NotificationJob, Notifier, NotifyError, SentCount};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

/// SMTP submission through an authenticated STARTTLS relay
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(transport: AsyncSmtpTransport<Tokio1Executor>) -> Self {
        Self { transport }
    }

    /// Connects to `smtp_host:smtp_port`, upgrades with STARTTLS, then logs in
    pub fn from_config(mail: &MailConfig) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&mail.smtp_host)?
            .port(mail.smtp_port)
            .credentials(Credentials::new(mail.user.clone(), mail.password.clone()))
            .timeout(Some(Duration::from_secs(60)))
            .build();

        Ok(Self::new(transport))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, job: &NotificationJob<'_>) -> Result<SentCount, NotifyError> {
        let attachment =
            job.artifact
                .read_bytes()
                .await
                .map_err(|source| NotifyError::Attachment {
                    path: job.artifact.path.clone(),
                    source,
                })?;

        let message = build_message(job, attachment)?;
        self.transport.send(message).await?;

        tracing::info!("Email sent to {} recipients", job.recipients.len());
        Ok(job.recipients.len())
    }
}

/// Builds the MIME message for `job`
///
/// The sender is the only visible address. Recipients go into Bcc, which
/// lettre moves into the envelope and strips from the transmitted headers.
pub fn build_message(
    job: &NotificationJob<'_>,
    attachment: Vec<u8>,
) -> Result<Message, NotifyError> {
    let sender = parse_mailbox(job.sender)?;

    let mut builder = Message::builder()
        .from(sender.clone())
        .to(sender)
        .subject(job.subject.as_str());

    for recipient in job.recipients {
        builder = builder.bcc(parse_mailbox(recipient)?);
    }

    let content_type = ContentType::parse("application/json")
        .map_err(|e| NotifyError::ContentType(e.to_string()))?;

    let message = builder.multipart(
        MultiPart::mixed()
            .singlepart(SinglePart::plain(job.body.clone()))
            .singlepart(
                Attachment::new(job.artifact.file_name.clone()).body(attachment, content_type),
            ),
    )?;

    Ok(message)
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}
