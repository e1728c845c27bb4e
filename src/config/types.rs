use chrono::NaiveTime;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Snapshot-Courier
///
/// Built once at startup and shared read-only between the fetcher, the
/// persister, the notifier and the scheduler.
#[derive(Debug, Clone)]
pub struct Config {
    pub fetch: FetchConfig,
    pub schedule: ScheduleConfig,
    pub mail: MailConfig,
    pub output: OutputConfig,
}

/// Target resource and retry budget
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// URL fetched with a plain GET on every attempt
    pub target_url: String,

    /// Additional attempts allowed after the first one fails
    pub max_retries: u32,

    /// Fixed wait between two attempts
    pub retry_delay: Duration,

    /// Per-attempt request timeout
    pub request_timeout: Duration,
}

/// Daily trigger configuration
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Local wall-clock time at which a cycle starts every day
    pub trigger_time: NaiveTime,
}

/// Mail account, relay and distribution list
#[derive(Clone)]
pub struct MailConfig {
    /// Whether a successful artifact is mailed at all
    pub enabled: bool,

    /// Sending account; also the visible From and To
    pub user: String,

    /// SMTP credential for `user`
    pub password: String,

    /// Bcc recipients, in configured order
    pub recipients: Vec<String>,

    /// Prefix of the subject line
    pub subject_prefix: String,

    pub smtp_host: String,
    pub smtp_port: u16,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("enabled", &self.enabled)
            .field("user", &self.user)
            .field("password", &"********")
            .field("recipients", &self.recipients)
            .field("subject_prefix", &self.subject_prefix)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Directory artifacts are written to
    pub directory: PathBuf,
}
