//! One fetch → persist → notify cycle

use crate::config::Config;
use crate::fetcher::{fetch_with_retry, FetchError, HttpSource, JsonSource, RetryPolicy};
use crate::notify::{NotificationJob, Notifier, SentCount, SmtpNotifier};
use crate::persist::{Artifact, ArtifactStore, PersistError};
use crate::scheduler::trigger::{Clock, SystemClock};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What happened to the notification step of a persisted cycle
#[derive(Debug)]
pub enum NotificationOutcome {
    /// Email is switched off; nothing was attempted
    Disabled,
    /// Submitted for this many Bcc recipients
    Sent(SentCount),
    /// Sending failed; the artifact stays on disk
    Failed(crate::notify::NotifyError),
}

/// Final state of one cycle
#[derive(Debug)]
pub enum CycleReport {
    /// No payload; nothing was written
    FetchFailed(FetchError),

    /// A payload arrived but could not be written; notification skipped
    PersistFailed {
        attempts: u32,
        error: PersistError,
    },

    /// The artifact is on disk, whatever the notification outcome
    Persisted {
        attempts: u32,
        artifact: Artifact,
        notification: NotificationOutcome,
    },
}

impl CycleReport {
    pub fn is_persisted(&self) -> bool {
        matches!(self, CycleReport::Persisted { .. })
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            CycleReport::Persisted { artifact, .. } => Some(artifact),
            _ => None,
        }
    }

    /// Logs the outcome at the stage that ended the cycle
    pub fn log(&self) {
        match self {
            CycleReport::FetchFailed(FetchError::Cancelled { attempts }) => {
                tracing::warn!("Cycle cancelled during fetch after {} attempts", attempts);
            }
            CycleReport::FetchFailed(e) => {
                tracing::error!("Cycle aborted at fetch stage: {}", e);
            }
            CycleReport::PersistFailed { attempts, error } => {
                tracing::error!(
                    "Cycle aborted at persist stage after {} attempts: {}",
                    attempts,
                    error
                );
            }
            CycleReport::Persisted {
                attempts,
                artifact,
                notification,
            } => match notification {
                NotificationOutcome::Disabled => tracing::info!(
                    "Cycle complete: {} saved after {} attempts (email disabled)",
                    artifact.file_name,
                    attempts
                ),
                NotificationOutcome::Sent(count) => tracing::info!(
                    "Cycle complete: {} saved after {} attempts and mailed to {} recipients",
                    artifact.file_name,
                    attempts,
                    count
                ),
                NotificationOutcome::Failed(e) => tracing::error!(
                    "Cycle complete: {} saved after {} attempts, notify stage failed: {}",
                    artifact.file_name,
                    attempts,
                    e
                ),
            },
        }
    }
}

/// Everything one cycle needs, wired once at startup
pub struct Pipeline {
    config: Arc<Config>,
    source: Box<dyn JsonSource>,
    store: ArtifactStore,
    notifier: Option<Box<dyn Notifier>>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(
        config: Arc<Config>,
        source: Box<dyn JsonSource>,
        store: ArtifactStore,
        notifier: Option<Box<dyn Notifier>>,
    ) -> Self {
        Self {
            config,
            source,
            store,
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    /// Production wiring: reqwest source, store in the output directory, and
    /// an SMTP notifier only when email is enabled.
    pub fn from_config(config: Arc<Config>) -> crate::Result<Self> {
        let source = HttpSource::from_config(&config.fetch)?;
        let store = ArtifactStore::new(&config.output.directory);
        let notifier: Option<Box<dyn Notifier>> = if config.mail.enabled {
            Some(Box::new(SmtpNotifier::from_config(&config.mail)?))
        } else {
            None
        };

        Ok(Self::new(config, Box::new(source), store, notifier))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Runs fetch, persist and notify in order; never returns an error
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        tracing::info!("Starting data collection from {}", self.source.location());

        let policy = RetryPolicy::from(&self.config.fetch);
        let fetched = match fetch_with_retry(self.source.as_ref(), &policy, cancel).await {
            Ok(fetched) => fetched,
            Err(e) => return CycleReport::FetchFailed(e),
        };

        let captured_at = self.clock.now();
        let artifact = match self.store.save(&fetched.payload, captured_at).await {
            Ok(artifact) => artifact,
            Err(error) => {
                return CycleReport::PersistFailed {
                    attempts: fetched.attempts,
                    error,
                }
            }
        };

        let notification = self.notify(&artifact).await;

        CycleReport::Persisted {
            attempts: fetched.attempts,
            artifact,
            notification,
        }
    }

    async fn notify(&self, artifact: &Artifact) -> NotificationOutcome {
        let notifier = match (&self.notifier, self.config.mail.enabled) {
            (Some(notifier), true) => notifier,
            _ => {
                tracing::info!("Email sending disabled");
                return NotificationOutcome::Disabled;
            }
        };

        let job = NotificationJob::new(artifact, &self.config.mail);
        match notifier.notify(&job).await {
            Ok(count) => NotificationOutcome::Sent(count),
            Err(e) => NotificationOutcome::Failed(e),
        }
    }
}
