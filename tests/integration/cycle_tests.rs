//! Integration tests for the fetch → persist → notify cycle
//!
//! These tests use wiremock to stand in for the remote JSON resource and
//! exercise whole cycles end-to-end against a temporary output directory.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lettre::{AsyncSmtpTransport, Tokio1Executor};
use serde_json::json;
use snapshot_courier::config::{
    load_config_from, Config, FetchConfig, MailConfig, OutputConfig, ScheduleConfig,
};
use snapshot_courier::fetcher::{FetchError, HttpSource};
use snapshot_courier::notify::{NotificationJob, Notifier, NotifyError, SentCount, SmtpNotifier};
use snapshot_courier::persist::ArtifactStore;
use snapshot_courier::scheduler::{Clock, CycleReport, NotificationOutcome, Pipeline};
use snapshot_courier::ConfigError;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RETRY_DELAY: Duration = Duration::from_millis(25);

struct FixedClock(NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Remembers every job it was handed
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, Vec<String>, String)>>,
}

impl RecordingNotifier {
    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

/// Local handle so the shared recorder can be boxed as a `Notifier`
struct SharedRecorder(Arc<RecordingNotifier>);

#[async_trait]
impl Notifier for SharedRecorder {
    async fn notify(&self, job: &NotificationJob<'_>) -> Result<SentCount, NotifyError> {
        self.0.sent.lock().unwrap().push((
            job.subject.clone(),
            job.recipients.to_vec(),
            job.artifact.file_name.clone(),
        ));
        Ok(job.recipients.len())
    }
}

fn captured_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(20, 0, 0)
        .unwrap()
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(url: &str, max_retries: u32, email: bool, output: &Path) -> Arc<Config> {
    Arc::new(Config {
        fetch: FetchConfig {
            target_url: url.to_string(),
            max_retries,
            retry_delay: RETRY_DELAY,
            request_timeout: Duration::from_secs(5),
        },
        schedule: ScheduleConfig {
            trigger_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        },
        mail: MailConfig {
            enabled: email,
            user: "courier@example.com".to_string(),
            password: "secret".to_string(),
            recipients: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            subject_prefix: "Daily data".to_string(),
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
        },
        output: OutputConfig {
            directory: output.to_path_buf(),
        },
    })
}

fn create_pipeline(config: Arc<Config>, notifier: Option<Box<dyn Notifier>>) -> Pipeline {
    let source = HttpSource::from_config(&config.fetch).unwrap();
    let store = ArtifactStore::new(&config.output.directory);
    Pipeline::new(config, Box::new(source), store, notifier)
        .with_clock(Arc::new(FixedClock(captured_at())))
}

fn artifact_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

async fn mount_flaky_then_ok(server: &MockServer, failures: u64, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(failures)
        .with_priority(1)
        .expect(failures)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .with_priority(2)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fail_fail_succeed_persists_and_notifies_once() {
    let server = MockServer::start().await;
    mount_flaky_then_ok(&server, 2, json!({"a": 1})).await;

    let dir = TempDir::new().unwrap();
    let url = format!("{}/data.json", server.uri());
    let recorder = Arc::new(RecordingNotifier::default());
    let pipeline = create_pipeline(
        create_test_config(&url, 2, true, dir.path()),
        Some(Box::new(SharedRecorder(recorder.clone()))),
    );

    let started = Instant::now();
    let report = pipeline.run_cycle(&CancellationToken::new()).await;
    assert!(started.elapsed() >= RETRY_DELAY * 2);

    match &report {
        CycleReport::Persisted {
            attempts,
            artifact,
            notification,
        } => {
            assert_eq!(*attempts, 3);
            assert_eq!(artifact.file_name, "response_2024-05-01_20-00-00.json");
            assert!(matches!(notification, NotificationOutcome::Sent(2)));

            let content = std::fs::read_to_string(&artifact.path).unwrap();
            assert_eq!(content, "{\n    \"a\": 1\n}");
        }
        other => panic!("expected a persisted cycle, got {:?}", other),
    }

    assert_eq!(recorder.sent_count(), 1);
    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent[0].0, "Daily data - 01/05/2024 20:00");
    assert_eq!(sent[0].1, vec!["a@example.com", "b@example.com"]);
    assert_eq!(sent[0].2, "response_2024-05-01_20-00-00.json");
}

#[tokio::test]
async fn test_email_disabled_never_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let recorder = Arc::new(RecordingNotifier::default());
    let pipeline = create_pipeline(
        create_test_config(&server.uri(), 0, false, dir.path()),
        Some(Box::new(SharedRecorder(recorder.clone()))),
    );

    let report = pipeline.run_cycle(&CancellationToken::new()).await;

    assert!(report.is_persisted());
    assert!(matches!(
        report,
        CycleReport::Persisted {
            notification: NotificationOutcome::Disabled,
            ..
        }
    ));
    assert_eq!(recorder.sent_count(), 0);
}

#[tokio::test]
async fn test_exhausted_retries_write_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(4)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let recorder = Arc::new(RecordingNotifier::default());
    let pipeline = create_pipeline(
        create_test_config(&server.uri(), 3, true, dir.path()),
        Some(Box::new(SharedRecorder(recorder.clone()))),
    );

    let report = pipeline.run_cycle(&CancellationToken::new()).await;

    match report {
        CycleReport::FetchFailed(FetchError::RetriesExhausted { attempts, .. }) => {
            assert_eq!(attempts, 4)
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
    assert_eq!(artifact_count(dir.path()), 0);
    assert_eq!(recorder.sent_count(), 0);
}

#[tokio::test]
async fn test_malformed_response_aborts_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let pipeline = create_pipeline(create_test_config(&server.uri(), 5, false, dir.path()), None);

    let report = pipeline.run_cycle(&CancellationToken::new()).await;

    assert!(matches!(
        report,
        CycleReport::FetchFailed(FetchError::Malformed { attempt: 1, .. })
    ));
    assert_eq!(artifact_count(dir.path()), 0);
}

#[tokio::test]
async fn test_persist_failure_skips_notification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"a": 1})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let recorder = Arc::new(RecordingNotifier::default());
    let pipeline = create_pipeline(
        create_test_config(&server.uri(), 0, true, &blocker),
        Some(Box::new(SharedRecorder(recorder.clone()))),
    );

    let report = pipeline.run_cycle(&CancellationToken::new()).await;

    assert!(matches!(report, CycleReport::PersistFailed { attempts: 1, .. }));
    assert_eq!(recorder.sent_count(), 0);
}

#[tokio::test]
async fn test_mail_failure_keeps_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cidade": "Belém"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("127.0.0.1")
        .port(1)
        .timeout(Some(Duration::from_secs(2)))
        .build();
    let pipeline = create_pipeline(
        create_test_config(&server.uri(), 0, true, dir.path()),
        Some(Box::new(SmtpNotifier::new(transport))),
    );

    let report = pipeline.run_cycle(&CancellationToken::new()).await;

    match &report {
        CycleReport::Persisted {
            artifact,
            notification,
            ..
        } => {
            assert!(matches!(
                notification,
                NotificationOutcome::Failed(NotifyError::Transport(_))
            ));
            let content = std::fs::read_to_string(&artifact.path).unwrap();
            assert!(content.contains("Belém"));
        }
        other => panic!("expected a persisted cycle, got {:?}", other),
    }
    assert_eq!(artifact_count(dir.path()), 1);
}

#[tokio::test]
async fn test_cancel_during_retry_wait() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = (*create_test_config(&server.uri(), 10, false, dir.path())).clone();
    config.fetch.retry_delay = Duration::from_secs(3600);
    let pipeline = create_pipeline(Arc::new(config), None);

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel_clone.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(5), pipeline.run_cycle(&cancel))
        .await
        .expect("cycle should stop after cancel");

    assert!(matches!(
        report,
        CycleReport::FetchFailed(FetchError::Cancelled { attempts: 1 })
    ));
    assert_eq!(artifact_count(dir.path()), 0);
}

#[test]
fn test_missing_required_key_prevents_startup() {
    let env = [
        ("REQUEST_URL", "https://api.example.com/data.json"),
        ("MAIL_AUTH_USER", "courier@example.com"),
        ("MAIL_AUTH_PASS", "secret"),
    ];

    let result = load_config_from(|key| {
        env.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    });

    let err = result.unwrap_err();
    assert!(matches!(err, ConfigError::MissingKey("SCHEDULE_RECIPIENTS")));
    assert!(err.to_string().contains("SCHEDULE_RECIPIENTS"));
}
