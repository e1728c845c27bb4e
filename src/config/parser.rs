use crate::config::types::{Config, FetchConfig, MailConfig, OutputConfig, ScheduleConfig};
use crate::config::validation::validate;
use crate::{ConfigError, ConfigResult};
use chrono::NaiveTime;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const REQUEST_URL: &str = "REQUEST_URL";
pub const MAIL_AUTH_USER: &str = "MAIL_AUTH_USER";
pub const MAIL_AUTH_PASS: &str = "MAIL_AUTH_PASS";
pub const SCHEDULE_RECIPIENTS: &str = "SCHEDULE_RECIPIENTS";
pub const SCHEDULE_TIME: &str = "SCHEDULE_TIME";
pub const MAX_RETRIES: &str = "MAX_RETRIES";
pub const RETRY_DELAY_SECS: &str = "RETRY_DELAY_SECS";
pub const ENABLE_EMAIL: &str = "ENABLE_EMAIL";
pub const SUBJECT: &str = "SUBJECT";
pub const SMTP_HOST: &str = "SMTP_HOST";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const OUTPUT_DIR: &str = "OUTPUT_DIR";
pub const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";

const DEFAULT_SCHEDULE_TIME: &str = "20:00:00";
const DEFAULT_MAX_RETRIES: u32 = 144;
const DEFAULT_RETRY_DELAY_SECS: u64 = 600;
const DEFAULT_SUBJECT: &str = "JSON snapshot";
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Loads the configuration from the process environment
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - A required key is missing or a value is invalid
///
/// # Example
///
/// ```no_run
/// use snapshot_courier::config::load_config;
///
/// let config = load_config().unwrap();
/// println!("Fetching {} daily", config.fetch.target_url);
/// ```
pub fn load_config() -> ConfigResult<Config> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Loads the configuration through an arbitrary key lookup
///
/// Blank values are treated the same as absent ones.
pub fn load_config_from<F>(lookup: F) -> ConfigResult<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let require = |key: &'static str| get(key).ok_or(ConfigError::MissingKey(key));

    // Required keys first, in a stable order, so the error names the first gap
    let target_url = require(REQUEST_URL)?;
    let user = require(MAIL_AUTH_USER)?;
    let password = require(MAIL_AUTH_PASS)?;
    let recipients = parse_recipients(&require(SCHEDULE_RECIPIENTS)?);

    let trigger_time = parse_trigger_time(
        &get(SCHEDULE_TIME).unwrap_or_else(|| DEFAULT_SCHEDULE_TIME.to_string()),
    )?;
    let max_retries = parse_number(MAX_RETRIES, get(MAX_RETRIES), DEFAULT_MAX_RETRIES)?;
    let retry_delay_secs = parse_number(
        RETRY_DELAY_SECS,
        get(RETRY_DELAY_SECS),
        DEFAULT_RETRY_DELAY_SECS,
    )?;
    let timeout_secs = parse_number(
        HTTP_TIMEOUT_SECS,
        get(HTTP_TIMEOUT_SECS),
        DEFAULT_HTTP_TIMEOUT_SECS,
    )?;
    let enabled = match get(ENABLE_EMAIL) {
        Some(raw) => parse_flag(ENABLE_EMAIL, &raw)?,
        None => false,
    };
    let smtp_port = parse_number(SMTP_PORT, get(SMTP_PORT), DEFAULT_SMTP_PORT)?;

    let config = Config {
        fetch: FetchConfig {
            target_url,
            max_retries,
            retry_delay: Duration::from_secs(retry_delay_secs),
            request_timeout: Duration::from_secs(timeout_secs),
        },
        schedule: ScheduleConfig { trigger_time },
        mail: MailConfig {
            enabled,
            user,
            password,
            recipients,
            subject_prefix: get(SUBJECT).unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            smtp_host: get(SMTP_HOST).unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port,
        },
        output: OutputConfig {
            directory: get(OUTPUT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        },
    };

    validate(&config)?;

    Ok(config)
}

/// Loads `KEY=VALUE` pairs from an env file into the process environment
///
/// With no path, a `.env` in the working directory is loaded if one exists.
/// Variables already present in the environment win over the file.
pub fn load_env_file(path: Option<&Path>) -> ConfigResult<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

/// Parses a daily trigger time in `HH:MM:SS` or `HH:MM` form
pub fn parse_trigger_time(raw: &str) -> ConfigResult<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| ConfigError::InvalidValue {
            key: SCHEDULE_TIME,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Splits a comma-separated recipient list, dropping empty entries
fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(key: &'static str, raw: &str) -> ConfigResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_number<T>(key: &'static str, raw: Option<String>, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value: raw,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
