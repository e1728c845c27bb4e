use crate::config::parser::{MAIL_AUTH_USER, SCHEDULE_RECIPIENTS};
use crate::config::types::{Config, FetchConfig, MailConfig};
use crate::{ConfigError, ConfigResult};
use lettre::Address;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_fetch_config(&config.fetch)?;
    validate_mail_config(&config.mail)?;
    Ok(())
}

/// Validates the target URL and timing values
fn validate_fetch_config(config: &FetchConfig) -> ConfigResult<()> {
    let url = Url::parse(&config.target_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid REQUEST_URL '{}': {}", config.target_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "REQUEST_URL '{}' must use http or https",
            config.target_url
        )));
    }

    if config.request_timeout.is_zero() {
        return Err(ConfigError::Validation(
            "HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Validates the mail account and distribution list
fn validate_mail_config(config: &MailConfig) -> ConfigResult<()> {
    validate_address(MAIL_AUTH_USER, &config.user)?;

    if config.recipients.is_empty() {
        return Err(ConfigError::Validation(
            "SCHEDULE_RECIPIENTS must contain at least one address".to_string(),
        ));
    }

    for recipient in &config.recipients {
        validate_address(SCHEDULE_RECIPIENTS, recipient)?;
    }

    if config.smtp_host.is_empty() {
        return Err(ConfigError::Validation("SMTP_HOST cannot be empty".to_string()));
    }

    if config.smtp_port == 0 {
        return Err(ConfigError::Validation("SMTP_PORT must be greater than zero".to_string()));
    }

    Ok(())
}

/// Checks an address with the same parser the mailer uses
fn validate_address(key: &'static str, address: &str) -> ConfigResult<()> {
    address
        .parse::<Address>()
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidValue {
            key,
            value: address.to_string(),
            reason: e.to_string(),
        })
}
