use crate::config::types::{Config, CrawlerConfig, OutputConfig, TargetEntry, UserAgentConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_targets(&config.targets)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.tracking_max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "tracking_max_pages must be >= 1, got {}",
            config.tracking_max_pages
        )));
    }

    if config.scroll_settle_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "scroll_settle_ms must be <= 60000ms, got {}ms",
            config.scroll_settle_ms
        )));
    }

    if config.max_scroll_iterations < 1 || config.max_scroll_iterations > 1000 {
        return Err(ConfigError::Validation(format!(
            "max_scroll_iterations must be between 1 and 1000, got {}",
            config.max_scroll_iterations
        )));
    }

    if config.page_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "page_timeout_secs must be >= 1, got {}",
            config.page_timeout_secs
        )));
    }

    if config.max_concurrent_crawls < 1 || config.max_concurrent_crawls > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_crawls must be between 1 and 64, got {}",
            config.max_concurrent_crawls
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates target entries
fn validate_targets(targets: &[TargetEntry]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for target in targets {
        if target.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "target name cannot be empty".to_string(),
            ));
        }

        if !names.insert(target.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "target name '{}' is used more than once",
                target.name
            )));
        }

        validate_crawl_url(&target.url)?;
        for tracking_url in &target.tracking_urls {
            validate_crawl_url(tracking_url)?;
        }
    }

    Ok(())
}

/// Validates a start URL: absolute, HTTP(S), with a host
fn validate_crawl_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid URL '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "URL '{}' must use HTTP or HTTPS",
            raw
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!("URL '{}' has no host", raw)));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
