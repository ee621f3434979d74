//! Configuration validation logic

use super::Config;
use crate::constants::MAX_USERS_LIMIT;
use crate::errors::{ErrorContext, LoadError, Result};
use url::Url;

/// Validate the configuration
pub fn validate(config: &Config) -> Result<()> {
    validate_target(config)?;
    validate_fleet(config)?;
    validate_users(config)?;
    validate_test_config(config)?;
    validate_polling(config)?;
    validate_metrics(config)?;
    validate_headers(config)?;
    Ok(())
}

/// Validate target configuration
fn validate_target(config: &Config) -> Result<()> {
    let url = Url::parse(&config.target.url).map_err(|e| {
        LoadError::config(format!(
            "Invalid control plane URL '{}': {}",
            config.target.url, e
        ))
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(LoadError::config(format!(
                "Invalid URL scheme '{}'. Only 'http' and 'https' are supported",
                scheme
            )));
        }
    }

    if config.target.timeout.is_zero() {
        return Err(LoadError::config("Timeout must be greater than 0"));
    }

    Ok(())
}

/// Validate fleet configuration
fn validate_fleet(config: &Config) -> Result<()> {
    if config.fleet.name.trim().is_empty() {
        return Err(LoadError::config("Fleet name cannot be empty"));
    }

    if config.fleet.namespace.trim().is_empty() {
        return Err(LoadError::config("Namespace cannot be empty"));
    }

    if config.fleet.size == 0 {
        return Err(LoadError::config("Fleet size must be greater than 0"));
    }

    Ok(())
}

/// Validate virtual user configuration
fn validate_users(config: &Config) -> Result<()> {
    if config.users.count == 0 {
        return Err(LoadError::config("Number of users must be greater than 0"));
    }

    if config.users.count > MAX_USERS_LIMIT {
        return Err(LoadError::config(format!(
            "Number of users cannot exceed {}",
            MAX_USERS_LIMIT
        )));
    }

    if config.users.min_wait > config.users.max_wait {
        return Err(LoadError::config(format!(
            "Minimum wait ({}ms) cannot exceed maximum wait ({}ms)",
            config.users.min_wait.as_millis(),
            config.users.max_wait.as_millis()
        )));
    }

    Ok(())
}

/// Validate test configuration
fn validate_test_config(config: &Config) -> Result<()> {
    // Ensure at least one termination condition is specified
    if config.test.duration.is_none() && config.test.total_iterations.is_none() {
        return Err(LoadError::config(
            "Must specify either --duration or --iterations to define test termination",
        ));
    }

    if let Some(duration) = config.test.duration
        && duration.is_zero()
    {
        return Err(LoadError::config("Duration must be greater than 0"));
    }

    if let Some(total) = config.test.total_iterations
        && total < config.users.count as u64
    {
        return Err(LoadError::config(format!(
            "Iterations ({}) must be at least the number of users ({})",
            total, config.users.count
        )));
    }

    Ok(())
}

/// Validate poller deadlines
fn validate_polling(config: &Config) -> Result<()> {
    if let Some(deadline) = config.polling.allocation_deadline
        && deadline.is_zero()
    {
        return Err(LoadError::config(
            "Allocation deadline must be greater than 0",
        ));
    }

    if let Some(deadline) = config.polling.scale_deadline
        && deadline.is_zero()
    {
        return Err(LoadError::config("Scale deadline must be greater than 0"));
    }

    Ok(())
}

/// Validate metrics forwarding configuration
fn validate_metrics(config: &Config) -> Result<()> {
    let namespace = &config.metrics.namespace;
    if namespace.is_empty() || namespace.contains(char::is_whitespace) {
        return Err(LoadError::config(format!(
            "Invalid metrics namespace '{}'. It must be non-empty and contain no whitespace",
            namespace
        )));
    }

    if let Some(addr) = &config.metrics.collector {
        let (host, port) = addr.rsplit_once(':').with_config_context(&format!(
            "Invalid metrics address '{}'. Use 'host:port' format",
            addr
        ))?;
        if host.is_empty() {
            return Err(LoadError::config(format!(
                "Invalid metrics address '{}'. Host cannot be empty",
                addr
            )));
        }
        port.parse::<u16>()
            .with_config_context(&format!("Invalid metrics port in '{}'", addr))?;
    }

    Ok(())
}

/// Validate custom headers format
fn validate_headers(config: &Config) -> Result<()> {
    for header in &config.target.headers {
        if !header.contains(':') {
            return Err(LoadError::config(format!(
                "Invalid header format '{}'. Use 'Key: Value' format",
                header
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_test_config() -> Config {
        let mut config = Config::with_defaults("http://localhost:8001".to_string());
        config.users.count = 2;
        config.test.total_iterations = Some(10);
        config
    }

    #[test]
    fn test_validate_valid_config() {
        let config = create_test_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_url() {
        let mut config = create_test_config();
        config.target.url = "invalid-url".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_websocket_scheme() {
        let mut config = create_test_config();
        config.target.url = "ws://localhost:8001".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_users() {
        let mut config = create_test_config();
        config.users.count = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_fleet_size() {
        let mut config = create_test_config();
        config.fleet.size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_inverted_think_time() {
        let mut config = create_test_config();
        config.users.min_wait = Duration::from_millis(900);
        config.users.max_wait = Duration::from_millis(500);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_no_termination_condition() {
        let mut config = create_test_config();
        config.test.duration = None;
        config.test.total_iterations = None;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_fewer_iterations_than_users() {
        let mut config = create_test_config();
        config.users.count = 5;
        config.test.total_iterations = Some(3);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_deadline() {
        let mut config = create_test_config();
        config.polling.allocation_deadline = Some(Duration::ZERO);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_metrics_address_needs_port() {
        let mut config = create_test_config();
        config.metrics.collector = Some("localhost".to_string());
        assert!(validate(&config).is_err());

        config.metrics.collector = Some("localhost:graphite".to_string());
        assert!(validate(&config).is_err());

        config.metrics.collector = None;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_metrics_namespace_whitespace() {
        let mut config = create_test_config();
        config.metrics.namespace = "perf test".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_header_format() {
        let mut config = create_test_config();
        config.target.headers = vec!["InvalidHeader".to_string()];
        assert!(validate(&config).is_err());
    }
}
