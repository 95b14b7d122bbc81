use crate::config::types::{
    Config, PipelineConfig, PolitenessConfig, RendererConfig, StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on any single worker pool
const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_pipeline_config(&config.pipeline)?;
    validate_politeness_config(&config.politeness)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_renderer_config(&config.renderer)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates worker pool and delivery settings
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    for (name, workers) in [
        ("ingest-workers", config.ingest_workers),
        ("crawl-workers", config.crawl_workers),
        ("scrape-workers", config.scrape_workers),
    ] {
        if workers < 1 || workers > MAX_WORKERS {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_WORKERS, workers
            )));
        }
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max-attempts must be >= 1".to_string(),
        ));
    }

    if config.task_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "task-timeout-secs must be > 0 when set".to_string(),
        ));
    }

    if config.fetch_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch-timeout-secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates politeness delays
fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    if config.max_crawl_delay_ms < config.default_crawl_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max-crawl-delay-ms ({}) must be >= default-crawl-delay-ms ({})",
            config.max_crawl_delay_ms, config.default_crawl_delay_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
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

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates renderer configuration
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "navigation-timeout-secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
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

    // Must contain exactly one @ with text on both sides
    let (local, domain) = match email.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => (local, domain),
        _ => {
            return Err(ConfigError::Validation(format!(
                "Invalid email format: '{}'",
                email
            )))
        }
    };

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        Config {
            seeds: vec!["example.com".to_string()],
            pipeline: PipelineConfig::default(),
            politeness: PolitenessConfig::default(),
            user_agent: UserAgentConfig {
                crawler_name: "TestCrawler".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            renderer: RendererConfig::default(),
            storage: StorageConfig {
                database_path: "./test.db".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&create_test_config()).is_ok());
    }

    #[test]
    fn test_worker_bounds() {
        let mut config = create_test_config();
        config.pipeline.scrape_workers = 0;
        assert!(validate(&config).is_err());

        let mut config = create_test_config();
        config.pipeline.crawl_workers = MAX_WORKERS + 1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = create_test_config();
        config.pipeline.max_attempts = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_delay_cap_below_default_rejected() {
        let mut config = create_test_config();
        config.politeness.default_crawl_delay_ms = 5000;
        config.politeness.max_crawl_delay_ms = 1000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_crawler_name_characters() {
        let mut config = create_test_config();
        config.user_agent.crawler_name = "bad name!".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_contact_url() {
        let mut config = create_test_config();
        config.user_agent.contact_url = "not a url".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_empty_database_path() {
        let mut config = create_test_config();
        config.storage.database_path = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }
}
