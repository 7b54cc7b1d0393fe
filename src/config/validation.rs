use crate::config::types::{Config, CrawlerConfig, DedupConfig, OutputConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_dedup_config(&config.dedup)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_pages and rate_limit use 0 for "unlimited", so any u32 is fine

    if config.parallelism < 1 || config.parallelism > 100 {
        return Err(ConfigError::Validation(format!(
            "parallelism must be between 1 and 100, got {}",
            config.parallelism
        )));
    }

    if config.timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_seconds must be >= 1, got {}",
            config.timeout_seconds
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates duplicate detection settings
fn validate_dedup_config(config: &DedupConfig) -> Result<(), ConfigError> {
    if config.short_content_threshold < config.min_content_length {
        return Err(ConfigError::Validation(format!(
            "short_content_threshold ({}) must be >= min_content_length ({})",
            config.short_content_threshold, config.min_content_length
        )));
    }

    if config.expected_items == 0 {
        return Err(ConfigError::Validation(
            "expected_items must be > 0".to_string(),
        ));
    }

    if !(config.false_positive_rate > 0.0 && config.false_positive_rate < 1.0) {
        return Err(ConfigError::Validation(format!(
            "false_positive_rate must be in (0, 1), got {}",
            config.false_positive_rate
        )));
    }

    if config.cache_capacity == 0 {
        return Err(ConfigError::Validation(
            "cache_capacity must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if let Some(dir) = &config.directory {
        if dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output directory cannot be empty".to_string(),
            ));
        }
    }

    if config.flush_interval == 0 {
        return Err(ConfigError::Validation(
            "flush_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&create_test_config()).is_ok());
    }

    #[test]
    fn test_parallelism_bounds() {
        let mut config = create_test_config();
        config.crawler.parallelism = 0;
        assert!(validate(&config).is_err());

        config.crawler.parallelism = 101;
        assert!(validate(&config).is_err());

        config.crawler.parallelism = 100;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = create_test_config();
        config.crawler.timeout_seconds = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        let mut config = create_test_config();
        config.crawler.user_agent = "   ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_threshold_ordering() {
        let mut config = create_test_config();
        config.dedup.min_content_length = 600;
        config.dedup.short_content_threshold = 500;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_false_positive_rate_range() {
        let mut config = create_test_config();
        config.dedup.false_positive_rate = 0.0;
        assert!(validate(&config).is_err());

        config.dedup.false_positive_rate = 1.0;
        assert!(validate(&config).is_err());

        config.dedup.false_positive_rate = 0.01;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_flush_interval_rejected() {
        let mut config = create_test_config();
        config.output.flush_interval = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_output_directory_rejected() {
        let mut config = create_test_config();
        config.output.directory = Some(String::new());
        assert!(validate(&config).is_err());
    }
}
