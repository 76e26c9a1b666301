use crate::config::types::{Config, CrawlerConfig, FetchConfig, OutputConfig, RenderMode};
use crate::ConfigError;
use url::Url;

/// Hard ceiling on redirects followed by the lightweight fetcher
pub const MAX_REDIRECTS: usize = 5;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    validate_page_budget(config)?;
    Ok(())
}

/// The page timeout must leave room for a lightweight attempt plus a full render
fn validate_page_budget(config: &Config) -> Result<(), ConfigError> {
    if config.fetch.render_mode == RenderMode::Never {
        return Ok(());
    }

    let needed = config.fetch.worst_case_page_ms();
    if config.crawler.page_timeout_ms <= needed {
        return Err(ConfigError::Validation(format!(
            "page_timeout_ms ({}ms) must exceed request + page load + ready + settle timeouts ({}ms)",
            config.crawler.page_timeout_ms, needed
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth = 0 is a valid single-page crawl

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_children_per_page < 1 {
        return Err(ConfigError::Validation(format!(
            "max_children_per_page must be >= 1, got {}",
            config.max_children_per_page
        )));
    }

    if config.page_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "page_timeout_ms must be >= 100ms, got {}ms",
            config.page_timeout_ms
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.max_redirects > MAX_REDIRECTS {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= {}, got {}",
            MAX_REDIRECTS, config.max_redirects
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.transport_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "transport_retries must be <= 10, got {}",
            config.transport_retries
        )));
    }

    if config.page_load_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "page_load_timeout_ms must be >= 100ms, got {}ms",
            config.page_load_timeout_ms
        )));
    }

    if config.min_content_chars == 0 {
        return Err(ConfigError::Validation(
            "min_content_chars must be >= 1".to_string(),
        ));
    }

    // The WebDriver endpoint only matters when rendering can happen
    if config.render_mode != RenderMode::Never {
        let url = Url::parse(&config.webdriver_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver_url: {}", e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "webdriver_url must use http or https, got '{}'",
                config.webdriver_url
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.sitemap_path.is_empty() {
        return Err(ConfigError::Validation(
            "sitemap_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_depth_is_valid() {
        let mut config = Config::default();
        config.crawler.max_depth = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_crawler_limits() {
        let mut config = Config::default();
        config.crawler.max_children_per_page = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.crawler.page_timeout_ms = 50;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.crawler.max_retries = 11;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_redirect_ceiling() {
        let mut config = Config::default();
        config.fetch.max_redirects = 5;
        assert!(validate(&config).is_ok());

        config.fetch.max_redirects = 6;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_webdriver_url_checked_only_when_rendering() {
        let mut config = Config::default();
        config.fetch.webdriver_url = "not a url".to_string();
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));

        config.fetch.render_mode = RenderMode::Never;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_output_paths() {
        let mut config = Config::default();
        config.output.sitemap_path.clear();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.output.database_path.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_page_timeout_must_cover_render() {
        let mut config = Config::default();
        config.crawler.page_timeout_ms = config.fetch.worst_case_page_ms();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("page_timeout_ms"));

        config.crawler.page_timeout_ms += 1;
        assert!(validate(&config).is_ok());

        config.fetch.page_load_timeout_ms = 120_000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_page_budget_ignored_without_rendering() {
        let mut config = Config::default();
        config.crawler.page_timeout_ms = 5_000;
        assert!(validate(&config).is_err());

        config.fetch.render_mode = RenderMode::Never;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_user_agent() {
        let mut config = Config::default();
        config.fetch.user_agent = "  ".to_string();
        assert!(validate(&config).is_err());
    }
}
