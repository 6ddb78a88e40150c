//! Settings validation

use crate::config::types::{CapturesSettings, ListSettings};
use crate::ConfigError;

/// Validates the settings of a capture extraction run
pub fn validate_captures(settings: &CapturesSettings) -> Result<(), ConfigError> {
    if settings.database.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }

    validate_location(&settings.layout.output_location, "output location")?;
    validate_location(
        &settings.layout.redirect_target_location,
        "redirect target location",
    )?;

    if settings.follow_redirects < 1 {
        return Err(ConfigError::Validation(format!(
            "follow_redirects must be >= 1, got {}",
            settings.follow_redirects
        )));
    }

    validate_crawls(&settings.crawls)
}

/// Validates the settings of the list writers
pub fn validate_lists(settings: &ListSettings) -> Result<(), ConfigError> {
    validate_location(&settings.table_location, "table location")?;
    validate_location(&settings.output_location, "output location")?;
    validate_crawls(&settings.crawls)
}

fn validate_location(location: &str, what: &str) -> Result<(), ConfigError> {
    if location.is_empty() {
        return Err(ConfigError::Validation(format!("{what} cannot be empty")));
    }
    Ok(())
}

fn validate_crawls(crawls: &[String]) -> Result<(), ConfigError> {
    if crawls.is_empty() {
        return Err(ConfigError::Validation(
            "at least one crawl dataset is required".to_string(),
        ));
    }
    for crawl in crawls {
        validate_crawl_id(crawl)?;
    }
    Ok(())
}

/// Validates a crawl identifier (e.g. CC-MAIN-2022-33).
///
/// Crawl identifiers end up in partition paths and SQL literals; reject
/// anything that cannot safely appear in both.
pub fn validate_crawl_id(crawl: &str) -> Result<(), ConfigError> {
    if crawl.is_empty() {
        return Err(ConfigError::InvalidCrawl("<empty>".to_string()));
    }
    if !crawl
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ConfigError::InvalidCrawl(crawl.to_string()));
    }
    Ok(())
}
