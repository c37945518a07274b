use crate::utils::error::{PluginError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(PluginError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(PluginError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(PluginError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(PluginError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(PluginError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number<T: PartialOrd + std::fmt::Display>(
    field_name: &str,
    value: T,
    min_value: T,
) -> Result<()> {
    if value < min_value {
        return Err(PluginError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PluginError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(PluginError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("pagerduty.api_url", "https://api.pagerduty.com").is_ok());
        assert!(validate_url("pagerduty.api_url", "http://127.0.0.1:8080").is_ok());
        assert!(validate_url("pagerduty.api_url", "").is_err());
        assert!(validate_url("pagerduty.api_url", "invalid-url").is_err());
        assert!(validate_url("pagerduty.api_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("pagerduty.max_pages", 3u32, 1).is_ok());
        assert!(validate_positive_number("pagerduty.max_pages", 0u32, 1).is_err());
    }

    #[test]
    fn test_validate_range_and_strings() {
        assert!(validate_range("pagerduty.max_pages", 3, 1, 100).is_ok());
        assert!(validate_range("pagerduty.max_pages", 101, 1, 100).is_err());
        assert!(validate_non_empty_string("server.bind_address", "  ").is_err());
        assert!(validate_path("techdocs.working_directory", "/tmp/techdocs").is_ok());
        assert!(validate_path("techdocs.working_directory", "").is_err());
    }
}
