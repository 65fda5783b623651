use crate::utils::error::{ClientError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub const HTTP_SCHEMES: &[&str] = &["http", "https"];
pub const WS_SCHEMES: &[&str] = &["ws", "wss"];

pub fn validate_url(field_name: &str, url_str: &str, schemes: &[&str]) -> Result<Url> {
    if url_str.is_empty() {
        return Err(ClientError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => {
            if schemes.contains(&url.scheme()) {
                Ok(url)
            } else {
                Err(ClientError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: url_str.to_string(),
                    reason: format!(
                        "Unsupported URL scheme: {}. Expected one of: {}",
                        url.scheme(),
                        schemes.join(", ")
                    ),
                })
            }
        }
        Err(e) => Err(ClientError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ClientError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ClientError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(ClientError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::InvalidConfigValueError {
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
        return Err(ClientError::InvalidConfigValueError {
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
        assert!(validate_url("api.base_url", "https://example.com", HTTP_SCHEMES).is_ok());
        assert!(validate_url("api.base_url", "http://example.com", HTTP_SCHEMES).is_ok());
        assert!(validate_url("api.base_url", "", HTTP_SCHEMES).is_err());
        assert!(validate_url("api.base_url", "invalid-url", HTTP_SCHEMES).is_err());
        assert!(validate_url("api.base_url", "ftp://example.com", HTTP_SCHEMES).is_err());
    }

    #[test]
    fn test_validate_websocket_url() {
        assert!(validate_url("realtime.url", "ws://localhost:3001", WS_SCHEMES).is_ok());
        assert!(validate_url("realtime.url", "wss://live.example.com", WS_SCHEMES).is_ok());
        assert!(validate_url("realtime.url", "https://example.com", WS_SCHEMES).is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("realtime.max_reconnect_attempts", 5, 1).is_ok());
        assert!(validate_positive_number("realtime.max_reconnect_attempts", 0, 1).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("api.request_timeout_seconds", 30, 1, 300).is_ok());
        assert!(validate_range("api.request_timeout_seconds", 0, 1, 300).is_err());
        assert!(validate_range("api.request_timeout_seconds", 301, 1, 300).is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("workflow.api_key", "key").is_ok());
        assert!(validate_non_empty_string("workflow.api_key", "   ").is_err());
    }
}
