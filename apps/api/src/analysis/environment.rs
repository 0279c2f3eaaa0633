//! Read-only configuration probes behind `/api/v1/analysis/status` and
//! `/api/v1/analysis/environment`.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;

use crate::analysis::MISSING_API_KEY_MESSAGE;
use crate::config::Config;
use crate::llm_client::is_placeholder_key;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    pub configured: bool,
    pub message: String,
    pub last_checked: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

pub fn api_key_status(config: &Config) -> ApiKeyStatus {
    let (configured, message) = match config.gemini_api_key.as_deref() {
        Some(key) if !is_placeholder_key(key) => (true, "Gemini API key is configured".to_string()),
        Some(_) => (
            false,
            "GEMINI_API_KEY still holds a placeholder value".to_string(),
        ),
        None => (false, MISSING_API_KEY_MESSAGE.to_string()),
    };

    ApiKeyStatus {
        configured,
        message,
        last_checked: Utc::now(),
    }
}

pub fn validate_environment(config: &Config) -> EnvironmentReport {
    let mut errors = Vec::new();

    match config.gemini_api_key.as_deref() {
        None => errors.push("GEMINI_API_KEY is not set".to_string()),
        Some(key) => {
            if is_placeholder_key(key) {
                errors.push("GEMINI_API_KEY appears to be a placeholder value".to_string());
            }
            if key.chars().any(char::is_whitespace) {
                errors.push("GEMINI_API_KEY must not contain whitespace".to_string());
            }
        }
    }

    match Url::parse(&config.gemini_api_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(format!(
            "GEMINI_API_URL must be an http(s) URL, got '{}'",
            config.gemini_api_url
        )),
    }

    if config.database_url.trim().is_empty() {
        errors.push("DATABASE_URL is not set".to_string());
    } else if !config.database_url.starts_with("postgres://")
        && !config.database_url.starts_with("postgresql://")
    {
        errors.push("DATABASE_URL must be a postgres:// connection string".to_string());
    }

    EnvironmentReport {
        is_valid: errors.is_empty(),
        errors,
    }
}
