//! Advisor configuration parsed from environment variables.

use super::AdvisorError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvisorTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisorConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeouts: AdvisorTimeouts,
}

impl AdvisorConfig {
    /// Build typed advisor config from environment variables.
    ///
    /// Required:
    /// - `GEMINI_API_KEY` (or `API_KEY`)
    ///
    /// Optional:
    /// - `GEMINI_MODEL`: default `gemini-3-flash-preview`
    /// - `GEMINI_BASE_URL`: default Generative Language API v1beta
    /// - `GEMINI_REQUEST_TIMEOUT_SECS`: default 60
    /// - `GEMINI_CONNECT_TIMEOUT_SECS`: default 10
    pub fn from_env() -> Result<Self, AdvisorError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AdvisorError> {
        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AdvisorError::MissingApiKey { var: "GEMINI_API_KEY".into() })?;

        let model = lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let base_url = lookup("GEMINI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = AdvisorTimeouts {
            request_secs: parse_secs(&lookup, "GEMINI_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_secs(&lookup, "GEMINI_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(Self { api_key, model, base_url, timeouts })
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64, AdvisorError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| AdvisorError::ConfigParse(format!("{key} must be a whole number of seconds, got '{raw}'"))),
    }
}
