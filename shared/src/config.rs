//! Runtime configuration pushed in by the shell.
//!
//! The core performs no I/O of its own, so the shell delivers configuration
//! through [`crate::Event::Configure`] at start-up. Until then the compiled-in
//! defaults apply.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::error::{AppError, ErrorKind};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:7878";
pub const MAX_BASE_URL_LENGTH: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub api_base_url: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Parsed and checked API origin. Only `http`/`https` with a host is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase(Url);

impl ApiBase {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
            url: raw.chars().take(100).collect(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("URL cannot be empty"));
        }
        if trimmed.len() > MAX_BASE_URL_LENGTH {
            return Err(invalid("URL is too long"));
        }

        let mut url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("only http and https are allowed"));
        }
        if url.host_str().is_none() {
            return Err(invalid("URL must have a host"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("credentials in URL are not allowed"));
        }

        url.set_query(None);
        url.set_fragment(None);
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self(url))
    }

    /// Appends path segments such as `["api", "user", "filters"]` to the base.
    /// Each segment is percent-encoded, so a `/` inside one stays inside it.
    pub fn join<I>(&self, segments: I) -> Result<Url, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.0.clone();
        url.path_segments_mut()
            .map_err(|()| ConfigError::InvalidBaseUrl {
                url: self.0.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<&CoreConfig> for ApiBase {
    type Error = ConfigError;

    fn try_from(config: &CoreConfig) -> Result<Self, Self::Error> {
        Self::parse(&config.api_base_url)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}
