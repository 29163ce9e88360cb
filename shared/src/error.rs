use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::filters::{ConditionType, RuleId};

const SERVER_MESSAGE_KEY: &str = "server_message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimited,
    Server,
    Storage,
    Serialization,
    Configuration,
    InvalidState,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Server => "SERVER_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network
            | Self::Timeout
            | Self::Conflict
            | Self::RateLimited
            | Self::Server
            | Self::Storage => ErrorSeverity::Transient,

            Self::Serialization | Self::Configuration | Self::InvalidState => {
                ErrorSeverity::Fatal
            }

            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network
                | Self::Timeout
                | Self::RateLimited
                | Self::Server
                | Self::Storage
                | Self::Conflict
        )
    }
}

/// Classified failure carried from an effect result (or a local check) into
/// the model, where the owning screen renders it with a retry affordance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub status: Option<u16>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            status: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub const fn requires_reauthentication(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Authentication => {
                "Your session has expired. Please sign in again.".into()
            }
            ErrorKind::Authorization => {
                "You don't have permission to perform this action.".into()
            }
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::Conflict => {
                "This action conflicts with a recent change. Please refresh and try again.".into()
            }
            ErrorKind::RateLimited => {
                "Too many requests. Please wait a moment and try again.".into()
            }
            ErrorKind::Server => "The server could not complete the request. Please try again.".into(),
            ErrorKind::Storage => "Unable to access local storage on this device.".into(),
            ErrorKind::Serialization => {
                "A data error occurred. Please contact support if this persists.".into()
            }
            ErrorKind::Configuration => {
                "The app is not configured correctly. Please reinstall or contact support.".into()
            }
            ErrorKind::InvalidState => self.message.clone(),
            ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
        }
    }

    /// Classifies a non-2xx response. The server reports failures as
    /// `{"error": "..."}` (sometimes `{"message": "..."}`); that text becomes
    /// the message when present.
    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        };

        let server_message = body
            .and_then(|b| serde_json::from_slice::<ApiErrorResponse>(b).ok())
            .and_then(ApiErrorResponse::into_message);

        let message = server_message
            .clone()
            .unwrap_or_else(|| format!("HTTP error: {status}"));
        let mut error = Self::new(kind, message).with_context("http_status", status.to_string());
        if let Some(server_message) = server_message {
            error = error.with_context(SERVER_MESSAGE_KEY, server_message);
        }
        error.status = Some(status);
        error
    }

    /// The `error`/`message` text the server put in a failure body, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        self.context.get(SERVER_MESSAGE_KEY).map(String::as_str)
    }

    #[must_use]
    pub fn from_http_error(error: &crux_http::Error) -> Self {
        use crux_http::Error as HttpError;

        match error {
            HttpError::Http(http) => {
                Self::from_http_status(u16::from(http.code), http.body.as_deref())
                    .with_internal(http.message.clone())
            }
            HttpError::Json(message) => {
                Self::new(ErrorKind::Serialization, "Unexpected response from the server")
                    .with_internal(message.clone())
            }
            HttpError::Url(message) => {
                Self::new(ErrorKind::Configuration, "Invalid request URL")
                    .with_internal(message.clone())
            }
            HttpError::Io(message) => {
                Self::new(ErrorKind::Network, "Network request failed").with_internal(message.clone())
            }
            HttpError::Timeout => Self::new(ErrorKind::Timeout, "Request timed out"),
        }
    }

    #[must_use]
    pub fn storage(error: &crux_kv::error::KeyValueError) -> Self {
        Self::new(ErrorKind::Storage, "Key-value storage failed").with_internal(error.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<crux_http::Error> for AppError {
    fn from(error: crux_http::Error) -> Self {
        Self::from_http_error(&error)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorResponse {
    fn into_message(self) -> Option<String> {
        self.error
            .or(self.message)
            .filter(|m| !m.trim().is_empty())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Rejections raised by local edits on the filter list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("No filter rule with id {0}")]
    RuleNotFound(RuleId),

    #[error("Condition index {index} is out of range for a rule with {len} conditions")]
    ConditionOutOfRange { index: usize, len: usize },

    #[error("The last distance condition of a rule cannot be removed")]
    LastDistanceCondition,

    #[error("Rule already has a {0} condition")]
    DuplicateCondition(ConditionType),

    #[error("Rule order must list every rule exactly once")]
    InvalidOrder,

    #[error("Rule position {position} is out of range for {len} rules")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("A save is already in progress for rule {0}")]
    SaveInFlight(RuleId),

    #[error("A delete is already in progress for rule {0}")]
    DeleteInFlight(RuleId),
}

impl From<EditError> for AppError {
    fn from(e: EditError) -> Self {
        let kind = match e {
            EditError::RuleNotFound(_) => ErrorKind::NotFound,
            EditError::ConditionOutOfRange { .. }
            | EditError::PositionOutOfRange { .. }
            | EditError::InvalidOrder
            | EditError::LastDistanceCondition
            | EditError::DuplicateCondition(_) => ErrorKind::Validation,
            EditError::SaveInFlight(_) | EditError::DeleteInFlight(_) => ErrorKind::InvalidState,
        };
        AppError::new(kind, e.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}
