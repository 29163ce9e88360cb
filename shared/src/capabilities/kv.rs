use secrecy::{ExposeSecret, SecretString};

use crate::error::{AppError, ErrorKind};

/// Key namespaces in the shell's key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyNamespace {
    Session,
}

impl KeyNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            KeyNamespace::Session => "session",
        }
    }

    pub fn key(&self, name: &str) -> String {
        format!("{}:{}", self.prefix(), name)
    }
}

/// Where the bearer token lives: `session:auth_token`.
pub fn auth_token_key() -> String {
    KeyNamespace::Session.key("auth_token")
}

pub fn encode_token(token: &SecretString) -> Vec<u8> {
    token.expose_secret().as_bytes().to_vec()
}

/// Reads a stored token. Missing or blank values mean "signed out".
pub fn decode_token(bytes: Option<Vec<u8>>) -> Result<Option<SecretString>, AppError> {
    let Some(bytes) = bytes else {
        return Ok(None);
    };
    let text = String::from_utf8(bytes).map_err(|_| {
        AppError::new(ErrorKind::Storage, "Stored session token is not valid UTF-8")
    })?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(SecretString::new(trimmed.to_string())))
}
