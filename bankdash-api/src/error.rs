//! Error taxonomy for calls against the banking API.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// HTTP 401. The composing layer reacts (see `intercept`); the client does not.
    #[error("Unauthorized")]
    Unauthorized,

    /// Any other non-2xx status, with the server's `message` field when present.
    #[error("Server error {status}: {}", message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    Request(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Business message from the server (e.g. "Insufficient balance").
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } => message.as_deref().filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }

    /// What to show a user: the server's own words when it gave any, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}
