//! `{ success, message, data }` response envelope and the status choke point.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "none")]
    pub data: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

/// Every response goes through here.
///
/// - 401 becomes `ApiError::Unauthorized`
/// - other non-2xx become `ApiError::Server` with the body's `message`, if any
/// - 2xx is unwrapped; an empty body or a null/missing `data` yields `None`
pub fn decode_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<Option<T>, ApiError> {
    if status == 401 {
        return Err(ApiError::Unauthorized);
    }

    if !(200..300).contains(&status) {
        return Err(ApiError::Server {
            status,
            message: error_message(body),
        });
    }

    if body.trim().is_empty() {
        return Ok(None);
    }

    let envelope: ApiResponse<T> =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(envelope.data)
}

/// Pull `message` out of an error body; plain-text bodies are used as-is.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => v
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string()),
        Err(_) => Some(body.to_string()),
    }
}
