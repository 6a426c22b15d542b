//! Failures returned by Spotify Web API calls.
//!
//! These are data, not control flow: tool handlers serialize them into the
//! tool result so the model can see why an action failed.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ApiError {
    /// Structured failure from the Web API
    #[error("Spotify API error ({status_code}): {message}")]
    Spotify {
        #[serde(rename = "statusCode")]
        status_code: u16,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
    },

    /// Transport, authentication or runtime failure
    #[error("{message}")]
    System { message: String },
}

impl ApiError {
    /// Build from a non-success response body
    pub fn from_response(status_code: u16, text: &str) -> Self {
        let body: Option<Value> = serde_json::from_str(text).ok();

        // {"error": {"status": 404, "message": "..."}} or {"error": "...", "error_description": "..."}
        let message = body
            .as_ref()
            .and_then(|b| {
                b.pointer("/error/message")
                    .or_else(|| b.get("error_description"))
                    .or_else(|| b.get("error"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
            .unwrap_or_else(|| {
                reqwest::StatusCode::from_u16(status_code)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Request failed")
                    .to_string()
            });

        ApiError::Spotify {
            status_code,
            message,
            body,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        ApiError::System {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Spotify { status_code, .. } => Some(*status_code),
            ApiError::System { .. } => None,
        }
    }
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        ApiError::system(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::system(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_web_api_error_shape() {
        let err = ApiError::from_response(
            404,
            r#"{"error":{"status":404,"message":"Player command failed: No active device found","reason":"NO_ACTIVE_DEVICE"}}"#,
        );
        assert_eq!(err.status_code(), Some(404));
        assert!(err.to_string().contains("No active device found"));

        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["source"], "spotify");
        assert_eq!(value["statusCode"], 404);
        assert_eq!(value["body"]["error"]["reason"], "NO_ACTIVE_DEVICE");
    }

    #[test]
    fn test_empty_body_uses_reason_phrase() {
        let err = ApiError::from_response(429, "");
        assert_eq!(
            err,
            ApiError::Spotify {
                status_code: 429,
                message: "Too Many Requests".to_string(),
                body: None
            }
        );
    }

    #[test]
    fn test_system_error_serialization() {
        let err = ApiError::from(crate::Error::Auth("no tokens".to_string()));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"source": "system", "message": "Authentication error: no tokens"})
        );
    }
}
