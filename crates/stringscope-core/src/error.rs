//! Failures of the two remote operations.

use thiserror::Error;

/// Why a fetch or submit did not produce a new state.
///
/// Every variant is recoverable: the panel keeps its last good state and tries
/// again on the next tick or edit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// The request never completed (connection refused, timeout, ...).
    #[error("request failed: {0}")]
    NetworkFailure(String),

    /// The service answered but reported a failure.
    #[error("service reported an error{}: {payload}", status_suffix(.http_status))]
    ApplicationError {
        http_status: Option<u16>,
        payload: String,
    },

    /// The service reported success but the body lacks expected fields.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String, payload: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl NetworkError {
    pub fn malformed(reason: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            payload: payload.into(),
        }
    }

    /// Raw response body kept for diagnostics, if a response was received.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::NetworkFailure(_) => None,
            Self::ApplicationError { payload, .. } | Self::MalformedResponse { payload, .. } => {
                Some(payload)
            }
        }
    }

    /// Short tag for status lines and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NetworkFailure(_) => "network",
            Self::ApplicationError { .. } => "application",
            Self::MalformedResponse { .. } => "malformed",
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failure_has_no_payload() {
        let err = NetworkError::NetworkFailure("connection refused".into());
        assert_eq!(err.payload(), None);
        assert_eq!(err.kind(), "network");
    }

    #[test]
    fn application_error_keeps_payload() {
        let err = NetworkError::ApplicationError {
            http_status: Some(400),
            payload: r#"{"status":"error"}"#.into(),
        };
        assert_eq!(err.payload(), Some(r#"{"status":"error"}"#));
        assert!(err.to_string().contains("HTTP 400"));
    }

    #[test]
    fn application_error_without_http_status() {
        let err = NetworkError::ApplicationError {
            http_status: None,
            payload: "x".into(),
        };
        assert_eq!(err.to_string(), "service reported an error: x");
    }

    #[test]
    fn malformed_message_names_reason() {
        let err = NetworkError::malformed("missing mass_spectrum", "{}");
        assert_eq!(err.to_string(), "malformed response: missing mass_spectrum");
        assert_eq!(err.payload(), Some("{}"));
    }
}
