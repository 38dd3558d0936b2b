//! Error types for the VisoLearn remote client shim.

use thiserror::Error;

/// Result type alias for client and service operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while talking to the hosted Space or persisting artifacts.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Bad or missing credential. Fatal to initialization; surfaced to the
    /// user with remediation text.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network failure or remote unavailable. Recoverable via retry or fallback.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Malformed remote response (empty body, non-JSON payload, missing
    /// fields). Never classified as success.
    #[error("Malformed remote response: {0}")]
    Protocol(String),

    /// A named endpoint invocation failed. Recoverable via fallback for
    /// generation/chat, fatal for save/export.
    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    /// Local filesystem failure while persisting session artifacts.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ClientError {
    /// Stable machine-readable tag for API bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Auth(_) => "auth",
            ClientError::Connection(_) => "connection",
            ClientError::Protocol(_) => "protocol",
            ClientError::RemoteCall(_) => "remote_call",
            ClientError::Storage(_) => "storage",
        }
    }

    /// True for failures that an operation with a local equivalent may absorb
    /// by substituting a fallback result.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_) | ClientError::Protocol(_) | ClientError::RemoteCall(_)
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ClientError::Connection(err.to_string())
        } else if err.is_decode() {
            ClientError::Protocol(err.to_string())
        } else {
            ClientError::RemoteCall(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_storage_are_not_degradable() {
        assert!(!ClientError::Auth("bad token".into()).is_degradable());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!ClientError::Storage(io).is_degradable());
    }

    #[test]
    fn remote_failures_are_degradable() {
        assert!(ClientError::Connection("down".into()).is_degradable());
        assert!(ClientError::Protocol("empty body".into()).is_degradable());
        assert!(ClientError::RemoteCall("boom".into()).is_degradable());
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(ClientError::Auth("x".into()).kind(), "auth");
        assert_eq!(ClientError::RemoteCall("x".into()).kind(), "remote_call");
    }
}
