//! Error taxonomy of the summary proxy.
//!
//! - [`ConfigError`]: local, not retryable, no upstream call made (HTTP 500)
//! - [`UpstreamError`]: anything that went wrong talking to Censys (HTTP 502)

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing CENSYS_API_ID or CENSYS_API_SECRET environment variables.")]
    MissingCredentials,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UpstreamError {
    /// Réponse non-2xx : on garde le code et le corps pour le diagnostic.
    #[error("Censys {path} failed: {status} {body}")]
    Status { path: String, status: u16, body: String },

    #[error("Censys {path} request failed: {message}")]
    Transport { path: String, message: String },

    #[error("Censys {path} timed out")]
    Timeout { path: String },

    #[error("Censys {path} returned an unreadable body: {message}")]
    Decode { path: String, message: String },
}

impl UpstreamError {
    /// HTTP status returned by Censys, when the call got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            UpstreamError::Status { path, .. }
            | UpstreamError::Transport { path, .. }
            | UpstreamError::Timeout { path }
            | UpstreamError::Decode { path, .. } => path,
        }
    }

    pub(crate) fn from_reqwest(path: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout { path: path.to_string() }
        } else if err.is_decode() {
            UpstreamError::Decode { path: path.to_string(), message: err.to_string() }
        } else {
            UpstreamError::Transport { path: path.to_string(), message: err.to_string() }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SummaryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl SummaryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SummaryError::Upstream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_keeps_code_and_body() {
        let err = UpstreamError::Status {
            path: "/hosts/search".into(),
            status: 403,
            body: "{\"error\":\"forbidden\"}".into(),
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.path(), "/hosts/search");
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("forbidden"));
    }

    #[test]
    fn test_only_upstream_errors_are_retryable() {
        assert!(!SummaryError::from(ConfigError::MissingCredentials).is_retryable());
        let timeout = UpstreamError::Timeout { path: "/hosts/stats/location.country_code".into() };
        assert_eq!(timeout.status(), None);
        assert!(SummaryError::from(timeout).is_retryable());
    }
}
