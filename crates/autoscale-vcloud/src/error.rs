//! Error types for the vCloud Director driver.

use std::fmt;

/// Categorised error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcloudErrorKind {
    /// Required default (org/vdc) or session missing before use
    Configuration,
    /// Name absent after a completed discovery scan
    NotFound,
    /// Request builder invoked before its prerequisite document was fetched
    MissingDependency,
    /// Provider rejected the mutation submission itself (non-202)
    Submission(u16),
    /// Task reached terminal error on the provider
    Task,
    /// Authentication failed (401 / bad credentials)
    Authentication,
    /// API unreachable or connection-level failure
    Connection,
    /// HTTP / API error with status code
    Api(u16),
    /// XML parse / serialisation error
    Parse,
    /// Transport-level timeout (a task outliving its deadline is NOT an
    /// error — see `TaskOutcome::TimedOut`)
    Timeout,
    /// Generic
    Other,
}

/// Crate error type carrying a kind + human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcloudError {
    pub kind: VcloudErrorKind,
    pub message: String,
}

impl VcloudError {
    pub fn new(kind: VcloudErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::new(VcloudErrorKind::Configuration, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(VcloudErrorKind::NotFound, msg)
    }

    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::new(VcloudErrorKind::MissingDependency, msg)
    }

    pub fn submission(status: u16, msg: impl Into<String>) -> Self {
        Self::new(VcloudErrorKind::Submission(status), msg)
    }

    pub fn task(msg: impl Into<String>) -> Self {
        Self::new(VcloudErrorKind::Task, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(VcloudErrorKind::Authentication, msg)
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(VcloudErrorKind::Connection, msg)
    }

    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::new(VcloudErrorKind::Api(status), msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(VcloudErrorKind::Parse, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(VcloudErrorKind::Timeout, msg)
    }
}

impl fmt::Display for VcloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for VcloudError {}

impl From<VcloudError> for String {
    fn from(e: VcloudError) -> String {
        e.to_string()
    }
}

impl From<reqwest::Error> for VcloudError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("HTTP timeout: {e}"))
        } else if e.is_connect() {
            Self::connection(format!("Connection failed: {e}"))
        } else {
            Self::new(VcloudErrorKind::Other, format!("HTTP error: {e}"))
        }
    }
}

/// Convenience alias.
pub type VcloudResult<T> = Result<T, VcloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = VcloudError::not_found("Unknown network: net9");
        let s = err.to_string();
        assert!(s.contains("NotFound"));
        assert!(s.contains("net9"));
    }

    #[test]
    fn submission_carries_status() {
        let err = VcloudError::submission(400, "bad recompose");
        assert_eq!(err.kind, VcloudErrorKind::Submission(400));
    }

    #[test]
    fn from_string_conversion() {
        let err = VcloudError::configuration("no default org");
        let s: String = err.into();
        assert!(s.contains("no default org"));
    }
}
