//! Error taxonomy shared by every layer of the service.

use thiserror::Error;

/// Result type used across the authorization core.
pub type AuthResult<T> = Result<T, AuthError>;

/// Message returned to callers in place of internal failure details.
pub const CONTACT_ADMIN: &str = "Inner application error, please contact admin.";

/// Authorization-core error.
///
/// Every failure here is semantic and deterministic; none of them are retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Token missing, malformed, expired, or signed with another key.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Malformed or disallowed caller input. The detail is safe to return.
    #[error("{0}")]
    Protocol(String),

    /// Internal invariant violation. The detail is logged, never returned.
    #[error("application error: {0}")]
    Application(String),
}

impl AuthError {
    pub fn not_authorized(msg: impl Into<String>) -> Self {
        Self::NotAuthorized(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn application(msg: impl Into<String>) -> Self {
        Self::Application(msg.into())
    }

    /// Text that may be shown to the caller.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::NotAuthorized(msg) | AuthError::Protocol(msg) => msg.clone(),
            AuthError::Application(_) => CONTACT_ADMIN.to_string(),
        }
    }
}
