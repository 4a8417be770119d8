use datagate_auth::{AuthError, Principal, User};

/// Authenticated caller of a request, inserted by the bearer middleware.
///
/// Carries the raw token as presented; refresh endpoints re-derive tokens
/// from it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPrincipal {
    principal: Principal,
    token: String,
}

impl RequestPrincipal {
    pub fn new(principal: Principal, token: impl Into<String>) -> Self {
        Self {
            principal,
            token: token.into(),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn raw_token(&self) -> &str {
        &self.token
    }

    /// The calling user, for endpoints that only serve users.
    pub fn require_user(&self) -> Result<&User, AuthError> {
        self.principal.as_user().ok_or_else(|| {
            tracing::warn!(caller = %self.principal.identifier(), "user endpoint called by an application");
            AuthError::not_authorized("This endpoint requires a user token")
        })
    }
}
