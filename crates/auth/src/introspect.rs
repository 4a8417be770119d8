//! Token introspection.
//!
//! Answers, on behalf of a calling application, whether a user token is
//! currently active and what it grants. Verdicts about the *token* are
//! returned as [`Introspection::Inactive`]; only caller or data faults are
//! errors.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use datagate_core::{ApplicationId, AuthError, AuthResult};

use crate::claims::{TokenClaims, TokenKind};
use crate::resolver::{effective_privileges, total_privileges};
use crate::{
    Application, AuthorizationPolicy, EntityStore, LongTermTokenManager, Principal, TokenCodec,
    User,
};

pub const TOKEN_NOT_FOUND: &str = "Token not found";
pub const USER_NOT_FOUND: &str = "user doesn't exist";
pub const LONG_TERM_TOKEN_STALE: &str =
    "Cannot find matched long term token, your token might have been refreshed.";
pub const NOT_ENOUGH_PRIVILEGES: &str = "User doesn't have enough privileges.";

/// Introspection input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntrospectionRequest {
    #[serde(default)]
    pub token: Option<String>,
    /// Application whose privileges are reported; all privileges when absent.
    #[serde(skip)]
    pub application_id: Option<ApplicationId>,
    /// Opaque payload evaluated by the [`AuthorizationPolicy`].
    #[serde(default)]
    pub request: Option<Value>,
}

impl IntrospectionRequest {
    pub fn for_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    pub fn scoped_to(mut self, application_id: ApplicationId) -> Self {
        self.application_id = Some(application_id);
        self
    }

    pub fn with_request(mut self, request: Value) -> Self {
        self.request = Some(request);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Introspection {
    Active {
        claims: TokenClaims,
        /// Comma-joined names of every privilege the user holds.
        roles: String,
        privileges: BTreeSet<String>,
    },
    Inactive {
        message: String,
    },
}

impl Introspection {
    fn inactive(message: impl Into<String>) -> Self {
        Introspection::Inactive {
            message: message.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Introspection::Active { .. })
    }

    /// Wire representation.
    ///
    /// Active: the token's claims, overridden by `active`, `roles` and
    /// `privileges`. Inactive: exactly `{active: false, message}`.
    pub fn to_response(&self) -> Value {
        let mut map = Map::new();
        match self {
            Introspection::Active {
                claims,
                roles,
                privileges,
            } => {
                map.extend(claims.to_map());
                map.insert("active".to_string(), Value::Bool(true));
                map.insert("roles".to_string(), Value::String(roles.clone()));
                map.insert(
                    "privileges".to_string(),
                    Value::Array(privileges.iter().cloned().map(Value::String).collect()),
                );
            }
            Introspection::Inactive { message } => {
                map.insert("active".to_string(), Value::Bool(false));
                map.insert("message".to_string(), Value::String(message.clone()));
            }
        }
        Value::Object(map)
    }
}

pub struct TokenIntrospector {
    codec: Arc<TokenCodec>,
    store: Arc<dyn EntityStore>,
    policy: Arc<dyn AuthorizationPolicy>,
}

impl TokenIntrospector {
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn EntityStore>,
        policy: Arc<dyn AuthorizationPolicy>,
    ) -> Self {
        Self {
            codec,
            store,
            policy,
        }
    }

    pub fn introspect(&self, caller: &Principal, request: &IntrospectionRequest) -> AuthResult<Introspection> {
        self.introspect_at(caller, request, Utc::now())
    }

    pub fn introspect_at(
        &self,
        caller: &Principal,
        request: &IntrospectionRequest,
        now: DateTime<Utc>,
    ) -> AuthResult<Introspection> {
        tracing::info!(caller = %caller.identifier(), "token introspection starting");

        let token = match request.token.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                tracing::warn!("introspection request carries no token");
                return Ok(Introspection::inactive(TOKEN_NOT_FOUND));
            }
        };

        let claims = match self.codec.parse_token_at(token, now) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::info!(error = %e, "introspected token did not verify");
                return Ok(Introspection::inactive(e.public_message()));
            }
        };

        let Some(application) = caller.as_application() else {
            tracing::error!(
                caller = %caller.identifier(),
                kind = %caller.kind(),
                "token introspection attempted by a non-application principal"
            );
            return Err(AuthError::application(format!(
                "The application token does not associate with an application but {}",
                caller.kind()
            )));
        };

        let scope = match request.application_id {
            Some(id) => Some(self.store.get_application(id)?.ok_or_else(|| {
                AuthError::protocol(format!("Cannot find application by input UUID: {id}"))
            })?),
            None => None,
        };

        let subject = claims.subject();
        if subject.kind == TokenKind::Application {
            tracing::info!(subject = %claims.sub, "application tokens are not introspected as user tokens");
            return Ok(Introspection::inactive(USER_NOT_FOUND));
        }

        let user = match self.store.find_user_by_subject(&subject.subject)? {
            Some(user) if user.active => user,
            Some(user) => {
                tracing::info!(user_id = %user.id, "introspected token belongs to a deactivated user");
                return Ok(Introspection::inactive(USER_NOT_FOUND));
            }
            None => {
                tracing::info!(subject = %subject.subject, "could not find user for introspected token");
                return Ok(Introspection::inactive(USER_NOT_FOUND));
            }
        };

        let verdict = if subject.kind == TokenKind::LongTerm {
            LongTermTokenManager::is_current(&user, token).then_some(()).ok_or(LONG_TERM_TOKEN_STALE)
        } else {
            self.is_session_authorized(application, request.request.as_ref(), &user)
                .then_some(())
                .ok_or(NOT_ENOUGH_PRIVILEGES)
        };

        if let Err(message) = verdict {
            tracing::info!(user_id = %user.id, application_id = %application.id, reason = message, "token inactive");
            return Ok(Introspection::inactive(message));
        }

        let total = total_privileges(&user);
        let privileges = match &scope {
            Some(scope) => effective_privileges(&user, scope.id).names(),
            None => total.names(),
        };
        let roles = total.ordered_names().join(",");

        tracing::info!(
            user_id = %user.id,
            application_id = %application.id,
            long_term = subject.kind == TokenKind::LongTerm,
            "token introspection succeeded"
        );

        Ok(Introspection::Active {
            claims,
            roles,
            privileges,
        })
    }

    fn is_session_authorized(&self, application: &Application, request: Option<&Value>, user: &User) -> bool {
        user.has_roles()
            && (!application.defines_privileges() || !effective_privileges(user, application.id).is_empty())
            && self.policy.is_authorized(application, request, user)
    }
}

impl core::fmt::Debug for TokenIntrospector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenIntrospector").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inactive_response_has_exactly_two_fields() {
        let response = Introspection::inactive(TOKEN_NOT_FOUND).to_response();
        assert_eq!(response, json!({"active": false, "message": "Token not found"}));
    }

    #[test]
    fn active_response_overrides_colliding_claims() {
        let mut extra = Map::new();
        extra.insert("active".to_string(), json!("spoofed"));
        extra.insert("email".to_string(), json!("u@example.org"));
        let claims = TokenClaims {
            sub: "fence|1".to_string(),
            iss: Some("datagate".to_string()),
            jti: None,
            iat: Some(1),
            exp: 2,
            extra,
        };
        let response = Introspection::Active {
            claims,
            roles: "P1,P2".to_string(),
            privileges: BTreeSet::from(["P1".to_string()]),
        }
        .to_response();

        assert_eq!(response["active"], json!(true));
        assert_eq!(response["sub"], json!("fence|1"));
        assert_eq!(response["email"], json!("u@example.org"));
        assert_eq!(response["roles"], json!("P1,P2"));
        assert_eq!(response["privileges"], json!(["P1"]));
    }

    #[test]
    fn request_body_ignores_application_id() {
        let req: IntrospectionRequest =
            serde_json::from_value(json!({"token": "abc", "request": {"q": 1}})).unwrap();
        assert_eq!(req.token.as_deref(), Some("abc"));
        assert_eq!(req.request, Some(json!({"q": 1})));
        assert!(req.application_id.is_none());
    }
}
