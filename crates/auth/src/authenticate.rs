//! Bearer token to [`Principal`] resolution.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use datagate_core::{ApplicationId, AuthError, AuthResult};

use crate::claims::{TokenKind, TokenSubject};
use crate::{Application, EntityStore, LongTermTokenManager, Principal, TokenCodec};

/// Resolves the caller of a request from the presented bearer token.
///
/// Rejections are `NotAuthorized`; store failures surface as `Application`.
#[derive(Clone)]
pub struct Authenticator {
    codec: Arc<TokenCodec>,
    store: Arc<dyn EntityStore>,
    issuer: Option<String>,
}

impl Authenticator {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn EntityStore>) -> Self {
        Self {
            codec,
            store,
            issuer: None,
        }
    }

    /// `iss` stamped on application tokens minted by this instance.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn authenticate(&self, raw_token: &str) -> AuthResult<Principal> {
        self.authenticate_at(raw_token, Utc::now())
    }

    pub fn authenticate_at(&self, raw_token: &str, now: DateTime<Utc>) -> AuthResult<Principal> {
        let claims = self.codec.parse_token_at(raw_token, now)?;
        let subject = claims.subject();

        match subject.kind {
            TokenKind::Application => {
                let application_id: ApplicationId = subject.subject.parse().map_err(|_| {
                    tracing::warn!(subject = %claims.sub, "application token carries a malformed id");
                    AuthError::not_authorized("Cannot parse token in header")
                })?;

                let application = self
                    .store
                    .get_application(application_id)?
                    .filter(|a| a.enabled)
                    .ok_or_else(|| {
                        tracing::warn!(%application_id, "application is unknown or disabled");
                        AuthError::not_authorized("Application doesn't exist or is disabled")
                    })?;

                tracing::debug!(%application_id, "authenticated application");
                Ok(Principal::Application(application))
            }
            TokenKind::Session | TokenKind::LongTerm => {
                let user = self
                    .store
                    .find_user_by_subject(&subject.subject)?
                    .ok_or_else(|| {
                        tracing::warn!(subject = %subject.subject, "token subject has no user");
                        AuthError::not_authorized("User doesn't exist anymore")
                    })?;

                if !user.active {
                    tracing::warn!(user_id = %user.id, "deactivated user presented a token");
                    return Err(AuthError::not_authorized("User has been deactivated."));
                }

                if subject.kind == TokenKind::LongTerm
                    && !LongTermTokenManager::is_current(&user, raw_token)
                {
                    tracing::warn!(user_id = %user.id, "stale long term token presented");
                    return Err(AuthError::not_authorized(
                        "Cannot find matched long term token, your token might have been refreshed.",
                    ));
                }

                tracing::debug!(user_id = %user.id, kind = ?subject.kind, "authenticated user");
                Ok(Principal::User(user))
            }
        }
    }

    /// Sign a token that authenticates `application` itself.
    pub fn mint_application_token(
        &self,
        application: &Application,
        ttl: Duration,
    ) -> AuthResult<String> {
        let subject = TokenSubject::application(application.id).encode();
        let mut claims = serde_json::Map::new();
        claims.insert("name".to_string(), application.name.clone().into());
        self.codec
            .create_token(None, self.issuer.as_deref(), &claims, &subject, ttl)
    }
}

impl core::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}
