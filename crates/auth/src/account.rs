//! Self-service operations of the authenticated user.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use datagate_core::{ApplicationId, AuthError, AuthResult, UserId};

use crate::resolver::{merged_query_template, query_scopes, total_privileges};
use crate::{AuthConfig, EntityStore, LongTermTokenManager, TokenCodec, User};

/// A freshly re-signed session token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedToken {
    pub token: String,
    pub expiration_date: DateTime<Utc>,
}

/// What a user may see about themselves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uuid: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub privileges: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub query_scopes: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

pub struct AccountService {
    codec: Arc<TokenCodec>,
    long_term: LongTermTokenManager,
    store: Arc<dyn EntityStore>,
    token_ttl: Duration,
    issuer: String,
}

impl AccountService {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn EntityStore>, config: &AuthConfig) -> Self {
        Self {
            long_term: LongTermTokenManager::from_config(codec.clone(), config),
            codec,
            store,
            token_ttl: config.token_ttl,
            issuer: config.issuer.clone(),
        }
    }

    pub fn refresh_session_token(&self, user_id: UserId, raw_token: &str) -> AuthResult<RefreshedToken> {
        self.refresh_session_token_at(user_id, raw_token, Utc::now())
    }

    /// Re-sign the presented session token with a fresh expiry.
    ///
    /// The user is re-read so that removals and deactivations since the
    /// request was authenticated are honoured.
    pub fn refresh_session_token_at(
        &self,
        user_id: UserId,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<RefreshedToken> {
        let user = self.store.get_user(user_id)?.ok_or_else(|| {
            tracing::error!(%user_id, "user disappeared before token refresh");
            AuthError::not_authorized("User doesn't exist anymore")
        })?;

        if !user.active {
            tracing::error!(%user_id, "user was deactivated before token refresh");
            return Err(AuthError::not_authorized("User has been deactivated."));
        }

        let subject = user.subject().ok_or_else(|| {
            AuthError::application(format!("stored user {user_id} has no subject"))
        })?;

        let claims = self
            .codec
            .parse_token_at(raw_token, now)
            .map_err(|_| AuthError::protocol("Cannot parse original token"))?;

        if claims.sub != subject {
            return Err(AuthError::application(format!(
                "token subject '{}' does not match stored subject of user {user_id}",
                claims.sub
            )));
        }

        let token = self.codec.create_token_at(
            claims.jti.as_deref(),
            Some(claims.iss.as_deref().unwrap_or(&self.issuer)),
            &claims.extra,
            subject,
            self.token_ttl,
            now,
        )?;
        let expires = now + self.token_ttl;
        let expiration_date = DateTime::from_timestamp(expires.timestamp(), 0).unwrap_or(expires);

        tracing::debug!(%user_id, %expiration_date, "session token refreshed");
        Ok(RefreshedToken {
            token,
            expiration_date,
        })
    }

    /// Profile of the current user.
    ///
    /// With `with_token`, the stored long-term token is returned; one is
    /// derived from `raw_token` and persisted first if the user has none.
    pub fn current_profile(&self, user_id: UserId, raw_token: &str, with_token: bool) -> AuthResult<UserProfile> {
        let user = self.load_current_user(user_id)?;

        let token = if !with_token {
            None
        } else if let Some(existing) = user.long_term_token() {
            Some(existing.to_string())
        } else {
            let issued = self.derive_long_term_token(raw_token)?;
            let stored = self
                .store
                .update_user(user_id, &mut |u: &mut User| {
                    // A concurrent request may have stored one already; keep it.
                    if u.long_term_token().is_none() {
                        u.long_term_token = Some(issued.clone());
                    }
                })?
                .ok_or_else(|| missing_current_user(user_id))?;
            tracing::info!(%user_id, "long term token issued for profile request");
            stored.long_term_token
        };

        Ok(UserProfile {
            uuid: user.id,
            email: user.email.clone(),
            privileges: total_privileges(&user).names(),
            query_scopes: query_scopes(&user),
            token,
        })
    }

    /// Issue a new long-term token, revoking the previous one.
    pub fn refresh_long_term_token(&self, user_id: UserId, raw_token: &str) -> AuthResult<String> {
        self.load_current_user(user_id)?;
        let issued = self.derive_long_term_token(raw_token)?;

        self.store
            .update_user(user_id, &mut |u: &mut User| {
                u.long_term_token = Some(issued.clone());
            })?
            .ok_or_else(|| missing_current_user(user_id))?;

        tracing::info!(%user_id, "long term token re-issued");
        Ok(issued)
    }

    /// Merged query template of the current user for one application, as JSON text.
    pub fn query_template(&self, user_id: UserId, application_id: Option<&str>) -> AuthResult<Option<String>> {
        let raw_id = application_id.map(str::trim).unwrap_or_default();
        if raw_id.is_empty() {
            tracing::error!("query template requested without an application id");
            return Err(AuthError::protocol("Input application UUID is incorrect."));
        }
        let id: ApplicationId = raw_id
            .parse()
            .map_err(|_| AuthError::protocol("Input application UUID is incorrect."))?;

        let user = self.load_current_user(user_id)?;
        let application = self.store.get_application(id)?.ok_or_else(|| {
            tracing::error!(application_id = %id, "query template requested for unknown application");
            AuthError::protocol(format!("Cannot find application by input UUID: {raw_id}"))
        })?;

        let merged = merged_query_template(&user, application.id)?;
        Ok(merged.map(|template| template.to_string()))
    }

    fn load_current_user(&self, user_id: UserId) -> AuthResult<User> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| missing_current_user(user_id))
    }

    fn derive_long_term_token(&self, raw_token: &str) -> AuthResult<String> {
        let claims = self
            .codec
            .parse_token(raw_token)
            .map_err(|_| AuthError::protocol("Cannot parse token in header"))?;
        self.long_term.issue_long_term_token(&claims)
    }
}

fn missing_current_user(user_id: UserId) -> AuthError {
    tracing::error!(%user_id, "authenticated user is missing from the store");
    AuthError::application(format!("current user {user_id} not found"))
}

impl core::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountService")
            .field("long_term", &self.long_term)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}
