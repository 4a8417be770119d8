//! Long-term token derivation and single-instance validation.
//!
//! A user holds at most one valid long-term token: the exact string stored on
//! the user record. Issuing a new one and persisting it revokes the previous
//! one, whatever its signature or expiry.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use datagate_core::{AuthError, AuthResult};

use crate::claims::{TokenClaims, TokenKind, TokenSubject};
use crate::{AuthConfig, TokenCodec, User};

#[derive(Debug, Clone)]
pub struct LongTermTokenManager {
    codec: Arc<TokenCodec>,
    ttl: Duration,
    issuer: Option<String>,
}

impl LongTermTokenManager {
    pub fn new(codec: Arc<TokenCodec>, ttl: Duration) -> Self {
        Self {
            codec,
            ttl,
            issuer: None,
        }
    }

    pub fn from_config(codec: Arc<TokenCodec>, config: &AuthConfig) -> Self {
        Self::new(codec, config.long_term_token_ttl).with_issuer(config.issuer.clone())
    }

    /// `iss` used when the source claims carry none.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn issue_long_term_token(&self, original: &TokenClaims) -> AuthResult<String> {
        self.issue_long_term_token_at(original, Utc::now())
    }

    /// Derive a long-term token from verified user-token claims.
    ///
    /// The caller must persist the result onto the user, replacing any prior
    /// value; that write is what revokes the previous token.
    pub fn issue_long_term_token_at(
        &self,
        original: &TokenClaims,
        now: DateTime<Utc>,
    ) -> AuthResult<String> {
        let subject = original.subject();
        if subject.kind == TokenKind::Application {
            return Err(AuthError::protocol(
                "Long term tokens can only be issued for users",
            ));
        }

        let derived = TokenSubject::long_term(subject.subject);
        tracing::debug!(subject = %derived.subject, "issuing long term token");

        self.codec.create_token_at(
            original.jti.as_deref(),
            original.iss.as_deref().or(self.issuer.as_deref()),
            &original.extra,
            &derived.encode(),
            self.ttl,
            now,
        )
    }

    /// A long-term token is current iff it equals the stored value byte for byte.
    pub fn is_current(user: &User, raw_token: &str) -> bool {
        user.long_term_token() == Some(raw_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<TokenCodec>, LongTermTokenManager) {
        let codec = Arc::new(TokenCodec::new(b"test-secret"));
        let manager = LongTermTokenManager::new(codec.clone(), Duration::days(30));
        (codec, manager)
    }

    fn session_claims(codec: &TokenCodec, subject: &str) -> TokenClaims {
        let token = codec
            .create_token(Some("jti"), Some("iss"), &serde_json::Map::new(), subject, Duration::hours(1))
            .unwrap();
        codec.parse_token(&token).unwrap()
    }

    #[test]
    fn long_term_subject_is_prefixed_once() {
        let (codec, manager) = setup();
        let first = manager
            .issue_long_term_token(&session_claims(&codec, "fence|7"))
            .unwrap();
        let first_claims = codec.parse_token(&first).unwrap();
        assert_eq!(first_claims.sub, "LONG_TERM_TOKEN|fence|7");

        // Re-deriving from a long-term token must not double the prefix.
        let second = manager.issue_long_term_token(&first_claims).unwrap();
        let second_claims = codec.parse_token(&second).unwrap();
        assert_eq!(second_claims.sub, "LONG_TERM_TOKEN|fence|7");
        assert_eq!(second_claims.jti.as_deref(), Some("jti"));
    }

    #[test]
    fn long_term_tokens_outlive_session_tokens() {
        let (codec, manager) = setup();
        let session = session_claims(&codec, "fence|7");
        let long_term = codec
            .parse_token(&manager.issue_long_term_token(&session).unwrap())
            .unwrap();
        assert!(long_term.exp > session.exp);
    }

    #[test]
    fn only_the_stored_value_is_current() {
        let (codec, manager) = setup();
        let now = Utc::now();
        let claims = session_claims(&codec, "fence|7");
        let t1 = manager.issue_long_term_token_at(&claims, now).unwrap();
        let t2 = manager
            .issue_long_term_token_at(&claims, now + Duration::seconds(5))
            .unwrap();
        assert_ne!(t1, t2);

        let mut user = User::new("fence|7");
        user.long_term_token = Some(t2.clone());
        assert!(LongTermTokenManager::is_current(&user, &t2));
        assert!(!LongTermTokenManager::is_current(&user, &t1));

        user.long_term_token = None;
        assert!(!LongTermTokenManager::is_current(&user, &t2));
    }

    #[test]
    fn issuer_is_inherited_or_defaulted() {
        let codec = Arc::new(TokenCodec::new(b"test-secret"));
        let manager = LongTermTokenManager::new(codec.clone(), Duration::days(30)).with_issuer("datagate");

        let inherited = manager
            .issue_long_term_token(&session_claims(&codec, "fence|7"))
            .unwrap();
        assert_eq!(codec.parse_token(&inherited).unwrap().iss.as_deref(), Some("iss"));

        let bare = codec
            .create_token(None, None, &serde_json::Map::new(), "fence|7", Duration::hours(1))
            .unwrap();
        let defaulted = manager
            .issue_long_term_token(&codec.parse_token(&bare).unwrap())
            .unwrap();
        assert_eq!(codec.parse_token(&defaulted).unwrap().iss.as_deref(), Some("datagate"));
    }

    #[test]
    fn application_tokens_cannot_derive_long_term_tokens() {
        let (codec, manager) = setup();
        let claims = session_claims(&codec, "PSAMA_APPLICATION|0190b5a8-0000-7000-8000-000000000000");
        assert!(matches!(
            manager.issue_long_term_token(&claims),
            Err(AuthError::Protocol(_))
        ));
    }
}
