//! Signed token encoding/decoding (HS256).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use datagate_core::{AuthError, AuthResult};

use crate::claims::{RESERVED_CLAIMS, TokenClaims, validate_claims};
use crate::AuthConfig;

/// Wraps the HMAC signer/verifier with the service's claim conventions.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.client_secret)
    }

    /// Sign a new token expiring `ttl` from now.
    pub fn create_token(
        &self,
        token_id: Option<&str>,
        issuer: Option<&str>,
        base_claims: &serde_json::Map<String, serde_json::Value>,
        subject: &str,
        ttl: Duration,
    ) -> AuthResult<String> {
        self.create_token_at(token_id, issuer, base_claims, subject, ttl, Utc::now())
    }

    /// Sign a new token as of `now`.
    ///
    /// `sub`, `jti`, `iss`, `iat` and `exp` always come from the arguments,
    /// whatever `base_claims` contains. Identical inputs yield identical tokens.
    pub fn create_token_at(
        &self,
        token_id: Option<&str>,
        issuer: Option<&str>,
        base_claims: &serde_json::Map<String, serde_json::Value>,
        subject: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<String> {
        let mut extra = base_claims.clone();
        for reserved in RESERVED_CLAIMS {
            extra.remove(reserved);
        }

        let claims = TokenClaims {
            sub: subject.to_string(),
            iss: issuer.map(str::to_string),
            jti: token_id.map(str::to_string),
            iat: Some(now.timestamp()),
            exp: (now + ttl).timestamp(),
            extra,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::application(format!("failed to sign token: {e}")))
    }

    pub fn parse_token(&self, token: &str) -> AuthResult<TokenClaims> {
        self.parse_token_at(token, Utc::now())
    }

    /// Verify signature and expiry, returning the claims only if both pass.
    pub fn parse_token_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AuthError::not_authorized(e.to_string())
            })?;

        validate_claims(&data.claims, now).map_err(|e| AuthError::not_authorized(e.to_string()))?;

        Ok(data.claims)
    }
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}
