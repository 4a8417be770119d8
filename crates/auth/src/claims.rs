use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::{APPLICATION_TOKEN_PREFIX, LONG_TERM_TOKEN_PREFIX, SUBJECT_SEPARATOR};

/// Claim names the codec owns; base claims never override them.
pub const RESERVED_CLAIMS: [&str; 5] = ["sub", "iss", "jti", "iat", "exp"];

/// Verified token claims.
///
/// Only produced by [`crate::TokenCodec::parse_token`] after signature and
/// expiry checks have passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Raw subject, including any kind prefix.
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Issued-at, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration, seconds since the epoch.
    pub exp: i64,

    /// Any additional claims carried by the token.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenClaims {
    pub fn subject(&self) -> TokenSubject {
        TokenSubject::parse(&self.sub)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// All claims as a flat JSON object.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued in the future)")]
    NotYetValid,
}

/// Allowed clock skew for `iat`, in seconds.
const IAT_LEEWAY_SECS: i64 = 60;

/// Deterministically validate the time window of verified claims.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if let Some(iat) = claims.iat {
        if iat > now + IAT_LEEWAY_SECS {
            return Err(TokenValidationError::NotYetValid);
        }
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// What a token's subject encodes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Ordinary user session token; subject is the user's subject.
    Session,
    /// Long-term user token; valid only while it equals the stored value.
    LongTerm,
    /// Application token; subject is the application id.
    Application,
}

/// Subject decoded once into an explicit kind and the unprefixed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenSubject {
    pub kind: TokenKind,
    pub subject: String,
}

impl TokenSubject {
    pub fn session(subject: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Session,
            subject: subject.into(),
        }
    }

    pub fn long_term(subject: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::LongTerm,
            subject: subject.into(),
        }
    }

    pub fn application(application_id: impl core::fmt::Display) -> Self {
        Self {
            kind: TokenKind::Application,
            subject: application_id.to_string(),
        }
    }

    /// Decode a raw subject claim.
    ///
    /// Repeated long-term prefixes collapse into one, so re-deriving a
    /// long-term token never accumulates prefixes.
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = strip_prefix(raw, APPLICATION_TOKEN_PREFIX) {
            return Self::application(rest);
        }

        let mut subject = raw;
        let mut long_term = false;
        while let Some(rest) = strip_prefix(subject, LONG_TERM_TOKEN_PREFIX) {
            subject = rest;
            long_term = true;
        }

        if long_term {
            Self::long_term(subject)
        } else {
            Self::session(subject)
        }
    }

    /// Encode back into the on-the-wire subject claim.
    pub fn encode(&self) -> String {
        match self.kind {
            TokenKind::Session => self.subject.clone(),
            TokenKind::LongTerm => {
                format!("{LONG_TERM_TOKEN_PREFIX}{SUBJECT_SEPARATOR}{}", self.subject)
            }
            TokenKind::Application => {
                format!("{APPLICATION_TOKEN_PREFIX}{SUBJECT_SEPARATOR}{}", self.subject)
            }
        }
    }
}

fn strip_prefix<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    raw.strip_prefix(prefix)?.strip_prefix(SUBJECT_SEPARATOR)
}
