use chrono::Duration;

/// Token settings injected into the codec and long-term token manager.
///
/// Built once at process start; there is no global signing-key state.
#[derive(Clone)]
pub struct AuthConfig {
    /// Symmetric HMAC key.
    pub client_secret: Vec<u8>,
    /// `iss` claim used for tokens minted without an inherited issuer.
    pub issuer: String,
    /// Lifetime of session tokens.
    pub token_ttl: Duration,
    /// Lifetime of long-term tokens. Must exceed `token_ttl`.
    pub long_term_token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(client_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            client_secret: client_secret.into(),
            issuer: "datagate".to_string(),
            token_ttl: Duration::hours(1),
            long_term_token_ttl: Duration::days(30),
        }
    }
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("token_ttl", &self.token_ttl)
            .field("long_term_token_ttl", &self.long_term_token_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secret() {
        let cfg = AuthConfig::new("super-secret-key");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret-key"));
        assert!(cfg.long_term_token_ttl > cfg.token_ttl);
    }
}
