use std::sync::Arc;

use datagate_auth::{
    AccountService, AuthConfig, AuthorizationPolicy, Authenticator, EntityStore, TokenCodec,
    TokenIntrospector, UserAdministration,
};

/// Authorization services shared by every handler.
#[derive(Debug)]
pub struct AppServices {
    pub authenticator: Arc<Authenticator>,
    pub introspector: TokenIntrospector,
    pub accounts: AccountService,
    pub admin: UserAdministration,
}

impl AppServices {
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn EntityStore>,
        policy: Arc<dyn AuthorizationPolicy>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::from_config(config));
        Self {
            authenticator: Arc::new(
                Authenticator::new(codec.clone(), store.clone()).with_issuer(config.issuer.clone()),
            ),
            introspector: TokenIntrospector::new(codec.clone(), store.clone(), policy),
            accounts: AccountService::new(codec, store.clone(), config),
            admin: UserAdministration::new(store),
        }
    }
}
