use serde_json::Value;

use crate::{Application, User};

/// Access-rule evaluation for introspection requests.
///
/// Evaluates the caller-supplied request payload against the user's access
/// rules. Implementations must be deterministic: a denial is final.
pub trait AuthorizationPolicy: Send + Sync {
    fn is_authorized(&self, application: &Application, request: Option<&Value>, user: &User) -> bool;
}

/// Policy that allows every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermitAll;

impl AuthorizationPolicy for PermitAll {
    fn is_authorized(&self, _application: &Application, _request: Option<&Value>, _user: &User) -> bool {
        true
    }
}

impl<F> AuthorizationPolicy for F
where
    F: Fn(&Application, Option<&Value>, &User) -> bool + Send + Sync,
{
    fn is_authorized(&self, application: &Application, request: Option<&Value>, user: &User) -> bool {
        self(application, request, user)
    }
}
