use serde::Serialize;

use crate::{Application, User};

/// Authenticated caller of a request.
///
/// Resolved once at the transport boundary; downstream code matches on the
/// variant instead of downcasting.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    User(User),
    Application(Application),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Application,
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::User(_) => PrincipalKind::User,
            Principal::Application(_) => PrincipalKind::Application,
        }
    }

    pub fn identifier(&self) -> String {
        match self {
            Principal::User(user) => user.id.to_string(),
            Principal::Application(application) => application.id.to_string(),
        }
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            Principal::User(user) => Some(user),
            Principal::Application(_) => None,
        }
    }

    pub fn as_application(&self) -> Option<&Application> {
        match self {
            Principal::Application(application) => Some(application),
            Principal::User(_) => None,
        }
    }
}

impl core::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PrincipalKind::User => f.write_str("user"),
            PrincipalKind::Application => f.write_str("application"),
        }
    }
}
