//! User entity for identity and role membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use datagate_core::{Entity, UserId, Versioned};

use crate::Role;

/// Identity record.
///
/// # Invariants
/// - `subject` is unique across users (enforced by the store).
/// - `long_term_token` holds the only long-term token currently valid for the
///   user; replacing it revokes the previous one.
/// - Users are deactivated, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Identity-provider-qualified subject (e.g. `fence|1234`).
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub long_term_token: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Free-form metadata document supplied by the identity provider or admin.
    #[serde(default)]
    pub general_metadata: serde_json::Value,
    #[serde(default)]
    pub accepted_tos: Option<DateTime<Utc>>,
    /// Storage version; bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
}

fn default_active() -> bool {
    true
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: UserId::new(),
            subject: None,
            email: None,
            roles: Vec::new(),
            long_term_token: None,
            active: true,
            general_metadata: serde_json::Value::Null,
            accepted_tos: None,
            version: 0,
        }
    }
}

impl User {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref().filter(|s| !s.is_empty())
    }

    pub fn long_term_token(&self) -> Option<&str> {
        self.long_term_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn has_roles(&self) -> bool {
        !self.roles.is_empty()
    }

    /// Whether any of the user's roles grants a privilege with this name.
    pub fn has_privilege(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.has_privilege(name))
    }

    /// Comma-joined role names, for logging.
    pub fn role_string(&self) -> String {
        self.roles
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Versioned for User {
    fn version(&self) -> u64 {
        self.version
    }
}
