//! Administrative user mutations.
//!
//! Batches are resolved and checked in full before anything is written, then
//! persisted atomically through [`crate::UserStore::save_users`].

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use datagate_core::{AuthError, AuthResult, ExpectedVersion, RoleId, UserId};

use crate::escalation::{check_batch, holds_super_admin};
use crate::naming::{ADMIN, FENCE_SUBJECT_PREFIX, SUBJECT_SEPARATOR};
use crate::store::StoreError;
use crate::{EntityStore, Role, User};

/// Reference to an existing role, by id or by unique name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleRef {
    #[serde(default, alias = "id")]
    pub uuid: Option<RoleId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// User as submitted to the batch endpoints.
///
/// On update only the fields present are applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    #[serde(default, alias = "id")]
    pub uuid: Option<UserId>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<RoleRef>>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub general_metadata: Option<Value>,
}

pub struct UserAdministration {
    store: Arc<dyn EntityStore>,
}

impl UserAdministration {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Create every user in the batch, or none.
    pub fn add_users(&self, acting: &User, drafts: Vec<UserDraft>) -> AuthResult<Vec<User>> {
        require_admin(acting)?;

        let mut users = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let roles = match &draft.roles {
                Some(refs) => self.resolve_roles(refs)?,
                None => Vec::new(),
            };
            let general_metadata = draft.general_metadata.map(normalize_metadata).unwrap_or_default();
            let email = draft
                .email
                .filter(|e| !e.trim().is_empty())
                .or_else(|| email_from_metadata(&general_metadata));

            users.push(User {
                id: draft.uuid.unwrap_or_default(),
                subject: draft.subject,
                email,
                roles,
                active: draft.active.unwrap_or(true),
                general_metadata,
                ..Default::default()
            });
        }

        check_batch(acting, users.iter().map(|u| (u, None)))?;

        let count = users.len();
        let saved = self
            .store
            .save_users(users.into_iter().map(|u| (u, ExpectedVersion::Exact(0))).collect())
            .map_err(batch_error)?;
        tracing::info!(acting_user = %acting.id, count, "users created");
        Ok(saved)
    }

    /// Update every user in the batch, or none.
    pub fn update_users(&self, acting: &User, drafts: Vec<UserDraft>) -> AuthResult<Vec<User>> {
        require_admin(acting)?;

        let mut changes = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let id = draft
                .uuid
                .ok_or_else(|| AuthError::protocol("Cannot update a user without a uuid"))?;
            let original = self
                .store
                .get_user(id)?
                .ok_or_else(|| AuthError::protocol(format!("Cannot find user by input UUID: {id}")))?;

            let mut updated = original.clone();
            if let Some(refs) = &draft.roles {
                updated.roles = self.resolve_roles(refs)?;
            }
            if let Some(subject) = draft.subject {
                updated.subject = Some(subject);
            }
            if let Some(email) = draft.email {
                updated.email = Some(email);
            }
            if let Some(active) = draft.active {
                updated.active = active;
            }
            if let Some(metadata) = draft.general_metadata {
                updated.general_metadata = normalize_metadata(metadata);
            }
            changes.push((updated, original));
        }

        check_batch(acting, changes.iter().map(|(u, o)| (u, Some(o))))?;

        let count = changes.len();
        let batch = changes
            .into_iter()
            .map(|(updated, original)| (updated, ExpectedVersion::Exact(original.version)))
            .collect();
        let saved = self.store.save_users(batch).map_err(batch_error)?;
        tracing::info!(acting_user = %acting.id, count, "users updated");
        Ok(saved)
    }

    /// Create or refresh the user behind a FENCE profile.
    ///
    /// Keyed by `fence|<user_id>`. Roles are cleared on every call.
    pub fn create_user_from_fence_profile(&self, profile: &Value) -> AuthResult<User> {
        let fence_id = match profile.get("user_id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(AuthError::protocol("FENCE profile has no user_id")),
        };
        let subject = format!("{FENCE_SUBJECT_PREFIX}{SUBJECT_SEPARATOR}{fence_id}");

        let candidate = User {
            subject: Some(subject.clone()),
            email: profile.get("email").and_then(Value::as_str).map(str::to_string),
            general_metadata: profile.clone(),
            accepted_tos: Some(Utc::now()),
            ..Default::default()
        };

        let user = self.store.find_or_create_user(&subject, candidate)?;
        let user = self
            .store
            .update_user(user.id, &mut |u: &mut User| u.roles.clear())?
            .ok_or_else(|| AuthError::application(format!("user {subject} vanished during creation")))?;

        tracing::debug!(user_id = %user.id, %subject, "user record synchronised from FENCE profile");
        Ok(user)
    }

    fn resolve_roles(&self, refs: &[RoleRef]) -> AuthResult<Vec<Role>> {
        let mut roles: Vec<Role> = Vec::with_capacity(refs.len());
        for role_ref in refs {
            let found = match (&role_ref.uuid, role_ref.name.as_deref()) {
                (Some(id), _) => self.store.get_role(*id)?,
                (None, Some(name)) => self.store.find_role_by_name(name)?,
                (None, None) => {
                    return Err(AuthError::protocol("Role reference needs a uuid or a name"));
                }
            };
            let role = found.ok_or_else(|| {
                let key = role_ref
                    .uuid
                    .map(|id| id.to_string())
                    .or_else(|| role_ref.name.clone())
                    .unwrap_or_default();
                AuthError::protocol(format!("Cannot find role by input: {key}"))
            })?;
            if !roles.iter().any(|r| r.id == role.id) {
                roles.push(role);
            }
        }
        Ok(roles)
    }
}

impl core::fmt::Debug for UserAdministration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserAdministration").finish_non_exhaustive()
    }
}

fn require_admin(acting: &User) -> AuthResult<()> {
    if acting.has_privilege(ADMIN) || holds_super_admin(acting) {
        return Ok(());
    }
    tracing::warn!(acting_user = %acting.id, roles = %acting.role_string(), "user administration denied");
    Err(AuthError::not_authorized("User doesn't have enough privileges."))
}

/// Store rejections caused by the submitted batch are caller errors.
fn batch_error(e: StoreError) -> AuthError {
    match e {
        StoreError::NotFound { entity, id } => {
            AuthError::protocol(format!("Cannot find {entity} by input UUID: {id}"))
        }
        StoreError::Unique { entity, column, value } => {
            AuthError::protocol(format!("A {entity} with {column} '{value}' already exists."))
        }
        StoreError::Conflict {
            entity,
            id,
            expected: ExpectedVersion::Exact(0),
            ..
        } => AuthError::protocol(format!("A {entity} with UUID {id} already exists.")),
        StoreError::Conflict { entity, id, .. } => AuthError::protocol(format!(
            "The {entity} with UUID {id} was changed concurrently or appears twice in the batch."
        )),
        other @ StoreError::Unavailable(_) => other.into(),
    }
}

/// Metadata may arrive as a JSON document or as JSON text.
fn normalize_metadata(metadata: Value) -> Value {
    match metadata {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

/// Value of the first metadata key mentioning "email", case-insensitively.
fn email_from_metadata(metadata: &Value) -> Option<String> {
    metadata
        .as_object()?
        .iter()
        .find(|(key, _)| key.to_lowercase().contains("email"))
        .and_then(|(_, value)| value.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_is_taken_from_first_matching_key() {
        let metadata = json!({"name": "Ada", "Primary_Email": "ada@example.org"});
        assert_eq!(email_from_metadata(&metadata).as_deref(), Some("ada@example.org"));
        assert_eq!(email_from_metadata(&json!({"name": "Ada"})), None);
        assert_eq!(email_from_metadata(&Value::Null), None);
    }

    #[test]
    fn caller_caused_store_errors_are_protocol_errors() {
        let unique = batch_error(StoreError::Unique {
            entity: "user",
            column: "subject",
            value: "fence|taken".to_string(),
        });
        assert_eq!(unique, AuthError::protocol("A user with subject 'fence|taken' already exists."));

        let existing = batch_error(StoreError::Conflict {
            entity: "user",
            id: "u-1".to_string(),
            expected: ExpectedVersion::Exact(0),
            actual: 1,
        });
        assert_eq!(existing, AuthError::protocol("A user with UUID u-1 already exists."));

        let twice = batch_error(StoreError::Conflict {
            entity: "user",
            id: "u-1".to_string(),
            expected: ExpectedVersion::Exact(3),
            actual: 4,
        });
        assert!(matches!(twice, AuthError::Protocol(msg) if msg.contains("appears twice")));

        let down = batch_error(StoreError::Unavailable("lock poisoned".to_string()));
        assert!(matches!(down, AuthError::Application(_)));
    }

    #[test]
    fn metadata_text_is_parsed() {
        let parsed = normalize_metadata(json!(r#"{"email": "x@example.org"}"#));
        assert_eq!(parsed, json!({"email": "x@example.org"}));
        assert_eq!(normalize_metadata(json!("not json")), json!("not json"));
    }

    #[test]
    fn draft_accepts_camel_case_and_partial_fields() {
        let draft: UserDraft = serde_json::from_value(json!({
            "subject": "fence|9",
            "generalMetadata": "{\"email\": \"n@example.org\"}",
            "roles": [{"name": "R1"}]
        }))
        .unwrap();
        assert_eq!(draft.subject.as_deref(), Some("fence|9"));
        assert!(draft.uuid.is_none());
        assert!(draft.active.is_none());
        assert_eq!(draft.roles.map(|r| r.len()), Some(1));
    }
}
