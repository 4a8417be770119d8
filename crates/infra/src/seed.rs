//! Startup seeding of the in-memory store from a JSON document.
//!
//! ```json
//! { "applications": [...], "roles": [...], "users": [...] }
//! ```
//!
//! Entities use their serde representation. Applications go in first, then
//! roles, then users, so later sections may reference earlier ones.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use datagate_auth::{Application, ApplicationStore, Role, RoleStore, StoreError, User, UserStore};
use datagate_core::ExpectedVersion;

use crate::InMemoryEntityStore;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("cannot read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("seed document is invalid: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cannot store seeded entity: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub applications: usize,
    pub roles: usize,
    pub users: usize,
}

impl Seed {
    pub fn from_json(text: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, SeedError> {
        let text = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Write every entity into `store`; users must not exist yet.
    pub fn apply(self, store: &InMemoryEntityStore) -> Result<SeedSummary, SeedError> {
        let summary = SeedSummary {
            applications: self.applications.len(),
            roles: self.roles.len(),
            users: self.users.len(),
        };

        for application in self.applications {
            store.upsert_application(application)?;
        }
        for role in self.roles {
            store.upsert_role(role)?;
        }
        store.save_users(
            self.users
                .into_iter()
                .map(|u| (u, ExpectedVersion::Exact(0)))
                .collect(),
        )?;

        tracing::info!(
            applications = summary.applications,
            roles = summary.roles,
            users = summary.users,
            "entity store seeded"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"{
        "applications": [{
            "id": "0190a8f0-0000-7000-8000-000000000001",
            "name": "PICSURE",
            "privileges": [{
                "id": "0190a8f0-0000-7000-8000-000000000002",
                "name": "PIC_SURE_USER",
                "application_id": "0190a8f0-0000-7000-8000-000000000001"
            }]
        }],
        "roles": [{
            "id": "0190a8f0-0000-7000-8000-000000000003",
            "name": "Researcher",
            "privileges": [{
                "id": "0190a8f0-0000-7000-8000-000000000002",
                "name": "PIC_SURE_USER",
                "application_id": "0190a8f0-0000-7000-8000-000000000001"
            }]
        }],
        "users": [{
            "id": "0190a8f0-0000-7000-8000-000000000004",
            "subject": "fence|1",
            "roles": [{"id": "0190a8f0-0000-7000-8000-000000000003", "name": "Researcher"}]
        }]
    }"#;

    #[test]
    fn seed_populates_every_table() {
        let store = InMemoryEntityStore::new();
        let summary = Seed::from_json(SEED).unwrap().apply(&store).unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                applications: 1,
                roles: 1,
                users: 1
            }
        );

        let user = store.find_user_by_subject("fence|1").unwrap().unwrap();
        assert!(user.has_privilege("PIC_SURE_USER"));
        assert!(store.find_role_by_name("Researcher").unwrap().is_some());
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(matches!(Seed::from_json("{\"users\": 3}"), Err(SeedError::Parse(_))));
        assert!(matches!(
            Seed::from_path(Path::new("/nonexistent/datagate-seed.json")),
            Err(SeedError::Io { .. })
        ));
    }
}
