//! Entity store ports.
//!
//! Lookups return `Ok(None)` when the entity does not exist; `Err` is reserved
//! for conflicts, uniqueness violations and backend failure.

use thiserror::Error;

use datagate_core::{ApplicationId, AuthError, ExpectedVersion, RoleId, UserId};

use crate::{Application, Role, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} with {column} '{value}' already exists")]
    Unique {
        entity: &'static str,
        column: &'static str,
        value: String,
    },

    #[error("concurrency conflict on {entity} {id} (expected: {expected:?}, actual: {actual})")]
    Conflict {
        entity: &'static str,
        id: String,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "entity store failure");
        AuthError::application(e.to_string())
    }
}

pub trait UserStore: Send + Sync {
    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError>;

    /// Insert or replace a user, bumping its version.
    ///
    /// `ExpectedVersion::Exact(0)` requires the user not to exist yet.
    fn merge_user(&self, user: User, expected: ExpectedVersion) -> Result<User, StoreError>;

    /// Atomic read-modify-write of one user.
    ///
    /// The closure runs under the store's write lock; `Ok(None)` when the user
    /// does not exist.
    fn update_user(
        &self,
        id: UserId,
        apply: &mut dyn FnMut(&mut User),
    ) -> Result<Option<User>, StoreError>;

    /// Persist every user in the batch or none of them.
    fn save_users(&self, users: Vec<(User, ExpectedVersion)>) -> Result<Vec<User>, StoreError>;

    /// Return the user with `subject`, inserting `candidate` if none exists.
    fn find_or_create_user(&self, subject: &str, candidate: User) -> Result<User, StoreError>;
}

pub trait RoleStore: Send + Sync {
    fn get_role(&self, id: RoleId) -> Result<Option<Role>, StoreError>;

    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;

    fn upsert_role(&self, role: Role) -> Result<Role, StoreError>;
}

pub trait ApplicationStore: Send + Sync {
    fn get_application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError>;

    fn upsert_application(&self, application: Application) -> Result<Application, StoreError>;
}

/// Everything the services need from storage.
pub trait EntityStore: UserStore + RoleStore + ApplicationStore {}

impl<T> EntityStore for T where T: UserStore + RoleStore + ApplicationStore {}
