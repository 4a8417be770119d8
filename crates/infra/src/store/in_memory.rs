use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use datagate_auth::{Application, ApplicationStore, Role, RoleStore, StoreError, User, UserStore};
use datagate_core::{ApplicationId, Entity, ExpectedVersion, RoleId, UserId, Versioned};

fn put<E: Entity + Clone>(table: &mut HashMap<E::Id, E>, entity: &E) {
    table.insert(*entity.id(), entity.clone());
}

#[derive(Debug, Default, Clone)]
struct Tables {
    users: HashMap<UserId, User>,
    roles: HashMap<RoleId, Role>,
    applications: HashMap<ApplicationId, Application>,
}

impl Tables {
    /// Replace each role snapshot with the stored role of the same id.
    fn hydrate(&self, mut user: User) -> User {
        for role in &mut user.roles {
            if let Some(current) = self.roles.get(&role.id) {
                *role = current.clone();
            }
        }
        user
    }

    fn subject_taken(&self, subject: &str, by_other_than: UserId) -> bool {
        self.users
            .values()
            .any(|u| u.id != by_other_than && u.subject() == Some(subject))
    }

    /// Validate and apply one user write; the caller decides whether to keep
    /// the resulting tables.
    fn stage_user(&mut self, mut user: User, expected: ExpectedVersion) -> Result<User, StoreError> {
        let current = self.users.get(&user.id).map(Versioned::version);

        match (current, expected) {
            (None, ExpectedVersion::Exact(v)) if v > 0 => {
                return Err(StoreError::NotFound {
                    entity: "user",
                    id: user.id.to_string(),
                });
            }
            (Some(actual), expected) if !expected.matches(actual) => {
                return Err(StoreError::Conflict {
                    entity: "user",
                    id: user.id.to_string(),
                    expected,
                    actual,
                });
            }
            _ => {}
        }

        if let Some(subject) = user.subject() {
            if self.subject_taken(subject, user.id) {
                return Err(StoreError::Unique {
                    entity: "user",
                    column: "subject",
                    value: subject.to_string(),
                });
            }
        }

        user.version = current.unwrap_or(0) + 1;
        put(&mut self.users, &user);
        Ok(user)
    }
}

/// In-memory entity store.
///
/// Intended for tests/dev. Every write takes the single write lock, so batch
/// writes and read-modify-write cycles are atomic.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    tables: RwLock<Tables>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl UserStore for InMemoryEntityStore {
    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let tables = self.read()?;
        Ok(tables.users.get(&id).cloned().map(|u| tables.hydrate(u)))
    }

    fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.subject() == Some(subject))
            .cloned()
            .map(|u| tables.hydrate(u)))
    }

    fn merge_user(&self, user: User, expected: ExpectedVersion) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        let stored = tables.stage_user(user, expected)?;
        Ok(tables.hydrate(stored))
    }

    fn update_user(
        &self,
        id: UserId,
        apply: &mut dyn FnMut(&mut User),
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.write()?;
        let Some(current) = tables.users.get(&id).cloned() else {
            return Ok(None);
        };

        let mut updated = tables.hydrate(current);
        let version = updated.version;
        apply(&mut updated);
        // The closure may not move the user to another id.
        updated.id = id;

        let stored = tables.stage_user(updated, ExpectedVersion::Exact(version))?;
        Ok(Some(tables.hydrate(stored)))
    }

    fn save_users(&self, users: Vec<(User, ExpectedVersion)>) -> Result<Vec<User>, StoreError> {
        let mut tables = self.write()?;
        let mut staged = (*tables).clone();

        let mut saved = Vec::with_capacity(users.len());
        for (user, expected) in users {
            saved.push(staged.stage_user(user, expected)?);
        }

        *tables = staged;
        Ok(saved.into_iter().map(|u| tables.hydrate(u)).collect())
    }

    fn find_or_create_user(&self, subject: &str, mut candidate: User) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        if let Some(existing) = tables.users.values().find(|u| u.subject() == Some(subject)) {
            let existing = existing.clone();
            return Ok(tables.hydrate(existing));
        }

        candidate.subject = Some(subject.to_string());
        let stored = tables.stage_user(candidate, ExpectedVersion::Exact(0))?;
        tracing::debug!(user_id = %stored.id, %subject, "created user on first sight");
        Ok(tables.hydrate(stored))
    }
}

impl RoleStore for InMemoryEntityStore {
    fn get_role(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.read()?.roles.values().find(|r| r.name == name).cloned())
    }

    fn upsert_role(&self, role: Role) -> Result<Role, StoreError> {
        let mut tables = self.write()?;
        if tables.roles.values().any(|r| r.id != role.id && r.name == role.name) {
            return Err(StoreError::Unique {
                entity: "role",
                column: "name",
                value: role.name,
            });
        }
        put(&mut tables.roles, &role);
        Ok(role)
    }
}

impl ApplicationStore for InMemoryEntityStore {
    fn get_application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self.read()?.applications.get(&id).cloned())
    }

    fn upsert_application(&self, application: Application) -> Result<Application, StoreError> {
        let mut tables = self.write()?;
        put(&mut tables.applications, &application);
        Ok(application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagate_auth::Privilege;

    #[test]
    fn lookups_return_none_when_absent() {
        let store = InMemoryEntityStore::new();
        assert_eq!(store.get_user(UserId::new()).unwrap(), None);
        assert_eq!(store.find_user_by_subject("fence|nobody").unwrap(), None);
        assert_eq!(store.get_role(RoleId::new()).unwrap(), None);
        assert_eq!(store.get_application(ApplicationId::new()).unwrap(), None);
    }

    #[test]
    fn merge_bumps_version_and_checks_expectation() {
        let store = InMemoryEntityStore::new();
        let user = store
            .merge_user(User::new("fence|1"), ExpectedVersion::Exact(0))
            .unwrap();
        assert_eq!(user.version, 1);

        let again = store.merge_user(user.clone(), ExpectedVersion::Exact(0));
        assert!(matches!(again, Err(StoreError::Conflict { actual: 1, .. })));

        let updated = store.merge_user(user, ExpectedVersion::Exact(1)).unwrap();
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn subjects_are_unique() {
        let store = InMemoryEntityStore::new();
        store
            .merge_user(User::new("fence|1"), ExpectedVersion::Any)
            .unwrap();
        let clash = store.merge_user(User::new("fence|1"), ExpectedVersion::Any);
        assert!(matches!(clash, Err(StoreError::Unique { column: "subject", .. })));
    }

    #[test]
    fn failed_batch_persists_nothing() {
        let store = InMemoryEntityStore::new();
        let existing = store
            .merge_user(User::new("fence|existing"), ExpectedVersion::Any)
            .unwrap();

        let fresh = User::new("fence|fresh");
        let stale = (existing.clone(), ExpectedVersion::Exact(7));
        let result = store.save_users(vec![(fresh.clone(), ExpectedVersion::Exact(0)), stale]);

        assert!(result.is_err());
        assert_eq!(store.get_user(fresh.id).unwrap(), None);
        assert_eq!(store.get_user(existing.id).unwrap().unwrap().version, 1);
    }

    #[test]
    fn batch_rejects_duplicate_subjects_within_itself() {
        let store = InMemoryEntityStore::new();
        let result = store.save_users(vec![
            (User::new("fence|dup"), ExpectedVersion::Exact(0)),
            (User::new("fence|dup"), ExpectedVersion::Exact(0)),
        ]);
        assert!(matches!(result, Err(StoreError::Unique { .. })));
        assert_eq!(store.find_user_by_subject("fence|dup").unwrap(), None);
    }

    #[test]
    fn update_of_missing_user_in_batch_is_not_found() {
        let store = InMemoryEntityStore::new();
        let result = store.save_users(vec![(User::new("fence|ghost"), ExpectedVersion::Exact(3))]);
        assert!(matches!(result, Err(StoreError::NotFound { entity: "user", .. })));
    }

    #[test]
    fn update_user_is_read_modify_write() {
        let store = InMemoryEntityStore::new();
        let user = store
            .merge_user(User::new("fence|1"), ExpectedVersion::Any)
            .unwrap();

        let updated = store
            .update_user(user.id, &mut |u: &mut User| u.long_term_token = Some("t".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(updated.long_term_token(), Some("t"));
        assert_eq!(updated.version, 2);

        let missing = store.update_user(UserId::new(), &mut |_: &mut User| {}).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn find_or_create_is_idempotent() {
        let store = InMemoryEntityStore::new();
        let first = store
            .find_or_create_user("fence|7", User::default().with_email("a@example.org"))
            .unwrap();
        let second = store
            .find_or_create_user("fence|7", User::default().with_email("b@example.org"))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email.as_deref(), Some("a@example.org"));
        assert_eq!(second.subject(), Some("fence|7"));
    }

    #[test]
    fn users_see_current_role_definitions() {
        let store = InMemoryEntityStore::new();
        let role = store.upsert_role(Role::new("R1")).unwrap();
        let user = store
            .merge_user(User::new("fence|1").with_role(role.clone()), ExpectedVersion::Any)
            .unwrap();
        assert!(!user.has_privilege("P1"));

        store
            .upsert_role(role.with_privilege(Privilege::new("P1")))
            .unwrap();
        assert!(store.get_user(user.id).unwrap().unwrap().has_privilege("P1"));
    }

    #[test]
    fn role_names_are_unique() {
        let store = InMemoryEntityStore::new();
        store.upsert_role(Role::new("R1")).unwrap();
        assert!(store.upsert_role(Role::new("R1")).is_err());
        assert!(store.find_role_by_name("R1").unwrap().is_some());
    }
}
