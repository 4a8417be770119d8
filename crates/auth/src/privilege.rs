use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use datagate_core::{ApplicationId, Entity, PrivilegeId};

/// Atomic, application-scoped access grant.
///
/// Privileges are shared between roles; a role holds a value snapshot of each
/// privilege it grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Privilege {
    pub id: PrivilegeId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Application the privilege applies to.
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
    #[serde(default)]
    pub query_scope: Option<String>,
    /// Query template fragment, stored as JSON text.
    #[serde(default)]
    pub query_template: Option<String>,
}

impl Privilege {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PrivilegeId::new(),
            name: name.into(),
            description: None,
            application_id: None,
            query_scope: None,
            query_template: None,
        }
    }

    pub fn for_application(mut self, application_id: ApplicationId) -> Self {
        self.application_id = Some(application_id);
        self
    }

    pub fn with_query_scope(mut self, scope: impl Into<String>) -> Self {
        self.query_scope = Some(scope.into());
        self
    }

    pub fn with_query_template(mut self, template: impl Into<String>) -> Self {
        self.query_template = Some(template.into());
        self
    }

    pub fn is_owned_by(&self, application_id: ApplicationId) -> bool {
        self.application_id == Some(application_id)
    }
}

impl Entity for Privilege {
    type Id = PrivilegeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Ordered, de-duplicated collection of privileges.
///
/// Iteration follows first-insertion order; a privilege already present (by
/// id) is not inserted twice. Template merging depends on this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegeSet {
    items: Vec<Privilege>,
    seen: HashSet<PrivilegeId>,
}

impl PrivilegeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when a privilege with the same id is already present.
    pub fn insert(&mut self, privilege: Privilege) -> bool {
        if !self.seen.insert(privilege.id) {
            return false;
        }
        self.items.push(privilege);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Privilege> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.items.iter().any(|p| p.name == name)
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.items.iter().map(|p| p.name.clone()).collect()
    }

    /// Names in iteration order, possibly repeated when two privileges share a name.
    pub fn ordered_names(&self) -> Vec<&str> {
        self.items.iter().map(|p| p.name.as_str()).collect()
    }
}

impl FromIterator<Privilege> for PrivilegeSet {
    fn from_iter<T: IntoIterator<Item = Privilege>>(iter: T) -> Self {
        let mut set = PrivilegeSet::new();
        for privilege in iter {
            set.insert(privilege);
        }
        set
    }
}

impl<'a> IntoIterator for &'a PrivilegeSet {
    type Item = &'a Privilege;
    type IntoIter = std::slice::Iter<'a, Privilege>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
