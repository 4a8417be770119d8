use serde::{Deserialize, Serialize};

use datagate_core::{ApplicationId, Entity};

use crate::Privilege;

/// Registered API-consuming client.
///
/// Applications authenticate with their own application tokens and own the
/// privileges they define.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub privileges: Vec<Privilege>,
}

fn default_enabled() -> bool {
    true
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ApplicationId::new(),
            name: name.into(),
            description: None,
            enabled: true,
            privileges: Vec::new(),
        }
    }

    /// Adds a privilege owned by this application.
    pub fn define_privilege(mut self, privilege: crate::Privilege) -> Self {
        self.privileges.push(privilege.for_application(self.id));
        self
    }

    /// Applications without privileges are open to every user holding a role.
    pub fn defines_privileges(&self) -> bool {
        !self.privileges.is_empty()
    }
}

impl Entity for Application {
    type Id = ApplicationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
