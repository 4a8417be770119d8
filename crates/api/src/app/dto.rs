use serde::{Deserialize, Serialize};
use serde_json::Value;

use datagate_auth::{AuthError, User};
use datagate_core::{ApplicationId, UserId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectQuery {
    pub application_id: Option<String>,
}

impl InspectQuery {
    /// Blank means "not scoped"; anything else must be a UUID.
    pub fn application_id(&self) -> Result<Option<ApplicationId>, AuthError> {
        match self.application_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AuthError::protocol("Input application UUID is incorrect.")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileQuery {
    /// Presence alone requests the long-term token (`?hasToken`).
    pub has_token: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTermTokenResponse {
    pub user_long_term_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTemplateResponse {
    pub query_template: Option<String>,
}

/// User as returned by the administration endpoints; never carries tokens.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub uuid: UserId,
    pub subject: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub active: bool,
    pub general_metadata: Value,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            uuid: user.id,
            subject: user.subject,
            email: user.email,
            roles: user.roles.into_iter().map(|r| r.name).collect(),
            active: user.active,
            general_metadata: user.general_metadata,
        }
    }
}
