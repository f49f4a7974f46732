use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Role level of the acting user, as resolved by the identity collaborator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RoleLevel {
    SystemAdministrator,
    CampusAdministrator,
    CampusStaff,
    Member,
}

/// The user on whose behalf an operation runs.
///
/// Identity and role are trusted as supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: RoleLevel,
}

impl Actor {
    pub fn new(user_id: Uuid, role: RoleLevel) -> Self {
        Self { user_id, role }
    }
}
