//! Role and permission records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::id::{PermissionId, RoleId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub id: PermissionId,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "createdAt", alias = "CreatedAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt", alias = "UpdatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: bool,
    /// The backend sends `null` for roles without permissions.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub permissions: Vec<PermissionRecord>,
    #[serde(default, alias = "createdAt", alias = "CreatedAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt", alias = "UpdatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RoleRecord {
    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p.name == permission)
    }
}

/// Body of `POST /roles` and `PUT /roles/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDraft {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub status: bool,
}

impl RoleDraft {
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::validation("role name must not be empty"));
        }
        if self.display_name.trim().is_empty() {
            return Err(ModelError::validation("role display name must not be empty"));
        }
        Ok(())
    }
}

/// Body of `POST /permissions/assign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignPermissions {
    pub role_id: RoleId,
    pub permission_ids: Vec<PermissionId>,
}

/// Result of `GET /roles`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePage {
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
    #[serde(default)]
    pub total: u64,
}

/// Result of `GET /permissions` and `GET /my-permissions`.
///
/// `grouped` (keyed by resource) is only sent by the catalog endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCatalog {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub permissions: Vec<PermissionRecord>,
    #[serde(default)]
    pub grouped: BTreeMap<String, Vec<PermissionRecord>>,
    #[serde(default)]
    pub total: u64,
}

impl PermissionCatalog {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(|p| p.name.as_str())
    }

    /// Permissions for one resource, falling back to filtering the flat list
    /// when the backend did not send the grouped view.
    pub fn for_resource(&self, resource: &str) -> Vec<&PermissionRecord> {
        match self.grouped.get(resource) {
            Some(group) => group.iter().collect(),
            None => self
                .permissions
                .iter()
                .filter(|p| p.resource == resource)
                .collect(),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
