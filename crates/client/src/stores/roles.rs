use std::sync::{Arc, PoisonError, RwLock};

use serde::de::IgnoredAny;

use jadmin_core::{
    AssignPermissions, PermissionCatalog, PermissionId, RoleDraft, RoleId, RolePage, RoleRecord,
};

use crate::error::ClientResult;
use crate::pipeline::RequestPipeline;

#[derive(Debug, Default)]
struct RoleSnapshot {
    roles: RolePage,
    permissions: PermissionCatalog,
}

/// Role and permission management (`/roles`, `/permissions`).
#[derive(Clone)]
pub struct RoleStore {
    pipeline: RequestPipeline,
    snapshot: Arc<RwLock<RoleSnapshot>>,
}

impl RoleStore {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self {
            pipeline,
            snapshot: Arc::new(RwLock::new(RoleSnapshot::default())),
        }
    }

    pub async fn fetch_roles(&self) -> ClientResult<RolePage> {
        let page: RolePage = self.pipeline.get("/roles").await?;
        self.write().roles = page.clone();
        Ok(page)
    }

    pub async fn get_role(&self, id: RoleId) -> ClientResult<RoleRecord> {
        self.pipeline.get(&format!("/roles/{id}")).await
    }

    pub async fn create_role(&self, draft: &RoleDraft) -> ClientResult<RoleRecord> {
        draft.validate()?;
        let role: RoleRecord = self.pipeline.post("/roles", draft).await?;
        tracing::info!(role = %role.name, id = %role.id, "role created");

        let mut snapshot = self.write();
        snapshot.roles.roles.push(role.clone());
        snapshot.roles.total += 1;
        Ok(role)
    }

    pub async fn update_role(&self, id: RoleId, draft: &RoleDraft) -> ClientResult<RoleRecord> {
        draft.validate()?;
        let role: RoleRecord = self.pipeline.put(&format!("/roles/{id}"), draft).await?;

        if let Some(slot) = self.write().roles.roles.iter_mut().find(|r| r.id == id) {
            *slot = role.clone();
        }
        Ok(role)
    }

    pub async fn delete_role(&self, id: RoleId) -> ClientResult<()> {
        let _: IgnoredAny = self.pipeline.delete(&format!("/roles/{id}")).await?;
        tracing::info!(%id, "role deleted");

        let mut snapshot = self.write();
        let before = snapshot.roles.roles.len();
        snapshot.roles.roles.retain(|r| r.id != id);
        if snapshot.roles.roles.len() < before {
            snapshot.roles.total = snapshot.roles.total.saturating_sub(1);
        }
        Ok(())
    }

    /// Full permission catalog, grouped by resource.
    pub async fn fetch_permissions(&self) -> ClientResult<PermissionCatalog> {
        let catalog: PermissionCatalog = self.pipeline.get("/permissions").await?;
        self.write().permissions = catalog.clone();
        Ok(catalog)
    }

    /// Replace the permission set of a role, then refresh the role list so
    /// the snapshot reflects the new grants.
    pub async fn assign_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> ClientResult<RolePage> {
        let body = AssignPermissions {
            role_id,
            permission_ids: permission_ids.to_vec(),
        };
        let _: IgnoredAny = self.pipeline.post("/permissions/assign", &body).await?;
        tracing::info!(%role_id, count = permission_ids.len(), "permissions assigned");
        self.fetch_roles().await
    }

    pub fn roles(&self) -> Vec<RoleRecord> {
        self.read().roles.roles.clone()
    }

    pub fn total(&self) -> u64 {
        self.read().roles.total
    }

    pub fn active_roles(&self) -> Vec<RoleRecord> {
        self.read()
            .roles
            .roles
            .iter()
            .filter(|r| r.status)
            .cloned()
            .collect()
    }

    pub fn permissions(&self) -> PermissionCatalog {
        self.read().permissions.clone()
    }

    pub fn reset(&self) {
        *self.write() = RoleSnapshot::default();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RoleSnapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RoleSnapshot> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }
}
