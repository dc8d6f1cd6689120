use std::sync::{Arc, PoisonError, RwLock};

use serde::de::IgnoredAny;

use jadmin_core::{AssignRoles, NewUser, RoleId, UserId, UserPage, UserProfile, UserUpdate};

use crate::error::ClientResult;
use crate::pipeline::RequestPipeline;

/// User management (`/users`).
#[derive(Clone)]
pub struct UserStore {
    pipeline: RequestPipeline,
    snapshot: Arc<RwLock<UserPage>>,
}

impl UserStore {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self {
            pipeline,
            snapshot: Arc::new(RwLock::new(UserPage::default())),
        }
    }

    pub async fn fetch_users(&self) -> ClientResult<UserPage> {
        let page: UserPage = self.pipeline.get("/users").await?;
        tracing::debug!(count = page.users.len(), total = page.total, "fetched users");
        *self.write() = page.clone();
        Ok(page)
    }

    pub async fn get_user(&self, id: UserId) -> ClientResult<UserProfile> {
        self.pipeline.get(&format!("/users/{id}")).await
    }

    pub async fn create_user(&self, user: &NewUser) -> ClientResult<UserProfile> {
        user.validate()?;
        let created: UserProfile = self.pipeline.post("/users", user).await?;
        tracing::info!(user = %created.username, id = %created.id, "user created");

        let mut snapshot = self.write();
        snapshot.users.push(created.clone());
        snapshot.total += 1;
        Ok(created)
    }

    pub async fn update_user(&self, id: UserId, update: &UserUpdate) -> ClientResult<UserProfile> {
        update.validate()?;
        let updated: UserProfile = self.pipeline.put(&format!("/users/{id}"), update).await?;

        if let Some(slot) = self.write().users.iter_mut().find(|u| u.id == id) {
            *slot = updated.clone();
        }
        if self.pipeline.session().current_user().is_some_and(|me| me.id == id) {
            self.pipeline.session().replace_profile(updated.clone())?;
        }
        Ok(updated)
    }

    pub async fn delete_user(&self, id: UserId) -> ClientResult<()> {
        let _: IgnoredAny = self.pipeline.delete(&format!("/users/{id}")).await?;
        tracing::info!(%id, "user deleted");

        let mut snapshot = self.write();
        let before = snapshot.users.len();
        snapshot.users.retain(|u| u.id != id);
        if snapshot.users.len() < before {
            snapshot.total = snapshot.total.saturating_sub(1);
        }
        Ok(())
    }

    /// Replace the user's role set.
    pub async fn assign_roles(&self, id: UserId, role_ids: &[RoleId]) -> ClientResult<()> {
        let body = AssignRoles {
            role_ids: role_ids.to_vec(),
        };
        let _: IgnoredAny = self
            .pipeline
            .post(&format!("/users/{id}/roles"), &body)
            .await?;
        Ok(())
    }

    pub fn users(&self) -> Vec<UserProfile> {
        self.read().users.clone()
    }

    pub fn total(&self) -> u64 {
        self.read().total
    }

    pub fn admin_users(&self) -> Vec<UserProfile> {
        self.read()
            .users
            .iter()
            .filter(|u| jadmin_auth::Role::from(*u).is_admin())
            .cloned()
            .collect()
    }

    pub fn active_users(&self) -> Vec<UserProfile> {
        self.read().users.iter().filter(|u| u.status).cloned().collect()
    }

    pub fn reset(&self) {
        *self.write() = UserPage::default();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, UserPage> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, UserPage> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }
}
