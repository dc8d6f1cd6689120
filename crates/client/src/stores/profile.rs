use serde::de::IgnoredAny;

use jadmin_core::{ChangePassword, PermissionCatalog, ProfileUpdate, UserProfile};

use crate::error::{ClientError, ClientResult};
use crate::pipeline::RequestPipeline;

/// Operations on the signed-in user's own account.
#[derive(Clone)]
pub struct ProfileStore {
    pipeline: RequestPipeline,
}

impl ProfileStore {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn change_password(&self, current: &str, new: &str) -> ClientResult<()> {
        let body = ChangePassword {
            current_password: current.to_string(),
            new_password: new.to_string(),
        };
        body.validate()?;
        self.require_session()?;

        let _: IgnoredAny = self.pipeline.post("/change-password", &body).await?;
        tracing::info!("password changed");
        Ok(())
    }

    /// Update the profile and write the result back into the session.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<UserProfile> {
        update.validate()?;
        self.require_session()?;

        let user: UserProfile = self.pipeline.put("/me", update).await?;
        self.pipeline.session().replace_profile(user.clone())?;
        Ok(user)
    }

    /// Effective permissions of the signed-in user (through their roles).
    pub async fn my_permissions(&self) -> ClientResult<PermissionCatalog> {
        self.require_session()?;
        self.pipeline.get("/my-permissions").await
    }

    fn require_session(&self) -> ClientResult<()> {
        if self.pipeline.session().token().is_some() {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }
}
