use thiserror::Error;

use jadmin_core::UserProfile;

use crate::{Capability, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("forbidden: missing capability '{0}'")]
    Forbidden(String),
}

/// In-memory capability check.
///
/// - No IO
/// - No panics
/// - `admin` grants everything; any other role grants exactly the capability
///   of the same name
pub fn has_capability(user: Option<&UserProfile>, capability: &str) -> bool {
    let Some(user) = user else {
        return false;
    };

    let role = Role::from(user);
    role.is_admin() || role.as_str() == capability
}

/// Same policy as [`has_capability`], reporting why access was refused.
pub fn authorize(user: Option<&UserProfile>, required: &Capability) -> Result<(), AuthzError> {
    let Some(profile) = user else {
        return Err(AuthzError::Unauthenticated);
    };

    if has_capability(Some(profile), required.as_str()) {
        Ok(())
    } else {
        tracing::debug!(
            user = %profile.username,
            role = %profile.role,
            capability = %required,
            "capability check denied"
        );
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
