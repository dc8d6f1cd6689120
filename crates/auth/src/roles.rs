use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role carried on a user profile.
///
/// Roles are opaque strings; the only one with built-in meaning is
/// [`Role::ADMIN`], which is granted every capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == Self::ADMIN.as_str()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&jadmin_core::UserProfile> for Role {
    fn from(user: &jadmin_core::UserProfile) -> Self {
        Role::new(user.role.clone())
    }
}
