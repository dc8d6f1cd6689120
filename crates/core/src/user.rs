//! User records and authentication payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::id::{RoleId, UserId};

/// Minimum accepted password length (mirrors the backend's binding rule).
pub const MIN_PASSWORD_LEN: usize = 6;

fn default_role() -> String {
    "user".to_string()
}

fn default_status() -> bool {
    true
}

/// Profile of a console user as returned by `/me`, `/users` and the auth
/// endpoints.
///
/// Timestamps accept the spellings emitted by the different endpoints
/// (`created_at`, `createdAt`, `CreatedAt`); unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(default, alias = "createdAt", alias = "CreatedAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt", alias = "UpdatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload of a successful login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user_info: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        require_non_empty("username", &self.username)?;
        require_non_empty("password", &self.password)
    }
}

/// Registration form.
///
/// `confirm_password` is a local check only and never leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub confirm_password: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> ModelResult<()> {
        require_non_empty("username", &self.username)?;
        require_email(&self.email)?;
        require_password(&self.password)?;
        match &self.confirm_password {
            Some(confirm) if confirm != &self.password => {
                Err(ModelError::validation("passwords do not match"))
            }
            _ => Ok(()),
        }
    }
}

/// Body of `POST /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_status")]
    pub status: bool,
}

impl NewUser {
    pub fn validate(&self) -> ModelResult<()> {
        require_non_empty("username", &self.username)?;
        require_email(&self.email)?;
        require_password(&self.password)
    }
}

/// Body of `PUT /users/{id}`; absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
}

impl UserUpdate {
    pub fn validate(&self) -> ModelResult<()> {
        if let Some(username) = &self.username {
            require_non_empty("username", username)?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        Ok(())
    }
}

/// Body of `PUT /me`. The backend replaces every field, so all are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub email: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub bio: String,
}

impl ProfileUpdate {
    pub fn validate(&self) -> ModelResult<()> {
        require_email(&self.email)
    }
}

/// Body of `POST /change-password`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePassword {
    pub fn validate(&self) -> ModelResult<()> {
        require_non_empty("current password", &self.current_password)?;
        require_password(&self.new_password)
    }
}

/// Body of `POST /users/{id}/roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRoles {
    pub role_ids: Vec<RoleId>,
}

/// Result of `GET /users`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub total: u64,
}

fn require_non_empty(field: &str, value: &str) -> ModelResult<()> {
    if value.trim().is_empty() {
        Err(ModelError::validation(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

fn require_email(email: &str) -> ModelResult<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ModelError::validation(format!("invalid email address '{email}'"))),
    }
}

fn require_password(password: &str) -> ModelResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        Err(ModelError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )))
    } else {
        Ok(())
    }
}
