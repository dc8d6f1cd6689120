//! `jadmin-core`: wire-level building blocks shared by the console client.
//!
//! This crate contains **pure data** (no IO, no HTTP client, no runtime): the
//! uniform response envelope, typed identifiers and the user/role/permission
//! records exchanged with the backend.

pub mod envelope;
pub mod error;
pub mod id;
pub mod role;
pub mod user;

pub use envelope::{ApiEnvelope, EnvelopeOutcome, SUCCESS_CODE, UNAUTHORIZED_CODE};
pub use error::{ModelError, ModelResult};
pub use id::{PermissionId, RoleId, UserId};
pub use role::{
    AssignPermissions, PermissionCatalog, PermissionRecord, RoleDraft, RolePage, RoleRecord,
};
pub use user::{
    AssignRoles, AuthPayload, ChangePassword, LoginRequest, NewUser, ProfileUpdate,
    RegisterRequest, UserPage, UserProfile, UserUpdate,
};
