//! `jadmin-auth`: pure authorization policy for the console client.
//!
//! This crate is intentionally decoupled from HTTP and storage: it answers
//! "may this user do X" and "may this navigation proceed" from in-memory
//! state only.

pub mod authorize;
pub mod capability;
pub mod guard;
pub mod password;
pub mod roles;

pub use authorize::{authorize, has_capability, AuthzError};
pub use capability::Capability;
pub use guard::{document_title, guard, NavigationDecision, Route, RouteMeta, RouteTable};
pub use password::{check_password_strength, PasswordStrength};
pub use roles::Role;
