//! Entity stores: thin CRUD façades over the request pipeline that keep the
//! last fetched list for the UI.

pub mod profile;
pub mod roles;
pub mod users;

pub use profile::ProfileStore;
pub use roles::RoleStore;
pub use users::UserStore;
