//! `jadmin-client`
//!
//! **Responsibility:** headless client for the Jing Admin console.
//!
//! This crate provides:
//! - Session management (login, persistence, periodic validity probe)
//! - An authenticated request pipeline with retry and central expiry handling
//! - User, role and profile stores over the backend API
//!
//! The backend stays the authority; this crate only caches what it returned.

pub mod config;
pub mod error;
pub mod error_handler;
pub mod notify;
pub mod pipeline;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod storage;
pub mod stores;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use error_handler::{report_error, user_message};
pub use notify::{NoticeLevel, Navigator, Notifier, TracingNavigator, TracingNotifier};
pub use pipeline::{RequestOptions, RequestPipeline, REQUEST_ID_HEADER};
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, TickOutcome, TokioScheduler};
pub use session::{Session, SessionManager, SessionRestore, SessionServices};
pub use state::{AppState, ClientDeps};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use stores::{ProfileStore, RoleStore, UserStore};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
