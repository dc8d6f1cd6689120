//! Application wiring: builds the session, pipeline and stores once.

use std::sync::Arc;

use jadmin_auth::{NavigationDecision, RouteTable};

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::notify::{Navigator, Notifier, TracingNavigator, TracingNotifier};
use crate::pipeline::RequestPipeline;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::session::{SessionManager, SessionServices};
use crate::storage::{FileStorage, SessionStorage};
use crate::stores::{ProfileStore, RoleStore, UserStore};
use crate::transport::{ReqwestTransport, Transport};

/// Side-effecting collaborators the client is assembled from.
#[derive(Clone)]
pub struct ClientDeps {
    pub transport: Arc<dyn Transport>,
    pub storage: Arc<dyn SessionStorage>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Everything the console UI talks to.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionManager,
    pub pipeline: RequestPipeline,
    pub users: UserStore,
    pub roles: RoleStore,
    pub profile: ProfileStore,
}

impl AppState {
    pub fn new(config: ClientConfig, deps: ClientDeps) -> Self {
        let session = SessionManager::new(
            config.clone(),
            SessionServices {
                transport: deps.transport.clone(),
                storage: deps.storage,
                notifier: deps.notifier,
                scheduler: deps.scheduler,
            },
        );
        let pipeline = RequestPipeline::new(config, deps.transport, session.clone(), deps.navigator);

        Self {
            users: UserStore::new(pipeline.clone()),
            roles: RoleStore::new(pipeline.clone()),
            profile: ProfileStore::new(pipeline.clone()),
            session,
            pipeline,
        }
    }

    /// Real HTTP, file-backed session and tokio timers.
    pub fn production(config: ClientConfig) -> ClientResult<Self> {
        let storage = match &config.session_file {
            Some(path) => FileStorage::new(path.clone()),
            None => FileStorage::open_default()?,
        };
        tracing::info!(
            api = %config.api_base_url,
            session_file = %storage.path().display(),
            "initializing console client"
        );

        let deps = ClientDeps {
            transport: Arc::new(ReqwestTransport::new()),
            storage: Arc::new(storage),
            notifier: Arc::new(TracingNotifier),
            navigator: Arc::new(TracingNavigator),
            scheduler: Arc::new(TokioScheduler),
        };
        Ok(Self::new(config, deps))
    }

    /// Route guard for `path`. Only token presence counts; the probe is what
    /// validates the token.
    pub fn navigate(&self, path: &str) -> NavigationDecision {
        RouteTable::console().navigate(path, self.session.token().is_some())
    }

    /// Sign out and drop every cached list.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.users.reset();
        self.roles.reset();
    }
}
