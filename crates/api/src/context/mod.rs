//! Application context - dependency injection container

use std::sync::Arc;

use rentkenya_core::{AuthBackend, AuthService, ProfileStore, ReconcilePolicy, ViewGate};
use rentkenya_domain::{Config, Result, Session};
use rentkenya_infra::{
    config, AccessTokenProvider, BackendEndpoint, GoTrueAuthClient, HttpClient,
    PostgrestProfileStore,
};
use tokio::task::JoinHandle;
use tracing::info;

/// Type alias for auth backend port trait object
type DynAuthBackend = dyn AuthBackend + Send + Sync + 'static;

/// Type alias for profile store port trait object
type DynProfileStore = dyn ProfileStore + Send + Sync + 'static;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub auth: AuthService,
    pub gate: ViewGate,
    session_source: Option<Arc<GoTrueAuthClient>>,
    auto_refresh: Option<JoinHandle<()>>,
}

impl AppContext {
    /// Wire the hosted backend adapters and start the auth service.
    ///
    /// `persisted` seeds the auth client with a session saved by an earlier
    /// run. Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `RentalError::Config` for an invalid backend URL or key, or if
    /// the HTTP client cannot be built.
    pub fn new(config: Config, persisted: Option<Session>) -> Result<Self> {
        let http = HttpClient::from_config(&config.backend)?;
        let endpoint = BackendEndpoint::from_config(&config.backend)?;

        let mut client = GoTrueAuthClient::new(http.clone(), endpoint.clone());
        if let Some(session) = persisted {
            client = client.with_session(session);
        }
        let client = Arc::new(client);
        let auto_refresh = client.spawn_auto_refresh();

        let tokens: Arc<dyn AccessTokenProvider> = Arc::clone(&client) as _;
        let profiles: Arc<DynProfileStore> =
            Arc::new(PostgrestProfileStore::new(http, endpoint, tokens));
        let backend: Arc<DynAuthBackend> = Arc::clone(&client) as _;

        info!(backend = %config.backend.url, "application context ready");

        let mut ctx = Self::with_ports(config, backend, profiles);
        ctx.session_source = Some(client);
        ctx.auto_refresh = Some(auto_refresh);
        Ok(ctx)
    }

    /// Load configuration (environment first, then file) and build the context.
    ///
    /// # Errors
    /// See [`config::load`] and [`AppContext::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(config::load()?, None)
    }

    /// Build the context around caller-supplied ports.
    pub fn with_ports(
        config: Config,
        backend: Arc<DynAuthBackend>,
        profiles: Arc<DynProfileStore>,
    ) -> Self {
        let policy = ReconcilePolicy::from(&config.reconcile);
        let gate = ViewGate::from(&config.gate);
        let auth = AuthService::start(backend, profiles, policy);

        Self { config, auth, gate, session_source: None, auto_refresh: None }
    }

    /// Session to persist for the next run, if the backend holds one.
    #[must_use]
    pub fn session_to_persist(&self) -> Option<Session> {
        self.session_source.as_ref().and_then(|client| client.cached_session())
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        if let Some(handle) = self.auto_refresh.take() {
            handle.abort();
        }
    }
}
