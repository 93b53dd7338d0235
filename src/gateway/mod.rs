pub mod config;
pub mod guard;
pub mod middleware;

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::header::HeaderMap;
use anyhow::{Context, Result};
use log::{debug, warn};

use crate::authz::config::AuthorizationConfig;
use crate::authz::{Authorizer, AuthzRequest, Decision, PolicyStore, GATEWAY_KEY_HEADER};
use crate::client::admin::AdminClient;
use crate::client::ControlPlane;
use crate::resource::ResolvedResource;
use crate::sync::{Stage, SyncError, SyncState, Synchronizer};

use self::config::GatewayConfig;
use self::guard::KeyGuard;

/// Entry point of the integration. Owns the synchronizer and the guard that
/// the request path reads from.
pub struct Gateway<C> {
    syncer: Synchronizer<C>,
    guard: Arc<KeyGuard>,
}

impl Gateway<AdminClient> {
    /// Builds a gateway talking to the admin API described by `cfg`.
    pub fn connect(cfg: &GatewayConfig, authz: &AuthorizationConfig) -> Result<Self> {
        let client = AdminClient::new(&cfg.admin_url(), Duration::from_secs(cfg.timeout_secs))
            .context("init admin client")?;
        Self::new(client, cfg.clone(), authz)
    }
}

impl<C: ControlPlane> Gateway<C> {
    pub fn new(client: C, cfg: GatewayConfig, authz: &AuthorizationConfig) -> Result<Self> {
        let store = PolicyStore::new(authz).context("build policy store")?;
        Ok(Self {
            syncer: Synchronizer::new(client, cfg),
            guard: Arc::new(KeyGuard::new(store)),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.syncer.config().enabled
    }

    /// Shared handle for the request path, see [`middleware::gateway_key`].
    pub fn guard(&self) -> Arc<KeyGuard> {
        Arc::clone(&self.guard)
    }

    pub fn client(&self) -> &C {
        self.syncer.client()
    }

    pub async fn provision_service(&self) -> Result<Stage, SyncError> {
        self.syncer.sync_service().await
    }

    pub async fn provision_route(
        &self,
        service: Option<&ResolvedResource>,
    ) -> Result<Stage, SyncError> {
        self.syncer.sync_route(service).await
    }

    pub async fn provision_consumer(&self) -> Result<Stage, SyncError> {
        self.syncer.sync_consumer().await
    }

    pub async fn provision_plugin(
        &self,
        consumer: Option<&ResolvedResource>,
    ) -> Result<Stage, SyncError> {
        self.syncer.sync_plugin(consumer).await
    }

    /// Runs a full synchronization and publishes its result for the request
    /// path. A failed run clears the published state, requests pass through
    /// until a later call succeeds.
    pub async fn synchronize(&self) -> Result<Arc<SyncState>, SyncError> {
        match self.syncer.run().await {
            Ok(state) => {
                let state = Arc::new(state);
                self.guard.publish(Arc::clone(&state));
                Ok(state)
            }
            Err(err) => {
                self.guard.clear();
                warn!("Gateway integration disabled until the next successful sync: {err}");
                Err(err)
            }
        }
    }

    /// Decides a single request. `method` is matched case-insensitively.
    pub fn authorize(&self, path: &str, method: &str, headers: &HeaderMap) -> Decision {
        let method = method.to_ascii_uppercase();
        let key = headers.get(GATEWAY_KEY_HEADER).map(|value| value.as_bytes());
        let req = AuthzRequest {
            path,
            method: &method,
            key,
        };
        let decision = self.guard.authorize_request(&req);
        if let Decision::Reject(kind) = decision {
            debug!("Reject {method} {path}: {}", kind.record().name);
        }
        decision
    }
}
