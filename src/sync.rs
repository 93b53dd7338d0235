use log::{error, info};
use thiserror::Error;

use crate::client::{ControlPlane, Outcome};
use crate::gateway::config::GatewayConfig;
use crate::resource::{
    EntityRef, KeyCredential, PluginPayload, Record, ResolvedResource, ResourceKind,
    RoutePayload,
};

/// Fatal failure of a synchronization run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("synchronize {kind} '{name}' failed: status {status}, {message}")]
    Resource {
        kind: ResourceKind,
        name: String,
        status: u16,
        message: String,
    },

    #[error("issue {plugin} key for consumer '{username}' failed: status {status}, {message}")]
    IssueKey {
        username: String,
        plugin: String,
        status: u16,
        message: String,
    },
}

/// Result of synchronizing a single resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Integration disabled or nothing declared for this kind.
    Skipped,
    Resolved(ResolvedResource),
}

impl Stage {
    pub fn resolved(&self) -> Option<&ResolvedResource> {
        match self {
            Stage::Skipped => None,
            Stage::Resolved(resource) => Some(resource),
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    pub resources: Vec<ResolvedResource>,
    pub credential: Option<KeyCredential>,
}

impl SyncState {
    pub fn get(&self, kind: ResourceKind) -> Option<&ResolvedResource> {
        self.resources.iter().find(|r| r.kind == kind)
    }
}

/// Reconciles the declared resources against the control plane, once per
/// call to [`Synchronizer::run`].
pub struct Synchronizer<C> {
    client: C,
    cfg: GatewayConfig,
}

impl<C: ControlPlane> Synchronizer<C> {
    pub fn new(client: C, cfg: GatewayConfig) -> Self {
        Self { client, cfg }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.cfg
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn sync_service(&self) -> Result<Stage, SyncError> {
        let spec = match self.cfg.service {
            Some(ref spec) if self.cfg.enabled => spec,
            _ => return Ok(Stage::Skipped),
        };

        let outcome = self.client.create_service(spec).await;
        resolve(ResourceKind::Service, &spec.name, outcome)
    }

    /// Routes point at the resolved service when there is one, otherwise at
    /// the declared service name.
    pub async fn sync_route(
        &self,
        service: Option<&ResolvedResource>,
    ) -> Result<Stage, SyncError> {
        let spec = match self.cfg.route {
            Some(ref spec) if self.cfg.enabled => spec,
            _ => return Ok(Stage::Skipped),
        };

        let service = match service {
            Some(service) => service.as_ref_or_name(),
            None => EntityRef::Name(spec.service_name.clone()),
        };
        let payload = RoutePayload::new(spec, service);

        let outcome = self.client.create_route(&payload).await;
        resolve(ResourceKind::Route, &spec.name, outcome)
    }

    pub async fn sync_consumer(&self) -> Result<Stage, SyncError> {
        let spec = match self.cfg.consumer {
            Some(ref spec) if self.cfg.enabled => spec,
            _ => return Ok(Stage::Skipped),
        };

        let outcome = self.client.create_consumer(spec).await;
        resolve(ResourceKind::Consumer, &spec.username, outcome)
    }

    pub async fn sync_plugin(
        &self,
        consumer: Option<&ResolvedResource>,
    ) -> Result<Stage, SyncError> {
        let spec = match self.cfg.plugin {
            Some(ref spec) if self.cfg.enabled => spec,
            _ => return Ok(Stage::Skipped),
        };

        let consumer = match consumer.and_then(|c| c.upstream_id.clone()) {
            Some(id) => EntityRef::Id(id),
            None => EntityRef::Username(spec.consumer_username.clone()),
        };
        let payload = PluginPayload::new(spec, consumer);

        match self.client.create_plugin(&payload).await {
            Outcome::Created(record) => {
                let id = record.map(|r| r.id);
                info!("Plugin '{}' created", spec.name);
                Ok(Stage::Resolved(ResolvedResource::new(
                    ResourceKind::Plugin,
                    &spec.name,
                    id,
                )))
            }
            Outcome::Exists(record) => {
                let id = record.map(|r| r.id);
                info!("Plugin '{}' adopted", spec.name);
                Ok(Stage::Resolved(ResolvedResource::new(
                    ResourceKind::Plugin,
                    &spec.name,
                    id,
                )))
            }
            Outcome::Failed { status, message } => {
                error!(
                    "Synchronize plugin '{}' failed: status {status}, {message}",
                    spec.name
                );
                Err(SyncError::Resource {
                    kind: ResourceKind::Plugin,
                    name: spec.name.clone(),
                    status,
                    message,
                })
            }
        }
    }

    /// Issues a key for the configured consumer+plugin pair. Returns `None`
    /// when the pair is not configured or the integration is disabled.
    pub async fn issue_key(&self) -> Result<Option<KeyCredential>, SyncError> {
        if !self.cfg.enabled {
            return Ok(None);
        }
        let (consumer, plugin) = match (&self.cfg.consumer, &self.cfg.plugin) {
            (Some(consumer), Some(plugin)) => (consumer, plugin),
            _ => return Ok(None),
        };

        match self
            .client
            .issue_key(&consumer.username, &plugin.name)
            .await
        {
            Outcome::Created(credential) | Outcome::Exists(credential) => Ok(Some(credential)),
            Outcome::Failed { status, message } => {
                error!(
                    "Issue {} key for consumer '{}' failed: status {status}, {message}",
                    plugin.name, consumer.username
                );
                Err(SyncError::IssueKey {
                    username: consumer.username.clone(),
                    plugin: plugin.name.clone(),
                    status,
                    message,
                })
            }
        }
    }

    /// Runs every stage in order: service, route, consumer, plugin, then key
    /// issuance. The first failure aborts the run.
    pub async fn run(&self) -> Result<SyncState, SyncError> {
        let mut state = SyncState::default();
        if !self.cfg.enabled {
            info!("Gateway integration disabled, skip synchronization");
            return Ok(state);
        }

        info!("Synchronizing gateway resources with {}", self.cfg.admin_url());

        let service = self.sync_service().await?;
        let route = self.sync_route(service.resolved()).await?;
        let consumer = self.sync_consumer().await?;
        let plugin = self.sync_plugin(consumer.resolved()).await?;

        for stage in [service, route, consumer, plugin] {
            if let Stage::Resolved(resource) = stage {
                state.resources.push(resource);
            }
        }

        state.credential = self.issue_key().await?;

        info!(
            "Gateway synchronized, {} resources resolved, key issued: {}",
            state.resources.len(),
            state.credential.is_some()
        );
        Ok(state)
    }
}

fn resolve(
    kind: ResourceKind,
    name: &str,
    outcome: Outcome<Record>,
) -> Result<Stage, SyncError> {
    match outcome {
        Outcome::Created(record) => {
            info!("{kind} '{name}' created with id '{}'", record.id);
            Ok(Stage::Resolved(ResolvedResource::new(
                kind,
                name,
                Some(record.id),
            )))
        }
        Outcome::Exists(record) => {
            info!("{kind} '{name}' adopted with id '{}'", record.id);
            Ok(Stage::Resolved(ResolvedResource::new(
                kind,
                name,
                Some(record.id),
            )))
        }
        Outcome::Failed { status, message } => {
            error!("Synchronize {kind} '{name}' failed: status {status}, {message}");
            Err(SyncError::Resource {
                kind,
                name: name.to_string(),
                status,
                message,
            })
        }
    }
}
