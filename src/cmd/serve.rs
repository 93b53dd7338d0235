use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};

use crate::client::admin::AdminClient;
use crate::config::Config;
use crate::gateway::Gateway;
use crate::server::{RestfulContext, RestfulServer};

/// Synchronize, then serve forward-auth checks over HTTP
#[derive(Args)]
pub struct ServeArgs {
    /// Override the bind address from config.
    #[arg(long, short)]
    pub bind: Option<String>,
}

impl ServeArgs {
    pub async fn run(&self, mut cfg: Config) -> Result<()> {
        if let Some(bind) = &self.bind {
            cfg.server.override_bind(bind).context("validate --bind")?;
        }
        if cfg.gateway.enabled && !cfg.gateway.issues_key() {
            warn!("No consumer and plugin pair configured, requests will not be checked");
        }
        let gateway = Arc::new(Gateway::connect(&cfg.gateway, &cfg.authorization)?);

        if let Err(err) = gateway.synchronize().await {
            // Keep serving, a SIGHUP retries the synchronization.
            error!("Initial gateway synchronization failed: {err}");
        }

        let mut hangup = signal(SignalKind::hangup()).context("listen SIGHUP")?;
        let resync = Arc::clone(&gateway);
        tokio::spawn(async move {
            while hangup.recv().await.is_some() {
                info!("Received SIGHUP, resynchronizing gateway");
                Self::resync(&resync).await;
            }
        });

        let ctx = Arc::new(RestfulContext {
            enabled: gateway.is_enabled(),
            guard: gateway.guard(),
        });
        let mut srv = RestfulServer::new(cfg.server.bind, ctx);
        if let Some(keep_alive) = cfg.server.keep_alive_secs {
            srv.set_keep_alive_secs(keep_alive);
        }
        if let Some(workers) = cfg.server.workers {
            srv.set_workers(workers);
        }

        srv.run().await
    }

    async fn resync(gateway: &Gateway<AdminClient>) {
        match gateway.synchronize().await {
            Ok(state) => info!(
                "Gateway resynchronized, {} resources resolved",
                state.resources.len()
            ),
            Err(err) => warn!("Gateway resynchronization failed: {err}"),
        }
    }
}
