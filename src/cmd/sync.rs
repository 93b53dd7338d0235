use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::config::Config;
use crate::display;
use crate::gateway::Gateway;
use crate::resource::ResolvedResource;

/// Synchronize the declared resources once and print what was resolved
#[derive(Args)]
pub struct SyncArgs {
    /// Also print the issued key.
    #[arg(long)]
    pub show_key: bool,
}

#[derive(Serialize)]
struct SyncOutput<'a> {
    enabled: bool,
    resources: &'a [ResolvedResource],

    #[serde(skip_serializing_if = "Option::is_none")]
    credential_id: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
}

impl SyncArgs {
    pub async fn run(&self, cfg: Config) -> Result<()> {
        let gateway = Gateway::connect(&cfg.gateway, &cfg.authorization)?;
        let state = gateway.synchronize().await.context("synchronize gateway")?;

        let credential = state.credential.as_ref();
        display::display_json(SyncOutput {
            enabled: gateway.is_enabled(),
            resources: &state.resources,
            credential_id: credential.map(|c| c.id.as_str()),
            key: credential
                .filter(|_| self.show_key)
                .map(|c| c.key.as_str()),
        })
    }
}
