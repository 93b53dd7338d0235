use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::authz::{Decision, GATEWAY_KEY_HEADER};
use crate::config::Config;
use crate::display;
use crate::gateway::Gateway;

/// Synchronize, then print the decision for a single request
#[derive(Args)]
pub struct CheckArgs {
    /// The request path, for example `/orders`.
    #[arg(long)]
    pub path: String,

    /// The request method.
    #[arg(long, short, default_value = "GET")]
    pub method: String,

    /// Value of the `x-gateway-key` header, omit to send none.
    #[arg(long, short)]
    pub key: Option<String>,
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    path: &'a str,
    method: String,
    allowed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl CheckArgs {
    pub async fn run(&self, cfg: Config) -> Result<()> {
        let gateway = Gateway::connect(&cfg.gateway, &cfg.authorization)?;
        gateway.synchronize().await.context("synchronize gateway")?;

        let mut headers = HeaderMap::new();
        if let Some(ref key) = self.key {
            let value = HeaderValue::from_str(key).context("invalid key value")?;
            headers.insert(HeaderName::from_static(GATEWAY_KEY_HEADER), value);
        }

        let decision = gateway.authorize(&self.path, &self.method, &headers);
        let record = match decision {
            Decision::Allow => None,
            Decision::Reject(kind) => Some(kind.record()),
        };
        display::display_json(CheckOutput {
            path: &self.path,
            method: self.method.to_uppercase(),
            allowed: record.is_none(),
            status: record.map(|r| r.status_code),
            error: record.map(|r| r.name),
        })
    }
}
