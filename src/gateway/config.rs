use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig};
use crate::resource::{ConsumerSpec, PluginSpec, RouteSpec, ServiceSpec};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Feature flag for the whole integration. When disabled nothing is
    /// synchronized and every request passes through.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "GatewayConfig::default_scheme")]
    pub scheme: String,

    #[serde(default = "GatewayConfig::default_host")]
    pub host: String,

    /// Admin API port, can be overridden by `KONG_PORT`.
    #[serde(default = "GatewayConfig::default_port")]
    pub port: u16,

    #[serde(default = "GatewayConfig::default_timeout_secs")]
    pub timeout_secs: u64,

    pub service: Option<ServiceSpec>,
    pub route: Option<RouteSpec>,
    pub consumer: Option<ConsumerSpec>,
    pub plugin: Option<PluginSpec>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scheme: Self::default_scheme(),
            host: Self::default_host(),
            port: Self::default_port(),
            timeout_secs: Self::default_timeout_secs(),
            service: None,
            route: None,
            consumer: None,
            plugin: None,
        }
    }
}

impl CommonConfig for GatewayConfig {
    fn complete(&mut self) -> Result<()> {
        match self.scheme.as_str() {
            "http" | "https" => {}
            _ => bail!(
                "invalid scheme, expect 'http' or 'https', not '{}'",
                self.scheme
            ),
        }

        self.host = expandenv("host", &self.host)?;
        if self.host.is_empty() {
            bail!("host is required");
        }

        if self.port == 0 {
            bail!("port must be greater than 0");
        }

        if self.timeout_secs < Self::MIN_TIMEOUT_SECS || self.timeout_secs > Self::MAX_TIMEOUT_SECS
        {
            bail!(
                "timeout_secs must be in range [{}, {}]",
                Self::MIN_TIMEOUT_SECS,
                Self::MAX_TIMEOUT_SECS
            );
        }

        if let Some(ref mut service) = self.service {
            complete_service(service).context("service")?;
        }

        if let Some(ref mut route) = self.route {
            complete_route(route).context("route")?;
            if let Some(ref service) = self.service {
                if route.service_name != service.name {
                    bail!(
                        "route: service_name '{}' does not match service '{}'",
                        route.service_name,
                        service.name
                    );
                }
            }
        }

        if let Some(ref mut consumer) = self.consumer {
            consumer.username = expandenv("username", &consumer.username)?;
            if consumer.username.is_empty() {
                bail!("consumer: username is required");
            }
        }

        if let Some(ref mut plugin) = self.plugin {
            if plugin.name.is_empty() {
                bail!("plugin: name is required");
            }
            plugin.consumer_username = expandenv("consumer_username", &plugin.consumer_username)?;
            if plugin.consumer_username.is_empty() {
                bail!("plugin: consumer_username is required");
            }
            if let Some(ref consumer) = self.consumer {
                if plugin.consumer_username != consumer.username {
                    bail!(
                        "plugin: consumer_username '{}' does not match consumer '{}'",
                        plugin.consumer_username,
                        consumer.username
                    );
                }
            }
        }

        Ok(())
    }
}

fn complete_service(service: &mut ServiceSpec) -> Result<()> {
    if service.name.is_empty() {
        bail!("name is required");
    }

    service.url = expandenv("url", &service.url)?;
    if !service.url.starts_with("http://") && !service.url.starts_with("https://") {
        bail!("url must start with 'http://' or 'https://'");
    }

    Ok(())
}

fn complete_route(route: &mut RouteSpec) -> Result<()> {
    if route.name.is_empty() {
        bail!("name is required");
    }
    if route.service_name.is_empty() {
        bail!("service_name is required");
    }
    if route.paths.is_empty() && route.hosts.is_empty() {
        bail!("at least one of paths or hosts is required");
    }
    for path in route.paths.iter() {
        if !path.starts_with('/') {
            bail!("path '{path}' must start with '/'");
        }
    }
    for method in route.methods.iter_mut() {
        *method = method.to_uppercase();
    }
    Ok(())
}

impl GatewayConfig {
    const MIN_TIMEOUT_SECS: u64 = 1;
    const MAX_TIMEOUT_SECS: u64 = 300;

    pub fn admin_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Key issuance needs both halves of the consumer+plugin pair.
    pub fn issues_key(&self) -> bool {
        self.consumer.is_some() && self.plugin.is_some()
    }

    fn default_scheme() -> String {
        String::from("http")
    }

    fn default_host() -> String {
        String::from("127.0.0.1")
    }

    fn default_port() -> u16 {
        8001
    }

    fn default_timeout_secs() -> u64 {
        10
    }
}
