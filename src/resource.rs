use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Desired state of an upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSpec {
    pub name: String,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    pub name: String,

    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(default)]
    pub methods: Vec<String>,

    #[serde(default)]
    pub hosts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_path: Option<bool>,

    /// Name of the service this route forwards to.
    pub service_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumerSpec {
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginSpec {
    pub name: String,

    /// Consumer the plugin is attached to, keys are issued for this pair.
    pub consumer_username: String,

    #[serde(default)]
    pub config: Map<String, Value>,
}

/// Reference to another entity in an admin API payload, either by id or by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityRef {
    Id(String),
    Name(String),
    Username(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePayload {
    pub name: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_path: Option<bool>,

    pub service: EntityRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginPayload {
    pub name: String,

    pub consumer: EntityRef,

    #[serde(skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

impl RoutePayload {
    pub fn new(spec: &RouteSpec, service: EntityRef) -> Self {
        Self {
            name: spec.name.clone(),
            paths: spec.paths.clone(),
            methods: spec.methods.clone(),
            hosts: spec.hosts.clone(),
            strip_path: spec.strip_path,
            service,
        }
    }
}

impl PluginPayload {
    pub fn new(spec: &PluginSpec, consumer: EntityRef) -> Self {
        Self {
            name: spec.name.clone(),
            consumer,
            config: spec.config.clone(),
        }
    }
}

/// An entity as returned by the admin API. Only the id is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Key issued by the control plane for a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCredential {
    pub key: String,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Service,
    Route,
    Consumer,
    Plugin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedResource {
    pub kind: ResourceKind,
    pub name: String,

    /// Upstream identifier. Only a plugin adopted after a conflict has none,
    /// the admin API does not report the existing plugin on 409.
    pub upstream_id: Option<String>,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Service => write!(f, "service"),
            ResourceKind::Route => write!(f, "route"),
            ResourceKind::Consumer => write!(f, "consumer"),
            ResourceKind::Plugin => write!(f, "plugin"),
        }
    }
}

impl ResolvedResource {
    pub fn new(kind: ResourceKind, name: impl ToString, upstream_id: Option<String>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            upstream_id,
        }
    }

    /// Reference used by dependent payloads: the upstream id when known,
    /// otherwise the name.
    pub fn as_ref_or_name(&self) -> EntityRef {
        match self.upstream_id {
            Some(ref id) => EntityRef::Id(id.clone()),
            None => EntityRef::Name(self.name.clone()),
        }
    }
}
