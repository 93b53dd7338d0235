pub mod admin;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;

use crate::resource::{
    ConsumerSpec, KeyCredential, PluginPayload, Record, RoutePayload, ServiceSpec,
};

pub const STATUS_SUCCESS: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_DUPLICATED: u16 = 409;

/// Synthetic status for replies that could not be decoded.
pub const STATUS_BAD_GATEWAY: u16 = 502;
/// Synthetic status for requests that never got a reply.
pub const STATUS_UNAVAILABLE: u16 = 503;

/// Result of an admin API operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The entity was created by this call.
    Created(T),
    /// The entity already existed and was adopted.
    Exists(T),
    Failed { status: u16, message: String },
}

/// A failed admin API exchange, either an unexpected status or a transport
/// problem normalized into a synthetic status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub status: u16,
    pub message: String,
}

impl Failure {
    pub fn new(status: u16, message: impl ToString) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }
}

impl<T> From<Failure> for Outcome<T> {
    fn from(failure: Failure) -> Self {
        Outcome::Failed {
            status: failure.status,
            message: failure.message,
        }
    }
}

/// Operations the synchronizer needs from the control plane.
///
/// Implementations never return errors out of band: every problem, including
/// transport failures, is reported as [`Outcome::Failed`].
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create_service(&self, spec: &ServiceSpec) -> Outcome<Record>;

    async fn create_route(&self, payload: &RoutePayload) -> Outcome<Record>;

    async fn create_consumer(&self, spec: &ConsumerSpec) -> Outcome<Record>;

    /// Plugins are not fetched back on conflict, an adopted plugin carries no
    /// record.
    async fn create_plugin(&self, payload: &PluginPayload) -> Outcome<Option<Record>>;

    async fn issue_key(&self, username: &str, plugin_name: &str) -> Outcome<KeyCredential>;
}
