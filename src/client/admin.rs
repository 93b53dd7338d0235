use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::resource::{
    ConsumerSpec, KeyCredential, PluginPayload, Record, RoutePayload, ServiceSpec,
};

use super::{
    ControlPlane, Failure, Outcome, STATUS_BAD_GATEWAY, STATUS_CREATED, STATUS_DUPLICATED,
    STATUS_SUCCESS, STATUS_UNAVAILABLE,
};

pub const SERVICES_PATH: &str = "services";
pub const ROUTES_PATH: &str = "routes";
pub const CONSUMERS_PATH: &str = "consumers";
pub const PLUGINS_PATH: &str = "plugins";

pub const MIME_JSON: &str = "application/json";

/// Client for the control plane admin API.
#[derive(Debug, Clone)]
pub struct AdminClient {
    url: Url,
    client: reqwest::Client,
}

/// Raw reply of the admin API.
struct Reply {
    status: u16,
    body: String,
}

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
}

impl AdminClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = url.trim_end_matches('/');
        let parsed = match Url::parse(url) {
            Ok(url) => url,
            Err(_) => bail!("invalid admin url '{url}'"),
        };
        match parsed.scheme() {
            "http" | "https" => {}
            _ => bail!(
                "invalid url scheme, expect 'http' or 'https', not '{}'",
                parsed.scheme()
            ),
        }
        if parsed.cannot_be_a_base() {
            bail!("invalid admin url '{url}'");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build admin client")?;

        Ok(Self {
            url: parsed,
            client,
        })
    }

    pub async fn get_service(&self, name: &str) -> Result<Record, Failure> {
        self.fetch(SERVICES_PATH, name).await
    }

    pub async fn get_route(&self, name: &str) -> Result<Record, Failure> {
        self.fetch(ROUTES_PATH, name).await
    }

    pub async fn get_consumer(&self, username: &str) -> Result<Record, Failure> {
        self.fetch(CONSUMERS_PATH, username).await
    }

    /// POSTs the entity, on conflict adopts the existing one by fetching it
    /// with its name.
    async fn create_or_adopt<B>(&self, collection: &str, name: &str, body: &B) -> Outcome<Record>
    where
        B: Serialize + ?Sized + Sync,
    {
        let reply = match self.post(&[collection], body).await {
            Ok(reply) => reply,
            Err(failure) => return failure.into(),
        };

        match reply.status {
            STATUS_CREATED => match reply.decode::<Record>() {
                Ok(record) => {
                    info!("Created {collection} '{name}' with id '{}'", record.id);
                    Outcome::Created(record)
                }
                Err(failure) => failure.into(),
            },
            STATUS_DUPLICATED => {
                info!("{collection} '{name}' already exists, fetching it");
                match self.fetch(collection, name).await {
                    Ok(record) => Outcome::Exists(record),
                    Err(failure) => failure.into(),
                }
            }
            _ => reply.into_failure().into(),
        }
    }

    async fn fetch(&self, collection: &str, name: &str) -> Result<Record, Failure> {
        let url = self.endpoint(&[collection, name])?;
        let reply = self.execute(self.client.request(Method::GET, url)).await?;
        if reply.status != STATUS_SUCCESS {
            return Err(reply.into_failure());
        }
        reply.decode()
    }

    async fn post<B>(&self, segments: &[&str], body: &B) -> Result<Reply, Failure>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.endpoint(segments)?;
        let json = match serde_json::to_string(body) {
            Ok(json) => json,
            Err(e) => return Err(Failure::new(STATUS_BAD_GATEWAY, format!("encode body: {e}"))),
        };
        let req = self
            .client
            .request(Method::POST, url)
            .header("Content-Type", MIME_JSON)
            .body(json);
        self.execute(req).await
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Reply, Failure> {
        let req = match req.header("Accept", MIME_JSON).build() {
            Ok(req) => req,
            Err(e) => {
                return Err(Failure::new(
                    STATUS_UNAVAILABLE,
                    format!("build request failed: {e}"),
                ))
            }
        };
        debug!("Admin request: {} {}", req.method(), req.url());

        let resp = match self.client.execute(req).await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return Err(Failure::new(
                    STATUS_UNAVAILABLE,
                    format!("admin api timed out: {e}"),
                ))
            }
            Err(e) => {
                return Err(Failure::new(
                    STATUS_UNAVAILABLE,
                    format!("admin api unreachable: {e}"),
                ))
            }
        };

        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                return Err(Failure::new(
                    STATUS_BAD_GATEWAY,
                    format!("read admin api reply: {e}"),
                ))
            }
        };
        debug!("Admin reply: {status}, {} bytes", body.len());

        Ok(Reply { status, body })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, Failure> {
        let mut url = self.url.clone();
        match url.path_segments_mut() {
            Ok(mut path) => {
                path.pop_if_empty().extend(segments);
            }
            Err(_) => return Err(Failure::new(STATUS_UNAVAILABLE, "admin url cannot be a base")),
        }
        Ok(url)
    }
}

impl Reply {
    fn decode<T: DeserializeOwned>(&self) -> Result<T, Failure> {
        serde_json::from_str(&self.body).map_err(|e| {
            Failure::new(
                STATUS_BAD_GATEWAY,
                format!("admin api returned invalid json: {e}"),
            )
        })
    }

    fn into_failure(self) -> Failure {
        let message = match serde_json::from_str::<MessageBody>(&self.body) {
            Ok(MessageBody {
                message: Some(message),
            }) => message,
            _ => {
                let body = self.body.trim();
                if body.is_empty() {
                    format!("admin api returned status {}", self.status)
                } else {
                    body.to_string()
                }
            }
        };
        Failure::new(self.status, message)
    }
}

#[async_trait]
impl ControlPlane for AdminClient {
    async fn create_service(&self, spec: &ServiceSpec) -> Outcome<Record> {
        self.create_or_adopt(SERVICES_PATH, &spec.name, spec).await
    }

    async fn create_route(&self, payload: &RoutePayload) -> Outcome<Record> {
        self.create_or_adopt(ROUTES_PATH, &payload.name, payload)
            .await
    }

    async fn create_consumer(&self, spec: &ConsumerSpec) -> Outcome<Record> {
        self.create_or_adopt(CONSUMERS_PATH, &spec.username, spec)
            .await
    }

    async fn create_plugin(&self, payload: &PluginPayload) -> Outcome<Option<Record>> {
        let reply = match self.post(&[PLUGINS_PATH], payload).await {
            Ok(reply) => reply,
            Err(failure) => return failure.into(),
        };

        match reply.status {
            // The record is informational only, a body we cannot read does
            // not undo the creation.
            STATUS_CREATED => Outcome::Created(reply.decode::<Record>().ok()),
            STATUS_DUPLICATED => {
                info!("Plugin '{}' already exists", payload.name);
                Outcome::Exists(None)
            }
            _ => reply.into_failure().into(),
        }
    }

    async fn issue_key(&self, username: &str, plugin_name: &str) -> Outcome<KeyCredential> {
        let reply = match self
            .post(&[CONSUMERS_PATH, username, plugin_name], &serde_json::json!({}))
            .await
        {
            Ok(reply) => reply,
            Err(failure) => return failure.into(),
        };

        if reply.status != STATUS_CREATED {
            return reply.into_failure().into();
        }
        match reply.decode::<KeyCredential>() {
            Ok(credential) => {
                info!(
                    "Issued {plugin_name} credential '{}' for consumer '{username}'",
                    credential.id
                );
                Outcome::Created(credential)
            }
            Err(failure) => failure.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use httpmock::prelude::*;
    use serde_json::json;

    use crate::resource::EntityRef;

    use super::*;

    fn service_spec() -> ServiceSpec {
        ServiceSpec {
            name: "orders".to_string(),
            url: "http://orders.svc:8080".to_string(),
            retries: None,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            tags: vec![],
        }
    }

    fn client(server: &MockServer) -> AdminClient {
        AdminClient::new(&server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_new() {
        assert!(AdminClient::new("http://127.0.0.1:8001/", Duration::from_secs(1)).is_ok());
        assert!(AdminClient::new("ftp://127.0.0.1:8001", Duration::from_secs(1)).is_err());
        assert!(AdminClient::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_create_service_created() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/services")
                    .header("content-type", "application/json")
                    .json_body(json!({"name": "orders", "url": "http://orders.svc:8080"}));
                then.status(201)
                    .json_body(json!({"id": "svc-1", "name": "orders"}));
            })
            .await;

        let outcome = client(&server).create_service(&service_spec()).await;
        create.assert_async().await;

        match outcome {
            Outcome::Created(record) => {
                assert_eq!(record.id, "svc-1");
                assert_eq!(record.fields["name"], "orders");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_service_adopts_existing() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/services");
                then.status(409)
                    .json_body(json!({"message": "UNIQUE violation detected on '{name=\"orders\"}'"}));
            })
            .await;
        let fetch = server
            .mock_async(|when, then| {
                when.method(GET).path("/services/orders");
                then.status(200)
                    .json_body(json!({"id": "svc-1", "name": "orders"}));
            })
            .await;

        let outcome = client(&server).create_service(&service_spec()).await;
        create.assert_async().await;
        fetch.assert_async().await;

        match outcome {
            Outcome::Exists(record) => assert_eq!(record.id, "svc-1"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_conflict_with_failed_fetch() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/consumers");
                then.status(409).json_body(json!({"message": "conflict"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/consumers/svc-a");
                then.status(404).json_body(json!({"message": "Not found"}));
            })
            .await;

        let spec = ConsumerSpec {
            username: "svc-a".to_string(),
            custom_id: None,
            tags: vec![],
        };
        let outcome = client(&server).create_consumer(&spec).await;
        assert_eq!(
            outcome,
            Outcome::Failed {
                status: 404,
                message: "Not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_create_route_failed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/routes")
                    .json_body(json!({
                        "name": "orders-route",
                        "paths": ["/orders"],
                        "service": {"id": "svc-1"}
                    }));
                then.status(400)
                    .json_body(json!({"message": "schema violation (paths.1: should start with: /)"}));
            })
            .await;

        let spec = crate::resource::RouteSpec {
            name: "orders-route".to_string(),
            paths: vec!["/orders".to_string()],
            methods: vec![],
            hosts: vec![],
            strip_path: None,
            service_name: "orders".to_string(),
        };
        let payload = RoutePayload::new(&spec, EntityRef::Id("svc-1".to_string()));
        let outcome = client(&server).create_route(&payload).await;
        assert_eq!(
            outcome,
            Outcome::Failed {
                status: 400,
                message: "schema violation (paths.1: should start with: /)".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_failure_without_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/services");
                then.status(500).body("internal error");
            })
            .await;

        let outcome = client(&server).create_service(&service_spec()).await;
        assert_eq!(
            outcome,
            Outcome::Failed {
                status: 500,
                message: "internal error".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/services");
                then.status(201).body("{not json");
            })
            .await;

        let outcome = client(&server).create_service(&service_spec()).await;
        match outcome {
            Outcome::Failed { status, message } => {
                assert_eq!(status, STATUS_BAD_GATEWAY);
                assert!(message.contains("invalid json"), "{message}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client =
            AdminClient::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(2)).unwrap();

        let outcome = client.create_service(&service_spec()).await;
        match outcome {
            Outcome::Failed { status, .. } => assert_eq!(status, STATUS_UNAVAILABLE),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_plugin() {
        let server = MockServer::start_async().await;
        let payload = PluginPayload {
            name: "key-auth".to_string(),
            consumer: EntityRef::Id("c-1".to_string()),
            config: Default::default(),
        };

        let mut created = server
            .mock_async(|when, then| {
                when.method(POST).path("/plugins");
                then.status(201)
                    .json_body(json!({"id": "p-1", "name": "key-auth"}));
            })
            .await;
        let outcome = client(&server).create_plugin(&payload).await;
        match outcome {
            Outcome::Created(Some(record)) => assert_eq!(record.id, "p-1"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        created.delete_async().await;

        let conflict = server
            .mock_async(|when, then| {
                when.method(POST).path("/plugins");
                then.status(409).json_body(json!({"message": "conflict"}));
            })
            .await;
        let outcome = client(&server).create_plugin(&payload).await;
        assert_eq!(outcome, Outcome::Exists(None));
        // No follow-up fetch for plugins.
        conflict.assert_async().await;
    }

    #[tokio::test]
    async fn test_issue_key() {
        let server = MockServer::start_async().await;
        let issue = server
            .mock_async(|when, then| {
                when.method(POST).path("/consumers/svc-a/key-auth");
                then.status(201)
                    .json_body(json!({"id": "cred-1", "key": "s3cr3t", "consumer": {"id": "c-1"}}));
            })
            .await;

        let outcome = client(&server).issue_key("svc-a", "key-auth").await;
        issue.assert_async().await;
        assert_eq!(
            outcome,
            Outcome::Created(KeyCredential {
                key: "s3cr3t".to_string(),
                id: "cred-1".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_issue_key_failed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/consumers/svc-a/key-auth");
                then.status(404).json_body(json!({"message": "Not found"}));
            })
            .await;

        let outcome = client(&server).issue_key("svc-a", "key-auth").await;
        assert_eq!(
            outcome,
            Outcome::Failed {
                status: 404,
                message: "Not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_getters() {
        let server = MockServer::start_async().await;
        let service = server
            .mock_async(|when, then| {
                when.method(GET).path("/services/orders");
                then.status(200)
                    .json_body(json!({"id": "svc-1", "name": "orders", "port": 8080}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/routes/orders-route");
                then.status(200)
                    .json_body(json!({"id": "r-1", "name": "orders-route"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/consumers/svc-a");
                then.status(404).json_body(json!({"message": "Not found"}));
            })
            .await;

        let client = client(&server);
        let record = client.get_service("orders").await.unwrap();
        service.assert_async().await;
        assert_eq!(record.id, "svc-1");
        assert_eq!(record.fields["port"], 8080);

        let route = client.get_route("orders-route").await.unwrap();
        assert_eq!(route.id, "r-1");

        let err = client.get_consumer("svc-a").await.unwrap_err();
        assert_eq!(err, Failure::new(404, "Not found"));
    }
}
