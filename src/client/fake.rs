use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::resource::{
    ConsumerSpec, KeyCredential, PluginPayload, Record, RoutePayload, ServiceSpec,
};

use super::{ControlPlane, Failure, Outcome};

/// In-memory control plane that behaves like the admin API: the first create
/// of a name succeeds, the next ones adopt the existing entity.
#[derive(Default)]
pub struct FakeControlPlane {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    next_id: u64,

    services: HashMap<String, Record>,
    routes: HashMap<String, Record>,
    consumers: HashMap<String, Record>,
    plugins: HashSet<String>,

    failures: HashMap<&'static str, Failure>,

    calls: Vec<String>,
    payloads: Vec<Value>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call of `op` fail. `op` is one of `service`,
    /// `route`, `consumer`, `plugin` or `key`.
    pub fn fail(&self, op: &'static str, failure: Failure) {
        self.state.lock().unwrap().failures.insert(op, failure);
    }

    pub fn recover(&self, op: &'static str) {
        self.state.lock().unwrap().failures.remove(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.state.lock().unwrap().payloads.clone()
    }

    fn call<B: Serialize>(&self, op: &'static str, name: &str, body: &B) -> Result<(), Failure> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{op}:{name}"));
        state
            .payloads
            .push(serde_json::to_value(body).unwrap_or(Value::Null));
        match state.failures.get(op) {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    fn create_or_adopt(
        &self,
        op: &'static str,
        name: &str,
        select: fn(&mut FakeState) -> &mut HashMap<String, Record>,
    ) -> Outcome<Record> {
        let mut state = self.state.lock().unwrap();
        if let Some(record) = select(&mut state).get(name) {
            return Outcome::Exists(record.clone());
        }

        state.next_id += 1;
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(name.to_string()));
        let record = Record {
            id: format!("{op}-{}", state.next_id),
            fields,
        };
        select(&mut state).insert(name.to_string(), record.clone());
        Outcome::Created(record)
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn create_service(&self, spec: &ServiceSpec) -> Outcome<Record> {
        if let Err(failure) = self.call("service", &spec.name, spec) {
            return failure.into();
        }
        self.create_or_adopt("service", &spec.name, |s| &mut s.services)
    }

    async fn create_route(&self, payload: &RoutePayload) -> Outcome<Record> {
        if let Err(failure) = self.call("route", &payload.name, payload) {
            return failure.into();
        }
        self.create_or_adopt("route", &payload.name, |s| &mut s.routes)
    }

    async fn create_consumer(&self, spec: &ConsumerSpec) -> Outcome<Record> {
        if let Err(failure) = self.call("consumer", &spec.username, spec) {
            return failure.into();
        }
        self.create_or_adopt("consumer", &spec.username, |s| &mut s.consumers)
    }

    async fn create_plugin(&self, payload: &PluginPayload) -> Outcome<Option<Record>> {
        if let Err(failure) = self.call("plugin", &payload.name, payload) {
            return failure.into();
        }
        let mut state = self.state.lock().unwrap();
        if !state.plugins.insert(payload.name.clone()) {
            return Outcome::Exists(None);
        }
        state.next_id += 1;
        Outcome::Created(Some(Record {
            id: format!("plugin-{}", state.next_id),
            fields: Map::new(),
        }))
    }

    async fn issue_key(&self, username: &str, plugin_name: &str) -> Outcome<KeyCredential> {
        let name = format!("{username}/{plugin_name}");
        if let Err(failure) = self.call("key", &name, &Value::Null) {
            return failure.into();
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        Outcome::Created(KeyCredential {
            key: format!("key-{}", state.next_id),
            id: format!("cred-{}", state.next_id),
        })
    }
}
