//! Scripted [`RemoteClient`] for driver and collector tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::ncc::error::Result;
use crate::ncc::{NccError, NccResponse, RemoteClient};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Create,
    Update,
    Remove,
    Retrieve,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoteCall {
    pub op: Op,
    pub tenant_id: String,
    pub path: String,
    pub resource_key: Option<String>,
    pub body: Option<Map<String, Value>>,
}

/// Succeeds with `{}` unless told otherwise.
///
/// `fail` makes every call of an op on a path fail. `respond` queues bodies
/// for retrieves on a path; the last queued body keeps being returned.
#[derive(Default)]
pub struct FakeRemote {
    calls: Mutex<Vec<RemoteCall>>,
    failures: Mutex<HashSet<(Op, String)>>,
    bodies: Mutex<HashMap<String, VecDeque<String>>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, op: Op, path: &str) -> &Self {
        self.failures.lock().unwrap().insert((op, path.to_string()));
        self
    }

    pub fn recover(&self, op: Op, path: &str) -> &Self {
        self.failures.lock().unwrap().remove(&(op, path.to_string()));
        self
    }

    pub fn respond(&self, path: &str, body: Value) -> &Self {
        self.bodies
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(body.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, op: Op) -> Vec<RemoteCall> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    fn record(
        &self,
        op: Op,
        tenant_id: &str,
        path: &str,
        resource_key: Option<&str>,
        body: Option<&Map<String, Value>>,
    ) -> Result<NccResponse> {
        self.calls.lock().unwrap().push(RemoteCall {
            op,
            tenant_id: tenant_id.to_string(),
            path: path.to_string(),
            resource_key: resource_key.map(str::to_string),
            body: body.cloned(),
        });

        if self.failures.lock().unwrap().contains(&(op, path.to_string())) {
            return Err(NccError::Status {
                status: 500,
                body: format!("scripted failure for {path}"),
            });
        }

        let body = match op {
            Op::Retrieve => {
                let mut bodies = self.bodies.lock().unwrap();
                match bodies.get_mut(path) {
                    Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
                    Some(queue) => queue.front().cloned().unwrap_or_default(),
                    None => {
                        return Err(NccError::Status {
                            status: 404,
                            body: format!("{path} not found"),
                        })
                    }
                }
            }
            _ => "{}".to_string(),
        };

        Ok(NccResponse { status: 200, body })
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn create_resource(
        &self,
        tenant_id: &str,
        path: &str,
        resource_key: &str,
        body: &Map<String, Value>,
    ) -> Result<NccResponse> {
        self.record(Op::Create, tenant_id, path, Some(resource_key), Some(body))
    }

    async fn update_resource(
        &self,
        tenant_id: &str,
        path: &str,
        resource_key: &str,
        body: &Map<String, Value>,
    ) -> Result<NccResponse> {
        self.record(Op::Update, tenant_id, path, Some(resource_key), Some(body))
    }

    async fn remove_resource(&self, tenant_id: &str, path: &str) -> Result<NccResponse> {
        self.record(Op::Remove, tenant_id, path, None, None)
    }

    async fn retrieve_resource(&self, tenant_id: &str, path: &str) -> Result<NccResponse> {
        self.record(Op::Retrieve, tenant_id, path, None, None)
    }
}
