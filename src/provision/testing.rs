//! In-memory stand-ins for the storage and compute APIs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use crate::gcp::error::ApiError;
use crate::gcp::gce::{
    ComputeApi, Instance, InstanceDescriptor, Operation, OperationErrorBody, OperationErrorItem,
};
use crate::gcp::gcs::{Bucket, StorageApi};

fn api_error(status: StatusCode, body: &str) -> ApiError {
    ApiError::Status {
        status,
        body: body.to_string(),
    }
}

pub fn op(status: &str) -> Operation {
    Operation {
        name: "operation-1".to_string(),
        status: status.to_string(),
        ..Default::default()
    }
}

pub fn op_with_errors(errors: Vec<OperationErrorItem>) -> Operation {
    Operation {
        error: Some(OperationErrorBody { errors }),
        ..op("DONE")
    }
}

#[derive(Default)]
pub struct FakeStorage {
    existing: Vec<Bucket>,
    fail_list: bool,
    fail_insert: Vec<String>,
    inserted: Mutex<Vec<String>>,
}

impl FakeStorage {
    pub fn with_existing<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            existing: names.into_iter().map(Bucket::named).collect(),
            ..Default::default()
        }
    }

    pub fn fail_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn fail_insert(mut self, name: &str) -> Self {
        self.fail_insert.push(name.to_string());
        self
    }

    /// Names passed to `insert_bucket`, including ones that failed.
    pub fn inserted(&self) -> Vec<String> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageApi for FakeStorage {
    async fn list_buckets(&self, _project: &str) -> Result<Vec<Bucket>, ApiError> {
        if self.fail_list {
            return Err(api_error(StatusCode::FORBIDDEN, "storage API disabled"));
        }
        Ok(self.existing.clone())
    }

    async fn insert_bucket(&self, _project: &str, bucket: &Bucket) -> Result<Bucket, ApiError> {
        self.inserted.lock().unwrap().push(bucket.name.clone());
        if self.fail_insert.contains(&bucket.name) {
            return Err(api_error(StatusCode::CONFLICT, "bucket name taken"));
        }
        Ok(Bucket {
            id: Some(bucket.name.clone()),
            location: Some("US".to_string()),
            ..bucket.clone()
        })
    }
}

/// Replays scripted operation snapshots, one per `get_zone_operation` call.
pub struct FakeCompute {
    snapshots: Mutex<VecDeque<Operation>>,
    fetches: Mutex<usize>,
    inserted: Mutex<Vec<Instance>>,
    fail_insert: bool,
}

impl FakeCompute {
    pub fn new(snapshots: Vec<Operation>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots.into()),
            fetches: Mutex::new(0),
            inserted: Mutex::new(Vec::new()),
            fail_insert: false,
        }
    }

    pub fn fail_insert(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    pub fn operation_fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    pub fn inserted(&self) -> Vec<Instance> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComputeApi for FakeCompute {
    async fn insert_instance(
        &self,
        _project: &str,
        _zone: &str,
        instance: &Instance,
    ) -> Result<Operation, ApiError> {
        self.inserted.lock().unwrap().push(instance.clone());
        if self.fail_insert {
            return Err(api_error(StatusCode::BAD_REQUEST, "invalid machine type"));
        }
        Ok(op("PENDING"))
    }

    async fn get_zone_operation(
        &self,
        _project: &str,
        _zone: &str,
        _operation: &str,
    ) -> Result<Operation, ApiError> {
        *self.fetches.lock().unwrap() += 1;
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "operation not found"))
    }

    async fn get_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<InstanceDescriptor, ApiError> {
        let inserted = self.inserted.lock().unwrap();
        let instance = inserted
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "instance not found"))?;
        Ok(InstanceDescriptor(json!({
            "name": instance.name,
            "status": "RUNNING",
            "machineType": instance.machine_type,
            "zone": format!("projects/{project}/zones/{zone}"),
            "networkInterfaces": [{"accessConfigs": [{"name": "External NAT", "natIP": "203.0.113.7"}]}],
        })))
    }
}
