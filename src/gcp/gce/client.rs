use async_trait::async_trait;

use crate::client::{AuthorizedClient, decode_json};
use crate::gcp::error::ApiError;
use crate::gcp::gce::types::{Instance, InstanceDescriptor, Operation};

pub const GCE_API_BASE: &str = "https://compute.googleapis.com/compute/v1";

/// The subset of the Compute Engine API a provisioning run needs.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Starts creating `instance`. Returns immediately with the zone operation.
    async fn insert_instance(
        &self,
        project: &str,
        zone: &str,
        instance: &Instance,
    ) -> Result<Operation, ApiError>;

    async fn get_zone_operation(
        &self,
        project: &str,
        zone: &str,
        operation: &str,
    ) -> Result<Operation, ApiError>;

    async fn get_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<InstanceDescriptor, ApiError>;
}

/// REST implementation of [`ComputeApi`].
#[derive(Debug, Clone)]
pub struct GceClient {
    client: AuthorizedClient,
}

impl GceClient {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }
}

fn zone_url(project: &str, zone: &str) -> String {
    format!("{}/projects/{}/zones/{}", GCE_API_BASE, project, zone)
}

#[async_trait]
impl ComputeApi for GceClient {
    async fn insert_instance(
        &self,
        project: &str,
        zone: &str,
        instance: &Instance,
    ) -> Result<Operation, ApiError> {
        let url = format!("{}/instances", zone_url(project, zone));
        let response = self.client.post(url).json(instance).send().await?;
        decode_json(response).await
    }

    async fn get_zone_operation(
        &self,
        project: &str,
        zone: &str,
        operation: &str,
    ) -> Result<Operation, ApiError> {
        let url = format!("{}/operations/{}", zone_url(project, zone), operation);
        let response = self.client.get(url).send().await?;
        decode_json(response).await
    }

    async fn get_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<InstanceDescriptor, ApiError> {
        let url = format!("{}/instances/{}", zone_url(project, zone), name);
        let response = self.client.get(url).send().await?;
        decode_json(response).await
    }
}
