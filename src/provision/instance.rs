use crate::error::{ProvisionError, Result};
use crate::gcp::gce::{ComputeApi, Instance, InstanceParams, Operation, create_instance_request};
use crate::provision::bootstrap::BootstrapConfig;
use crate::provision::buckets::BucketNames;
use crate::provision::config::ProvisionConfig;

/// Assembles the instance request from the run config, buckets, and cloud-config.
pub fn build_spec(
    config: &ProvisionConfig,
    buckets: &BucketNames,
    bootstrap: &BootstrapConfig,
) -> Instance {
    let blob_bucket_uri = buckets.blob_uri();
    let config_bucket_uri = buckets.config_uri();
    create_instance_request(&InstanceParams {
        name: &config.instance_name,
        project: &config.project,
        zone: &config.zone,
        machine_type: &config.machine_type,
        blob_bucket_uri: &blob_bucket_uri,
        config_bucket_uri: &config_bucket_uri,
        user_data: bootstrap.as_str(),
    })
}

/// Sends the insert request and returns the operation tracking it.
pub async fn submit<C>(compute: &C, project: &str, zone: &str, instance: &Instance) -> Result<Operation>
where
    C: ComputeApi + ?Sized,
{
    tracing::info!(instance = %instance.name, zone, "creating instance");
    let op = compute
        .insert_instance(project, zone, instance)
        .await
        .map_err(ProvisionError::Submission)?;
    tracing::info!(operation = %op.name, status = %op.status, "instance insert accepted");
    Ok(op)
}
