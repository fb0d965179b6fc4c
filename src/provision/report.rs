use crate::error::{ProvisionError, Result};
use crate::gcp::gce::{ComputeApi, InstanceDescriptor};

pub const SUMMARY_HEADERS: [&str; 5] = ["Status", "Name", "Machine Type", "Zone", "External IP"];

/// Fetches the created instance once its operation has finished.
pub async fn fetch_instance<C>(
    compute: &C,
    project: &str,
    zone: &str,
    name: &str,
) -> Result<InstanceDescriptor>
where
    C: ComputeApi + ?Sized,
{
    compute
        .get_instance(project, zone, name)
        .await
        .map_err(|source| ProvisionError::GetInstance {
            name: name.to_string(),
            source,
        })
}

/// One table row matching [`SUMMARY_HEADERS`]. Absent fields render as "-".
pub fn summary_row(instance: &InstanceDescriptor) -> [String; 5] {
    let cell = |v: Option<&str>| v.unwrap_or("-").to_string();
    [
        cell(instance.status()),
        cell(instance.name()),
        cell(instance.machine_type()),
        cell(instance.zone()),
        cell(instance.external_ip()),
    ]
}
