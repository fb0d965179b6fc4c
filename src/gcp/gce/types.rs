//! Compute Engine resources: the `instances.insert` body, the zone
//! `Operation` that tracks it, and the instance returned by `instances.get`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of an `instances.insert` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub description: String,
    /// Full URL of the machine type resource.
    #[serde(rename = "machineType")]
    pub machine_type: String,
    pub disks: Vec<AttachedDisk>,
    /// Network tags, used to match firewall rules.
    pub tags: Tags,
    /// Read by the server at boot to find its buckets and credentials.
    pub metadata: Metadata,
    #[serde(rename = "networkInterfaces")]
    pub network_interfaces: Vec<NetworkInterface>,
    /// Grants the VM's default account the provisioning scopes.
    #[serde(rename = "serviceAccounts")]
    pub service_accounts: Vec<ServiceAccountRef>,
}

impl Instance {
    /// Looks up a metadata value by key.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .items
            .iter()
            .find(|it| it.key == key)
            .map(|it| it.value.as_str())
    }
}

/// Boot disk, created from `initialize_params` along with the instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachedDisk {
    #[serde(rename = "autoDelete")]
    pub auto_delete: bool,
    pub boot: bool,
    #[serde(rename = "type")]
    pub disk_type: String,
    #[serde(rename = "initializeParams")]
    pub initialize_params: InitializeParams,
}

/// Parameters for initializing a disk from a source image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "diskName")]
    pub disk_name: String,
    #[serde(rename = "sourceImage")]
    pub source_image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tags {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

impl MetadataItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterface {
    #[serde(rename = "accessConfigs")]
    pub access_configs: Vec<AccessConfig>,
    pub network: String,
}

/// `ONE_TO_ONE_NAT` gives the instance an ephemeral external IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(rename = "type")]
    pub access_type: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountRef {
    pub email: String,
    pub scopes: Vec<String>,
}

/// A zone operation tracking an asynchronous action such as instance creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    /// Raw status string; see [`OperationStatus::parse`].
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationErrorBody>,
    #[serde(rename = "operationType")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(rename = "targetLink")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
}

impl Operation {
    /// Errors reported by a finished operation. Empty when it succeeded.
    pub fn errors(&self) -> &[OperationErrorItem] {
        match &self.error {
            Some(body) => &body.errors,
            None => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
}

impl OperationStatus {
    /// Returns `None` for any status outside the three known values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "RUNNING" => Some(Self::Running),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationErrorBody {
    #[serde(default)]
    pub errors: Vec<OperationErrorItem>,
}

/// One error attached to a finished operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationErrorItem {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub message: String,
}

impl fmt::Display for OperationErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " (at {location})")?;
        }
        Ok(())
    }
}

/// The full instance resource as returned by `instances.get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceDescriptor(pub Value);

fn last_segment(s: &str) -> &str {
    s.rsplit('/').next().unwrap_or(s)
}

impl InstanceDescriptor {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn status(&self) -> Option<&str> {
        self.str_field("status")
    }

    /// Machine type name without the resource URL prefix.
    pub fn machine_type(&self) -> Option<&str> {
        self.str_field("machineType").map(last_segment)
    }

    /// Zone name without the resource URL prefix.
    pub fn zone(&self) -> Option<&str> {
        self.str_field("zone").map(last_segment)
    }

    /// The NAT IP of the first access config on the first network interface.
    pub fn external_ip(&self) -> Option<&str> {
        self.0
            .get("networkInterfaces")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|ni| ni.get("accessConfigs"))
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|ac| ac.get("natIP"))
            .and_then(|v| v.as_str())
    }
}
