//! # GCE Instance Configuration
//!
//! Builds the `Instance` request body for a Camlistore server. Everything that
//! is not derived from the inputs (image, tags, scopes, credentials metadata)
//! is fixed here, so the same inputs always produce the same request.

use crate::gcp::auth::SCOPES;
use crate::gcp::gce::client::GCE_API_BASE;
use crate::gcp::gce::types::*;

/// CoreOS image the boot disk is created from.
pub const COREOS_IMAGE: &str = "projects/coreos-cloud/global/images/coreos-alpha-402-2-0-v20140807";

pub const METADATA_USERNAME: &str = "camlistore-username";
pub const METADATA_PASSWORD: &str = "camlistore-password";
pub const METADATA_BLOB_BUCKET: &str = "camlistore-blob-bucket";
pub const METADATA_CONFIG_BUCKET: &str = "camlistore-config-bucket";
pub const METADATA_USER_DATA: &str = "user-data";

/// Inputs for [`create_instance_request`].
#[derive(Debug, Clone, Copy)]
pub struct InstanceParams<'a> {
    pub name: &'a str,
    pub project: &'a str,
    pub zone: &'a str,
    /// Short machine type name, e.g. "g1-small".
    pub machine_type: &'a str,
    /// `gs://` URI of the blob bucket.
    pub blob_bucket_uri: &'a str,
    /// `gs://` URI of the config bucket.
    pub config_bucket_uri: &'a str,
    /// Cloud-config text handed to the instance as `user-data`.
    pub user_data: &'a str,
}

/// Creates the `Instance` request for a Camlistore server.
pub fn create_instance_request(params: &InstanceParams<'_>) -> Instance {
    let project_url = format!("{}/projects/{}", GCE_API_BASE, params.project);

    Instance {
        name: params.name.to_string(),
        description: "Camlistore server".to_string(),
        machine_type: format!(
            "{}/zones/{}/machineTypes/{}",
            project_url, params.zone, params.machine_type
        ),
        disks: vec![AttachedDisk {
            auto_delete: true,
            boot: true,
            disk_type: "PERSISTENT".to_string(),
            initialize_params: InitializeParams {
                disk_name: format!("{}-coreos-stateless-pd", params.name),
                source_image: format!("{}/{}", GCE_API_BASE, COREOS_IMAGE),
            },
        }],
        tags: Tags {
            items: vec!["http-server".to_string(), "https-server".to_string()],
        },
        metadata: Metadata {
            items: vec![
                MetadataItem::new(METADATA_USERNAME, "test"),
                // TODO: replace the cleartext placeholder once the server reads a hashed secret.
                MetadataItem::new(METADATA_PASSWORD, "insecure"),
                MetadataItem::new(METADATA_BLOB_BUCKET, params.blob_bucket_uri),
                MetadataItem::new(METADATA_CONFIG_BUCKET, params.config_bucket_uri),
                MetadataItem::new(METADATA_USER_DATA, params.user_data),
            ],
        },
        network_interfaces: vec![NetworkInterface {
            access_configs: vec![AccessConfig {
                access_type: "ONE_TO_ONE_NAT".to_string(),
                name: "External NAT".to_string(),
            }],
            network: format!("{}/global/networks/default", project_url),
        }],
        service_accounts: vec![ServiceAccountRef {
            email: "default".to_string(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> InstanceParams<'static> {
        InstanceParams {
            name: "camlistore-server",
            project: "acme",
            zone: "us-central1-a",
            machine_type: "g1-small",
            blob_bucket_uri: "gs://acme-camlistore-blobs",
            config_bucket_uri: "gs://acme-camlistore-config",
            user_data: "#cloud-config\n",
        }
    }

    #[test]
    fn build_request_paths() {
        let req = create_instance_request(&params());
        assert_eq!(
            req.machine_type,
            "https://compute.googleapis.com/compute/v1/projects/acme/zones/us-central1-a/machineTypes/g1-small"
        );
        assert_eq!(
            req.network_interfaces[0].network,
            "https://compute.googleapis.com/compute/v1/projects/acme/global/networks/default"
        );
        assert_eq!(req.name, "camlistore-server");
        assert_eq!(req.disks.len(), 1);
        let disk = &req.disks[0];
        assert!(disk.boot && disk.auto_delete);
        assert_eq!(disk.initialize_params.disk_name, "camlistore-server-coreos-stateless-pd");
        assert!(disk.initialize_params.source_image.ends_with(COREOS_IMAGE));
    }

    #[test]
    fn metadata_keys_in_order() {
        let req = create_instance_request(&params());
        let keys: Vec<&str> = req.metadata.items.iter().map(|it| it.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                METADATA_USERNAME,
                METADATA_PASSWORD,
                METADATA_BLOB_BUCKET,
                METADATA_CONFIG_BUCKET,
                METADATA_USER_DATA
            ]
        );
        assert_eq!(
            req.metadata_value(METADATA_BLOB_BUCKET),
            Some("gs://acme-camlistore-blobs")
        );
        assert_eq!(
            req.metadata_value(METADATA_CONFIG_BUCKET),
            Some("gs://acme-camlistore-config")
        );
        assert_eq!(req.metadata_value(METADATA_USER_DATA), Some("#cloud-config\n"));
    }

    #[test]
    fn service_account_and_nat() {
        let req = create_instance_request(&params());
        assert_eq!(req.service_accounts.len(), 1);
        assert_eq!(req.service_accounts[0].email, "default");
        assert_eq!(req.service_accounts[0].scopes.len(), 4);
        let ac = &req.network_interfaces[0].access_configs[0];
        assert_eq!(ac.access_type, "ONE_TO_ONE_NAT");
        assert_eq!(ac.name, "External NAT");
        assert_eq!(req.tags.items, ["http-server", "https-server"]);
    }

    #[test]
    fn serialized_field_names() {
        let v = serde_json::to_value(create_instance_request(&params())).unwrap();
        assert!(v.get("machineType").is_some());
        assert!(v.get("networkInterfaces").is_some());
        assert!(v.get("serviceAccounts").is_some());
        assert_eq!(v["disks"][0]["type"], "PERSISTENT");
        assert_eq!(v["disks"][0]["autoDelete"], true);
        assert_eq!(v["networkInterfaces"][0]["accessConfigs"][0]["type"], "ONE_TO_ONE_NAT");
    }
}
