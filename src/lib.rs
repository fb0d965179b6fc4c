// # camlistore-gce: one-shot Camlistore server provisioning on Google Cloud
//
// This crate creates a Camlistore server in a Google Cloud project: it
// authenticates the operator with the OAuth2 installed-application flow,
// makes sure the blob and config buckets exist, renders the CoreOS
// cloud-config, creates the VM, and waits for the creation to finish.

/// HTTP client carrying the operator's bearer token.
pub mod client;

/// Error taxonomy for a provisioning run.
pub mod error;

/// Google Cloud Platform REST clients: OAuth2, Compute Engine, Cloud Storage.
pub mod gcp;

/// The provisioning run itself and its individual steps.
pub mod provision;

pub use error::{ErrorKind, ProvisionError, Result};
pub use provision::{ProvisionConfig, Provisioner};
