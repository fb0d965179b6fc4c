//! # Provisioning run
//!
//! Drives one end-to-end creation of a Camlistore server: render the
//! cloud-config, make sure the blob and config buckets exist, submit the
//! instance, wait for the creation operation, and fetch the result.
//!
//! Authentication happens before this point; the orchestrator only sees the
//! authorized storage and compute clients through [`StorageApi`] and
//! [`ComputeApi`].

pub mod bootstrap;
pub mod buckets;
pub mod config;
pub mod instance;
pub mod poller;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

pub use bootstrap::BootstrapConfig;
pub use buckets::BucketNames;
pub use config::ProvisionConfig;
pub use poller::OperationPoller;

use crate::error::Result;
use crate::gcp::gce::{ComputeApi, InstanceDescriptor};
use crate::gcp::gcs::StorageApi;

pub struct Provisioner<'a, S: ?Sized, C: ?Sized> {
    config: &'a ProvisionConfig,
    storage: &'a S,
    compute: &'a C,
    poll_interval: Duration,
}

impl<'a, S, C> Provisioner<'a, S, C>
where
    S: StorageApi + ?Sized,
    C: ComputeApi + ?Sized,
{
    pub fn new(config: &'a ProvisionConfig, storage: &'a S, compute: &'a C) -> Self {
        Self {
            config,
            storage,
            compute,
            poll_interval: poller::POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs every step in order and returns the created instance.
    ///
    /// The first error ends the run. Buckets created before a later failure
    /// stay in the project.
    pub async fn run(&self) -> Result<InstanceDescriptor> {
        let config = self.config;
        let project = config.project.as_str();
        let zone = config.zone.as_str();

        let bootstrap =
            bootstrap::build(&config.machine_type, config.ssh_public_key.as_deref())?;
        tracing::debug!(
            len = bootstrap.byte_len(),
            validated_len = bootstrap.validated_len(),
            ssh_key = bootstrap.has_ssh_key(),
            "cloud-config rendered"
        );
        let buckets = buckets::ensure_buckets(self.storage, project).await?;

        let spec = instance::build_spec(config, &buckets, &bootstrap);
        let op = instance::submit(self.compute, project, zone, &spec).await?;

        OperationPoller::new(self.compute, project, zone)
            .with_interval(self.poll_interval)
            .wait(&op.name)
            .await?;

        report::fetch_instance(self.compute, project, zone, &config.instance_name).await
    }
}
