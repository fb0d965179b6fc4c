//! # Zone operation polling
//!
//! Instance creation returns a zone operation right away; the instance exists
//! only once that operation reaches `DONE` without errors. The poller checks
//! it on a fixed interval until then. There is no backoff, no attempt limit,
//! and no cancellation: an operation stuck in `RUNNING` keeps the run waiting.

use std::time::Duration;

use crate::error::{ProvisionError, Result};
use crate::gcp::gce::{ComputeApi, Operation, OperationStatus};

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Outcome of inspecting one snapshot of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// `PENDING` or `RUNNING`.
    Waiting(OperationStatus),
    /// `DONE` with no errors.
    Finished,
}

/// Classifies an operation snapshot.
///
/// `DONE` with errors and unknown statuses are failures. Each sub-error is
/// logged separately before the failure is returned.
pub fn evaluate(op: &Operation) -> Result<Progress> {
    match OperationStatus::parse(&op.status) {
        Some(status @ (OperationStatus::Pending | OperationStatus::Running)) => {
            Ok(Progress::Waiting(status))
        }
        Some(OperationStatus::Done) => {
            let errors = op.errors();
            if errors.is_empty() {
                return Ok(Progress::Finished);
            }
            for e in errors {
                tracing::error!(
                    operation = %op.name,
                    code = %e.code,
                    location = ?e.location,
                    message = %e.message,
                    "operation error"
                );
            }
            Err(ProvisionError::OperationFailed {
                operation: op.name.clone(),
                errors: errors.to_vec(),
            })
        }
        None => Err(ProvisionError::UnexpectedStatus {
            operation: op.name.clone(),
            status: op.status.clone(),
        }),
    }
}

/// Waits for a zone operation to finish.
pub struct OperationPoller<'a, C: ?Sized> {
    compute: &'a C,
    project: &'a str,
    zone: &'a str,
    interval: Duration,
}

impl<'a, C> OperationPoller<'a, C>
where
    C: ComputeApi + ?Sized,
{
    pub fn new(compute: &'a C, project: &'a str, zone: &'a str) -> Self {
        Self {
            compute,
            project,
            zone,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Polls `operation` until it is `DONE`, returning the final snapshot.
    pub async fn wait(&self, operation: &str) -> Result<Operation> {
        tracing::info!(operation, "waiting on operation");
        loop {
            tokio::time::sleep(self.interval).await;

            let op = self
                .compute
                .get_zone_operation(self.project, self.zone, operation)
                .await
                .map_err(|source| ProvisionError::GetOperation {
                    operation: operation.to_string(),
                    source,
                })?;

            match evaluate(&op)? {
                Progress::Waiting(status) => {
                    tracing::info!(operation, ?status, progress = ?op.progress, "waiting on operation");
                }
                Progress::Finished => {
                    tracing::info!(operation, target_link = ?op.target_link, "operation succeeded");
                    return Ok(op);
                }
            }
        }
    }
}
