//! Error types for a provisioning run.
//!
//! Every variant is fatal for the run. Nothing is retried and nothing already
//! created in the cloud project is rolled back.

use std::fmt;
use std::io;
use std::path::PathBuf;

use itertools::Itertools;
use thiserror::Error;

use crate::gcp::error::ApiError;
use crate::gcp::gce::types::OperationErrorItem;
use crate::provision::config::HELP_ENABLE_AUTH;

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{} does not exist.\n{}", .path.display(), HELP_ENABLE_AUTH)]
    MissingCredentialFile { path: PathBuf },

    #[error("error reading {}: {source}", .path.display())]
    UnreadableCredentialFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error reading ssh public key {}: {source}", .path.display())]
    SshKey {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to render cloud config: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("error exchanging auth code for a token: {0}")]
    Authentication(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("error listing buckets: {0}")]
    ListBuckets(#[source] ApiError),

    #[error("error creating bucket {name}: {source}")]
    CreateBucket {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to create instance: {0}")]
    Submission(#[source] ApiError),

    #[error("failed to get operation {operation}: {source}")]
    GetOperation {
        operation: String,
        #[source]
        source: ApiError,
    },

    #[error("error getting instance {name} after creation: {source}")]
    GetInstance {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error(
        "operation {operation} failed with {} error(s): {}",
        .errors.len(),
        .errors.iter().join("; ")
    )]
    OperationFailed {
        operation: String,
        errors: Vec<OperationErrorItem>,
    },

    #[error("unknown status {status:?} for operation {operation}")]
    UnexpectedStatus { operation: String, status: String },

    #[error("cloud config length of {len} bytes is over {limit} byte limit")]
    ConfigTooLarge { len: usize, limit: usize },
}

/// Coarse classification of a [`ProvisionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unreadable local files, template problems.
    Configuration,
    /// Authorization-code exchange failed.
    Authentication,
    /// A bucket or instance API call failed.
    Provisioning,
    /// The creation operation finished with errors or in an unknown state.
    Operation,
    /// The bootstrap configuration exceeds the metadata byte cap.
    SizeLimit,
}

impl ProvisionError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredentialFile { .. }
            | Self::UnreadableCredentialFile { .. }
            | Self::SshKey { .. }
            | Self::Template(_) => ErrorKind::Configuration,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::HttpClient(_)
            | Self::ListBuckets(_)
            | Self::CreateBucket { .. }
            | Self::Submission(_)
            | Self::GetOperation { .. }
            | Self::GetInstance { .. } => ErrorKind::Provisioning,
            Self::OperationFailed { .. } | Self::UnexpectedStatus { .. } => ErrorKind::Operation,
            Self::ConfigTooLarge { .. } => ErrorKind::SizeLimit,
        }
    }

    /// Returns a stable error code for this error's kind.
    pub const fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => "E001",
            ErrorKind::Authentication => "E002",
            ErrorKind::Provisioning => "E003",
            ErrorKind::Operation => "E004",
            ErrorKind::SizeLimit => "E005",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::Provisioning => "provisioning",
            Self::Operation => "operation",
            Self::SizeLimit => "size limit",
        };
        f.write_str(s)
    }
}
