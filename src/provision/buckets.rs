//! Ensures the two Camlistore buckets exist in the target project.

use std::collections::BTreeSet;

use futures::future::join_all;

use crate::error::{ProvisionError, Result};
use crate::gcp::gcs::{Bucket, StorageApi};

const BLOB_BUCKET_SUFFIX: &str = "-camlistore-blobs";
const CONFIG_BUCKET_SUFFIX: &str = "-camlistore-config";

/// Names of the blob and config buckets for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketNames {
    pub blobs: String,
    pub config: String,
}

impl BucketNames {
    pub fn for_project(project: &str) -> Self {
        Self {
            blobs: format!("{project}{BLOB_BUCKET_SUFFIX}"),
            config: format!("{project}{CONFIG_BUCKET_SUFFIX}"),
        }
    }

    pub fn blob_uri(&self) -> String {
        format!("gs://{}", self.blobs)
    }

    pub fn config_uri(&self) -> String {
        format!("gs://{}", self.config)
    }
}

/// The set of bucket names a project must have. Always two entries.
pub fn required_buckets(project: &str) -> BTreeSet<String> {
    let names = BucketNames::for_project(project);
    BTreeSet::from([names.blobs, names.config])
}

/// Names in `required` that are not among `existing`.
pub fn missing_buckets<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    required: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut need = required.clone();
    for name in existing {
        need.remove(name);
    }
    need
}

/// Creates every bucket in `to_create` concurrently and waits for all of them.
///
/// Each failure is logged as it is observed. Once every creation has settled,
/// the first failure in name order is returned; buckets that were created are
/// left in place.
pub async fn create_missing<S>(
    storage: &S,
    project: &str,
    to_create: &BTreeSet<String>,
) -> Result<Vec<Bucket>>
where
    S: StorageApi + ?Sized,
{
    if to_create.is_empty() {
        return Ok(Vec::new());
    }
    tracing::info!(buckets = ?to_create, "need to create buckets");

    let tasks = to_create.iter().map(|name| async move {
        tracing::info!(bucket = %name, "creating bucket");
        let bucket = Bucket::named(name.as_str());
        (name, storage.insert_bucket(project, &bucket).await)
    });

    let mut created = Vec::with_capacity(to_create.len());
    let mut first_error = None;
    for (name, result) in join_all(tasks).await {
        match result {
            Ok(bucket) => {
                tracing::info!(
                    bucket = %bucket.name,
                    location = ?bucket.location,
                    storage_class = ?bucket.storage_class,
                    "created bucket"
                );
                created.push(bucket);
            }
            Err(source) => {
                tracing::error!(bucket = %name, error = %source, "error creating bucket");
                if first_error.is_none() {
                    first_error = Some(ProvisionError::CreateBucket {
                        name: name.clone(),
                        source,
                    });
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(created),
    }
}

/// Lists the project's buckets and creates whichever required ones are missing.
pub async fn ensure_buckets<S>(storage: &S, project: &str) -> Result<BucketNames>
where
    S: StorageApi + ?Sized,
{
    let existing = storage
        .list_buckets(project)
        .await
        .map_err(ProvisionError::ListBuckets)?;
    let required = required_buckets(project);
    let to_create = missing_buckets(existing.iter().map(|b| b.name.as_str()), &required);
    if to_create.is_empty() {
        tracing::info!(project, "required buckets already exist");
    }
    create_missing(storage, project, &to_create).await?;
    Ok(BucketNames::for_project(project))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provision::testing::FakeStorage;

    #[test]
    fn required_set_has_two_prefixed_names() {
        for project in ["acme", "a", "my-project-123", ""] {
            let set = required_buckets(project);
            assert_eq!(set.len(), 2);
            assert!(set.iter().all(|name| name.starts_with(project)));
        }
        let set = required_buckets("acme");
        assert!(set.contains("acme-camlistore-blobs"));
        assert!(set.contains("acme-camlistore-config"));
    }

    #[test]
    fn missing_is_required_minus_existing() {
        let required = required_buckets("acme");
        let missing = missing_buckets(["acme-camlistore-blobs", "unrelated"], &required);
        assert_eq!(missing, BTreeSet::from(["acme-camlistore-config".to_string()]));

        let none = missing_buckets(["acme-camlistore-config", "acme-camlistore-blobs"], &required);
        assert!(none.is_empty());
    }

    #[test]
    fn uris() {
        let names = BucketNames::for_project("acme");
        assert_eq!(names.blob_uri(), "gs://acme-camlistore-blobs");
        assert_eq!(names.config_uri(), "gs://acme-camlistore-config");
    }

    #[tokio::test]
    async fn existing_buckets_issue_no_inserts() {
        let storage = FakeStorage::with_existing(["acme-camlistore-blobs", "acme-camlistore-config"]);
        let names = ensure_buckets(&storage, "acme").await.unwrap();
        assert_eq!(names, BucketNames::for_project("acme"));
        assert!(storage.inserted().is_empty());
    }

    #[tokio::test]
    async fn creates_only_missing_bucket() {
        let storage = FakeStorage::with_existing(["acme-camlistore-blobs"]);
        ensure_buckets(&storage, "acme").await.unwrap();
        assert_eq!(storage.inserted(), ["acme-camlistore-config"]);
    }

    #[tokio::test]
    async fn one_failure_is_fatal_but_others_complete() {
        let storage = FakeStorage::default().fail_insert("acme-camlistore-blobs");
        let err = ensure_buckets(&storage, "acme").await.unwrap_err();

        assert!(
            matches!(&err, ProvisionError::CreateBucket { name, .. } if name == "acme-camlistore-blobs")
        );
        assert_eq!(err.kind(), ErrorKind::Provisioning);
        // Both creations were attempted; the config bucket was not abandoned.
        let mut attempted = storage.inserted();
        attempted.sort();
        assert_eq!(attempted, ["acme-camlistore-blobs", "acme-camlistore-config"]);
    }

    #[tokio::test]
    async fn list_failure_is_fatal() {
        let storage = FakeStorage::default().fail_list();
        let err = ensure_buckets(&storage, "acme").await.unwrap_err();
        assert!(matches!(err, ProvisionError::ListBuckets(_)));
        assert!(storage.inserted().is_empty());
    }
}
