//! # GCS API Client Logic
//!
//! Bucket listing and creation against the Cloud Storage JSON API.

use async_trait::async_trait;

use crate::client::{AuthorizedClient, decode_json};
use crate::gcp::error::ApiError;
use crate::gcp::gcs::types::{Bucket, BucketList};

const BUCKETS_URL: &str = "https://storage.googleapis.com/storage/v1/b";

/// The subset of the Cloud Storage API a provisioning run needs.
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// Lists every bucket in `project`, across all result pages.
    async fn list_buckets(&self, project: &str) -> Result<Vec<Bucket>, ApiError>;

    /// Creates `bucket` in `project` and returns the server's view of it.
    async fn insert_bucket(&self, project: &str, bucket: &Bucket) -> Result<Bucket, ApiError>;
}

/// REST implementation of [`StorageApi`].
#[derive(Debug, Clone)]
pub struct GcsClient {
    client: AuthorizedClient,
}

impl GcsClient {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageApi for GcsClient {
    async fn list_buckets(&self, project: &str) -> Result<Vec<Bucket>, ApiError> {
        let mut page_token: Option<String> = None;
        let mut buckets = Vec::new();

        // Loop to handle paginated results from the GCS API.
        loop {
            let mut req = self
                .client
                .get(BUCKETS_URL)
                .query(&[("project", project)]);
            if let Some(ref t) = page_token {
                req = req.query(&[("pageToken", t.as_str())]);
            }

            let body: BucketList = decode_json(req.send().await?).await?;
            buckets.extend(body.items);

            page_token = body.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(buckets)
    }

    async fn insert_bucket(&self, project: &str, bucket: &Bucket) -> Result<Bucket, ApiError> {
        let res = self
            .client
            .post(BUCKETS_URL)
            .query(&[("project", project)])
            .json(bucket)
            .send()
            .await?;
        decode_json(res).await
    }
}
