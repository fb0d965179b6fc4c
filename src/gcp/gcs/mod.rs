//! # Cloud Storage buckets
//!
//! Bucket-level calls of the Google Cloud Storage JSON API: listing the
//! buckets of a project and creating new ones. Object access is not needed
//! here; the server itself reads and writes the buckets once it runs.
//!
//! - `client`: the `StorageApi` trait and its REST implementation.
//! - `types`: bucket resources as the API serializes them.

pub mod client;
pub mod types;

pub use client::{GcsClient, StorageApi};
pub use types::*;
