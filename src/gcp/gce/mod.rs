//! # Compute Engine instances
//!
//! Creates a VM instance, follows the zone operation tracking its creation,
//! and fetches the finished instance resource.
//!
//! - `client`: the `ComputeApi` trait and its REST implementation.
//! - `defaults`: the instance request body for a Camlistore server.
//! - `types`: instance and operation resources as the API serializes them.

pub mod client;
pub mod defaults;
pub mod types;

pub use client::{ComputeApi, GceClient};
pub use defaults::{InstanceParams, create_instance_request};
pub use types::*;
