pub mod auth;
pub mod error;
pub mod gce;
pub mod gcs;
pub mod types;

// Re-export common auth
pub use auth::{CredentialBroker, TokenCache, load_client_credentials};
pub use error::ApiError;
