//! # Authorized HTTP client
//!
//! Thin wrapper over `reqwest::Client` that attaches the operator's bearer
//! token to every request. The storage and compute clients share one instance.

use std::time::Duration;

use reqwest::{IntoUrl, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::gcp::error::ApiError;
use crate::gcp::types::Token;

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A `reqwest::Client` bound to an OAuth2 access token.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    bearer: String,
}

impl AuthorizedClient {
    pub fn new(token: &Token) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            bearer: format!("Bearer {}", token.access_token),
        })
    }

    pub fn get(&self, url: impl IntoUrl) -> RequestBuilder {
        self.http.get(url).header("Authorization", &self.bearer)
    }

    pub fn post(&self, url: impl IntoUrl) -> RequestBuilder {
        self.http.post(url).header("Authorization", &self.bearer)
    }
}

/// Checks the response status and decodes a JSON body.
///
/// Non-2xx responses become `ApiError::Status` carrying the raw body so the
/// caller can surface the API's own error message.
pub async fn decode_json<T: DeserializeOwned>(res: Response) -> Result<T, ApiError> {
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }
    Ok(res.json().await?)
}
