// Upstream release lookup
// reason: reqwest for the one outbound HTTPS request per run
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use vmdoctor_core::port::{VersionError, VersionSource};

/// HashiCorp checkpoint endpoint for Vagrant releases
pub const CHECKPOINT_URL: &str = "https://checkpoint-api.hashicorp.com/v1/check/vagrant";

#[derive(Debug, Deserialize)]
struct CheckpointResponse {
    current_version: String,
}

/// VersionSource over the checkpoint API
pub struct CheckpointClient {
    client: Client,
    url: String,
}

impl CheckpointClient {
    pub fn new(timeout: Duration) -> Self {
        Self::with_url(CHECKPOINT_URL, timeout)
    }

    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vmdoctor/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl VersionSource for CheckpointClient {
    async fn latest_version(&self) -> Result<String, VersionError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| VersionError::Request(e.to_string()))?;

        let body: CheckpointResponse = response
            .json()
            .await
            .map_err(|e| VersionError::Parse(e.to_string()))?;

        debug!(url = %self.url, version = %body.current_version, "Latest release fetched");
        Ok(body.current_version)
    }
}
