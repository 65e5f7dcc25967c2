//! Cloud instance metadata lookups used for default identity values.

use thiserror::Error;
use tracing::debug;

const METADATA_BASE_URL: &str = "http://169.254.169.254";

/// Errors from the instance metadata service.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metadata service returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Client for the instance metadata service.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    inner: reqwest::Client,
    base_url: String,
}

impl MetadataClient {
    pub fn new() -> Self {
        Self::with_base_url(METADATA_BASE_URL)
    }

    /// Point the client somewhere else (tests).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str) -> Result<String, MetadataError> {
        let url = format!("{}/latest/meta-data/{}", self.base_url, path);
        debug!(url = %url, "GET instance metadata");

        let response = self.inner.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MetadataError::Status(response.status()));
        }
        Ok(response.text().await?)
    }

    /// Machine image id (`ami-id`).
    pub async fn image_id(&self) -> Result<String, MetadataError> {
        self.get("ami-id").await
    }

    /// Instance id.
    pub async fn instance_id(&self) -> Result<String, MetadataError> {
        self.get("instance-id").await
    }

    /// Instance type, e.g. `m3.xlarge`.
    pub async fn instance_type(&self) -> Result<String, MetadataError> {
        self.get("instance-type").await
    }

    /// Availability zone.
    pub async fn availability_zone(&self) -> Result<String, MetadataError> {
        self.get("placement/availability-zone").await
    }
}

impl Default for MetadataClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_metadata_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/ami-id"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ami-1234"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/placement/availability-zone"))
            .respond_with(ResponseTemplate::new(200).set_body_string("us-east-1a"))
            .mount(&server)
            .await;

        let client = MetadataClient::with_base_url(&server.uri());
        assert_eq!(client.image_id().await.unwrap(), "ami-1234");
        assert_eq!(client.availability_zone().await.unwrap(), "us-east-1a");
    }

    #[tokio::test]
    async fn non_success_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = MetadataClient::with_base_url(&server.uri());
        assert!(matches!(
            client.instance_id().await,
            Err(MetadataError::Status(s)) if s == reqwest::StatusCode::NOT_FOUND
        ));
    }
}
