//! Uploads to signed URLs: named file artifacts and JSON documents.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::debug;

use fleetd_core::{RunId, TaskId, WorkerIdentity};

use crate::client::QueueClient;
use crate::error::QueueError;

/// Uploads named files via queue-issued signed URLs and returns their
/// public artifact URLs.
#[derive(Debug, Clone)]
pub struct ArtifactUploader {
    client: QueueClient,
}

impl ArtifactUploader {
    pub fn new(client: QueueClient) -> Self {
        Self { client }
    }

    /// Upload one artifact from a file.
    ///
    /// When `content_type` is omitted it is derived from the file
    /// extension. Returns the canonical artifact URL
    /// (`{taskId}/runs/{runId}/artifacts/{name}`).
    pub async fn upload(
        &self,
        identity: &WorkerIdentity,
        task_id: &TaskId,
        run_id: &RunId,
        name: &str,
        file: &Path,
        content_type: Option<&str>,
    ) -> Result<String, QueueError> {
        let metadata = tokio::fs::metadata(file)
            .await
            .map_err(|_| QueueError::MissingFile(file.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(QueueError::MissingFile(file.to_path_buf()));
        }

        let content_type = match content_type {
            Some(ct) => ct.to_string(),
            None => mime_guess::from_path(file)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };

        let mut artifacts = BTreeMap::new();
        artifacts.insert(name.to_string(), content_type.clone());
        let put_urls = self
            .client
            .request_artifact_urls(identity, task_id, run_id, &artifacts)
            .await?;
        let put_url = put_urls
            .get(name)
            .ok_or_else(|| QueueError::MissingArtifactUrl(name.to_string()))?;

        debug!(name = %name, url = %put_url, size = metadata.len(), "PUT artifact");

        let source = tokio::fs::File::open(file).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(source));
        let response = self
            .client
            .http()
            .put(put_url)
            .header(CONTENT_TYPE, &content_type)
            .header(CONTENT_LENGTH, metadata.len())
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QueueError::status("artifact upload", response.status()));
        }

        Ok(self.client.config().artifact_url(task_id, run_id, name))
    }

    /// Serialize `document` and PUT it to a pre-obtained signed URL.
    ///
    /// Used for the logs and result documents, whose URLs are issued at
    /// claim/reclaim time rather than per upload.
    pub async fn put_json<T: Serialize>(&self, url: &str, document: &T) -> Result<(), QueueError> {
        debug!(url = %url, "PUT JSON document");
        let response = self.client.http().put(url).json(document).send().await?;
        if !response.status().is_success() {
            return Err(QueueError::status("document upload", response.status()));
        }
        Ok(())
    }
}
