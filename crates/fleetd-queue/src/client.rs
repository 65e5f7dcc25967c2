//! HTTP client for the queue's `/v1` endpoints.

use reqwest::StatusCode;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use fleetd_core::{RunId, TaskDefinition, TaskId, WorkerIdentity};

use crate::error::QueueError;
use crate::wire::{
    ArtifactSpec, ArtifactUrlsReply, ArtifactUrlsRequest, ClaimReply, PendingTasksReply, RunScope,
    TaskCreatedReply, WorkerScope,
};

/// Where the queue and the object store live. Passed in explicitly; the
/// client performs no ambient configuration lookup.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue base URL, e.g. `http://localhost:3000`.
    pub base_url: String,

    /// Object store base URL for task definitions and artifacts.
    pub object_store_url: String,
}

impl QueueConfig {
    pub fn new(base_url: &str, object_store_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            object_store_url: object_store_url.trim_end_matches('/').to_string(),
        }
    }

    /// Canonical public URL for an uploaded artifact.
    pub fn artifact_url(&self, task_id: &TaskId, run_id: &RunId, name: &str) -> String {
        format!(
            "{}/{}/runs/{}/artifacts/{}",
            self.object_store_url, task_id, run_id, name
        )
    }
}

/// Stateless client for the queue's claim/reclaim/artifact-url/complete
/// endpoints and the object-store task-definition fetch.
#[derive(Debug, Clone)]
pub struct QueueClient {
    inner: reqwest::Client,
    config: QueueConfig,
}

impl QueueClient {
    /// Create a new queue client.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: reqwest::Client::new(),
            config,
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner
    }

    fn queue_url(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.base_url, path)
    }

    /// Claim the next pending task for this identity's provisioner/worker
    /// type. `Ok(None)` means no task is available (HTTP 204).
    pub async fn claim_work(
        &self,
        identity: &WorkerIdentity,
    ) -> Result<Option<ClaimReply>, QueueError> {
        let url = self.queue_url(&format!(
            "/claim-work/{}/{}",
            identity.provisioner_id, identity.worker_type
        ));
        debug!(url = %url, "GET claim-work");

        let response = self
            .inner
            .get(&url)
            .json(&WorkerScope {
                worker_group: &identity.worker_group,
                worker_id: &identity.worker_id,
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json().await?)),
            StatusCode::NO_CONTENT => Ok(None),
            status => Err(QueueError::status("claim-work", status)),
        }
    }

    /// Fetch a task definition from the object store.
    pub async fn fetch_task_definition(
        &self,
        task_id: &TaskId,
    ) -> Result<TaskDefinition, QueueError> {
        let url = format!("{}/{}/task.json", self.config.object_store_url, task_id);
        debug!(url = %url, "GET task definition");

        let response = self.inner.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(QueueError::status("task definition fetch", response.status()));
        }
        Ok(response.json().await?)
    }

    /// Renew the lease on a claimed task. Any non-success reply (including
    /// 404 for a task that no longer exists) is propagated as an error;
    /// retrying is the caller's decision.
    pub async fn reclaim(
        &self,
        identity: &WorkerIdentity,
        task_id: &TaskId,
        run_id: &RunId,
    ) -> Result<ClaimReply, QueueError> {
        self.claim_task(identity, task_id, Some(run_id)).await
    }

    /// Claim a specific task (no `runId` yet) or reclaim a held run.
    pub async fn claim_task(
        &self,
        identity: &WorkerIdentity,
        task_id: &TaskId,
        run_id: Option<&RunId>,
    ) -> Result<ClaimReply, QueueError> {
        let url = self.queue_url(&format!("/task/{}/claim", task_id));
        debug!(url = %url, "POST claim");

        let response = self
            .inner
            .post(&url)
            .json(&RunScope {
                worker_group: &identity.worker_group,
                worker_id: &identity.worker_id,
                run_id: run_id.map(RunId::as_str),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QueueError::status("claim", response.status()));
        }
        Ok(response.json().await?)
    }

    /// Exchange `{name: contentType}` declarations for signed PUT URLs.
    pub async fn request_artifact_urls(
        &self,
        identity: &WorkerIdentity,
        task_id: &TaskId,
        run_id: &RunId,
        artifacts: &BTreeMap<String, String>,
    ) -> Result<HashMap<String, String>, QueueError> {
        let url = self.queue_url(&format!("/task/{}/artifact-urls", task_id));
        debug!(url = %url, count = artifacts.len(), "POST artifact-urls");

        let specs: BTreeMap<&str, ArtifactSpec<'_>> = artifacts
            .iter()
            .map(|(name, content_type)| {
                (
                    name.as_str(),
                    ArtifactSpec {
                        content_type: content_type.as_str(),
                    },
                )
            })
            .collect();

        let response = self
            .inner
            .post(&url)
            .json(&ArtifactUrlsRequest {
                worker_group: &identity.worker_group,
                worker_id: &identity.worker_id,
                run_id: run_id.as_str(),
                artifacts: specs,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QueueError::status("artifact-urls", response.status()));
        }
        let reply: ArtifactUrlsReply = response.json().await?;
        Ok(reply.artifact_put_urls)
    }

    /// Mark the task done.
    pub async fn report_completed(
        &self,
        identity: &WorkerIdentity,
        task_id: &TaskId,
        run_id: &RunId,
    ) -> Result<(), QueueError> {
        let url = self.queue_url(&format!("/task/{}/completed", task_id));
        debug!(url = %url, "POST completed");

        let response = self
            .inner
            .post(&url)
            .json(&RunScope {
                worker_group: &identity.worker_group,
                worker_id: &identity.worker_id,
                run_id: Some(run_id.as_str()),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QueueError::status("completed", response.status()));
        }
        Ok(())
    }

    /// Submit a new task to the queue; the queue assigns the task id.
    pub async fn post_task(&self, task: &TaskDefinition) -> Result<TaskCreatedReply, QueueError> {
        let url = self.queue_url("/task/new");
        debug!(url = %url, command = %task.command, "POST task/new");

        let response = self.inner.post(&url).json(task).send().await?;
        if !response.status().is_success() {
            return Err(QueueError::status("task/new", response.status()));
        }
        Ok(response.json().await?)
    }

    /// List pending tasks for a provisioner.
    pub async fn list_pending_tasks(
        &self,
        provisioner_id: &str,
    ) -> Result<PendingTasksReply, QueueError> {
        let url = self.queue_url(&format!("/pending-tasks/{}", provisioner_id));
        debug!(url = %url, "GET pending-tasks");

        let response = self.inner.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(QueueError::status("pending-tasks", response.status()));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity() -> WorkerIdentity {
        WorkerIdentity::new("aws-provisioner", "m3-xlarge_ami-1234", "us-east-1a", "i-abcd")
            .unwrap()
    }

    fn client(server: &MockServer) -> QueueClient {
        QueueClient::new(QueueConfig::new(&server.uri(), &server.uri()))
    }

    #[tokio::test]
    async fn claim_work_returns_task_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/claim-work/aws-provisioner/m3-xlarge_ami-1234"))
            .and(body_partial_json(json!({
                "workerGroup": "us-east-1a",
                "workerId": "i-abcd"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": {"taskId": "t1", "takenUntil": "2026-08-29T12:15:00Z"},
                "runId": "0",
                "logsPutUrl": "http://signed/logs",
                "resultPutUrl": "http://signed/result"
            })))
            .mount(&server)
            .await;

        let reply = client(&server).claim_work(&identity()).await.unwrap();
        let reply = reply.expect("task should be claimed");
        assert_eq!(reply.status.task_id.as_str(), "t1");
        assert_eq!(reply.result_put_url, "http://signed/result");
    }

    #[tokio::test]
    async fn claim_work_returns_none_on_204() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let reply = client(&server).claim_work(&identity()).await.unwrap();
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn claim_work_errors_on_other_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).claim_work(&identity()).await.unwrap_err();
        assert!(matches!(
            err,
            QueueError::UnexpectedStatus { ref endpoint, status }
                if endpoint == "claim-work" && status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn fetch_task_definition_parses_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/t1/task.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "command": "/bin/sh",
                "arguments": ["-c", "true"]
            })))
            .mount(&server)
            .await;

        let task = client(&server)
            .fetch_task_definition(&TaskId::new("t1"))
            .await
            .unwrap();
        assert_eq!(task.command, "/bin/sh");
        assert_eq!(task.arguments, vec!["-c", "true"]);
    }

    #[tokio::test]
    async fn fetch_task_definition_errors_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_task_definition(&TaskId::new("gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::UnexpectedStatus { .. }));
    }

    #[tokio::test]
    async fn reclaim_sends_run_scope_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/task/t1/claim"))
            .and(body_partial_json(json!({
                "workerGroup": "us-east-1a",
                "workerId": "i-abcd",
                "runId": "0"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": {"taskId": "t1", "takenUntil": "2026-08-29T12:30:00Z"},
                "runId": "0",
                "logsPutUrl": "http://signed/logs2",
                "resultPutUrl": "http://signed/result2"
            })))
            .mount(&server)
            .await;

        let reply = client(&server)
            .reclaim(&identity(), &TaskId::new("t1"), &RunId::new("0"))
            .await
            .unwrap();
        assert_eq!(reply.logs_put_url, "http://signed/logs2");
    }

    #[tokio::test]
    async fn claim_task_without_run_id_omits_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/task/t1/claim"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": {"taskId": "t1", "takenUntil": "2026-08-29T12:30:00Z"},
                "runId": "0",
                "logsPutUrl": "http://signed/logs",
                "resultPutUrl": "http://signed/result"
            })))
            .mount(&server)
            .await;

        client(&server)
            .claim_task(&identity(), &TaskId::new("t1"), None)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("runId").is_none());
        assert_eq!(body["workerGroup"], "us-east-1a");
    }

    #[tokio::test]
    async fn reclaim_propagates_404() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .reclaim(&identity(), &TaskId::new("t1"), &RunId::new("0"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QueueError::UnexpectedStatus { status, .. } if status == StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn request_artifact_urls_maps_names() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/task/t1/artifact-urls"))
            .and(body_partial_json(json!({
                "artifacts": {"stdout.log": {"contentType": "text/plain"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "artifactPutUrls": {"stdout.log": "http://signed/stdout"}
            })))
            .mount(&server)
            .await;

        let mut artifacts = BTreeMap::new();
        artifacts.insert("stdout.log".to_string(), "text/plain".to_string());
        let urls = client(&server)
            .request_artifact_urls(&identity(), &TaskId::new("t1"), &RunId::new("0"), &artifacts)
            .await
            .unwrap();
        assert_eq!(urls["stdout.log"], "http://signed/stdout");
    }

    #[tokio::test]
    async fn report_completed_ok_and_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/task/t1/completed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/task/t2/completed"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let c = client(&server);
        c.report_completed(&identity(), &TaskId::new("t1"), &RunId::new("0"))
            .await
            .unwrap();
        let err = c
            .report_completed(&identity(), &TaskId::new("t2"), &RunId::new("0"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::UnexpectedStatus { .. }));
    }

    #[tokio::test]
    async fn post_task_returns_assigned_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/task/new"))
            .and(body_partial_json(json!({
                "command": "/bin/sh",
                "arguments": ["-c", "true"],
                "priority": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": {"taskId": "t-new"}
            })))
            .mount(&server)
            .await;

        // Unknown task parameters survive the round trip to the queue.
        let task: TaskDefinition = serde_json::from_value(json!({
            "command": "/bin/sh",
            "arguments": ["-c", "true"],
            "priority": 3
        }))
        .unwrap();
        let reply = client(&server).post_task(&task).await.unwrap();
        assert_eq!(reply.status.task_id.as_str(), "t-new");
    }

    #[tokio::test]
    async fn post_task_errors_on_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let err = client(&server)
            .post_task(&TaskDefinition::new("true", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QueueError::UnexpectedStatus { ref endpoint, status }
                if endpoint == "task/new" && status == StatusCode::BAD_REQUEST
        ));
    }

    #[test]
    fn artifact_url_is_canonical() {
        let config = QueueConfig::new("http://queue:3000/", "http://store/");
        assert_eq!(
            config.artifact_url(&TaskId::new("t1"), &RunId::new("0"), "stdout.log"),
            "http://store/t1/runs/0/artifacts/stdout.log"
        );
    }
}
