//! REST implementation of [`TaskApi`] over `reqwest`.
//!
//! Non-success statuses are normalized into [`ApiError`]: `400` and `404`
//! carry the server's `{error}` message, anything else becomes
//! [`ApiError::Fetch`] with a fixed per-operation message.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use taskdash_proto::{ErrorBody, NewTask, Task, TaskId, TaskPatch, User, UserId};

use super::{ApiError, TaskApi};

/// HTTP client for the task/user API.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTaskApi {
    /// Creates a client rooted at `base_url` (e.g. `http://localhost:3000`).
    ///
    /// `timeout` bounds each request; `None` waits indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unexpected`] if the URL does not parse or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Unexpected(format!("invalid base url {base_url}: {e}")))?;
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Unexpected(format!("failed to build http client: {e}")))?;

        tracing::debug!(base_url = %base_url, "http task api ready");
        Ok(Self { client, base_url })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Unexpected(format!("invalid endpoint {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, failure: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(failure, &e))?;
        read_json(resp, failure).await
    }
}

impl TaskApi for HttpTaskApi {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.get_json("api/tasks", "Failed to fetch tasks").await
    }

    async fn fetch_users(&self) -> Result<Vec<User>, ApiError> {
        self.get_json("api/users", "Failed to fetch users").await
    }

    async fn fetch_task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.get_json(&format!("api/tasks/{id}"), "Failed to fetch task")
            .await
    }

    async fn fetch_user(&self, id: UserId) -> Result<User, ApiError> {
        self.get_json(&format!("api/users/{id}"), "Failed to fetch user")
            .await
    }

    async fn create_task(&self, data: &NewTask) -> Result<Task, ApiError> {
        const FAILURE: &str = "Failed to create task";
        let url = self.endpoint("api/tasks")?;
        tracing::debug!(%url, "POST");
        let resp = self
            .client
            .post(url)
            .json(data)
            .send()
            .await
            .map_err(|e| transport_error(FAILURE, &e))?;
        read_json(resp, FAILURE).await
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        const FAILURE: &str = "Failed to update task";
        let url = self.endpoint(&format!("api/tasks/{id}"))?;
        tracing::debug!(%url, "PATCH");
        let resp = self
            .client
            .patch(url)
            .json(patch)
            .send()
            .await
            .map_err(|e| transport_error(FAILURE, &e))?;
        read_json(resp, FAILURE).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        const FAILURE: &str = "Failed to delete task";
        let url = self.endpoint(&format!("api/tasks/{id}"))?;
        tracing::debug!(%url, "DELETE");
        let resp = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| transport_error(FAILURE, &e))?;
        check_status(resp, FAILURE).await?;
        Ok(())
    }
}

/// Checks the status, then decodes the JSON body.
async fn read_json<T: DeserializeOwned>(resp: Response, failure: &str) -> Result<T, ApiError> {
    let resp = check_status(resp, failure).await?;
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Unexpected(format!("{failure}: {e}")))
}

/// Maps a non-success response to the matching [`ApiError`].
async fn check_status(resp: Response, failure: &str) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let server_message = resp.json::<ErrorBody>().await.ok().map(|body| body.error);
    tracing::warn!(
        status = status.as_u16(),
        server_message = server_message.as_deref().unwrap_or(""),
        "{failure}"
    );

    Err(match status {
        StatusCode::BAD_REQUEST => {
            ApiError::Validation(server_message.unwrap_or_else(|| failure.to_string()))
        }
        StatusCode::NOT_FOUND => {
            ApiError::NotFound(server_message.unwrap_or_else(|| failure.to_string()))
        }
        other => ApiError::Fetch {
            message: failure.to_string(),
            status: other.as_u16(),
        },
    })
}

fn transport_error(failure: &str, e: &reqwest::Error) -> ApiError {
    tracing::warn!(error = %e, "{failure}");
    ApiError::Unexpected(format!("{failure}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let api = HttpTaskApi::new("http://localhost:3000/dashboard", None).unwrap();
        assert_eq!(api.base_url().as_str(), "http://localhost:3000/dashboard/");
        assert_eq!(
            api.endpoint("api/tasks").unwrap().as_str(),
            "http://localhost:3000/dashboard/api/tasks"
        );
    }

    #[test]
    fn root_base_url_joins_cleanly() {
        let api = HttpTaskApi::new("http://localhost:3000", None).unwrap();
        assert_eq!(
            api.endpoint("api/tasks/7").unwrap().as_str(),
            "http://localhost:3000/api/tasks/7"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpTaskApi::new("not a url", None).unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_unexpected_error() {
        // Port 9 (discard) on localhost is essentially never served.
        let api = HttpTaskApi::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
        let err = api.fetch_tasks().await.unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(ref m) if m.starts_with("Failed to fetch tasks")));
    }
}
