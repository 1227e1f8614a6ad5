//! HttpTaskApi - `TaskApi` over the server's REST endpoints.
//!
//! | operation        | method   | path                          |
//! |------------------|----------|-------------------------------|
//! | register         | `POST`   | `/users/new`                  |
//! | login            | `POST`   | `/users`                      |
//! | create task      | `POST`   | `/tasks`                      |
//! | update task      | `PATCH`  | `/tasks/{id}`                 |
//! | delete task      | `DELETE` | `/tasks/{id}`                 |
//! | share task       | `POST`   | `/tasks/{id}/{user}`          |
//! | unshare task     | `DELETE` | `/tasks/{id}/{user}`          |
//! | swap order       | `PATCH`  | `/tasks/{upper}/{lower}`      |
//! | create category  | `POST`   | `/categories`                 |
//! | update category  | `PATCH`  | `/categories/{id}`            |
//! | delete category  | `PATCH`  | `/categories/{id}/delete`     |
//!
//! Errors: a 4xx answer becomes `Conflict` carrying the server's `error`
//! message; connection failures, timeouts and 5xx answers become
//! `Transport`.

use crate::config::ServerSettings;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskshare_core::error::{Result, TaskShareError};
use taskshare_core::{
    AuthToken, Category, CategoryDraft, CategoryId, LoginResponse, Task, TaskApi, TaskDraft,
    TaskId,
};

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    name: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTaskApi {
    /// Creates a client for the API rooted at `base_url`
    /// (e.g. `http://localhost:5000/api`).
    ///
    /// # Errors
    ///
    /// Returns `Config` if `base_url` is not a valid base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TaskShareError::config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TaskShareError::config(format!(
                "'{}' cannot be used as a base URL",
                base_url
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            timeout,
        })
    }

    pub fn from_settings(settings: &ServerSettings) -> Result<Self> {
        Self::new(&settings.base_url, settings.request_timeout())
    }

    /// Builds an endpoint URL. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TaskShareError::config("base URL cannot have path segments"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Adds the bearer token and the request timeout.
    fn auth_request(&self, request: RequestBuilder, token: &AuthToken) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", token.expose()))
            .timeout(self.timeout)
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("[HttpTaskApi] {} failed: {}", action, e);
            TaskShareError::transport(format!("{} failed: {}", action, e))
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("[HttpTaskApi] {} -> {}", action, status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = server_message(&body).unwrap_or_else(|| status.to_string());
        tracing::warn!("[HttpTaskApi] {} rejected ({}): {}", action, status, message);

        if status.is_client_error() {
            Err(TaskShareError::conflict(message))
        } else {
            Err(TaskShareError::transport(format!(
                "{} returned {}: {}",
                action, status, message
            )))
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| TaskShareError::Serialization {
                format: "JSON".to_string(),
                message: format!("{} response: {}", action, e),
            })
    }
}

/// Extracts the `error` field of a server error body, or the trimmed body
/// itself when it is not that shape.
fn server_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        return Some(parsed.error);
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn register(&self, username: &str, password: &str) -> Result<()> {
        let url = self.endpoint(&["users", "new"])?;
        let request = self
            .client
            .post(url)
            .json(&Credentials {
                name: username,
                password,
            })
            .timeout(self.timeout);
        self.send(request, "register").await?;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let url = self.endpoint(&["users"])?;
        let request = self
            .client
            .post(url)
            .json(&Credentials {
                name: username,
                password,
            })
            .timeout(self.timeout);
        let response = self.send(request, "login").await?;
        Self::read_json(response, "login").await
    }

    async fn create_task(&self, token: &AuthToken, draft: &TaskDraft) -> Result<TaskId> {
        let url = self.endpoint(&["tasks"])?;
        let request = self.auth_request(self.client.post(url).json(draft), token);
        let response = self.send(request, "create task").await?;
        Ok(Self::read_json::<IdResponse>(response, "create task").await?.id)
    }

    async fn update_task(&self, token: &AuthToken, task: &Task) -> Result<()> {
        let url = self.endpoint(&["tasks", &task.id.to_string()])?;
        let request = self.auth_request(self.client.patch(url).json(task), token);
        self.send(request, "update task").await?;
        Ok(())
    }

    async fn delete_task(&self, token: &AuthToken, id: TaskId) -> Result<()> {
        let url = self.endpoint(&["tasks", &id.to_string()])?;
        let request = self.auth_request(self.client.delete(url), token);
        self.send(request, "delete task").await?;
        Ok(())
    }

    async fn share_task(&self, token: &AuthToken, id: TaskId, target: &str) -> Result<()> {
        let url = self.endpoint(&["tasks", &id.to_string(), target])?;
        let request = self.auth_request(self.client.post(url), token);
        self.send(request, "share task").await?;
        Ok(())
    }

    async fn unshare_task(&self, token: &AuthToken, id: TaskId, target: &str) -> Result<()> {
        let url = self.endpoint(&["tasks", &id.to_string(), target])?;
        let request = self.auth_request(self.client.delete(url), token);
        self.send(request, "unshare task").await?;
        Ok(())
    }

    async fn swap_order(&self, token: &AuthToken, upper: TaskId, lower: TaskId) -> Result<()> {
        let url = self.endpoint(&["tasks", &upper.to_string(), &lower.to_string()])?;
        let request = self.auth_request(self.client.patch(url), token);
        self.send(request, "swap order").await?;
        Ok(())
    }

    async fn create_category(
        &self,
        token: &AuthToken,
        draft: &CategoryDraft,
    ) -> Result<CategoryId> {
        let url = self.endpoint(&["categories"])?;
        let request = self.auth_request(self.client.post(url).json(draft), token);
        let response = self.send(request, "create category").await?;
        Ok(Self::read_json::<IdResponse>(response, "create category")
            .await?
            .id)
    }

    async fn update_category(&self, token: &AuthToken, category: &Category) -> Result<()> {
        let url = self.endpoint(&["categories", &category.id.to_string()])?;
        let request = self.auth_request(self.client.patch(url).json(category), token);
        self.send(request, "update category").await?;
        Ok(())
    }

    async fn delete_category(&self, token: &AuthToken, id: CategoryId) -> Result<Vec<Task>> {
        let url = self.endpoint(&["categories", &id.to_string(), "delete"])?;
        let request = self.auth_request(self.client.patch(url), token);
        let response = self.send(request, "delete category").await?;
        Ok(Self::read_json::<TasksResponse>(response, "delete category")
            .await?
            .tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves exactly one HTTP exchange on a loopback port and reports the
    /// request head it received.
    async fn serve_once(status: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            // Read the head, then as many body bytes as announced.
            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if n == 0 {
                    break buf.len();
                }
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let length = head
                .lines()
                .find_map(|l| {
                    l.to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                })
                .unwrap_or(0);
            while buf.len() < head_end + length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(head);
        });

        (format!("http://{}/api", addr), rx)
    }

    fn token() -> AuthToken {
        AuthToken::new("abc123")
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let api = HttpTaskApi::new("http://localhost:5000/api/", Duration::from_secs(1)).unwrap();
        let url = api.endpoint(&["tasks", "4", "bob smith"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/tasks/4/bob%20smith");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpTaskApi::new("not a url", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, TaskShareError::Config(_)));
    }

    #[test]
    fn test_server_message_extraction() {
        assert_eq!(
            server_message(r#"{"error":"Kategorie existiert bereits"}"#).as_deref(),
            Some("Kategorie existiert bereits")
        );
        assert_eq!(server_message(" plain text ").as_deref(), Some("plain text"));
        assert_eq!(server_message(""), None);
    }

    #[tokio::test]
    async fn test_create_task_returns_server_id() {
        let (base, head) = serve_once("201 Created", r#"{"id":17}"#).await;
        let api = HttpTaskApi::new(&base, Duration::from_secs(5)).unwrap();
        let draft = TaskDraft {
            title: "Buy milk".to_string(),
            description: String::new(),
            category: Category::default_entry(1),
            order: 0,
        };

        assert_eq!(api.create_task(&token(), &draft).await.unwrap(), 17);
        let head = head.await.unwrap();
        assert!(head.starts_with("POST /api/tasks HTTP/1.1"));
        assert!(head.to_ascii_lowercase().contains("authorization: bearer abc123"));
    }

    #[tokio::test]
    async fn test_client_error_becomes_conflict() {
        let (base, _head) =
            serve_once("400 Bad Request", r#"{"error":"Kategorie existiert bereits"}"#).await;
        let api = HttpTaskApi::new(&base, Duration::from_secs(5)).unwrap();

        let err = api
            .create_category(&token(), &CategoryDraft::named("work"))
            .await
            .unwrap_err();
        assert_eq!(err, TaskShareError::conflict("Kategorie existiert bereits"));
    }

    #[tokio::test]
    async fn test_server_error_becomes_transport() {
        let (base, _head) = serve_once("500 Internal Server Error", "").await;
        let api = HttpTaskApi::new(&base, Duration::from_secs(5)).unwrap();

        let err = api.delete_task(&token(), 3).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_delete_category_returns_tasks() {
        let body = r##"{"tasks":[{"id":1,"title":"Report","desc":"","isDone":false,
            "category":{"id":1,"cat_name":"default","color_header":"#00a4ba","color_body":"#00ceea"},
            "owner":"alice","shared":[""],"order":0}]}"##;
        let (base, head) = serve_once("200 OK", body).await;
        let api = HttpTaskApi::new(&base, Duration::from_secs(5)).unwrap();

        let tasks = api.delete_category(&token(), 5).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].category.is_default());
        assert!(tasks[0].shared_with.is_empty());
        assert!(head.await.unwrap().starts_with("PATCH /api/categories/5/delete"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = HttpTaskApi::new(&format!("http://{}/api", addr), Duration::from_secs(2)).unwrap();
        let err = api.login("alice", "pw").await.unwrap_err();
        assert!(err.is_transport());
    }
}
