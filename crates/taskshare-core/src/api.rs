//! Request/response collaborator.
//!
//! The REST surface of the server as consumed by the synchronisation engine.
//! Implementations own paths, methods, and status mapping; callers only see
//! `TaskShareError`.

use crate::auth::AuthToken;
use crate::category::{Category, CategoryDraft, CategoryId};
use crate::error::Result;
use crate::task::{Task, TaskDraft, TaskId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Payload returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: AuthToken,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// The server API used by the client.
///
/// Every mutating call takes the bearer token of the current session.
/// Server-side rejections surface as `Conflict`, connectivity problems as
/// `Transport`.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Creates an account.
    async fn register(&self, username: &str, password: &str) -> Result<()>;

    /// Authenticates and returns the token plus the user's current state.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse>;

    /// Creates a task and returns its server-assigned id.
    async fn create_task(&self, token: &AuthToken, draft: &TaskDraft) -> Result<TaskId>;

    /// Replaces a task's fields on the server.
    async fn update_task(&self, token: &AuthToken, task: &Task) -> Result<()>;

    async fn delete_task(&self, token: &AuthToken, id: TaskId) -> Result<()>;

    /// Delegates a task to another user.
    async fn share_task(&self, token: &AuthToken, id: TaskId, target: &str) -> Result<()>;

    async fn unshare_task(&self, token: &AuthToken, id: TaskId, target: &str) -> Result<()>;

    /// Confirms an adjacent swap of two tasks (upper first).
    async fn swap_order(&self, token: &AuthToken, upper: TaskId, lower: TaskId) -> Result<()>;

    /// Creates a category and returns its server-assigned id.
    async fn create_category(&self, token: &AuthToken, draft: &CategoryDraft)
    -> Result<CategoryId>;

    async fn update_category(&self, token: &AuthToken, category: &Category) -> Result<()>;

    /// Deletes a category. The server moves its tasks to the default category
    /// and returns the user's updated task list.
    async fn delete_category(&self, token: &AuthToken, id: CategoryId) -> Result<Vec<Task>>;
}
