//! Client facade.
//!
//! Wires the session, reconciler, ordering coordinator and push channel into
//! the single entry point a UI or CLI talks to.

use crate::ordering::{OrderingCoordinator, OrderingState};
use crate::push_adapter::{ChannelStatus, PushChannelAdapter};
use crate::reconciler::ChangeReconciler;
use crate::session::SessionContext;
use std::sync::Arc;
use taskshare_core::error::Result;
use taskshare_core::validation;
use taskshare_core::{
    Category, CategoryDraft, CategoryId, PushTransport, Task, TaskApi, TaskEdit, TaskId,
};

pub struct TaskShareClient {
    session: SessionContext,
    api: Arc<dyn TaskApi>,
    reconciler: ChangeReconciler,
    ordering: OrderingCoordinator,
    push: Option<PushChannelAdapter>,
}

impl TaskShareClient {
    /// Creates a logged-out client.
    ///
    /// Without a push transport the client runs in optimistic-only mode.
    pub fn new(api: Arc<dyn TaskApi>, transport: Option<Arc<dyn PushTransport>>) -> Self {
        let session = SessionContext::new();
        let reconciler = ChangeReconciler::new(session.clone(), api.clone());
        let ordering = OrderingCoordinator::new(session.clone(), api.clone());
        let push = transport.map(|t| PushChannelAdapter::new(t, reconciler.clone()));
        Self {
            session,
            api,
            reconciler,
            ordering,
            push,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        validation::validate_credentials(username, password)?;
        self.api.register(username.trim(), password).await?;
        tracing::info!("[Client] Registered '{}'", username.trim());
        Ok(())
    }

    /// Logs in, replacing any current session, and opens the push channel.
    ///
    /// Failing to open the channel is not fatal: it is logged and the session
    /// continues without live updates.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        validation::validate_credentials(username, password)?;
        let username = username.trim();
        let response = self.api.login(username, password).await?;
        let ticket = self.session.begin(username, response).await;

        if let Some(push) = &self.push {
            match push.open(ticket.clone()).await {
                Ok(channel) => self.session.attach_channel(&ticket, channel).await,
                Err(e) => tracing::warn!(
                    "[Client] Push channel unavailable, continuing without live updates: {}",
                    e
                ),
            }
        }
        Ok(())
    }

    /// Closes the push channel and discards all session state.
    pub async fn logout(&self) {
        self.session.teardown().await;
    }

    pub async fn current_user(&self) -> Option<String> {
        self.session.current_user().await
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.session.tasks().await
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.session.categories().await
    }

    pub async fn channel_status(&self) -> Option<ChannelStatus> {
        self.session.channel_status().await
    }

    pub fn ordering_state(&self) -> OrderingState {
        self.ordering.state()
    }

    pub async fn create_task(
        &self,
        title: &str,
        description: &str,
        category_id: CategoryId,
    ) -> Result<Task> {
        self.reconciler
            .create_task(title, description, category_id)
            .await
    }

    pub async fn edit_task(&self, id: TaskId, edit: TaskEdit) -> Result<Task> {
        self.reconciler.edit_task(id, edit).await
    }

    pub async fn toggle_done(&self, id: TaskId) -> Result<Task> {
        self.reconciler.toggle_done(id).await
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<()> {
        self.reconciler.delete_task(id).await
    }

    pub async fn share_task(&self, id: TaskId, target: &str) -> Result<Task> {
        self.reconciler.share_task(id, target).await
    }

    pub async fn unshare_task(&self, id: TaskId, target: &str) -> Result<Task> {
        self.reconciler.unshare_task(id, target).await
    }

    pub async fn swap(&self, index: usize) -> Result<()> {
        self.ordering.swap(index).await
    }

    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category> {
        self.reconciler.create_category(draft).await
    }

    pub async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category> {
        self.reconciler.update_category(id, draft).await
    }

    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        self.reconciler.delete_category(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockPushTransport, MockTaskApi, login_response, sample_task};
    use std::time::Duration;
    use taskshare_core::TaskShareError;

    #[tokio::test]
    async fn test_login_populates_and_logout_clears() {
        let api = Arc::new(MockTaskApi::new());
        api.set_login(login_response(vec![sample_task(1, "alice")]));
        let client = TaskShareClient::new(api.clone(), None);

        client.login("alice", "pw").await.unwrap();
        assert_eq!(client.current_user().await.as_deref(), Some("alice"));
        assert_eq!(client.tasks().await.len(), 1);
        assert_eq!(client.categories().await.len(), 1);
        assert!(client.channel_status().await.is_none());

        client.logout().await;
        assert!(client.current_user().await.is_none());
        assert!(client.tasks().await.is_empty());
        assert_eq!(
            client.toggle_done(1).await.unwrap_err(),
            TaskShareError::AuthRequired
        );
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected_locally() {
        let api = Arc::new(MockTaskApi::new());
        let client = TaskShareClient::new(api.clone(), None);

        assert!(client.login("", "pw").await.unwrap_err().is_validation());
        assert!(client.register("bob", "").await.unwrap_err().is_validation());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_push_channel_follows_session() {
        let api = Arc::new(MockTaskApi::new());
        let transport = Arc::new(MockPushTransport::new());
        let client = TaskShareClient::new(api, Some(transport.clone()));

        let tx = transport.sender();
        client.login("alice", "pw").await.unwrap();
        assert_eq!(client.channel_status().await, Some(ChannelStatus::Open));

        tx.unbounded_send(Ok(r#"{"id":9,"title":"shared by bob","owner":"bob"}"#.to_string()))
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while client.tasks().await.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("push event never applied");

        client.logout().await;
        assert!(client.channel_status().await.is_none());
        let _ = tx.unbounded_send(Ok(r#"{"id":10,"title":"late","owner":"bob"}"#.to_string()));
        tokio::task::yield_now().await;
        assert!(client.tasks().await.is_empty());

        // A fresh login opens a fresh connection.
        let _tx = transport.sender();
        client.login("alice", "pw").await.unwrap();
        assert_eq!(transport.connects(), 2);
    }

    #[tokio::test]
    async fn test_login_survives_push_failure() {
        let api = Arc::new(MockTaskApi::new());
        let transport = Arc::new(MockPushTransport::new());
        let client = TaskShareClient::new(api, Some(transport.clone()));

        client.login("alice", "pw").await.unwrap();
        assert!(client.channel_status().await.is_none());
        client.create_task("Buy milk", "", 1).await.unwrap();
        assert_eq!(client.tasks().await.len(), 1);
    }
}
