//! Session lifecycle.
//!
//! `SessionContext` is the one shared mutable state of a running client. It is
//! cheap to clone; every clone refers to the same state. The registries inside
//! are only touched while the write lock is held, and the lock is never held
//! across a server call.
//!
//! Each login starts a new *epoch*. Work that suspends on the server captures
//! a [`SessionTicket`] first and presents it again before writing back, so a
//! response that arrives after logout (or after a re-login) is discarded.

use crate::push_adapter::PushChannelHandle;
use std::sync::Arc;
use taskshare_core::error::{Result, TaskShareError};
use taskshare_core::{AuthToken, Category, CategoryRegistry, LoginResponse, Task, TaskRegistry};
use tokio::sync::RwLock;

/// Proof of which session an in-flight operation belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    epoch: u64,
    pub user: String,
    pub token: AuthToken,
}

impl SessionTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// State owned by the session.
#[derive(Debug, Default)]
pub struct SessionState {
    pub user: Option<String>,
    pub token: Option<AuthToken>,
    pub tasks: TaskRegistry,
    pub categories: CategoryRegistry,
    channel: Option<PushChannelHandle>,
    epoch: u64,
    next_provisional_id: i64,
}

impl SessionState {
    /// Hands out a fresh negative id for an entity the server has not yet
    /// confirmed.
    pub fn next_provisional_id(&mut self) -> i64 {
        self.next_provisional_id -= 1;
        self.next_provisional_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn clear(&mut self) -> Option<PushChannelHandle> {
        self.user = None;
        self.token = None;
        self.tasks = TaskRegistry::new();
        self.categories = CategoryRegistry::new();
        self.next_provisional_id = 0;
        self.epoch += 1;
        self.channel.take()
    }
}

/// Shared handle to the client's session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    state: Arc<RwLock<SessionState>>,
}

impl SessionContext {
    /// Creates an empty, logged-out session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the session from a login snapshot, discarding any previous
    /// one, and returns the ticket of the new epoch.
    pub async fn begin(&self, user: impl Into<String>, login: LoginResponse) -> SessionTicket {
        let user = user.into();
        let mut state = self.state.write().await;
        if let Some(channel) = state.clear() {
            channel.close();
        }

        state.user = Some(user.clone());
        state.token = Some(login.token.clone());
        state.categories = CategoryRegistry::from_snapshot(login.categories);
        state.tasks = TaskRegistry::from_snapshot(login.tasks);

        tracing::info!(
            "[Session] Started session for '{}' (epoch {}, {} tasks, {} categories)",
            user,
            state.epoch,
            state.tasks.len(),
            state.categories.len()
        );

        SessionTicket {
            epoch: state.epoch,
            user,
            token: login.token,
        }
    }

    /// Tears the session down: closes the push channel, discards the token
    /// and clears both registries. Outstanding responses become stale.
    pub async fn teardown(&self) {
        let mut state = self.state.write().await;
        let had_user = state.user.clone();
        if let Some(channel) = state.clear() {
            channel.close();
        }
        if let Some(user) = had_user {
            tracing::info!("[Session] Ended session for '{}'", user);
        }
    }

    /// Returns the ticket of the current session.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` when no token is held.
    pub async fn ticket(&self) -> Result<SessionTicket> {
        let state = self.state.read().await;
        match (&state.user, &state.token) {
            (Some(user), Some(token)) => Ok(SessionTicket {
                epoch: state.epoch,
                user: user.clone(),
                token: token.clone(),
            }),
            _ => Err(TaskShareError::AuthRequired),
        }
    }

    pub async fn is_current(&self, ticket: &SessionTicket) -> bool {
        self.state.read().await.epoch == ticket.epoch
    }

    /// Runs `f` against the state under the read lock.
    pub async fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    /// Runs `f` under the write lock, provided the ticket still matches the
    /// current epoch.
    ///
    /// # Errors
    ///
    /// Returns `StaleSession` if the session was torn down or replaced since
    /// the ticket was issued.
    pub async fn write_current<R>(
        &self,
        ticket: &SessionTicket,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Result<R> {
        let mut state = self.state.write().await;
        if state.epoch != ticket.epoch {
            tracing::debug!(
                "[Session] Discarding write for epoch {} (current {})",
                ticket.epoch,
                state.epoch
            );
            return Err(TaskShareError::StaleSession);
        }
        Ok(f(&mut state))
    }

    /// Stores the push channel of the current session. A channel opened for
    /// an older epoch is closed immediately.
    pub async fn attach_channel(&self, ticket: &SessionTicket, channel: PushChannelHandle) {
        let mut state = self.state.write().await;
        if state.epoch != ticket.epoch {
            channel.close();
            return;
        }
        if let Some(previous) = state.channel.replace(channel) {
            previous.close();
        }
    }

    pub async fn channel_status(&self) -> Option<crate::push_adapter::ChannelStatus> {
        self.state
            .read()
            .await
            .channel
            .as_ref()
            .map(PushChannelHandle::status)
    }

    pub async fn current_user(&self) -> Option<String> {
        self.state.read().await.user.clone()
    }

    /// Snapshot of the tasks in display order.
    pub async fn tasks(&self) -> Vec<Task> {
        self.read(|state| state.tasks.iter().cloned().collect()).await
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.read(|state| state.categories.iter().cloned().collect())
            .await
    }
}
