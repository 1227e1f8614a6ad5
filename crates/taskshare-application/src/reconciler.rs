//! Change reconciler.
//!
//! Applies local mutations and push-delivered change events to the session
//! registries under one commit protocol:
//!
//! - Local mutations are written speculatively, then sent to the server. On
//!   success the authoritative values (server ids, server task lists) are
//!   written back; on failure the speculative write is undone.
//! - Push events apply unconditionally and always win over a pending local
//!   write for the fields they carry.
//! - Re-applying data that is already current (a push echoing our own change)
//!   is idempotent.
//!
//! A rollback restores, field by field, the pre-mutation values of what the
//! speculative write changed. A field that something newer (typically a push
//! event) has overwritten in the meantime keeps the newer value.

use crate::session::{SessionContext, SessionState, SessionTicket};
use std::sync::Arc;
use taskshare_core::error::{Result, TaskShareError};
use taskshare_core::validation;
use taskshare_core::{
    Category, CategoryDraft, CategoryId, ChangeEvent, Task, TaskApi, TaskDraft, TaskEdit, TaskId,
    TaskPatch,
};
use tokio_util::sync::CancellationToken;

/// Commit protocol for every change source except reordering.
#[derive(Clone)]
pub struct ChangeReconciler {
    session: SessionContext,
    api: Arc<dyn TaskApi>,
}

impl ChangeReconciler {
    pub fn new(session: SessionContext, api: Arc<dyn TaskApi>) -> Self {
        Self { session, api }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    // ============================================================================
    // Tasks
    // ============================================================================

    /// Creates a task owned by the current user.
    ///
    /// The task appears immediately under a provisional id and is re-keyed to
    /// the server id once the create is confirmed.
    pub async fn create_task(
        &self,
        title: &str,
        description: &str,
        category_id: CategoryId,
    ) -> Result<Task> {
        let ticket = self.session.ticket().await?;
        validation::validate_title(title)?;
        validation::validate_description(description)?;

        let (provisional_id, draft) = self
            .session
            .write_current(&ticket, |state| {
                let id = state.next_provisional_id();
                let category = state.categories.by_id(category_id).clone();
                let draft = TaskDraft {
                    title: title.to_string(),
                    description: description.to_string(),
                    category: category.clone(),
                    order: state.tasks.len() as i64,
                };
                state.tasks.replace_all(Task {
                    id,
                    title: draft.title.clone(),
                    description: draft.description.clone(),
                    is_done: false,
                    category,
                    owner: ticket.user.clone(),
                    shared_with: Default::default(),
                    display_order: 0,
                });
                (id, draft)
            })
            .await?;

        tracing::debug!("[Reconciler] Created provisional task {}", provisional_id);

        match self.api.create_task(&ticket.token, &draft).await {
            Ok(server_id) => {
                self.session
                    .write_current(&ticket, |state| {
                        state.tasks.rekey(provisional_id, server_id);
                        state.tasks.get(server_id).cloned()
                    })
                    .await?
                    .ok_or_else(|| TaskShareError::not_found("Task", server_id))
            }
            Err(e) => {
                tracing::warn!(
                    "[Reconciler] Create of task '{}' failed, rolling back: {}",
                    draft.title,
                    e
                );
                self.session
                    .write_current(&ticket, |state| {
                        state.tasks.remove(provisional_id);
                    })
                    .await?;
                Err(e)
            }
        }
    }

    /// Edits title, description and category of an owned task.
    pub async fn edit_task(&self, id: TaskId, edit: TaskEdit) -> Result<Task> {
        let ticket = self.session.ticket().await?;
        validation::validate_title(&edit.title)?;
        validation::validate_description(&edit.description)?;

        let pending = self
            .session
            .write_current(&ticket, |state| {
                let previous = owned_task(state, id, &ticket.user)?;
                let category = state.categories.by_id(edit.category_id).clone();
                let patch = TaskPatch::new(id)
                    .title(edit.title.clone())
                    .description(edit.description.clone())
                    .category(category);
                speculate(state, previous, &patch)
            })
            .await??;

        self.commit_task_update(&ticket, pending, "edit").await
    }

    /// Flips the done flag. Allowed for the owner and for delegates.
    pub async fn toggle_done(&self, id: TaskId) -> Result<Task> {
        let ticket = self.session.ticket().await?;

        let pending = self
            .session
            .write_current(&ticket, |state| {
                let previous = state
                    .tasks
                    .get(id)
                    .cloned()
                    .ok_or_else(|| TaskShareError::not_found("Task", id))?;
                let patch = TaskPatch::new(id).done(!previous.is_done);
                speculate(state, previous, &patch)
            })
            .await??;

        self.commit_task_update(&ticket, pending, "toggle").await
    }

    /// Deletes an owned task. On failure it is restored at its old position.
    pub async fn delete_task(&self, id: TaskId) -> Result<()> {
        let ticket = self.session.ticket().await?;

        let (index, removed) = self
            .session
            .write_current(&ticket, |state| {
                owned_task(state, id, &ticket.user)?;
                state
                    .tasks
                    .remove(id)
                    .ok_or_else(|| TaskShareError::not_found("Task", id))
            })
            .await??;

        if let Err(e) = self.api.delete_task(&ticket.token, id).await {
            tracing::warn!("[Reconciler] Delete of task {} failed, restoring: {}", id, e);
            self.session
                .write_current(&ticket, |state| state.tasks.restore(index, removed))
                .await?;
            return Err(e);
        }
        tracing::debug!("[Reconciler] Deleted task {}", id);
        Ok(())
    }

    /// Delegates an owned task to `target`. Sharing with a user who already
    /// has the task is a no-op.
    pub async fn share_task(&self, id: TaskId, target: &str) -> Result<Task> {
        self.change_sharing(id, target, true).await
    }

    /// Withdraws a delegation. Removing a user who does not have the task is
    /// a no-op.
    pub async fn unshare_task(&self, id: TaskId, target: &str) -> Result<Task> {
        self.change_sharing(id, target, false).await
    }

    async fn change_sharing(&self, id: TaskId, target: &str, share: bool) -> Result<Task> {
        let ticket = self.session.ticket().await?;

        let step = self
            .session
            .write_current(&ticket, |state| {
                let previous = owned_task(state, id, &ticket.user)?;
                validation::validate_share_target(target, &previous.owner)?;

                let mut shared_with = previous.shared_with.clone();
                let changed = if share {
                    shared_with.insert(target)
                } else {
                    shared_with.remove(target)
                };
                if !changed {
                    return Ok(None);
                }
                let patch = TaskPatch::new(id).shared_with(shared_with);
                speculate(state, previous, &patch).map(Some)
            })
            .await??;

        let Some(pending) = step else {
            tracing::debug!(
                "[Reconciler] Sharing of task {} with '{}' already as requested",
                id,
                target
            );
            return self
                .session
                .read(|state| state.tasks.get(id).cloned())
                .await
                .ok_or_else(|| TaskShareError::not_found("Task", id));
        };

        let result = if share {
            self.api.share_task(&ticket.token, id, target).await
        } else {
            self.api.unshare_task(&ticket.token, id, target).await
        };

        match result {
            Ok(()) => Ok(pending.updated),
            Err(e) => {
                tracing::warn!(
                    "[Reconciler] {} of task {} with '{}' failed, rolling back: {}",
                    if share { "Share" } else { "Unshare" },
                    id,
                    target,
                    e
                );
                self.rollback_task(&ticket, pending).await?;
                Err(e)
            }
        }
    }

    async fn commit_task_update(
        &self,
        ticket: &SessionTicket,
        pending: PendingTaskWrite,
        action: &str,
    ) -> Result<Task> {
        match self.api.update_task(&ticket.token, &pending.updated).await {
            Ok(()) => {
                tracing::debug!("[Reconciler] Committed {} of task {}", action, pending.updated.id);
                Ok(pending.updated)
            }
            Err(e) => {
                tracing::warn!(
                    "[Reconciler] {} of task {} failed, rolling back: {}",
                    action,
                    pending.updated.id,
                    e
                );
                self.rollback_task(ticket, pending).await?;
                Err(e)
            }
        }
    }

    async fn rollback_task(&self, ticket: &SessionTicket, pending: PendingTaskWrite) -> Result<()> {
        self.session
            .write_current(ticket, |state| {
                let id = pending.previous.id;
                let Some(current) = state.tasks.get(id) else {
                    tracing::debug!("[Reconciler] Task {} removed since the failed write", id);
                    return;
                };
                let undo = pending.patch.undo_onto(&pending.previous, current);
                if undo.is_empty() {
                    tracing::debug!(
                        "[Reconciler] Task {} fully superseded since the failed write",
                        id
                    );
                    return;
                }
                if let Err(e) = state.tasks.merge_fields(&undo) {
                    tracing::debug!("[Reconciler] Rollback of task {} skipped: {}", id, e);
                }
            })
            .await
    }

    // ============================================================================
    // Categories
    // ============================================================================

    /// Creates a category under a provisional id, re-keyed on success.
    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category> {
        let ticket = self.session.ticket().await?;

        let (provisional_id, draft) = self
            .session
            .write_current(&ticket, |state| {
                validation::validate_category(&draft, &state.categories, None)?;
                let id = state.next_provisional_id();
                let category = draft.clone().into_category(id);
                let trimmed = CategoryDraft {
                    name: category.name.clone(),
                    ..draft
                };
                state.categories.upsert(category)?;
                Ok::<_, TaskShareError>((id, trimmed))
            })
            .await??;

        match self.api.create_category(&ticket.token, &draft).await {
            Ok(server_id) => {
                self.session
                    .write_current(&ticket, |state| {
                        state.categories.rekey(provisional_id, server_id);
                        let category = state.categories.get(server_id).cloned()?;
                        // Tasks assigned while the create was in flight follow the new id.
                        state.tasks.reassign_category(provisional_id, &category);
                        Some(category)
                    })
                    .await?
                    .ok_or_else(|| TaskShareError::not_found("Category", server_id))
            }
            Err(e) => {
                tracing::warn!(
                    "[Reconciler] Create of category '{}' failed, rolling back: {}",
                    draft.name,
                    e
                );
                self.session
                    .write_current(&ticket, |state| {
                        let _ = state.categories.remove(provisional_id);
                        let fallback = state.categories.default_category().clone();
                        state.tasks.reassign_category(provisional_id, &fallback);
                    })
                    .await?;
                Err(e)
            }
        }
    }

    /// Renames or recolours a category. Tasks keep the snapshot they embed.
    pub async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category> {
        let ticket = self.session.ticket().await?;

        let (previous, updated, revision) = self
            .session
            .write_current(&ticket, |state| {
                if state.categories.is_default(id) {
                    return Err(TaskShareError::protected("Category", id));
                }
                let previous = state
                    .categories
                    .get(id)
                    .cloned()
                    .ok_or_else(|| TaskShareError::not_found("Category", id))?;
                validation::validate_category(&draft, &state.categories, Some(id))?;
                let updated = draft.clone().into_category(id);
                state.categories.upsert(updated.clone())?;
                let revision = state.categories.revision(id).unwrap_or_default();
                Ok((previous, updated, revision))
            })
            .await??;

        if let Err(e) = self.api.update_category(&ticket.token, &updated).await {
            tracing::warn!("[Reconciler] Update of category {} failed, rolling back: {}", id, e);
            self.session
                .write_current(&ticket, |state| {
                    if state.categories.revision(id) == Some(revision) {
                        let _ = state.categories.upsert(previous);
                    }
                })
                .await?;
            return Err(e);
        }
        Ok(updated)
    }

    /// Deletes a category.
    ///
    /// Its tasks move to the default category in the same write that removes
    /// it, so no task ever references a missing category. The task list the
    /// server returns is then applied authoritatively.
    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let ticket = self.session.ticket().await?;

        let (index, removed, fallback, reassigned) = self
            .session
            .write_current(&ticket, |state| {
                let index = state.categories.index_of(id);
                let removed = state.categories.remove(id)?;
                let fallback = state.categories.default_category().clone();
                let reassigned = state.tasks.reassign_category(id, &fallback);
                Ok::<_, TaskShareError>((index.unwrap_or_default(), removed, fallback, reassigned))
            })
            .await??;

        match self.api.delete_category(&ticket.token, id).await {
            Ok(tasks) => {
                self.session
                    .write_current(&ticket, |state| {
                        for task in tasks {
                            state.tasks.replace_all(task);
                        }
                    })
                    .await?;
                tracing::debug!("[Reconciler] Deleted category {}", id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[Reconciler] Delete of category {} failed, restoring: {}", id, e);
                self.session
                    .write_current(&ticket, |state| {
                        state.categories.restore(index, removed);
                        for (task_id, old) in reassigned {
                            let still_fallback = state
                                .tasks
                                .get(task_id)
                                .is_some_and(|task| task.category == fallback);
                            if still_fallback {
                                let _ = state.tasks.merge_fields(&TaskPatch::new(task_id).category(old));
                            }
                        }
                    })
                    .await?;
                Err(e)
            }
        }
    }

    // ============================================================================
    // Push events
    // ============================================================================

    /// Applies one push-delivered event to the session the ticket belongs to.
    ///
    /// # Errors
    ///
    /// Returns `StaleSession` if that session is gone. Events that cannot be
    /// applied (an update for an unknown task without a title) are dropped.
    pub async fn apply_event(&self, ticket: &SessionTicket, event: ChangeEvent) -> Result<()> {
        self.session
            .write_current(ticket, |state| apply_to_state(state, event))
            .await
    }

    /// Like [`apply_event`](Self::apply_event), but drops the event if
    /// `cancel` fired before the write acquired the session.
    ///
    /// Returns whether the event was applied.
    pub async fn apply_event_unless_cancelled(
        &self,
        ticket: &SessionTicket,
        event: ChangeEvent,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.session
            .write_current(ticket, |state| {
                if cancel.is_cancelled() {
                    tracing::debug!(
                        "[Reconciler] Dropping {} for task {} after close",
                        event.kind(),
                        event.task_id()
                    );
                    return false;
                }
                apply_to_state(state, event);
                true
            })
            .await
    }
}

/// A speculative task write that may have to be undone.
struct PendingTaskWrite {
    previous: Task,
    updated: Task,
    patch: TaskPatch,
}

fn owned_task(state: &SessionState, id: TaskId, user: &str) -> Result<Task> {
    let task = state
        .tasks
        .get(id)
        .ok_or_else(|| TaskShareError::not_found("Task", id))?;
    if !task.is_owned_by(user) {
        return Err(TaskShareError::NotOwner { task_id: id });
    }
    Ok(task.clone())
}

fn speculate(state: &mut SessionState, previous: Task, patch: &TaskPatch) -> Result<PendingTaskWrite> {
    let updated = state.tasks.merge_fields(patch)?.clone();
    Ok(PendingTaskWrite {
        previous,
        updated,
        patch: patch.clone(),
    })
}

fn apply_to_state(state: &mut SessionState, event: ChangeEvent) {
    let kind = event.kind();
    let id = event.task_id();
    match event {
        ChangeEvent::Upsert { task } => {
            let fallback = state.categories.default_category().clone();
            if !state.tasks.upsert(task, &fallback) {
                tracing::warn!(
                    "[Reconciler] Dropping {} for unknown task {} without a title",
                    kind,
                    id
                );
                return;
            }
        }
        ChangeEvent::Remove { id } => {
            state.tasks.remove(id);
        }
    }
    tracing::debug!("[Reconciler] Applied {} for task {}", kind, id);
}
