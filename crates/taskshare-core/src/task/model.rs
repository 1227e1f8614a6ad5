//! Task domain model.
//!
//! A task embeds a *snapshot* of its category: a copy of the category fields
//! taken when the category was assigned. Editing the category later does not
//! relabel tasks; only a new change event for the task does.

use crate::category::{Category, CategoryId};
use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned task identifier. Negative values are provisional.
pub type TaskId = i64;

/// Usernames a task is delegated to.
///
/// Behaves as a set (no duplicates) while keeping insertion order for display.
/// Decoding drops empty names and duplicates, which normalises the legacy
/// `[""]` placeholder to the empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SharedWith(Vec<String>);

impl SharedWith {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user. Returns false if the user was already present.
    pub fn insert(&mut self, user: impl Into<String>) -> bool {
        let user = user.into();
        if user.is_empty() || self.contains(&user) {
            return false;
        }
        self.0.push(user);
        true
    }

    /// Removes a user. Returns false if the user was not present.
    pub fn remove(&mut self, user: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|u| u != user);
        self.0.len() != before
    }

    pub fn contains(&self, user: &str) -> bool {
        self.0.iter().any(|u| u == user)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SharedWith {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SharedWith::new();
        for user in iter {
            set.insert(user);
        }
        set
    }
}

impl<'de> Deserialize<'de> for SharedWith {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
        Ok(raw.unwrap_or_default().into_iter().collect())
    }
}

/// A task as held in the registry and exchanged with the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    #[serde(rename = "isDone", default)]
    pub is_done: bool,
    pub category: Category,
    #[serde(default)]
    pub owner: String,
    #[serde(rename = "shared", default)]
    pub shared_with: SharedWith,
    #[serde(rename = "order", default)]
    pub display_order: i64,
}

impl Task {
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.owner == user
    }

    /// True if `user` sees this task as a delegate rather than the owner.
    pub fn is_delegated_to(&self, user: &str) -> bool {
        self.shared_with.contains(user)
    }
}

/// A partial task: the id plus any subset of fields.
///
/// Used both for local merges (only the fields the caller means to change)
/// and for push events, which may carry a full or partial record. `None`
/// means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "desc", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "isDone", default, skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "shared", default, skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<SharedWith>,
    /// Server-side position. The registry owns ordering, so this is only
    /// consulted when building an initial snapshot.
    #[serde(rename = "order", default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
}

impl TaskPatch {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn done(mut self, is_done: bool) -> Self {
        self.is_done = Some(is_done);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn shared_with(mut self, shared_with: SharedWith) -> Self {
        self.shared_with = Some(shared_with);
        self
    }

    /// Writes every present field onto `task`. Ordering is left untouched.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(is_done) = self.is_done {
            task.is_done = is_done;
        }
        if let Some(category) = &self.category {
            task.category = category.clone();
        }
        if let Some(owner) = &self.owner {
            task.owner = owner.clone();
        }
        if let Some(shared_with) = &self.shared_with {
            task.shared_with = shared_with.clone();
        }
    }

    /// Builds the patch that undoes `self` on `current`.
    ///
    /// Covers each field `self` set whose current value is still the one
    /// `self` wrote, restoring it from `previous`. Fields a newer write has
    /// changed since are left out.
    pub fn undo_onto(&self, previous: &Task, current: &Task) -> TaskPatch {
        fn revert<T: Clone + PartialEq>(written: &Option<T>, now: &T, before: &T) -> Option<T> {
            match written {
                Some(value) if value == now => Some(before.clone()),
                _ => None,
            }
        }

        TaskPatch {
            id: current.id,
            title: revert(&self.title, &current.title, &previous.title),
            description: revert(&self.description, &current.description, &previous.description),
            is_done: revert(&self.is_done, &current.is_done, &previous.is_done),
            category: revert(&self.category, &current.category, &previous.category),
            owner: revert(&self.owner, &current.owner, &previous.owner),
            shared_with: revert(&self.shared_with, &current.shared_with, &previous.shared_with),
            display_order: None,
        }
    }

    /// True if the patch carries no field besides the id.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.is_done.is_none()
            && self.category.is_none()
            && self.owner.is_none()
            && self.shared_with.is_none()
            && self.display_order.is_none()
    }

    /// Builds a new task from the patch, filling absent fields with defaults.
    ///
    /// Returns `None` without a title: a task cannot exist untitled.
    pub fn into_task(self, fallback_category: &Category) -> Option<Task> {
        let title = self.title?;
        Some(Task {
            id: self.id,
            title,
            description: self.description.unwrap_or_default(),
            is_done: self.is_done.unwrap_or(false),
            category: self
                .category
                .unwrap_or_else(|| fallback_category.clone()),
            owner: self.owner.unwrap_or_default(),
            shared_with: self.shared_with.unwrap_or_default(),
            display_order: self.display_order.unwrap_or_default(),
        })
    }
}

impl From<Task> for TaskPatch {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: Some(task.title),
            description: Some(task.description),
            is_done: Some(task.is_done),
            category: Some(task.category),
            owner: Some(task.owner),
            shared_with: Some(task.shared_with),
            display_order: Some(task.display_order),
        }
    }
}

/// Input for creating a task; serialised as the create request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(rename = "desc")]
    pub description: String,
    pub category: Category,
    pub order: i64,
}

/// Owner-side edit of a task's text and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: String,
    pub description: String,
    pub category_id: CategoryId,
}
