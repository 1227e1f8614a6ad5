//! Task registry.
//!
//! The ordered task collection of a session. Sequence position is the display
//! order; `Task::display_order` is kept equal to the index (dense, gapless)
//! after every write.

use super::model::{Task, TaskId, TaskPatch};
use crate::category::{Category, CategoryId};
use crate::error::{Result, TaskShareError};
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct Entry {
    task: Task,
    revision: u64,
}

/// Ordered sequence of tasks keyed by id.
///
/// Every write bumps a per-entry revision drawn from a registry-wide counter,
/// which lets callers detect whether anything touched a task since they last
/// wrote it.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    entries: Vec<Entry>,
    write_seq: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a login snapshot, ordered by the server's
    /// `order` field. Duplicate ids keep the last occurrence.
    pub fn from_snapshot(mut tasks: Vec<Task>) -> Self {
        tasks.sort_by_key(|t| t.display_order);
        let mut registry = Self::new();
        for task in tasks {
            registry.replace_all(task);
        }
        registry
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.position(id).map(|idx| &self.entries[idx].task)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.position(id).is_some()
    }

    pub fn index_of(&self, id: TaskId) -> Option<usize> {
        self.position(id)
    }

    pub fn task_at(&self, index: usize) -> Option<&Task> {
        self.entries.get(index).map(|e| &e.task)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.entries.iter().map(|e| &e.task)
    }

    /// Task ids in display order.
    pub fn ids(&self) -> Vec<TaskId> {
        self.entries.iter().map(|e| e.task.id).collect()
    }

    /// Monotonic write counter of the entry, if present.
    pub fn revision(&self, id: TaskId) -> Option<u64> {
        self.position(id).map(|idx| self.entries[idx].revision)
    }

    /// Inserts a complete task, or replaces every field of an existing one.
    ///
    /// An existing task keeps its position; a new one is appended.
    pub fn replace_all(&mut self, mut task: Task) {
        let revision = self.next_revision();
        match self.position(task.id) {
            Some(idx) => {
                task.display_order = idx as i64;
                self.entries[idx] = Entry { task, revision };
            }
            None => {
                task.display_order = self.entries.len() as i64;
                self.entries.push(Entry { task, revision });
            }
        }
    }

    /// Merges the present fields of `patch` into an existing task.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the task is not in the registry.
    pub fn merge_fields(&mut self, patch: &TaskPatch) -> Result<&Task> {
        let idx = self
            .position(patch.id)
            .ok_or_else(|| TaskShareError::not_found("Task", patch.id))?;
        let revision = self.next_revision();
        let entry = &mut self.entries[idx];
        patch.apply_to(&mut entry.task);
        entry.revision = revision;
        Ok(&entry.task)
    }

    /// Create-or-update by id.
    ///
    /// Present fields of an existing task are overwritten; an absent task is
    /// created from the patch (which then needs a title) and appended.
    /// Returns false if nothing was applied.
    pub fn upsert(&mut self, patch: TaskPatch, fallback_category: &Category) -> bool {
        if self.contains(patch.id) {
            return self.merge_fields(&patch).is_ok();
        }
        match patch.into_task(fallback_category) {
            Some(task) => {
                self.replace_all(task);
                true
            }
            None => false,
        }
    }

    /// Removes a task, returning its former index and value.
    pub fn remove(&mut self, id: TaskId) -> Option<(usize, Task)> {
        let idx = self.position(id)?;
        self.write_seq += 1;
        let entry = self.entries.remove(idx);
        self.renumber();
        Some((idx, entry.task))
    }

    /// Re-inserts a removed task at its former index, unless the id has
    /// reappeared in the meantime.
    pub fn restore(&mut self, index: usize, task: Task) {
        if self.contains(task.id) {
            return;
        }
        let revision = self.next_revision();
        let index = index.min(self.entries.len());
        self.entries.insert(index, Entry { task, revision });
        self.renumber();
    }

    /// Replaces a provisional id with the server-assigned one.
    ///
    /// If the server id is already present (a push delivered it first), the
    /// provisional entry is dropped instead.
    pub fn rekey(&mut self, old_id: TaskId, new_id: TaskId) {
        let Some(idx) = self.position(old_id) else {
            return;
        };
        if self.contains(new_id) {
            self.entries.remove(idx);
            self.renumber();
            return;
        }
        let revision = self.next_revision();
        let entry = &mut self.entries[idx];
        entry.task.id = new_id;
        entry.revision = revision;
    }

    /// Replaces the order wholesale.
    ///
    /// # Errors
    ///
    /// Returns `OrderMismatch` unless `sequence` is a permutation of the
    /// current ids; the order is unchanged in that case.
    pub fn reorder(&mut self, sequence: &[TaskId]) -> Result<()> {
        if sequence.len() != self.entries.len() {
            return Err(TaskShareError::order_mismatch(format!(
                "expected {} ids, got {}",
                self.entries.len(),
                sequence.len()
            )));
        }
        let mut seen = HashSet::with_capacity(sequence.len());
        for id in sequence {
            if !seen.insert(*id) {
                return Err(TaskShareError::order_mismatch(format!("duplicate id {}", id)));
            }
            if !self.contains(*id) {
                return Err(TaskShareError::order_mismatch(format!("unknown id {}", id)));
            }
        }

        let mut remaining = std::mem::take(&mut self.entries);
        for id in sequence {
            if let Some(pos) = remaining.iter().position(|e| e.task.id == *id) {
                self.entries.push(remaining.swap_remove(pos));
            }
        }
        self.write_seq += 1;
        self.renumber();
        Ok(())
    }

    /// Moves every task referencing `removed` onto `fallback`.
    ///
    /// Returns the previous category snapshots so the change can be undone.
    pub fn reassign_category(
        &mut self,
        removed: CategoryId,
        fallback: &Category,
    ) -> Vec<(TaskId, Category)> {
        let mut previous = Vec::new();
        for idx in 0..self.entries.len() {
            if self.entries[idx].task.category.id != removed {
                continue;
            }
            let revision = self.next_revision();
            let entry = &mut self.entries[idx];
            let old = std::mem::replace(&mut entry.task.category, fallback.clone());
            entry.revision = revision;
            previous.push((entry.task.id, old));
        }
        previous
    }

    fn next_revision(&mut self) -> u64 {
        self.write_seq += 1;
        self.write_seq
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.entries.iter().position(|e| e.task.id == id)
    }

    fn renumber(&mut self) {
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            entry.task.display_order = idx as i64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::SharedWith;

    fn category() -> Category {
        Category::default_entry(1)
    }

    fn task(id: TaskId, title: &str) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: String::new(),
            is_done: false,
            category: category(),
            owner: "alice".to_string(),
            shared_with: SharedWith::new(),
            display_order: 0,
        }
    }

    fn registry_of(ids: &[TaskId]) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for id in ids {
            registry.replace_all(task(*id, &format!("task {}", id)));
        }
        registry
    }

    #[test]
    fn test_upsert_then_remove() {
        let mut registry = TaskRegistry::new();
        let patch = TaskPatch::from(task(1, "Buy milk"));
        assert!(registry.upsert(patch, &category()));
        assert_eq!(registry.get(1).unwrap().title, "Buy milk");

        registry.remove(1);
        assert!(registry.get(1).is_none());
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let mut registry = registry_of(&[1]);
        registry
            .merge_fields(&TaskPatch::new(1).description("2 litres"))
            .unwrap();
        let task = registry.get(1).unwrap();
        assert_eq!(task.title, "task 1");
        assert_eq!(task.description, "2 litres");
    }

    #[test]
    fn test_merge_unknown_task_fails() {
        let mut registry = TaskRegistry::new();
        let err = registry.merge_fields(&TaskPatch::new(3).done(true)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_replace_all_keeps_position() {
        let mut registry = registry_of(&[1, 2, 3]);
        registry.replace_all(task(2, "renamed"));
        assert_eq!(registry.ids(), vec![1, 2, 3]);
        assert_eq!(registry.get(2).unwrap().display_order, 1);
    }

    #[test]
    fn test_snapshot_sorted_by_server_order() {
        let mut a = task(10, "a");
        a.display_order = 5;
        let mut b = task(11, "b");
        b.display_order = 2;
        let registry = TaskRegistry::from_snapshot(vec![a, b]);
        assert_eq!(registry.ids(), vec![11, 10]);
        assert_eq!(registry.get(10).unwrap().display_order, 1);
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let mut registry = registry_of(&[1, 2, 3]);
        assert!(registry.reorder(&[1, 2]).is_err());
        assert!(registry.reorder(&[1, 2, 2]).is_err());
        assert!(registry.reorder(&[1, 2, 4]).is_err());
        assert_eq!(registry.ids(), vec![1, 2, 3]);

        registry.reorder(&[3, 1, 2]).unwrap();
        assert_eq!(registry.ids(), vec![3, 1, 2]);
        let orders: Vec<i64> = registry.iter().map(|t| t.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_and_restore_position() {
        let mut registry = registry_of(&[1, 2, 3]);
        let (idx, removed) = registry.remove(2).unwrap();
        assert_eq!(registry.ids(), vec![1, 3]);
        registry.restore(idx, removed);
        assert_eq!(registry.ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_rekey_provisional_id() {
        let mut registry = registry_of(&[1, -1]);
        registry.rekey(-1, 42);
        assert_eq!(registry.ids(), vec![1, 42]);

        let mut registry = registry_of(&[-1, 42]);
        registry.rekey(-1, 42);
        assert_eq!(registry.ids(), vec![42]);
    }

    #[test]
    fn test_revision_advances_on_write() {
        let mut registry = registry_of(&[1]);
        let before = registry.revision(1).unwrap();
        registry.merge_fields(&TaskPatch::new(1).done(true)).unwrap();
        assert!(registry.revision(1).unwrap() > before);
    }

    #[test]
    fn test_reassign_category() {
        let mut registry = registry_of(&[1, 2]);
        let work = Category::new(5, "work", "#000000", "#000000");
        registry.merge_fields(&TaskPatch::new(2).category(work.clone())).unwrap();

        let previous = registry.reassign_category(5, &category());
        assert_eq!(previous, vec![(2, work)]);
        assert!(registry.get(2).unwrap().category.is_default());
    }
}
