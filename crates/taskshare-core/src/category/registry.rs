//! Category registry.
//!
//! Maps category ids to category records for one session. Exactly one entry
//! carries the reserved default id at all times; lookups of unknown ids
//! degrade to that entry instead of failing.

use super::model::{Category, CategoryId, DEFAULT_CATEGORY_ID};
use crate::error::{Result, TaskShareError};

#[derive(Debug, Clone)]
struct Entry {
    category: Category,
    revision: u64,
}

/// The session's category table, kept in insertion order.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    entries: Vec<Entry>,
    default_id: CategoryId,
    write_seq: u64,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn free_default_id(categories: &[Category]) -> CategoryId {
    if categories.iter().all(|c| c.id != DEFAULT_CATEGORY_ID) {
        return DEFAULT_CATEGORY_ID;
    }
    categories.iter().map(|c| c.id).max().unwrap_or_default().max(0) + 1
}

impl CategoryRegistry {
    /// Creates a registry holding only a synthesised default category.
    pub fn new() -> Self {
        Self::with_default(Category::default_entry(DEFAULT_CATEGORY_ID))
    }

    fn with_default(default: Category) -> Self {
        let default_id = default.id;
        Self {
            entries: vec![Entry {
                category: default,
                revision: 0,
            }],
            default_id,
            write_seq: 0,
        }
    }

    /// Builds a registry from a login snapshot.
    ///
    /// The entry named `"default"` becomes the reserved default; when the
    /// snapshot has none, one is synthesised with id 1, or with the next id
    /// past the snapshot's if 1 is taken. Later duplicates of an id overwrite
    /// earlier ones.
    pub fn from_snapshot(categories: Vec<Category>) -> Self {
        let default = categories
            .iter()
            .find(|c| c.is_default())
            .cloned()
            .unwrap_or_else(|| Category::default_entry(free_default_id(&categories)));

        let mut registry = Self::with_default(default);
        for category in categories {
            if category.id == registry.default_id {
                continue;
            }
            registry.put(category);
        }
        registry
    }

    pub fn default_id(&self) -> CategoryId {
        self.default_id
    }

    pub fn default_category(&self) -> &Category {
        // The default entry is never removed, so the lookup always succeeds.
        self.entries
            .iter()
            .find(|e| e.category.id == self.default_id)
            .map(|e| &e.category)
            .unwrap_or(&self.entries[0].category)
    }

    pub fn is_default(&self, id: CategoryId) -> bool {
        id == self.default_id
    }

    /// Returns the category, or the default category when `id` is unknown.
    pub fn by_id(&self, id: CategoryId) -> &Category {
        self.get(id).unwrap_or_else(|| self.default_category())
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.position(id).map(|idx| &self.entries[idx].category)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.position(id).is_some()
    }

    /// Finds a category by exact (trimmed) name.
    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        let name = name.trim();
        self.entries
            .iter()
            .map(|e| &e.category)
            .find(|c| c.name == name)
    }

    /// Inserts or replaces a category by id.
    ///
    /// # Errors
    ///
    /// Returns `ProtectedEntity` when the call would change the default entry.
    pub fn upsert(&mut self, category: Category) -> Result<()> {
        if category.id == self.default_id && category != *self.default_category() {
            return Err(TaskShareError::protected("Category", category.id));
        }
        self.put(category);
        Ok(())
    }

    /// Removes a category and returns it.
    ///
    /// # Errors
    ///
    /// - `ProtectedEntity` if `id` is the default category
    /// - `NotFound` if no such category exists
    pub fn remove(&mut self, id: CategoryId) -> Result<Category> {
        if id == self.default_id {
            return Err(TaskShareError::protected("Category", id));
        }
        let idx = self
            .position(id)
            .ok_or_else(|| TaskShareError::not_found("Category", id))?;
        self.write_seq += 1;
        Ok(self.entries.remove(idx).category)
    }

    /// Re-inserts a category at a given position (used to undo a removal).
    pub fn restore(&mut self, index: usize, category: Category) {
        if self.contains(category.id) {
            return;
        }
        self.write_seq += 1;
        let index = index.min(self.entries.len());
        self.entries.insert(
            index,
            Entry {
                category,
                revision: self.write_seq,
            },
        );
    }

    /// Replaces a provisional id with the server-assigned one.
    ///
    /// If `new_id` is already present, the provisional entry is dropped.
    pub fn rekey(&mut self, old_id: CategoryId, new_id: CategoryId) {
        let Some(idx) = self.position(old_id) else {
            return;
        };
        if self.contains(new_id) {
            self.entries.remove(idx);
            return;
        }
        self.write_seq += 1;
        let entry = &mut self.entries[idx];
        entry.category.id = new_id;
        entry.revision = self.write_seq;
    }

    /// Index of a category in insertion order.
    pub fn index_of(&self, id: CategoryId) -> Option<usize> {
        self.position(id)
    }

    /// Monotonic write counter of the entry, if present.
    pub fn revision(&self, id: CategoryId) -> Option<u64> {
        self.position(id).map(|idx| self.entries[idx].revision)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.entries.iter().map(|e| &e.category)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the default category is never removed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: CategoryId) -> Option<usize> {
        self.entries.iter().position(|e| e.category.id == id)
    }

    fn put(&mut self, category: Category) {
        self.write_seq += 1;
        let revision = self.write_seq;
        match self.position(category.id) {
            Some(idx) => self.entries[idx] = Entry { category, revision },
            None => self.entries.push(Entry { category, revision }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work() -> Category {
        Category::new(2, "work", "#ff0000", "#ff8888")
    }

    #[test]
    fn test_new_registry_has_default() {
        let registry = CategoryRegistry::new();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.default_id(), DEFAULT_CATEGORY_ID);
        assert!(registry.default_category().is_default());
    }

    #[test]
    fn test_from_snapshot_finds_default_by_name() {
        let registry = CategoryRegistry::from_snapshot(vec![
            work(),
            Category::default_entry(7),
        ]);
        assert_eq!(registry.default_id(), 7);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_synthesised_default_avoids_taken_id() {
        let home = Category::new(DEFAULT_CATEGORY_ID, "home", "#00ff00", "#88ff88");
        let registry = CategoryRegistry::from_snapshot(vec![home.clone(), work()]);

        assert_eq!(registry.default_id(), 3);
        assert!(registry.default_category().is_default());
        assert_eq!(registry.get(DEFAULT_CATEGORY_ID), Some(&home));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_remove_default_is_protected() {
        let mut registry = CategoryRegistry::from_snapshot(vec![work()]);
        let err = registry.remove(registry.default_id()).unwrap_err();
        assert!(err.is_protected());
        assert!(registry.contains(registry.default_id()));
    }

    #[test]
    fn test_by_id_degrades_to_default() {
        let registry = CategoryRegistry::from_snapshot(vec![work()]);
        assert_eq!(registry.by_id(2).name, "work");
        assert!(registry.by_id(99).is_default());
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut registry = CategoryRegistry::new();
        registry.upsert(work()).unwrap();
        registry
            .upsert(Category::new(2, "office", "#000000", "#111111"))
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.by_id(2).name, "office");
    }

    #[test]
    fn test_upsert_cannot_rename_default() {
        let mut registry = CategoryRegistry::new();
        let renamed = Category::new(DEFAULT_CATEGORY_ID, "misc", "#000000", "#000000");
        assert!(registry.upsert(renamed).unwrap_err().is_protected());
        assert!(registry.default_category().is_default());
    }

    #[test]
    fn test_rekey_and_restore() {
        let mut registry = CategoryRegistry::new();
        registry.upsert(Category::new(-1, "errands", "#000000", "#000000")).unwrap();
        registry.rekey(-1, 5);
        assert!(registry.get(-1).is_none());
        assert_eq!(registry.by_id(5).name, "errands");

        let idx = registry.index_of(5).unwrap();
        let removed = registry.remove(5).unwrap();
        registry.restore(idx, removed);
        assert_eq!(registry.index_of(5), Some(idx));
    }

    #[test]
    fn test_rekey_drops_provisional_when_server_id_known() {
        let mut registry = CategoryRegistry::new();
        registry.upsert(Category::new(-1, "errands", "#000000", "#000000")).unwrap();
        registry.upsert(Category::new(5, "errands", "#000000", "#000000")).unwrap();
        registry.rekey(-1, 5);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(-1).is_none());
    }
}
