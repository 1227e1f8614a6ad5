//! Task domain module.
//!
//! This module contains the task record, its partial form used for merges
//! and push events, and the ordered task registry.
//!
//! # Module Structure
//!
//! - `model`: `Task`, `TaskPatch`, `TaskDraft`, `TaskEdit`, `SharedWith`
//! - `registry`: `TaskRegistry`, the single writable task store of a session

mod model;
pub mod registry;

pub use model::{SharedWith, Task, TaskDraft, TaskEdit, TaskId, TaskPatch};
pub use registry::TaskRegistry;
