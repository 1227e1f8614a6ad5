pub mod api;
pub mod auth;
pub mod category;
pub mod error;
pub mod event;
pub mod push;
pub mod task;
pub mod validation;

// Re-export common types
pub use api::{LoginResponse, TaskApi};
pub use auth::AuthToken;
pub use category::{Category, CategoryDraft, CategoryId, CategoryRegistry};
pub use error::{Result, TaskShareError};
pub use event::{ChangeEvent, ChangeKind};
pub use push::{PushStream, PushTransport};
pub use task::{SharedWith, Task, TaskDraft, TaskEdit, TaskId, TaskPatch, TaskRegistry};
