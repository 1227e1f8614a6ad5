//! Category domain module.
//!
//! # Module Structure
//!
//! - `model`: the `Category` record and the reserved default entry
//! - `registry`: `CategoryRegistry`, the session's id -> category table

mod model;
pub mod registry;

pub use model::{
    Category, CategoryDraft, CategoryId, DEFAULT_BODY_COLOR, DEFAULT_CATEGORY_ID,
    DEFAULT_CATEGORY_NAME, DEFAULT_HEADER_COLOR, UNCATEGORIZED_LABEL,
};
pub use registry::CategoryRegistry;
