//! Category domain model.

use serde::{Deserialize, Serialize};

/// Server-assigned category identifier. Negative values are provisional ids
/// handed out by the client until the server confirms a create.
pub type CategoryId = i64;

/// Reserved name of the per-user fallback category.
pub const DEFAULT_CATEGORY_NAME: &str = "default";

/// Preferred id for a default synthesised when the login snapshot has none.
pub const DEFAULT_CATEGORY_ID: CategoryId = 1;

pub const DEFAULT_HEADER_COLOR: &str = "#00a4ba";
pub const DEFAULT_BODY_COLOR: &str = "#00ceea";

/// Label shown in place of the reserved default name.
pub const UNCATEGORIZED_LABEL: &str = "uncategorized";

/// A user-defined task category.
///
/// Field names on the wire follow the server's JSON (`cat_name`,
/// `color_header`, `color_body`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(rename = "cat_name")]
    pub name: String,
    #[serde(rename = "color_header", default = "default_header_color")]
    pub header_color: String,
    #[serde(rename = "color_body", default = "default_body_color")]
    pub body_color: String,
}

fn default_header_color() -> String {
    DEFAULT_HEADER_COLOR.to_string()
}

fn default_body_color() -> String {
    DEFAULT_BODY_COLOR.to_string()
}

impl Category {
    pub fn new(
        id: CategoryId,
        name: impl Into<String>,
        header_color: impl Into<String>,
        body_color: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            header_color: header_color.into(),
            body_color: body_color.into(),
        }
    }

    /// Builds the reserved default category under the given id.
    pub fn default_entry(id: CategoryId) -> Self {
        Self::new(
            id,
            DEFAULT_CATEGORY_NAME,
            DEFAULT_HEADER_COLOR,
            DEFAULT_BODY_COLOR,
        )
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_CATEGORY_NAME
    }

    /// Name to display, with the default category shown as "uncategorized".
    pub fn display_name(&self) -> &str {
        if self.is_default() {
            UNCATEGORIZED_LABEL
        } else {
            &self.name
        }
    }
}

/// Input for creating or renaming a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    #[serde(rename = "cat_name")]
    pub name: String,
    #[serde(rename = "color_header")]
    pub header_color: String,
    #[serde(rename = "color_body")]
    pub body_color: String,
}

impl CategoryDraft {
    /// A draft with the given name and the default colours.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header_color: DEFAULT_HEADER_COLOR.to_string(),
            body_color: DEFAULT_BODY_COLOR.to_string(),
        }
    }

    pub fn with_colors(mut self, header: impl Into<String>, body: impl Into<String>) -> Self {
        self.header_color = header.into();
        self.body_color = body.into();
        self
    }

    /// Materialises the draft under an id, trimming the name.
    pub fn into_category(self, id: CategoryId) -> Category {
        Category::new(id, self.name.trim(), self.header_color, self.body_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let json = r##"{"id":3,"cat_name":"work","color_header":"#112233","color_body":"#445566"}"##;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category, Category::new(3, "work", "#112233", "#445566"));

        let back = serde_json::to_value(&category).unwrap();
        assert_eq!(back["cat_name"], "work");
        assert_eq!(back["color_body"], "#445566");
    }

    #[test]
    fn test_missing_colors_fall_back_to_defaults() {
        let category: Category = serde_json::from_str(r#"{"id":2,"cat_name":"home"}"#).unwrap();
        assert_eq!(category.header_color, DEFAULT_HEADER_COLOR);
        assert_eq!(category.body_color, DEFAULT_BODY_COLOR);
    }

    #[test]
    fn test_default_display_name() {
        assert_eq!(Category::default_entry(1).display_name(), "uncategorized");
        assert_eq!(Category::new(2, "home", "#000000", "#ffffff").display_name(), "home");
    }
}
