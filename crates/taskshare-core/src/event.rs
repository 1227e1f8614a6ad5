//! Change-event protocol of the push channel.
//!
//! Messages use an explicit discriminant:
//!
//! ```json
//! {"kind": "upsert", "task": {"id": 1, "title": "Buy milk", ...}}
//! {"kind": "remove", "id": 1}
//! ```
//!
//! The legacy untagged shape is still accepted: an object carrying a `title`
//! field is an upsert, anything else (a bare number or an object with only an
//! id) is a removal.

use crate::error::{Result, TaskShareError};
use crate::task::{TaskId, TaskPatch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

/// Discriminant of a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    Upsert,
    Remove,
}

/// A parsed push-channel message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeEvent {
    /// Create-or-update by id. Absent fields are left untouched.
    Upsert { task: TaskPatch },
    /// Delete by id.
    Remove { id: TaskId },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Upsert { .. } => ChangeKind::Upsert,
            Self::Remove { .. } => ChangeKind::Remove,
        }
    }

    pub fn task_id(&self) -> TaskId {
        match self {
            Self::Upsert { task } => task.id,
            Self::Remove { id } => *id,
        }
    }

    /// Parses one raw message.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when the message is not JSON or matches
    /// neither the tagged nor the legacy shape.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw.trim())?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self> {
        if let Some(kind) = value.get("kind").and_then(Value::as_str) {
            if kind.parse::<ChangeKind>().is_err() {
                return Err(malformed(format!("unknown change kind '{}'", kind)));
            }
            return Ok(serde_json::from_value(value)?);
        }
        Self::from_legacy(value)
    }

    fn from_legacy(value: Value) -> Result<Self> {
        match &value {
            Value::Number(n) => n
                .as_i64()
                .map(|id| Self::Remove { id })
                .ok_or_else(|| malformed(format!("invalid task id {}", n))),
            Value::String(s) => s
                .trim()
                .parse::<TaskId>()
                .map(|id| Self::Remove { id })
                .map_err(|_| malformed(format!("invalid task id '{}'", s))),
            Value::Object(map) if map.contains_key("title") => Ok(Self::Upsert {
                task: serde_json::from_value(value)?,
            }),
            Value::Object(map) => map
                .get("id")
                .and_then(Value::as_i64)
                .map(|id| Self::Remove { id })
                .ok_or_else(|| malformed("object without title or id")),
            other => Err(malformed(format!("unexpected payload {}", other))),
        }
    }

    /// Encodes the event in the tagged form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn malformed(message: impl Into<String>) -> TaskShareError {
    TaskShareError::Serialization {
        format: "change event".to_string(),
        message: message.into(),
    }
}
