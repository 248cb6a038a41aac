use serde::{Deserialize, Serialize};

use crate::core::Document;

pub const VALUE_SCHEMA: &str = "plate-md";
pub const VALUE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Unsupported value schema {schema:?} (version {version})")]
    Unsupported { schema: String, version: u32 },
}

/// Persisted form of an editor document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownValue {
    #[serde(default = "value_schema")]
    pub schema: String,
    #[serde(default = "value_version")]
    pub version: u32,
    pub document: Document,
}

fn value_schema() -> String {
    VALUE_SCHEMA.to_string()
}

fn value_version() -> u32 {
    VALUE_VERSION
}

impl MarkdownValue {
    pub fn from_document(document: Document) -> Self {
        Self {
            schema: value_schema(),
            version: value_version(),
            document,
        }
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_pretty(&self) -> Result<String, ValueError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a saved value, rejecting envelopes written for another schema
    /// or a newer version.
    pub fn from_json_str(s: &str) -> Result<Self, ValueError> {
        let value: Self = serde_json::from_str(s)?;
        if value.schema != VALUE_SCHEMA || value.version > VALUE_VERSION {
            return Err(ValueError::Unsupported {
                schema: value.schema,
                version: value.version,
            });
        }
        Ok(value)
    }
}
