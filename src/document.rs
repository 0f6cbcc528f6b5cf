//! Reading and writing book documents and entity registries.
//!
//! Input documents come from the ingestion collaborator as JSON. A file may
//! hold a whole book (`{book_title, chapters}`) or a single chapter object,
//! which is treated as a one-chapter book.

use std::path::Path;

use crate::error::{DocumentError, DocumentResult};
use crate::model::{Book, CanonicalEntity, Chapter};

impl Book {
    /// Parse a book from JSON text. `origin` names the source in diagnostics.
    pub fn from_json_str(text: &str, origin: &str) -> DocumentResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| malformed(origin, e))?;

        let Some(object) = value.as_object() else {
            return Err(DocumentError::Malformed {
                origin: origin.into(),
                message: "top-level value is not a JSON object".into(),
            });
        };

        if object.contains_key("chapters") {
            serde_json::from_value(value).map_err(|e| malformed(origin, e))
        } else {
            let chapter: Chapter = serde_json::from_value(value).map_err(|e| malformed(origin, e))?;
            Ok(Book {
                chapters: vec![chapter],
                ..Default::default()
            })
        }
    }

    /// Load a book from a JSON file.
    pub fn load(path: &Path) -> DocumentResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json_str(&text, &path.display().to_string())
    }

    /// Pretty-printed JSON encoding of the book.
    pub fn to_json_string(&self) -> DocumentResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DocumentError::Serialize {
            message: e.to_string(),
        })
    }

    /// Write the book as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> DocumentResult<()> {
        let json = self.to_json_string()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DocumentError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, json).map_err(|e| DocumentError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Drop every chapter's raw `entities` field.
    pub fn strip_raw_entities(&mut self) {
        for chapter in &mut self.chapters {
            chapter.entities = None;
        }
    }

    /// Every source paragraph, in reading order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.chapters
            .iter()
            .flat_map(|ch| ch.paragraphs.iter().map(String::as_str))
    }
}

/// Parse a registry from JSON text: either a document carrying
/// `global_entities` or a bare array of entities.
pub fn registry_from_json_str(text: &str, origin: &str) -> DocumentResult<Vec<CanonicalEntity>> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| malformed(origin, e))?;

    let entities = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(mut object) => object
            .remove("global_entities")
            .ok_or_else(|| DocumentError::MissingRegistry {
                origin: origin.into(),
            })?,
        _ => {
            return Err(DocumentError::MissingRegistry {
                origin: origin.into(),
            });
        }
    };

    serde_json::from_value(entities).map_err(|e| malformed(origin, e))
}

/// Load a registry file written by `loregraph canonicalize` (or a bare array).
pub fn load_registry(path: &Path) -> DocumentResult<Vec<CanonicalEntity>> {
    let text = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    registry_from_json_str(&text, &path.display().to_string())
}

fn malformed(origin: &str, err: serde_json::Error) -> DocumentError {
    DocumentError::Malformed {
        origin: origin.into(),
        message: err.to_string(),
    }
}
