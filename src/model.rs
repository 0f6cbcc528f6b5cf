//! Core data types: books, chapters, mentions and canonical entities.
//!
//! These mirror the JSON documents exchanged with the ingestion and
//! graph-export collaborators, so field names follow the wire format.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A whole book: title plus ordered chapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Book {
    /// Book title, absent when the source had none.
    #[serde(default)]
    pub book_title: Option<String>,
    /// Chapters in reading order.
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    /// Canonical entity registry, present once identifiers are assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_entities: Option<Vec<CanonicalEntity>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One chapter with its paragraphs and, depending on pipeline stage,
/// raw entity mentions or tagging output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chapter {
    pub number: i64,
    pub title: String,
    #[serde(default)]
    pub paragraphs: Vec<String>,
    /// Raw mentions keyed by extractor label, in document order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<RawEntities>,
    /// Paragraphs with inline entity markers, same length as `paragraphs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagged_paragraphs: Option<Vec<String>>,
    /// Entity ids found per paragraph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_mentions: Option<Vec<ParagraphMentions>>,
    /// Fields this crate does not interpret (summaries, dates, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Chapter {
    /// Build a chapter from its number, title and paragraphs.
    pub fn new(number: i64, title: impl Into<String>, paragraphs: Vec<String>) -> Self {
        Self {
            number,
            title: title.into(),
            paragraphs,
            ..Default::default()
        }
    }

    /// Attach raw mentions, one `(label, values)` pair per extractor label.
    pub fn with_entities<L, V>(mut self, entities: impl IntoIterator<Item = (L, Vec<V>)>) -> Self
    where
        L: Into<String>,
        V: Into<String>,
    {
        let pairs = entities
            .into_iter()
            .map(|(label, values)| (label.into(), values.into_iter().map(Into::into).collect()))
            .collect();
        self.entities = Some(RawEntities(pairs));
        self
    }
}

/// Entity ids mentioned in one paragraph, ascending and distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphMentions {
    pub paragraph_index: usize,
    pub entities: Vec<String>,
}

/// Raw `label -> values` mapping that keeps the JSON key order.
///
/// The mention collector emits mentions in order of first occurrence, so the
/// order of labels inside a chapter must survive deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntities(pub Vec<(String, Vec<String>)>);

impl RawEntities {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RawEntities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, values) in &self.0 {
            map.serialize_entry(label, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawEntities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = RawEntities;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from entity label to a list of strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((label, values)) = access.next_entry::<String, Vec<String>>()? {
                    pairs.push((label, values));
                }
                Ok(RawEntities(pairs))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// One surface occurrence, deduplicated by `(entity_type, value)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawMention {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub value: String,
}

impl RawMention {
    pub fn new(entity_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            value: value.into(),
        }
    }
}

/// A grouping proposed by the canonicalization oracle. Untrusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGroup {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub canonical_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl EntityGroup {
    pub fn new<A: Into<String>>(
        entity_type: impl Into<String>,
        canonical_name: impl Into<String>,
        aliases: impl IntoIterator<Item = A>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            canonical_name: canonical_name.into(),
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }
}

/// A deduplicated named thing with its verified surface forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub canonical_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Stable typed identifier (e.g. `CHARACTER_001`), absent until assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl CanonicalEntity {
    pub fn new<A: Into<String>>(
        entity_type: impl Into<String>,
        canonical_name: impl Into<String>,
        aliases: impl IntoIterator<Item = A>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            canonical_name: canonical_name.into(),
            aliases: aliases.into_iter().map(Into::into).collect(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<EntityGroup> for CanonicalEntity {
    fn from(group: EntityGroup) -> Self {
        Self {
            entity_type: group.entity_type,
            canonical_name: group.canonical_name,
            aliases: group.aliases,
            id: None,
        }
    }
}

/// Marker syntax inserted after a tagged alias.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagStyle {
    /// `[ID]`
    #[default]
    Single,
    /// `[[ID]]`, the wiki-link form used by Obsidian-style vaults.
    Double,
}

impl TagStyle {
    /// Render the marker for an identifier, without the leading space.
    pub fn marker(&self, id: &str) -> String {
        match self {
            Self::Single => format!("[{id}]"),
            Self::Double => format!("[[{id}]]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_entities_keep_key_order() {
        let json = r#"{"number": 1, "title": "T", "paragraphs": [],
            "entities": {"PERSON": ["Mattie"], "GPE": ["Ganser"], "DATE": ["1901"]}}"#;
        let chapter: Chapter = serde_json::from_str(json).unwrap();
        let labels: Vec<&str> = chapter.entities.as_ref().unwrap().iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["PERSON", "GPE", "DATE"]);
    }

    #[test]
    fn unknown_chapter_fields_survive() {
        let json = r#"{"number": 2, "title": "T", "paragraphs": ["a"], "summary": "s"}"#;
        let chapter: Chapter = serde_json::from_str(json).unwrap();
        assert_eq!(chapter.extra["summary"], "s");

        let out = serde_json::to_value(&chapter).unwrap();
        assert_eq!(out["summary"], "s");
        assert!(out.get("entities").is_none());
        assert!(out.get("tagged_paragraphs").is_none());
    }

    #[test]
    fn entity_without_aliases_key_deserializes_empty() {
        let json = r#"{"type": "Place", "canonical_name": "Ganser Harbor"}"#;
        let entity: CanonicalEntity = serde_json::from_str(json).unwrap();
        assert!(entity.aliases.is_empty());
        assert!(entity.id.is_none());
    }

    #[test]
    fn tag_style_markers() {
        assert_eq!(TagStyle::Single.marker("ITEM_001"), "[ITEM_001]");
        assert_eq!(TagStyle::Double.marker("ITEM_001"), "[[ITEM_001]]");
    }
}
