//! Mention collection: flattening per-chapter raw mentions into one
//! deduplicated global pool.
//!
//! Extractor labels (spaCy's `PERSON`, `GPE`, ... or the chapter parser's
//! `characters`, `places`, ...) are mapped onto the normalized categories.
//! Numeric and temporal categories never reach canonicalization.

use std::collections::HashSet;

use crate::model::{Chapter, RawMention};

/// Extractor label to normalized category.
const TYPE_MAP: &[(&str, &str)] = &[
    ("PERSON", "Character"),
    ("GPE", "Place"),
    ("LOC", "Place"),
    ("ORG", "Organization"),
    ("PRODUCT", "Item"),
    ("WORK_OF_ART", "Item"),
    ("DATE", "Date"),
    ("TIME", "Time"),
    ("MONEY", "Monetary Value"),
    ("NORP", "Group or Culture"),
    ("EVENT", "Event"),
    ("LAW", "Theme"),
    ("LANGUAGE", "Theme"),
    ("characters", "Character"),
    ("places", "Place"),
    ("items", "Item"),
    ("themes", "Theme"),
];

/// Normalized categories excluded from canonicalization.
pub const EXCLUDED_TYPES: &[&str] = &[
    "Date",
    "Time",
    "Monetary Value",
    "Ordinal",
    "Quantity",
    "Cardinal",
    "Percent",
];

/// Map an extractor label onto its normalized category.
///
/// Unmapped labels are title-cased verbatim (`CARDINAL` -> `Cardinal`,
/// `FAC` -> `Fac`).
pub fn normalize_type(label: &str) -> String {
    TYPE_MAP
        .iter()
        .find(|(raw, _)| *raw == label)
        .map(|(_, normalized)| (*normalized).to_string())
        .unwrap_or_else(|| title_case(label))
}

/// Whether a normalized category is numeric/temporal and must be skipped.
pub fn is_excluded(entity_type: &str) -> bool {
    EXCLUDED_TYPES.contains(&entity_type)
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut prev_alpha = false;
    for c in label.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Collect one [`RawMention`] per distinct `(type, trimmed value)` across
/// all chapters, in order of first occurrence.
///
/// Dedup is trim-only: `"Mattie"` and `"mattie"` stay distinct.
pub fn collect_mentions(chapters: &[Chapter]) -> Vec<RawMention> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut mentions = Vec::new();

    for chapter in chapters {
        let Some(entities) = &chapter.entities else {
            continue;
        };
        for (label, values) in entities.iter() {
            let entity_type = normalize_type(label);
            if is_excluded(&entity_type) {
                tracing::debug!(
                    chapter = chapter.number,
                    label,
                    skipped = values.len(),
                    "excluded entity category"
                );
                continue;
            }
            for value in values {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                if seen.insert((entity_type.clone(), value.to_string())) {
                    mentions.push(RawMention::new(entity_type.clone(), value));
                }
            }
        }
    }

    tracing::info!(
        chapters = chapters.len(),
        mentions = mentions.len(),
        "mention collection complete"
    );
    mentions
}
