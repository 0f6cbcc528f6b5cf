//! Grounding: keeping only aliases that verifiably occur in the source text.
//!
//! Matching is a case-sensitive, verbatim substring test against every
//! paragraph. Nothing is renamed or invented here; the stage only removes.

use crate::model::CanonicalEntity;

/// Names and aliases shorter than this (in characters) are too ambiguous.
pub const DEFAULT_MIN_LEN: usize = 3;

/// Length thresholds for grounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundingRules {
    /// Minimum canonical-name length; shorter entities are dropped outright.
    pub min_name_len: usize,
    /// Minimum alias length; shorter aliases are dropped.
    pub min_alias_len: usize,
}

impl Default for GroundingRules {
    fn default() -> Self {
        Self {
            min_name_len: DEFAULT_MIN_LEN,
            min_alias_len: DEFAULT_MIN_LEN,
        }
    }
}

/// Why an entity did not survive grounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    ShortName,
    NoGroundedAlias,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortName => "canonical name too short",
            Self::NoGroundedAlias => "no alias found in source text",
        }
    }
}

/// Result of the grounding stage.
#[derive(Debug, Clone, Default)]
pub struct Grounded {
    /// Surviving entities, input order.
    pub entities: Vec<CanonicalEntity>,
    /// Dropped entities with the reason, input order.
    pub dropped: Vec<(CanonicalEntity, DropReason)>,
    /// Aliases removed from surviving or dropped entities.
    pub aliases_dropped: usize,
}

/// Filter entities against the source paragraphs.
///
/// An entity whose canonical name is shorter than `min_name_len` is
/// dropped. Each remaining alias survives only if it is at least
/// `min_alias_len` long and occurs verbatim in some paragraph. An entity
/// left with no aliases is dropped.
pub fn ground_entities<'a, I>(
    entities: Vec<CanonicalEntity>,
    paragraphs: I,
    rules: GroundingRules,
) -> Grounded
where
    I: IntoIterator<Item = &'a str>,
{
    let paragraphs: Vec<&str> = paragraphs.into_iter().collect();
    let mut outcome = Grounded::default();

    for mut entity in entities {
        if entity.canonical_name.chars().count() < rules.min_name_len {
            tracing::info!(
                canonical_name = %entity.canonical_name,
                entity_type = %entity.entity_type,
                reason = DropReason::ShortName.as_str(),
                "dropping entity"
            );
            outcome.dropped.push((entity, DropReason::ShortName));
            continue;
        }

        let before = entity.aliases.len();
        entity.aliases.retain(|alias| {
            alias.chars().count() >= rules.min_alias_len
                && paragraphs.iter().any(|p| p.contains(alias.as_str()))
        });
        let removed = before - entity.aliases.len();
        outcome.aliases_dropped += removed;

        if entity.aliases.is_empty() {
            tracing::info!(
                canonical_name = %entity.canonical_name,
                entity_type = %entity.entity_type,
                reason = DropReason::NoGroundedAlias.as_str(),
                "dropping entity"
            );
            outcome.dropped.push((entity, DropReason::NoGroundedAlias));
            continue;
        }

        if removed > 0 {
            tracing::debug!(
                canonical_name = %entity.canonical_name,
                removed,
                kept = entity.aliases.len(),
                "ungrounded aliases removed"
            );
        }
        outcome.entities.push(entity);
    }

    tracing::info!(
        kept = outcome.entities.len(),
        dropped = outcome.dropped.len(),
        aliases_dropped = outcome.aliases_dropped,
        "grounding complete"
    );
    outcome
}
