//! Canonicalization: batching mentions through the oracle and merging the
//! groups it proposes into one entity list.
//!
//! The only merge rule is the case-insensitive `(type, canonical_name)` key.
//! Two groups that share it collapse into one entity whose aliases are the
//! set union of both; nothing is merged beyond what the oracle proposes.

use std::collections::HashMap;

use crate::collect::{is_excluded, normalize_type};
use crate::model::{CanonicalEntity, EntityGroup, RawMention};
use crate::oracle::{CanonicalizationOracle, OracleResult};

/// Default number of surface values sent per oracle call.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Result of the canonicalization stage.
#[derive(Debug, Clone, Default)]
pub struct Canonicalized {
    /// Merged entities in order of first appearance.
    pub entities: Vec<CanonicalEntity>,
    /// Oracle calls made.
    pub batches: usize,
    /// Groups returned across all batches, before merging.
    pub groups_returned: usize,
    /// Groups discarded for having an empty canonical name.
    pub groups_skipped: usize,
}

/// Group surface values by type, preserving first-seen type order and
/// value order within each type.
pub fn group_by_type(mentions: &[RawMention]) -> Vec<(String, Vec<String>)> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for mention in mentions {
        let slot = *index.entry(mention.entity_type.as_str()).or_insert_with(|| {
            grouped.push((mention.entity_type.clone(), Vec::new()));
            grouped.len() - 1
        });
        grouped[slot].1.push(mention.value.clone());
    }
    grouped
}

/// Accumulates oracle groups under the case-insensitive merge key.
#[derive(Debug, Default)]
pub struct GroupMerger {
    entities: Vec<CanonicalEntity>,
    index: HashMap<(String, String), usize>,
}

impl GroupMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one group in. The first group with a given key becomes the
    /// entry; later ones only contribute aliases not already present.
    pub fn add(&mut self, group: EntityGroup) {
        let key = (
            group.entity_type.to_lowercase(),
            group.canonical_name.to_lowercase(),
        );
        match self.index.get(&key) {
            Some(&slot) => {
                let existing = &mut self.entities[slot].aliases;
                for alias in group.aliases {
                    if !existing.contains(&alias) {
                        existing.push(alias);
                    }
                }
            }
            None => {
                let mut entity = CanonicalEntity::from(group);
                let mut unique: Vec<String> = Vec::with_capacity(entity.aliases.len());
                for alias in entity.aliases.drain(..) {
                    if !unique.contains(&alias) {
                        unique.push(alias);
                    }
                }
                entity.aliases = unique;
                self.index.insert(key, self.entities.len());
                self.entities.push(entity);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn into_entities(self) -> Vec<CanonicalEntity> {
        self.entities
    }
}

/// Run every batch through the oracle and merge the results.
///
/// A batch whose response fails to parse aborts the whole stage; no
/// unmerged fallback is produced.
pub fn canonicalize<O: CanonicalizationOracle + ?Sized>(
    mentions: &[RawMention],
    oracle: &O,
    batch_size: usize,
) -> OracleResult<Canonicalized> {
    let batch_size = batch_size.max(1);
    let mut merger = GroupMerger::new();
    let mut outcome = Canonicalized::default();

    for (entity_type, values) in group_by_type(mentions) {
        tracing::info!(
            entity_type = %entity_type,
            values = values.len(),
            batches = values.len().div_ceil(batch_size),
            "canonicalizing entity type"
        );

        for chunk in values.chunks(batch_size) {
            let groups = oracle.batch_canonicalize(&entity_type, chunk)?;
            outcome.batches += 1;
            outcome.groups_returned += groups.len();

            for mut group in groups {
                if group.canonical_name.trim().is_empty() {
                    tracing::warn!(
                        entity_type = %entity_type,
                        aliases = ?group.aliases,
                        "oracle returned a group without a canonical name, skipping"
                    );
                    outcome.groups_skipped += 1;
                    continue;
                }
                if group.entity_type.trim().is_empty() {
                    group.entity_type = entity_type.clone();
                }
                if is_excluded(&normalize_type(group.entity_type.trim())) {
                    tracing::warn!(
                        entity_type = %entity_type,
                        group_type = %group.entity_type,
                        canonical_name = %group.canonical_name,
                        "oracle returned a group of an excluded type, skipping"
                    );
                    outcome.groups_skipped += 1;
                    continue;
                }
                merger.add(group);
            }
        }
    }

    outcome.entities = merger.into_entities();
    tracing::info!(
        batches = outcome.batches,
        groups = outcome.groups_returned,
        entities = outcome.entities.len(),
        "canonicalization complete"
    );
    Ok(outcome)
}
