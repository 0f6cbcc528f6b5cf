//! Alias lookup table: lower-cased alias -> entity id.
//!
//! Built from the final registry. Every alias and every canonical name of
//! every entity becomes a key. When two different entities claim the same
//! key, the [`CollisionPolicy`] decides which id the key keeps.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{TagError, TagResult};
use crate::model::CanonicalEntity;

/// Resolution rule for an alias claimed by two different entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// The entity inserted first keeps the alias.
    #[default]
    FirstWins,
    /// The entity inserted last takes the alias over.
    LastWins,
    /// Refuse to build the table.
    Reject,
}

/// One key of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    /// Lower-cased alias text.
    pub alias: String,
    /// Entity id the alias resolves to.
    pub id: String,
}

/// A key claimed by two entities, and how it was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasCollision {
    pub alias: String,
    pub kept_id: String,
    pub discarded_id: String,
}

/// Lower-cased alias to entity id, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
    index: HashMap<String, usize>,
    collisions: Vec<AliasCollision>,
    policy: CollisionPolicy,
}

impl AliasTable {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Build from an identifier-assigned registry.
    ///
    /// Each entity contributes its aliases, then its canonical name.
    pub fn build(registry: &[CanonicalEntity], policy: CollisionPolicy) -> TagResult<Self> {
        let mut table = Self::new(policy);
        for entity in registry {
            let id = entity.id.as_deref().ok_or_else(|| TagError::MissingId {
                canonical_name: entity.canonical_name.clone(),
            })?;
            for alias in &entity.aliases {
                table.insert(alias, id)?;
            }
            table.insert(&entity.canonical_name, id)?;
        }

        if !table.collisions.is_empty() {
            tracing::warn!(
                collisions = table.collisions.len(),
                policy = ?policy,
                "aliases shared between entities"
            );
        }
        tracing::debug!(aliases = table.len(), "alias table built");
        Ok(table)
    }

    /// Build from explicit `(alias, id)` pairs.
    pub fn from_pairs<A, I>(
        pairs: impl IntoIterator<Item = (A, I)>,
        policy: CollisionPolicy,
    ) -> TagResult<Self>
    where
        A: AsRef<str>,
        I: AsRef<str>,
    {
        let mut table = Self::new(policy);
        for (alias, id) in pairs {
            table.insert(alias.as_ref(), id.as_ref())?;
        }
        Ok(table)
    }

    /// Insert one mapping. Empty aliases are ignored.
    pub fn insert(&mut self, alias: &str, id: &str) -> TagResult<()> {
        let key = alias.to_lowercase();
        if key.trim().is_empty() {
            return Ok(());
        }

        let Some(&slot) = self.index.get(&key) else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push(AliasEntry {
                alias: key,
                id: id.to_string(),
            });
            return Ok(());
        };

        let existing = &mut self.entries[slot];
        if existing.id == id {
            return Ok(());
        }

        let collision = match self.policy {
            CollisionPolicy::Reject => {
                return Err(TagError::AliasCollision {
                    alias: key,
                    existing_id: existing.id.clone(),
                    new_id: id.to_string(),
                });
            }
            CollisionPolicy::FirstWins => AliasCollision {
                alias: key,
                kept_id: existing.id.clone(),
                discarded_id: id.to_string(),
            },
            CollisionPolicy::LastWins => {
                let discarded = std::mem::replace(&mut existing.id, id.to_string());
                AliasCollision {
                    alias: key,
                    kept_id: id.to_string(),
                    discarded_id: discarded,
                }
            }
        };

        tracing::warn!(
            alias = %collision.alias,
            kept = %collision.kept_id,
            discarded = %collision.discarded_id,
            "alias collision"
        );
        self.collisions.push(collision);
        Ok(())
    }

    /// Resolve an alias, case-insensitively.
    pub fn lookup(&self, alias: &str) -> Option<&str> {
        self.index
            .get(&alias.to_lowercase())
            .map(|&slot| self.entries[slot].id.as_str())
    }

    /// Entries by descending character length; ties keep insertion order.
    pub fn longest_first(&self) -> Vec<&AliasEntry> {
        let mut sorted: Vec<&AliasEntry> = self.entries.iter().collect();
        sorted.sort_by_key(|e| std::cmp::Reverse(e.alias.chars().count()));
        sorted
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn collisions(&self) -> &[AliasCollision] {
        &self.collisions
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
