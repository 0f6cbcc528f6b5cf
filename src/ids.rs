//! Identifier assignment for canonical entities.
//!
//! Ids have the form `<PREFIX>_<NNN>`: the type upper-cased with spaces
//! replaced by underscores, then a per-type counter starting at 1. They are
//! stable only for a fixed input order.

use std::collections::HashMap;

use crate::model::CanonicalEntity;

/// The id prefix for an entity type (`Group or Culture` -> `GROUP_OR_CULTURE`).
pub fn type_prefix(entity_type: &str) -> String {
    entity_type.to_uppercase().replace(' ', "_")
}

/// Format an identifier from a prefix and a 1-based counter.
pub fn format_id(prefix: &str, counter: usize) -> String {
    format!("{prefix}_{counter:03}")
}

/// Per-type counters handed out in call order.
#[derive(Debug, Default)]
pub struct IdAllocator {
    counters: HashMap<String, usize>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next identifier for the given entity type.
    pub fn next_id(&mut self, entity_type: &str) -> String {
        let prefix = type_prefix(entity_type);
        let counter = self.counters.entry(prefix.clone()).or_insert(0);
        *counter += 1;
        format_id(&prefix, *counter)
    }

    /// How many ids have been issued per prefix.
    pub fn counts(&self) -> &HashMap<String, usize> {
        &self.counters
    }
}

/// Assign ids to every entity in input order, overwriting any existing id.
pub fn assign_ids(entities: &mut [CanonicalEntity]) -> IdAllocator {
    let mut allocator = IdAllocator::new();
    for entity in entities.iter_mut() {
        entity.id = Some(allocator.next_id(&entity.entity_type));
    }
    tracing::info!(
        entities = entities.len(),
        types = allocator.counts().len(),
        "identifiers assigned"
    );
    allocator
}
