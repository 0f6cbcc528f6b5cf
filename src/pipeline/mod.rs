//! Pipeline orchestration: the stages chained over one book.
//!
//! ```text
//! collect -> canonicalize -> normalize -> ground -> assign ids -> tag
//! ```
//!
//! The first five stages build the registry (`build_registry`); the last
//! one rewrites paragraphs against it (`tag_book`). Stages run strictly in
//! order; only tagging fans out across chapters, and only when asked to.

use serde::Serialize;

use crate::canonicalize::canonicalize;
use crate::collect::collect_mentions;
use crate::config::PipelineConfig;
use crate::error::LoreResult;
use crate::grounding::ground_entities;
use crate::ids::assign_ids;
use crate::model::{Book, CanonicalEntity, TagStyle};
use crate::normalize::normalize_aliases;
use crate::oracle::{CanonicalizationOracle, Retrying};
use crate::tagger::{self, AliasTable, CollisionPolicy, SpanTagger};

/// Counts gathered across a run. Stages that did not run leave zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Distinct `(type, value)` mentions after exclusion.
    pub mentions: usize,
    /// Oracle calls made.
    pub batches: usize,
    pub groups_returned: usize,
    pub groups_skipped: usize,
    /// Entities after the case-insensitive merge.
    pub merged_entities: usize,
    pub entities_dropped: usize,
    pub aliases_dropped: usize,
    /// Entities in the final registry.
    pub registry_size: usize,
    pub chapters: usize,
    pub paragraphs_tagged: usize,
    pub tags_inserted: usize,
    pub alias_collisions: usize,
}

/// How the tagging half runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagOptions {
    pub style: TagStyle,
    pub collision_policy: CollisionPolicy,
    pub parallel: bool,
}

impl From<&PipelineConfig> for TagOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            style: config.tag_style,
            collision_policy: config.collision_policy,
            parallel: config.parallel_tagging,
        }
    }
}

/// Tag every paragraph of `book` against an identifier-assigned registry.
///
/// Fills `tagged_paragraphs` and `entity_mentions` on each chapter and
/// returns the tagging counts (the registry counts stay zero).
pub fn tag_book(
    book: &mut Book,
    registry: &[CanonicalEntity],
    options: &TagOptions,
) -> LoreResult<PipelineReport> {
    let table = AliasTable::build(registry, options.collision_policy)?;
    let span_tagger = SpanTagger::new(&table, options.style)?;
    let stats = tagger::tag_book(book, &span_tagger, options.parallel);

    Ok(PipelineReport {
        registry_size: registry.len(),
        chapters: stats.chapters,
        paragraphs_tagged: stats.paragraphs,
        tags_inserted: stats.markers,
        alias_collisions: table.collisions().len(),
        ..Default::default()
    })
}

/// A configured pipeline bound to one oracle.
pub struct Pipeline<O> {
    config: PipelineConfig,
    oracle: Retrying<O>,
}

impl<O: CanonicalizationOracle> Pipeline<O> {
    /// The oracle is wrapped so failed batches are retried
    /// `config.oracle.retries` times.
    pub fn new(config: PipelineConfig, oracle: O) -> Self {
        let oracle = Retrying::new(oracle, config.oracle.retries);
        Self { config, oracle }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the registry half: collect, canonicalize, normalize, ground and
    /// assign identifiers. The book is not modified.
    pub fn build_registry(&self, book: &Book) -> LoreResult<(Vec<CanonicalEntity>, PipelineReport)> {
        let mut report = PipelineReport {
            chapters: book.chapters.len(),
            ..Default::default()
        };

        let mentions = collect_mentions(&book.chapters);
        report.mentions = mentions.len();

        let canonical = canonicalize(&mentions, &self.oracle, self.config.batch_size)?;
        report.batches = canonical.batches;
        report.groups_returned = canonical.groups_returned;
        report.groups_skipped = canonical.groups_skipped;
        report.merged_entities = canonical.entities.len();

        let mut entities = canonical.entities;
        normalize_aliases(&mut entities);

        let grounded = ground_entities(entities, book.paragraphs(), self.config.grounding_rules());
        report.entities_dropped = grounded.dropped.len();
        report.aliases_dropped = grounded.aliases_dropped;

        let mut registry = grounded.entities;
        assign_ids(&mut registry);
        report.registry_size = registry.len();

        tracing::info!(
            mentions = report.mentions,
            batches = report.batches,
            merged = report.merged_entities,
            dropped = report.entities_dropped,
            registry = report.registry_size,
            "registry built"
        );
        Ok((registry, report))
    }

    /// Build the registry and attach it to the book as `global_entities`,
    /// removing each chapter's raw `entities`.
    pub fn canonicalize_book(&self, book: &mut Book) -> LoreResult<PipelineReport> {
        let (registry, report) = self.build_registry(book)?;
        book.global_entities = Some(registry);
        book.strip_raw_entities();
        Ok(report)
    }

    /// Run every stage over the book.
    ///
    /// On success the book carries `global_entities`, per-chapter
    /// `tagged_paragraphs` and `entity_mentions`, and no raw `entities`.
    /// On error the book is left untouched.
    pub fn run(&self, book: &mut Book) -> LoreResult<PipelineReport> {
        let (registry, mut report) = self.build_registry(book)?;
        let tagged = tag_book(book, &registry, &TagOptions::from(&self.config))?;

        book.global_entities = Some(registry);
        book.strip_raw_entities();

        report.paragraphs_tagged = tagged.paragraphs_tagged;
        report.tags_inserted = tagged.tags_inserted;
        report.alias_collisions = tagged.alias_collisions;
        tracing::info!(
            paragraphs = report.paragraphs_tagged,
            tags = report.tags_inserted,
            collisions = report.alias_collisions,
            "pipeline complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoreError, TagError};
    use crate::model::{Chapter, EntityGroup};
    use crate::oracle::{OracleError, OracleResult};
    use std::cell::Cell;

    fn book() -> Book {
        Book {
            book_title: Some("The Harbor".into()),
            chapters: vec![
                Chapter::new(
                    1,
                    "Arrival",
                    vec!["Mattie walked through Ganser Harbor with her father's watch.".into()],
                )
                .with_entities([
                    ("PERSON", vec!["Mattie"]),
                    ("GPE", vec!["Ganser Harbor"]),
                    ("PRODUCT", vec!["watch"]),
                    ("DATE", vec!["1901"]),
                ]),
            ],
            ..Default::default()
        }
    }

    fn echo_oracle(entity_type: &str, values: &[String]) -> OracleResult<Vec<EntityGroup>> {
        Ok(values
            .iter()
            .map(|v| EntityGroup::new(entity_type, v.as_str(), [v.as_str()]))
            .collect())
    }

    #[test]
    fn full_run_tags_and_registers() {
        let pipeline = Pipeline::new(PipelineConfig::default(), echo_oracle);
        let mut book = book();
        let report = pipeline.run(&mut book).unwrap();

        let chapter = &book.chapters[0];
        assert_eq!(
            chapter.tagged_paragraphs.as_ref().unwrap()[0],
            "Mattie [CHARACTER_001] walked through Ganser Harbor [PLACE_001] with her father's watch [ITEM_001]."
        );
        assert!(chapter.entities.is_none());
        assert_eq!(book.global_entities.as_ref().unwrap().len(), 3);
        assert_eq!(report.mentions, 3);
        assert_eq!(report.batches, 3);
        assert_eq!(report.tags_inserted, 3);
        assert_eq!(report.registry_size, 3);
    }

    #[test]
    fn retries_follow_config() {
        let calls = Cell::new(0);
        let flaky = |entity_type: &str, values: &[String]| -> OracleResult<Vec<EntityGroup>> {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                return Err(OracleError::ParseError {
                    entity_type: entity_type.into(),
                    message: "not json".into(),
                });
            }
            echo_oracle(entity_type, values)
        };
        let mut config = PipelineConfig::default();
        config.oracle.retries = 1;
        let pipeline = Pipeline::new(config, &flaky);
        let (registry, _) = pipeline.build_registry(&book()).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn oracle_failure_leaves_book_untouched() {
        let failing = |entity_type: &str, _: &[String]| -> OracleResult<Vec<EntityGroup>> {
            Err(OracleError::ParseError {
                entity_type: entity_type.into(),
                message: "garbage".into(),
            })
        };
        let pipeline = Pipeline::new(PipelineConfig::default(), failing);
        let mut book = book();
        let err = pipeline.run(&mut book).unwrap_err();
        assert!(matches!(err, LoreError::Oracle(OracleError::ParseError { .. })));
        assert!(book.chapters[0].entities.is_some());
        assert!(book.chapters[0].tagged_paragraphs.is_none());
        assert!(book.global_entities.is_none());
    }

    #[test]
    fn canonicalize_book_strips_raw_entities() {
        let pipeline = Pipeline::new(PipelineConfig::default(), echo_oracle);
        let mut book = book();
        pipeline.canonicalize_book(&mut book).unwrap();
        assert!(book.chapters[0].entities.is_none());
        assert!(book.chapters[0].tagged_paragraphs.is_none());
        let ids: Vec<_> = book
            .global_entities
            .unwrap()
            .into_iter()
            .filter_map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["CHARACTER_001", "PLACE_001", "ITEM_001"]);
    }

    #[test]
    fn reject_policy_surfaces_collisions() {
        let registry = vec![
            CanonicalEntity::new("Character", "Mattie", ["Mattie", "the girl"]).with_id("CHARACTER_001"),
            CanonicalEntity::new("Character", "Jolene", ["Jolene", "the girl"]).with_id("CHARACTER_002"),
        ];
        let options = TagOptions {
            collision_policy: CollisionPolicy::Reject,
            ..Default::default()
        };
        let err = tag_book(&mut book(), &registry, &options).unwrap_err();
        assert!(matches!(err, LoreError::Tag(TagError::AliasCollision { .. })));

        let report = tag_book(&mut book(), &registry, &TagOptions::default()).unwrap();
        assert_eq!(report.alias_collisions, 1);
    }

    #[test]
    fn oracle_cannot_smuggle_excluded_types_into_registry() {
        let dated = |entity_type: &str, values: &[String]| -> OracleResult<Vec<EntityGroup>> {
            let mut groups = echo_oracle(entity_type, values)?;
            groups.push(EntityGroup::new("Date", "1901", ["1901"]));
            Ok(groups)
        };
        let mut book = book();
        book.chapters[0].paragraphs[0].push_str(" It was 1901.");
        let pipeline = Pipeline::new(PipelineConfig::default(), dated);
        let (registry, report) = pipeline.build_registry(&book).unwrap();
        let ids: Vec<&str> = registry.iter().filter_map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, vec!["CHARACTER_001", "PLACE_001", "ITEM_001"]);
        assert_eq!(report.groups_skipped, 3);
    }

    #[test]
    fn empty_book_makes_no_oracle_calls() {
        let calls = Cell::new(0);
        let counting = |entity_type: &str, values: &[String]| -> OracleResult<Vec<EntityGroup>> {
            calls.set(calls.get() + 1);
            echo_oracle(entity_type, values)
        };
        let pipeline = Pipeline::new(PipelineConfig::default(), &counting);
        let mut book = Book::default();
        let report = pipeline.run(&mut book).unwrap();
        assert_eq!(calls.get(), 0);
        assert_eq!(report, PipelineReport::default());
        assert_eq!(book.global_entities, Some(Vec::new()));
    }
}
