// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # loregraph
//!
//! Builds a canonical entity registry for a book and rewrites its
//! paragraphs with inline, identifier-bearing entity tags.
//!
//! ## Architecture
//!
//! - **Mention collection** (`collect`): raw per-chapter extractor output
//!   deduplicated into `(type, value)` mentions
//! - **Canonicalization** (`canonicalize`, `oracle`): batched grouping by an
//!   untrusted oracle (Ollama by default), merged case-insensitively
//! - **Validation** (`normalize`, `grounding`): alias cleanup, then removal
//!   of anything that does not occur verbatim in the text
//! - **Identifiers** (`ids`): `TYPE_NNN` ids with per-type counters
//! - **Tagging** (`tagger`): greedy longest-first, non-overlapping
//!   insertion of `[ID]` markers
//!
//! ## Library usage
//!
//! ```no_run
//! use loregraph::config::PipelineConfig;
//! use loregraph::model::{Book, EntityGroup};
//! use loregraph::oracle::OracleResult;
//! use loregraph::pipeline::Pipeline;
//!
//! let oracle = |entity_type: &str, values: &[String]| -> OracleResult<Vec<EntityGroup>> {
//!     Ok(values.iter().map(|v| EntityGroup::new(entity_type, v.as_str(), [v.as_str()])).collect())
//! };
//! let mut book = Book::load(std::path::Path::new("book.json")).unwrap();
//! let report = Pipeline::new(PipelineConfig::default(), oracle).run(&mut book).unwrap();
//! println!("{} tags inserted", report.tags_inserted);
//! ```

pub mod canonicalize;
pub mod collect;
pub mod config;
pub mod document;
pub mod error;
pub mod grounding;
pub mod ids;
pub mod model;
pub mod normalize;
pub mod oracle;
pub mod paths;
pub mod pipeline;
pub mod tagger;
