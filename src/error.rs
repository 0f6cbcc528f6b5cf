//! Rich diagnostic error types for loregraph.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::oracle::OracleError;
use crate::paths::PathError;

/// Top-level error type for a loregraph run.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum LoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

// ---------------------------------------------------------------------------
// Document errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error("failed to read document: {path}")]
    #[diagnostic(
        code(lore::document::read),
        help("Check that the file exists and that you have read permissions.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write document: {path}")]
    #[diagnostic(
        code(lore::document::write),
        help(
            "Check that the parent directory exists, that you have write permissions, \
             and that the disk is not full."
        )
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {origin}: {message}")]
    #[diagnostic(
        code(lore::document::malformed),
        help(
            "The input must be a JSON object with `book_title` and `chapters` \
             (each chapter: `number`, `title`, `paragraphs`, optional `entities`), \
             or a single chapter object."
        )
    )]
    Malformed { origin: String, message: String },

    #[error("no entity registry found in {origin}")]
    #[diagnostic(
        code(lore::document::no_registry),
        help(
            "A registry file is either a document carrying `global_entities` \
             (as written by `loregraph canonicalize`) or a bare JSON array of entities."
        )
    )]
    MissingRegistry { origin: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(lore::document::serialize),
        help("The document could not be encoded as JSON. This is a bug; please report it.")
    )]
    Serialize { message: String },
}

pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

// ---------------------------------------------------------------------------
// Tagging errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TagError {
    #[error("alias \"{alias}\" maps to both {existing_id} and {new_id}")]
    #[diagnostic(
        code(lore::tag::alias_collision),
        help(
            "Two registry entities share an alias, so tagging would be ambiguous. \
             Remove the alias from one of them, or set `collision_policy` to \
             `first-wins` or `last-wins`."
        )
    )]
    AliasCollision {
        alias: String,
        existing_id: String,
        new_id: String,
    },

    #[error("registry entity \"{canonical_name}\" has no identifier")]
    #[diagnostic(
        code(lore::tag::missing_id),
        help(
            "Only identifier-assigned registries can be used for tagging. \
             Run `loregraph canonicalize` to produce one."
        )
    )]
    MissingId { canonical_name: String },

    #[error("invalid alias pattern \"{alias}\": {message}")]
    #[diagnostic(
        code(lore::tag::pattern),
        help("The alias could not be compiled into a matcher. It may be unreasonably long.")
    )]
    Pattern { alias: String, message: String },
}

pub type TagResult<T> = std::result::Result<T, TagError>;

/// Convenience alias for crate-level results.
pub type LoreResult<T> = std::result::Result<T, LoreError>;
