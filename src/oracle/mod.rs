//! The canonicalization oracle boundary.
//!
//! An oracle receives one entity type and a batch of surface values and
//! proposes groups of `{type, canonical_name, aliases}`. Its output is
//! untrusted: everything it returns is re-checked by the alias normalizer
//! and the grounding validator before it reaches the registry.

pub mod ollama;

use miette::Diagnostic;
use thiserror::Error;

use crate::model::EntityGroup;

pub use ollama::{OllamaClient, OllamaConfig, OllamaOracle};

/// Errors from the oracle subsystem.
#[derive(Debug, Error, Diagnostic)]
pub enum OracleError {
    #[error("Ollama is not available at {url}")]
    #[diagnostic(
        code(lore::oracle::unavailable),
        help("Start Ollama with `ollama serve`, or point --ollama-url at a running server.")
    )]
    Unavailable { url: String },

    #[error("oracle request failed: {message}")]
    #[diagnostic(
        code(lore::oracle::request_failed),
        help("Check that Ollama is running and the model is pulled.")
    )]
    RequestFailed { message: String },

    #[error("failed to parse oracle response for {entity_type} batch: {message}")]
    #[diagnostic(
        code(lore::oracle::parse_error),
        help(
            "The model did not return a JSON array of {{type, canonical_name, aliases}} objects. \
             Re-run the batch, lower the temperature, or set `oracle.retries` in the config."
        )
    )]
    ParseError { entity_type: String, message: String },

    #[error("failed to pull model \"{model}\": {message}")]
    #[diagnostic(
        code(lore::oracle::model_pull),
        help("Check your internet connection or manually run: ollama pull {model}")
    )]
    ModelPull { model: String, message: String },
}

pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// Something that can propose canonical groupings for a batch of values.
///
/// Implemented for closures so tests can substitute a deterministic double.
pub trait CanonicalizationOracle {
    fn batch_canonicalize(&self, entity_type: &str, values: &[String])
    -> OracleResult<Vec<EntityGroup>>;
}

impl<F> CanonicalizationOracle for F
where
    F: Fn(&str, &[String]) -> OracleResult<Vec<EntityGroup>>,
{
    fn batch_canonicalize(
        &self,
        entity_type: &str,
        values: &[String],
    ) -> OracleResult<Vec<EntityGroup>> {
        self(entity_type, values)
    }
}

/// Re-issues a failed batch up to `retries` extra times.
#[derive(Debug)]
pub struct Retrying<O> {
    inner: O,
    retries: u32,
}

impl<O> Retrying<O> {
    pub fn new(inner: O, retries: u32) -> Self {
        Self { inner, retries }
    }
}

impl<O: CanonicalizationOracle> CanonicalizationOracle for Retrying<O> {
    fn batch_canonicalize(
        &self,
        entity_type: &str,
        values: &[String],
    ) -> OracleResult<Vec<EntityGroup>> {
        let mut attempt = 0;
        loop {
            match self.inner.batch_canonicalize(entity_type, values) {
                Ok(groups) => return Ok(groups),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(
                        entity_type,
                        attempt,
                        retries = self.retries,
                        error = %e,
                        "oracle batch failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

const PROMPT_TEMPLATE: &str = "\
You are a literary assistant helping canonicalize entities across an entire novel.

Given a list of extracted named entities grouped by type, identify canonical entity names and group any aliases or variations.

Only use the input terms exactly as provided. Do not add new entities. Do not guess or invent names.

Return a JSON array with objects of the form:
[
  {
    \"type\": \"Character\",
    \"canonical_name\": \"Mattie Mae Albright\",
    \"aliases\": [\"Mattie\", \"Mattie Mae\", \"Matilda\"]
  },
  ...
]

Input:
{entity_input}

Only return valid JSON. No explanation.
";

/// Build the prompt for one batch: the type label followed by the
/// comma-joined values, verbatim.
pub fn build_prompt(entity_type: &str, values: &[String]) -> String {
    let entity_input = format!("{entity_type}: {}", values.join(", "));
    PROMPT_TEMPLATE.replace("{entity_input}", &entity_input)
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum GroupsPayload {
    Bare(Vec<EntityGroup>),
    Wrapped { entities: Vec<EntityGroup> },
}

impl GroupsPayload {
    fn into_groups(self) -> Vec<EntityGroup> {
        match self {
            Self::Bare(groups) | Self::Wrapped { entities: groups } => groups,
        }
    }
}

/// Parse an oracle response into groups.
///
/// Accepts a bare JSON array, an object wrapping the array under
/// `entities`, or an array embedded in surrounding prose. Anything else is
/// a [`OracleError::ParseError`].
pub fn parse_groups(entity_type: &str, response: &str) -> OracleResult<Vec<EntityGroup>> {
    let trimmed = response.trim();

    let first_err = match serde_json::from_str::<GroupsPayload>(trimmed) {
        Ok(payload) => return Ok(payload.into_groups()),
        Err(e) => e,
    };

    let embedded = match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(s), Some(e)) if e > s => &trimmed[s..=e],
        _ => {
            return Err(OracleError::ParseError {
                entity_type: entity_type.into(),
                message: format!("no JSON array found in response ({first_err})"),
            });
        }
    };

    serde_json::from_str::<Vec<EntityGroup>>(embedded).map_err(|e| OracleError::ParseError {
        entity_type: entity_type.into(),
        message: format!("JSON parse error: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn prompt_embeds_type_and_values_verbatim() {
        let prompt = build_prompt("Character", &["Mattie".into(), "Matty".into()]);
        assert!(prompt.contains("Input:\nCharacter: Mattie, Matty\n"));
        assert!(prompt.contains("Do not add new entities."));
        assert!(!prompt.contains("{entity_input}"));
    }

    #[test]
    fn parse_bare_array() {
        let groups = parse_groups(
            "Character",
            r#"[{"type": "Character", "canonical_name": "Mattie", "aliases": ["Matty"]}]"#,
        )
        .unwrap();
        assert_eq!(groups, vec![EntityGroup::new("Character", "Mattie", ["Matty"])]);
    }

    #[test]
    fn parse_wrapped_object() {
        let groups = parse_groups(
            "Place",
            r#"{"entities": [{"type": "Place", "canonical_name": "Ganser Harbor", "aliases": []}]}"#,
        )
        .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].canonical_name, "Ganser Harbor");
    }

    #[test]
    fn parse_array_inside_prose() {
        let response = "Sure! Here you go:\n```json\n[{\"type\": \"Item\", \"canonical_name\": \"watch\"}]\n```";
        let groups = parse_groups("Item", response).unwrap();
        assert_eq!(groups[0].canonical_name, "watch");
        assert!(groups[0].aliases.is_empty());
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        let err = parse_groups("Character", r#"{"name": "Mattie"}"#).unwrap_err();
        assert!(matches!(err, OracleError::ParseError { .. }));

        let err = parse_groups("Character", r#"[{"canonical_name": "Mattie"}]"#).unwrap_err();
        assert!(matches!(err, OracleError::ParseError { ref entity_type, .. } if entity_type == "Character"));

        assert!(parse_groups("Character", "I cannot help with that.").is_err());
    }

    #[test]
    fn retrying_recovers_from_transient_failure() {
        let calls = Cell::new(0);
        let flaky = |t: &str, _: &[String]| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(OracleError::ParseError {
                    entity_type: t.into(),
                    message: "garbage".into(),
                })
            } else {
                Ok(vec![EntityGroup::new(t, "Mattie", ["Mattie"])])
            }
        };

        let oracle = Retrying::new(&flaky, 2);
        let groups = oracle.batch_canonicalize("Character", &["Mattie".into()]).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retrying_gives_up_after_budget() {
        let calls = Cell::new(0);
        let broken = |t: &str, _: &[String]| -> OracleResult<Vec<EntityGroup>> {
            calls.set(calls.get() + 1);
            Err(OracleError::ParseError {
                entity_type: t.into(),
                message: "garbage".into(),
            })
        };

        let oracle = Retrying::new(&broken, 1);
        assert!(oracle.batch_canonicalize("Character", &[]).is_err());
        assert_eq!(calls.get(), 2);
    }
}
