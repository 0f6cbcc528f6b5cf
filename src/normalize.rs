//! Alias normalization.
//!
//! Cleans possessives and punctuation out of every alias, makes sure the
//! canonical name is itself an alias, and dedups/sorts the result so the
//! output is deterministic. Running it twice changes nothing.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::CanonicalEntity;

/// Trailing possessive, straight or curly apostrophe.
static POSSESSIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b['’]s$").unwrap());

/// Anything that is neither a word character nor whitespace.
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Clean one alias: drop a trailing possessive, then every non-word,
/// non-space character, then surrounding whitespace.
///
/// The possessive goes first; once apostrophes are stripped there is no
/// `'s` left to recognize.
pub fn clean_alias(alias: &str) -> String {
    let trimmed = alias.trim();
    let without_possessive = POSSESSIVE.replace(trimmed, "");
    let without_punct = NON_WORD.replace_all(&without_possessive, "");
    without_punct.trim().to_string()
}

/// Normalize one entity's aliases in place.
///
/// Every alias is cleaned, then the trimmed canonical name is appended
/// verbatim. Its cleaned form is appended as well: a second pass would
/// otherwise derive it from the canonical name and grow the set.
pub fn normalize_entity(entity: &mut CanonicalEntity) {
    let canonical = entity.canonical_name.trim().to_string();

    let mut aliases: Vec<String> = entity
        .aliases
        .iter()
        .map(|alias| clean_alias(alias))
        .filter(|alias| !alias.is_empty())
        .collect();

    if !canonical.is_empty() {
        let cleaned = clean_alias(&canonical);
        if !cleaned.is_empty() {
            aliases.push(cleaned);
        }
        aliases.push(canonical);
    }

    aliases.sort();
    aliases.dedup();
    entity.aliases = aliases;
}

/// Normalize every entity's aliases.
pub fn normalize_aliases(entities: &mut [CanonicalEntity]) {
    for entity in entities.iter_mut() {
        normalize_entity(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(name: &str, aliases: &[&str]) -> Vec<String> {
        let mut entity = CanonicalEntity::new("Character", name, aliases.iter().copied());
        normalize_entity(&mut entity);
        entity.aliases
    }

    #[test]
    fn clean_alias_strips_possessive_and_punctuation() {
        assert_eq!(clean_alias("Mattie's"), "Mattie");
        assert_eq!(clean_alias("Mattie’s"), "Mattie");
        assert_eq!(clean_alias("  \"Mattie Mae,\" "), "Mattie Mae");
        assert_eq!(clean_alias("Mr. Albright"), "Mr Albright");
        assert_eq!(clean_alias("St. James's Park"), "St Jamess Park");
        assert_eq!(clean_alias("Chess"), "Chess");
        assert_eq!(clean_alias("..."), "");
    }

    #[test]
    fn canonical_name_always_present() {
        assert_eq!(normalized("Mattie", &["Matty"]), vec!["Mattie", "Matty"]);
        assert_eq!(normalized(" Mattie ", &[]), vec!["Mattie"]);
        assert_eq!(normalized("Mattie", &["!!"]), vec!["Mattie"]);
    }

    #[test]
    fn missing_aliases_key_becomes_singleton() {
        let json = r#"{"type": "Place", "canonical_name": "Ganser Harbor"}"#;
        let mut entity: CanonicalEntity = serde_json::from_str(json).unwrap();
        normalize_entity(&mut entity);
        assert_eq!(entity.aliases, vec!["Ganser Harbor"]);
    }

    #[test]
    fn dedup_and_sort() {
        assert_eq!(
            normalized("Mattie", &["Matty", "Mattie's", "Matty", "Mattie Mae"]),
            vec!["Mattie", "Mattie Mae", "Matty"]
        );
    }

    #[test]
    fn dedup_is_case_sensitive() {
        assert_eq!(normalized("Mattie", &["mattie"]), vec!["Mattie", "mattie"]);
    }

    #[test]
    fn canonical_alias_is_cleaned_and_kept_verbatim() {
        assert_eq!(normalized("Dr. Reyes", &["Dr. Reyes"]), vec!["Dr Reyes", "Dr. Reyes"]);
        assert_eq!(
            normalized("Mattie's Landing", &["the Landing."]),
            vec!["Mattie's Landing", "Matties Landing", "the Landing"]
        );
    }

    #[test]
    fn punctuation_free_canonical_variant_grounds() {
        let mut entity = CanonicalEntity::new("Character", "Dr. Reyes", ["Dr. Reyes"]);
        normalize_entity(&mut entity);
        let outcome = crate::grounding::ground_entities(
            vec![entity],
            ["Dr Reyes arrived."],
            crate::grounding::GroundingRules::default(),
        );
        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.entities[0].aliases, vec!["Dr Reyes"]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let cases: &[(&str, &[&str])] = &[
            ("Mattie", &["Matty", "Mattie's", "Mattie Mae,"]),
            ("Mattie's Landing", &["Mattie's Landing", "Landing's", "landing"]),
            ("Dr. Reyes", &["Dr. Reyes", "Reyes's", "the doctor"]),
            ("Dr. Reyes", &["the doctor"]),
            ("O'Hara's Pub", &[]),
            ("Ganser Harbor", &[]),
        ];
        for (name, aliases) in cases {
            let mut once = CanonicalEntity::new("Character", *name, aliases.iter().copied());
            normalize_entity(&mut once);
            let mut twice = once.clone();
            normalize_entity(&mut twice);
            assert_eq!(once, twice, "not idempotent for {name}");
        }
    }
}
