//! Span tagging: rewriting paragraphs with inline entity markers.
//!
//! The scan is greedy, longest-alias-first, non-overlapping and
//! case-insensitive. For each alias, every occurrence is a candidate; a
//! candidate is rejected when
//!
//! - an open bracket appears in the three characters before it (it would
//!   sit inside a marker inserted earlier),
//! - the character just before or just after it is alphabetic (digits and
//!   punctuation are acceptable boundaries), or
//! - it overlaps a span accepted earlier.
//!
//! Accepted matches get ` [ID]` (or ` [[ID]]`) inserted right after them.
//! Longer aliases run first, so a shorter alias nested inside a tagged
//! longer one is suppressed by the overlap check.

pub mod alias_table;
pub mod spans;

use std::collections::BTreeSet;

use rayon::prelude::*;
use regex::{Regex, RegexBuilder};

use crate::error::{TagError, TagResult};
use crate::model::{Book, Chapter, ParagraphMentions, TagStyle};

pub use alias_table::{AliasCollision, AliasEntry, AliasTable, CollisionPolicy};
pub use spans::{Span, SpanSet};

/// Output of tagging one paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedParagraph {
    /// Paragraph text with markers inserted.
    pub text: String,
    /// Distinct entity ids found, ascending.
    pub entity_ids: Vec<String>,
    /// Accepted spans (match plus marker) in `text` coordinates.
    pub spans: Vec<Span>,
}

/// Compiled alias matchers in precedence order.
#[derive(Debug, Clone)]
pub struct SpanTagger {
    matchers: Vec<(Regex, String)>,
    style: TagStyle,
}

impl SpanTagger {
    /// Compile one case-insensitive matcher per alias, longest first.
    pub fn new(table: &AliasTable, style: TagStyle) -> TagResult<Self> {
        let matchers = table
            .longest_first()
            .into_iter()
            .map(|entry| {
                RegexBuilder::new(&regex::escape(&entry.alias))
                    .case_insensitive(true)
                    .build()
                    .map(|re| (re, entry.id.clone()))
                    .map_err(|e| TagError::Pattern {
                        alias: entry.alias.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<TagResult<Vec<_>>>()?;
        Ok(Self { matchers, style })
    }

    pub fn style(&self) -> TagStyle {
        self.style
    }

    /// Tag one paragraph. No state carries over between calls.
    pub fn tag(&self, paragraph: &str) -> TaggedParagraph {
        let mut text = paragraph.to_string();
        let mut accepted = SpanSet::new();
        let mut found: BTreeSet<&str> = BTreeSet::new();

        for (matcher, id) in &self.matchers {
            let marker = format!(" {}", self.style.marker(id));
            let candidates: Vec<(usize, usize)> = matcher
                .find_iter(&text)
                .map(|m| (m.start(), m.end()))
                .collect();

            // Candidates are positions in `text` before this alias's own
            // insertions; `shift` tracks how far those have moved them.
            let mut shift = 0;
            for (start, end) in candidates {
                let (start, end) = (start + shift, end + shift);
                if !is_acceptable(&text, start, end, &accepted) {
                    continue;
                }
                text.insert_str(end, &marker);
                accepted.accept(start, end, marker.len());
                shift += marker.len();
                found.insert(id);
            }
        }

        TaggedParagraph {
            text,
            entity_ids: found.into_iter().map(str::to_string).collect(),
            spans: accepted.into_vec(),
        }
    }

    /// Tag every paragraph of a chapter, filling `tagged_paragraphs` and
    /// `entity_mentions`. Returns the number of markers inserted.
    pub fn tag_chapter(&self, chapter: &mut Chapter) -> usize {
        let mut tagged = Vec::with_capacity(chapter.paragraphs.len());
        let mut mentions = Vec::with_capacity(chapter.paragraphs.len());
        let mut markers = 0;

        for (paragraph_index, paragraph) in chapter.paragraphs.iter().enumerate() {
            let result = self.tag(paragraph);
            markers += result.spans.len();
            tagged.push(result.text);
            mentions.push(ParagraphMentions {
                paragraph_index,
                entities: result.entity_ids,
            });
        }

        chapter.tagged_paragraphs = Some(tagged);
        chapter.entity_mentions = Some(mentions);
        markers
    }
}

fn is_acceptable(text: &str, start: usize, end: usize, accepted: &SpanSet) -> bool {
    let before = &text[..start];
    if before.chars().rev().take(3).any(|c| c == '[') {
        return false;
    }
    if before.chars().next_back().is_some_and(char::is_alphabetic) {
        return false;
    }
    if text[end..].chars().next().is_some_and(char::is_alphabetic) {
        return false;
    }
    !accepted.overlaps(start, end)
}

/// Counts from tagging a whole book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagStats {
    pub chapters: usize,
    pub paragraphs: usize,
    pub markers: usize,
}

/// Tag every chapter of a book. Chapters are independent, so with
/// `parallel` they are processed on the rayon pool; output is identical.
pub fn tag_book(book: &mut Book, tagger: &SpanTagger, parallel: bool) -> TagStats {
    let markers: usize = if parallel {
        book.chapters
            .par_iter_mut()
            .map(|chapter| tagger.tag_chapter(chapter))
            .sum()
    } else {
        book.chapters
            .iter_mut()
            .map(|chapter| tagger.tag_chapter(chapter))
            .sum()
    };

    let stats = TagStats {
        chapters: book.chapters.len(),
        paragraphs: book.chapters.iter().map(|c| c.paragraphs.len()).sum(),
        markers,
    };
    tracing::info!(
        chapters = stats.chapters,
        paragraphs = stats.paragraphs,
        markers = stats.markers,
        "tagging complete"
    );
    stats
}
