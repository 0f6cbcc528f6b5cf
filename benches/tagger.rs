//! Benchmarks for span tagging.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use loregraph::model::{Book, Chapter, TagStyle};
use loregraph::tagger::{self, AliasTable, CollisionPolicy, SpanTagger};

const SENTENCES: &[&str] = &[
    "Mattie walked through Ganser Harbor with her father's watch.",
    "Albright kept the lighthouse above the Harbor for thirty years.",
    "The Harbor Folk said Mattie Mae talked to the gulls.",
    "Nobody in Ganser had seen a storm like it since the wreck of the Providence.",
];

fn alias_table() -> AliasTable {
    let mut pairs: Vec<(String, String)> = vec![
        ("mattie".into(), "CHARACTER_001".into()),
        ("mattie mae".into(), "CHARACTER_001".into()),
        ("albright".into(), "CHARACTER_002".into()),
        ("ganser harbor".into(), "PLACE_001".into()),
        ("the harbor".into(), "PLACE_001".into()),
        ("ganser".into(), "PLACE_001".into()),
        ("watch".into(), "ITEM_001".into()),
        ("lighthouse".into(), "PLACE_002".into()),
        ("harbor folk".into(), "GROUP_OR_CULTURE_001".into()),
        ("providence".into(), "ITEM_002".into()),
    ];
    // Filler aliases that never match, to size the table like a real novel's.
    pairs.extend((0..200).map(|i| (format!("minor figure {i}"), format!("CHARACTER_{:03}", i + 3))));
    AliasTable::from_pairs(pairs, CollisionPolicy::FirstWins).unwrap()
}

fn chapter_paragraphs(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            SENTENCES
                .iter()
                .cycle()
                .skip(i % SENTENCES.len())
                .take(6)
                .copied()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn bench_tag_paragraph(c: &mut Criterion) {
    let span_tagger = SpanTagger::new(&alias_table(), TagStyle::Single).unwrap();
    let paragraph = chapter_paragraphs(1).remove(0);

    c.bench_function("tag_paragraph", |bench| {
        bench.iter(|| black_box(span_tagger.tag(black_box(&paragraph))))
    });
}

fn bench_tag_book(c: &mut Criterion) {
    let span_tagger = SpanTagger::new(&alias_table(), TagStyle::Single).unwrap();
    let book = Book {
        chapters: (0..20)
            .map(|n| Chapter::new(n, format!("Chapter {n}"), chapter_paragraphs(40)))
            .collect(),
        ..Default::default()
    };

    c.bench_function("tag_book_sequential_20x40", |bench| {
        bench.iter(|| {
            let mut book = book.clone();
            black_box(tagger::tag_book(&mut book, &span_tagger, false))
        })
    });

    c.bench_function("tag_book_parallel_20x40", |bench| {
        bench.iter(|| {
            let mut book = book.clone();
            black_box(tagger::tag_book(&mut book, &span_tagger, true))
        })
    });
}

criterion_group!(benches, bench_tag_paragraph, bench_tag_book);
criterion_main!(benches);
