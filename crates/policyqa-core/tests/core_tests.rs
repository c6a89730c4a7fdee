use std::fs;
use std::path::Path;

use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use tempfile::TempDir;

use policyqa_core::chunker::{split_flat, split_structured, ChunkBuilder, ChunkingConfig, DocumentInfo, MIN_SECTION_CHARS};
use policyqa_core::config::{Config, IndexBackend, Settings};
use policyqa_core::data_processor::DataProcessor;
use policyqa_core::error::Error;
use policyqa_core::types::IdScope;

/// `words` distinct words of the form `<tag>NNN`, space separated.
fn paragraph(tag: &str, words: usize) -> String {
    (0..words).map(|i| format!("{tag}{i:03}")).collect::<Vec<_>>().join(" ")
}

fn doc() -> DocumentInfo {
    DocumentInfo {
        source: "pto_policy.md".to_string(),
        doc_id: "POL-001".to_string(),
        file_path: "/policies/pto_policy.md".to_string(),
    }
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

#[test]
fn flat_chunks_stay_within_bound() {
    let text: Vec<String> = (0..30).map(|i| paragraph(&format!("p{i}w"), 40 + (i % 7) * 9)).collect();
    let chunks = split_flat(&text.join("\n\n"), 1000, 200);
    assert!(chunks.len() > 3);
    for c in &chunks {
        assert!(c.chars().count() <= 1500, "chunk of {} chars", c.chars().count());
    }
}

#[test]
fn next_chunk_starts_with_word_tail_of_previous() {
    let text: Vec<String> = (0..12).map(|i| paragraph(&format!("s{i:02}x"), 50)).collect();
    let chunks = split_flat(&text.join("\n\n"), 1000, 200);
    assert!(chunks.len() >= 2);
    for pair in chunks.windows(2) {
        let prev: Vec<&str> = pair[0].split_whitespace().collect();
        let n = prev.len() * 200 / 1000;
        assert!(n > 0);
        let expected = &prev[prev.len() - n..];
        let next: Vec<&str> = pair[1].split_whitespace().take(n).collect();
        assert_eq!(next, expected);
    }
}

#[test]
fn chunking_is_deterministic() {
    let body: Vec<String> = (0..8).map(|i| paragraph(&format!("d{i}w"), 45)).collect();
    let text = format!("# Handbook\n\n## Leave\n\n{}\n\n## Travel\n\n{}\n", body[..4].join("\n\n"), body[4..].join("\n\n"));
    let builder = ChunkBuilder::new(ChunkingConfig::default()).unwrap();

    let a = builder.chunk(&text, true, &doc());
    let b = builder.chunk(&text, true, &doc());
    assert!(!a.is_empty());
    assert_eq!(a, b);
    let ids: Vec<&str> = a.iter().map(|c| c.id.as_str()).collect();
    let ids_again: Vec<&str> = b.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ids_again);
}

#[test]
fn short_heading_sections_are_dropped() {
    let long = paragraph("body", 40);
    let text = format!("## Purpose\n\nShort note.\n\n## Scope\n\n{long}\n\n## Contacts\n\nHR desk.\n");
    let builder = ChunkBuilder::new(ChunkingConfig::default()).unwrap();
    let chunks = builder.chunk(&text, true, &doc());

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].metadata.heading.as_deref(), Some("Scope"));
    assert!(chunks[0].content.starts_with("## Scope"));
}

#[test]
fn oversized_paragraph_is_kept_whole() {
    let giant = paragraph("g", 400);
    let text = format!("{}\n\n{giant}\n\n{}", paragraph("a", 20), paragraph("b", 20));
    let chunks = split_flat(&text, 1000, 200);

    assert!(giant.chars().count() > 1500);
    assert!(chunks.iter().any(|c| c.contains(&giant)), "giant paragraph must not be cut");
}

#[test]
fn short_remainder_after_eager_split_joins_last_chunk() {
    let paras: Vec<String> = (0..5).map(|i| paragraph(&format!("l{i}"), 60)).collect();
    let text = format!(
        "## Leave\n\n{}\n\nOK.\n\n## Next\n\n{}\n",
        paras.join("\n\n"),
        paragraph("n", 40)
    );
    let sections = split_structured(&text, 1000, 200);

    let leave: Vec<_> = sections.iter().filter(|s| s.heading.as_deref() == Some("Leave")).collect();
    assert!(leave.len() >= 2);
    for s in &leave {
        assert!(s.content.chars().count() >= MIN_SECTION_CHARS, "fragment {:?}", s.content);
    }
    assert!(leave.last().unwrap().content.ends_with("l4059\n\nOK."));
    assert_eq!(sections.last().unwrap().heading.as_deref(), Some("Next"));
}

#[test]
fn chunk_after_giant_paragraph_carries_its_tail() {
    let giant = paragraph("g", 1000);
    let normal = paragraph("n", 120);
    let chunks = split_flat(&format!("{giant}\n\n{normal}"), 1000, 200);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], giant);
    // 1000 words * 200 / 1000 = 200 leading words come from the giant paragraph
    let tail = giant.split_whitespace().skip(800).collect::<Vec<_>>().join(" ");
    assert_eq!(chunks[1], format!("{tail}\n\n{normal}"));
    assert!(chunks[1].chars().count() > 1500);
}

#[test]
fn degenerate_window_sizes_do_not_panic() {
    assert_eq!(split_flat("a b\n\nc d", 0, 0), vec!["a b", "c d"]);
    let chunks = split_flat("a b\n\nc d", 2, 5);
    assert_eq!(chunks, vec!["a b", "a b\n\nc d"]);
}

#[test]
fn rejects_overlap_not_smaller_than_size() {
    let cfg = ChunkingConfig { chunk_size: 200, chunk_overlap: 200, id_scope: IdScope::Leading };
    assert!(matches!(ChunkBuilder::new(cfg), Err(Error::InvalidConfig(_))));
}

fn pto_document() -> String {
    // four ~320 character paragraphs, ~1300 characters of section body
    let paras: Vec<String> = (0..4).map(|i| paragraph(&format!("t{i}"), 53)).collect();
    format!(
        "# Paid Time Off\n\n**Document ID**: POL-001\n\n## PTO\n\n{}\n",
        paras.join("\n\n")
    )
}

#[test]
fn pto_section_yields_two_overlapping_chunks() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("pto_policy.md"), pto_document()).unwrap();

    let processor = DataProcessor::new(ChunkingConfig::default()).unwrap();
    let corpus = processor.process_directory(tmp.path()).expect("process");

    assert_eq!(corpus.files_processed, 1);
    assert!(corpus.skipped.is_empty());
    let pto: Vec<_> = corpus
        .chunks
        .iter()
        .filter(|c| c.metadata.heading.as_deref() == Some("PTO"))
        .collect();
    assert_eq!(pto.len(), 2);
    for c in &pto {
        assert_eq!(c.metadata.doc_id, "POL-001");
        assert_eq!(c.metadata.source, "pto_policy.md");
    }
    assert!(pto[0].content.chars().count() <= 1000);
    assert!(pto[0].content.starts_with("## PTO"));

    let first: Vec<&str> = pto[0].content.split_whitespace().collect();
    let n = word_count(&pto[0].content) * 200 / 1000;
    let tail = first[first.len() - n..].join(" ");
    assert!(pto[1].content.starts_with(&tail));
    assert!(pto[1].content.ends_with("t3052"));
}

#[test]
fn plain_text_uses_filename_as_doc_id() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("remote_work.txt"), "Employees   may work remotely\n\n\n\ntwo days per week.").unwrap();

    let processor = DataProcessor::new(ChunkingConfig::default()).unwrap();
    let corpus = processor.process_directory(tmp.path()).unwrap();

    assert_eq!(corpus.chunks.len(), 1);
    let chunk = &corpus.chunks[0];
    assert_eq!(chunk.content, "Employees may work remotely\n\ntwo days per week.");
    assert_eq!(chunk.metadata.doc_id, "REMOTE_WORK");
    assert_eq!(chunk.metadata.heading, None);
}

#[test]
fn html_is_rendered_to_text() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("security.html"),
        "<html><body><h1>Security</h1><p>Lock your screen when away.</p></body></html>",
    )
    .unwrap();

    let processor = DataProcessor::new(ChunkingConfig::default()).unwrap();
    let corpus = processor.process_directory(tmp.path()).unwrap();

    assert_eq!(corpus.chunks.len(), 1);
    assert!(corpus.chunks[0].content.contains("Lock your screen when away."));
    assert!(!corpus.chunks[0].content.contains("<p>"));
    assert_eq!(corpus.chunks[0].metadata.doc_id, "SECURITY");
}

#[test]
fn unreadable_file_is_skipped_not_fatal() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a_broken.pdf"), b"this is not a pdf").unwrap();
    fs::write(tmp.path().join("b_notes.txt"), "Badges must be worn on site.").unwrap();
    fs::write(tmp.path().join("c_logo.png"), [0u8, 1, 2]).unwrap();

    let processor = DataProcessor::new(ChunkingConfig::default()).unwrap();
    let corpus = processor.process_directory(tmp.path()).unwrap();

    assert_eq!(corpus.files_processed, 1);
    assert_eq!(corpus.skipped.len(), 1);
    assert!(corpus.skipped[0].path.ends_with("a_broken.pdf"));
    assert_eq!(corpus.chunks.len(), 1);
    assert_eq!(corpus.chunks[0].metadata.doc_id, "B_NOTES");
}

#[test]
fn missing_directory_is_an_ingestion_error() {
    let processor = DataProcessor::new(ChunkingConfig::default()).unwrap();
    let err = processor.process_directory(Path::new("/definitely/not/here")).unwrap_err();
    assert!(matches!(err, Error::Ingestion { .. }));
}

#[test]
fn settings_merge_defaults_and_toml() {
    let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(
        r#"
        [retrieval]
        top_k = 3

        [index]
        backend = "memory"

        [generation]
        model = "openai/gpt-4o-mini"
        "#,
    ));
    let settings = Config::from_figment(figment, Path::new("/srv/policyqa")).settings().unwrap();

    assert_eq!(settings.retrieval.top_k, 3);
    assert!((settings.retrieval.similarity_threshold - 0.3).abs() < 1e-6);
    assert_eq!(settings.index.backend, IndexBackend::Memory);
    assert_eq!(settings.generation.model, "openai/gpt-4o-mini");
    assert_eq!(settings.generation.max_tokens, 500);
    assert_eq!(settings.chunking.chunk_size, 1000);
}

#[test]
fn invalid_settings_are_rejected() {
    let figment = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::string("[retrieval]\ntop_k = 0\n"));
    let err = Config::from_figment(figment, Path::new(".")).settings().unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn relative_paths_resolve_against_base() {
    let config = Config::from_figment(Figment::new(), Path::new("/srv/policyqa"));
    assert_eq!(config.resolve_path("data/index"), Path::new("/srv/policyqa/data/index"));
    assert_eq!(config.resolve_path("/var/lib/index"), Path::new("/var/lib/index"));
}
