//! Document chunking.
//!
//! Two strategies share one paragraph splitter:
//! - flat: blank-line paragraphs packed into windows of about `chunk_size`
//!   characters, each new window seeded with the trailing words of the last one;
//! - structured: markdown split on level 1-2 headings, one chunk per section,
//!   oversized sections routed through the flat splitter.
//!
//! Lengths are counted in `char`s. Nothing here truncates text: a paragraph
//! longer than `chunk_size` ends up whole in a single chunk.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkMetadata, IdScope};

/// Sections whose trimmed body (heading line excluded) is shorter than this are
/// dropped as noise.
pub const MIN_SECTION_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub id_scope: IdScope,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, id_scope: IdScope::Leading }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// File-level provenance; the heading is filled in per section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub source: String,
    pub doc_id: String,
    pub file_path: String,
}

impl DocumentInfo {
    fn metadata(&self, heading: Option<String>) -> ChunkMetadata {
        ChunkMetadata {
            source: self.source.clone(),
            doc_id: self.doc_id.clone(),
            heading,
            file_path: self.file_path.clone(),
        }
    }
}

/// A piece of text together with the heading it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChunkBuilder {
    config: ChunkingConfig,
}

impl ChunkBuilder {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn chunk(&self, text: &str, structured: bool, doc: &DocumentInfo) -> Vec<Chunk> {
        let ChunkingConfig { chunk_size, chunk_overlap, id_scope } = self.config;
        let sections = if structured {
            split_structured(text, chunk_size, chunk_overlap)
        } else {
            split_flat(text, chunk_size, chunk_overlap)
                .into_iter()
                .map(|content| Section { heading: None, content })
                .collect()
        };
        sections
            .into_iter()
            .map(|s| Chunk::new(s.content, doc.metadata(s.heading), id_scope))
            .collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Last `floor(overlap / chunk_size * words(text))` words of `text`, space-joined.
/// Never more than the whole text; empty for a zero `chunk_size`.
fn overlap_tail(text: &str, chunk_size: usize, overlap: usize) -> String {
    if chunk_size == 0 {
        return String::new();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    let n = (words.len() * overlap / chunk_size).min(words.len());
    words[words.len() - n..].join(" ")
}

/// Paragraph sliding window.
///
/// A chunk that follows an oversized paragraph opens with that paragraph's
/// overlap tail, so it can exceed 1.5x `chunk_size` without being a single
/// paragraph itself.
pub fn split_flat(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for para in text.split("\n\n") {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        let para_len = char_len(para);
        if current_len + para_len > chunk_size && !current.is_empty() {
            let tail = overlap_tail(&current, chunk_size, overlap);
            chunks.push(current.trim().to_string());
            current = if tail.is_empty() { para.to_string() } else { format!("{tail}\n\n{para}") };
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(para);
        }
        current_len = char_len(&current);
    }

    let last = current.trim();
    if !last.is_empty() {
        chunks.push(last.to_string());
    }
    chunks
}

/// Level 1-2 ATX heading text, if `line` is one.
fn parse_heading(line: &str) -> Option<String> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if !(1..=2).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim();
    (!title.is_empty()).then(|| title.to_string())
}

struct SectionAccumulator {
    heading: Option<String>,
    text: String,
    // byte offset where the body starts, past the heading line
    body_start: usize,
    // set once part of this section was already emitted by an eager split
    split: bool,
}

impl SectionAccumulator {
    fn new(heading: Option<String>) -> Self {
        Self { heading, text: String::new(), body_start: 0, split: false }
    }

    fn open(heading: String, line: &str) -> Self {
        let mut text = line.trim_end().to_string();
        text.push('\n');
        Self { heading: Some(heading), body_start: text.len(), text, split: false }
    }

    fn emit(&mut self, out: &mut Vec<Section>, chunk_size: usize, overlap: usize) {
        out.extend(split_flat(&self.text, chunk_size, overlap).into_iter().map(|content| Section {
            heading: self.heading.clone(),
            content,
        }));
        self.text.clear();
        self.body_start = 0;
        self.split = true;
    }

    fn flush(mut self, out: &mut Vec<Section>, chunk_size: usize, overlap: usize) {
        let body = char_len(self.text[self.body_start..].trim());
        if body == 0 {
            return;
        }
        if body < MIN_SECTION_CHARS {
            // short remainder of an eagerly split section joins its last chunk
            if self.split {
                if let Some(last) = out.last_mut().filter(|s| s.heading == self.heading) {
                    last.content.push_str("\n\n");
                    last.content.push_str(self.text.trim());
                }
            }
            return;
        }
        if char_len(self.text.trim()) > chunk_size {
            self.emit(out, chunk_size, overlap);
        } else {
            out.push(Section { heading: self.heading, content: self.text.trim().to_string() });
        }
    }
}

/// Heading-aware splitting for markdown.
///
/// Text before the first heading forms its own section with no heading. Once a
/// section grows past 1.5x `chunk_size` it is split at the next paragraph
/// break and accumulation restarts under the same heading.
pub fn split_structured(text: &str, chunk_size: usize, overlap: usize) -> Vec<Section> {
    let eager_limit = chunk_size + chunk_size / 2;
    let mut out = Vec::new();
    let mut section = SectionAccumulator::new(None);
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence {
            if let Some(heading) = parse_heading(line) {
                let previous = std::mem::replace(&mut section, SectionAccumulator::open(heading, line));
                previous.flush(&mut out, chunk_size, overlap);
                continue;
            }
            if line.trim().is_empty() && char_len(&section.text) > eager_limit {
                section.emit(&mut out, chunk_size, overlap);
                continue;
            }
        }
        section.text.push_str(line);
        section.text.push('\n');
    }
    section.flush(&mut out, chunk_size, overlap);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_level_one_and_two_headings() {
        assert_eq!(parse_heading("# Title"), Some("Title".to_string()));
        assert_eq!(parse_heading("## PTO ##"), Some("PTO".to_string()));
        assert_eq!(parse_heading("### Details"), None);
        assert_eq!(parse_heading("#hashtag"), None);
        assert_eq!(parse_heading("##   "), None);
        assert_eq!(parse_heading("plain text"), None);
    }

    #[test]
    fn overlap_tail_floors_word_count() {
        let text = "a b c d e f g h i j k l";
        // 12 words * 200 / 1000 = 2.4 -> 2
        assert_eq!(overlap_tail(text, 1000, 200), "k l");
        // 4 words * 200 / 1000 = 0.8 -> 0
        assert_eq!(overlap_tail("a b c d", 1000, 200), "");
    }

    #[test]
    fn overlap_tail_is_bounded_by_text() {
        assert_eq!(overlap_tail("a b c", 2, 5), "a b c");
        assert_eq!(overlap_tail("a b c", 0, 0), "");
    }

    #[test]
    fn zero_overlap_seeds_nothing() {
        let para = "word ".repeat(30);
        let text = format!("{para}\n\n{para}\n\n{para}");
        let chunks = split_flat(&text, 200, 0);
        assert_eq!(chunks.len(), 3);
        for c in &chunks {
            assert_eq!(c.split_whitespace().count(), 30);
        }
    }

    #[test]
    fn headings_inside_code_fences_are_content() {
        let body = "Run the following when onboarding a laptop. ".repeat(4);
        let text = format!("## Setup\n\n{body}\n\n```sh\n# install tools\nbrew bundle\n```\n");
        let sections = split_structured(&text, 1000, 200);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading.as_deref(), Some("Setup"));
        assert!(sections[0].content.contains("# install tools"));
    }
}
