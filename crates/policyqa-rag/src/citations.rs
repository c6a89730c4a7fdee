//! Citation markers in generated answers.
//!
//! This is an approximate check for diagnostics: it only looks for the
//! `[Source: file, Doc ID: ID]` markers the instructions ask for and says
//! nothing about whether the cited text supports the answer. The `sources` of
//! a [`Response`](policyqa_core::types::Response) never depend on it.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use policyqa_core::types::SourceRef;

static CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Source:\s*([^,\]]+?)\s*,\s*Doc ID:\s*([^\]]+?)\s*\]").expect("static pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Citation {
    pub source: String,
    pub doc_id: String,
}

/// Markers found in `answer`, deduplicated, in order of appearance.
pub fn parse_citations(answer: &str) -> Vec<Citation> {
    let mut seen = HashSet::new();
    CITATION
        .captures_iter(answer)
        .map(|c| Citation { source: c[1].to_string(), doc_id: c[2].to_string() })
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CitationReport {
    /// Returned sources whose doc id appears in a marker.
    pub cited: Vec<String>,
    /// Returned sources never mentioned by a marker.
    pub uncited: Vec<String>,
    /// Markers naming a doc id that was not among the returned sources.
    pub unknown: Vec<Citation>,
}

pub fn check_citations(answer: &str, sources: &[SourceRef]) -> CitationReport {
    let citations = parse_citations(answer);
    let cited_ids: HashSet<&str> = citations.iter().map(|c| c.doc_id.as_str()).collect();
    let known_ids: HashSet<&str> = sources.iter().map(|s| s.doc_id.as_str()).collect();

    let mut report = CitationReport::default();
    for s in sources {
        let bucket = if cited_ids.contains(s.doc_id.as_str()) { &mut report.cited } else { &mut report.uncited };
        if !bucket.contains(&s.doc_id) {
            bucket.push(s.doc_id.clone());
        }
    }
    report.unknown = citations.into_iter().filter(|c| !known_ids.contains(c.doc_id.as_str())).collect();
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(doc_id: &str) -> SourceRef {
        SourceRef { doc_id: doc_id.into(), source: format!("{doc_id}.md"), heading: None, similarity: 0.5 }
    }

    #[test]
    fn parses_markers_in_order_without_duplicates() {
        let answer = "You get 20 days [Source: pto.md, Doc ID: POL-001]. Remote work is capped \
                      [Source: remote_work.md , Doc ID: POL-002 ] [Source: pto.md, Doc ID: POL-001]";
        let found = parse_citations(answer);
        assert_eq!(
            found,
            vec![
                Citation { source: "pto.md".into(), doc_id: "POL-001".into() },
                Citation { source: "remote_work.md".into(), doc_id: "POL-002".into() },
            ]
        );
    }

    #[test]
    fn report_splits_cited_uncited_unknown() {
        let answer = "See [Source: pto.md, Doc ID: POL-001] and [Source: x.md, Doc ID: POL-404].";
        let report = check_citations(answer, &[source("POL-001"), source("POL-002")]);
        assert_eq!(report.cited, vec!["POL-001"]);
        assert_eq!(report.uncited, vec!["POL-002"]);
        assert_eq!(report.unknown.len(), 1);
        assert_eq!(report.unknown[0].doc_id, "POL-404");
    }

    #[test]
    fn answer_without_markers_cites_nothing() {
        let report = check_citations("Twenty days.", &[source("POL-001")]);
        assert!(report.cited.is_empty());
        assert_eq!(report.uncited, vec!["POL-001"]);
    }
}
