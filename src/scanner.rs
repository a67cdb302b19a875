//! Marker discovery over the block sequence.
//!
//! A paragraph is a marker block when its extracted text contains the
//! magic-string pattern; the pattern is anchored at the `{rpfy}:`
//! prefix and extends non-greedily to the last dot-delimited extension
//! before end of text.

use crate::document::{Block, ReportDocument};
use crate::marker::MagicMarker;
use crate::Diagnostic;
use log::warn;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

pub static MAGIC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\{rpfy\}:.*?\.[^.]+$").expect("magic string regex"));

/// A marker found in the document, with the index of the paragraph
/// block that carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerMatch {
    pub block_index: usize,
    pub marker: MagicMarker,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub markers: Vec<MarkerMatch>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scans the document for marker paragraphs, in block order.
///
/// Duplicate marker text inside one paragraph yields a single
/// diagnostic for that paragraph; every occurrence is still returned so
/// no artifacts are dropped by duplication alone.
pub fn find_markers(doc: &ReportDocument) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    for (index, block) in doc.blocks.iter().enumerate() {
        let Some(paragraph) = block.as_paragraph() else {
            continue;
        };
        let text = paragraph.text();
        let matches: Vec<&str> = MAGIC_PATTERN.find_iter(&text).map(|m| m.as_str()).collect();
        if matches.is_empty() {
            continue;
        }

        let unique: HashSet<&str> = matches.iter().copied().collect();
        if unique.len() < matches.len() {
            warn!("Duplicate artifact declarations found in paragraph {}.", index + 1);
            outcome.diagnostics.push(Diagnostic {
                block_index: Some(index),
                artifact: None,
                message: "duplicate artifact declarations in paragraph".to_string(),
            });
        }

        for raw in matches {
            outcome.markers.push(MarkerMatch {
                block_index: index,
                marker: MagicMarker::parse(raw),
            });
        }
    }

    outcome
}

/// True when the paragraph at `index` is a marker block.
pub fn is_marker_block(doc: &ReportDocument, index: usize) -> bool {
    doc.blocks
        .get(index)
        .and_then(Block::as_paragraph)
        .is_some_and(|p| MAGIC_PATTERN.is_match(&p.text()))
}

/// Scans forward from `start_index + 1` for the next `count` blocks
/// that bear placed artifact content (a drawing-carrying paragraph or a
/// table).
///
/// Returns fewer indices when the document ends first, and never scans
/// past another marker block: a following marker group's artifacts are
/// not consumed by this one.
pub fn find_artifact_blocks(doc: &ReportDocument, start_index: usize, count: usize) -> Vec<usize> {
    let mut found = Vec::new();

    for index in (start_index + 1)..doc.blocks.len() {
        if found.len() == count {
            break;
        }
        if is_marker_block(doc, index) {
            break;
        }
        if doc.blocks[index].bears_artifact() {
            found.push(index);
        }
    }

    found.truncate(count);
    found
}

/// Finds the table paired with the marker paragraph at `start_index`:
/// the first following table sibling, with the scan stopping at the
/// first intervening paragraph.
pub fn find_following_table(doc: &ReportDocument, start_index: usize) -> Option<usize> {
    for index in (start_index + 1)..doc.blocks.len() {
        match &doc.blocks[index] {
            Block::Table(_) => return Some(index),
            Block::Paragraph(_) => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Drawing, Paragraph, ParagraphChild, Table};

    fn paragraph(text: &str) -> Block {
        Block::Paragraph(Paragraph::with_text(text))
    }

    fn drawing_paragraph() -> Block {
        Block::Paragraph(Paragraph {
            children: vec![ParagraphChild::Drawing(Drawing {
                source: "fig.png".into(),
                width: None,
                height: None,
                alt_text: None,
            })],
            ..Default::default()
        })
    }

    fn table() -> Block {
        Block::Table(Table::default())
    }

    #[test]
    fn test_find_markers_in_block_order() {
        let doc = ReportDocument::new(vec![
            paragraph("Some prose without markers."),
            paragraph("{rpfy}:first.png"),
            paragraph("more prose"),
            paragraph("See the figures {rpfy}:[a.png, b.csv]"),
        ]);

        let outcome = find_markers(&doc);
        assert_eq!(outcome.markers.len(), 2);
        assert_eq!(outcome.markers[0].block_index, 1);
        assert_eq!(outcome.markers[1].block_index, 3);
        assert_eq!(outcome.markers[1].marker.len(), 2);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_marker_embedded_in_prose_is_found() {
        let doc = ReportDocument::new(vec![paragraph("As shown in {rpfy}:results.png")]);
        let outcome = find_markers(&doc);
        assert_eq!(outcome.markers.len(), 1);
        assert_eq!(outcome.markers[0].marker.raw, "{rpfy}:results.png");
    }

    #[test]
    fn test_grammar_mismatch_is_not_a_marker() {
        let doc = ReportDocument::new(vec![
            paragraph("{rpfy}: no extension here"),
            paragraph("rpfy:missing-braces.png"),
        ]);
        // "no extension here" has no dot-delimited suffix; the second
        // paragraph lacks the braced prefix
        assert!(find_markers(&doc).markers.is_empty());
    }

    #[test]
    fn test_duplicate_marker_diagnostic_once_per_paragraph() {
        // the pattern anchors at segment ends, so a hard break between
        // two identical declarations produces two matches
        let doc = ReportDocument::new(vec![Block::Paragraph(Paragraph {
            children: vec![
                ParagraphChild::Run(crate::document::Run::text("{rpfy}:a.png")),
                ParagraphChild::Break,
                ParagraphChild::Run(crate::document::Run::text("{rpfy}:a.png")),
            ],
            ..Default::default()
        })]);

        let outcome = find_markers(&doc);
        // both occurrences still processed, one diagnostic
        assert_eq!(outcome.markers.len(), 2);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].block_index, Some(0));
    }

    #[test]
    fn test_find_artifact_blocks_skips_prose_and_counts() {
        let doc = ReportDocument::new(vec![
            paragraph("{rpfy}:[a.png, b.png]"),
            paragraph(""),
            drawing_paragraph(),
            drawing_paragraph(),
            drawing_paragraph(),
        ]);
        assert_eq!(find_artifact_blocks(&doc, 0, 2), vec![2, 3]);
    }

    #[test]
    fn test_find_artifact_blocks_returns_short_when_document_ends() {
        let doc = ReportDocument::new(vec![paragraph("{rpfy}:a.png"), paragraph("")]);
        assert!(find_artifact_blocks(&doc, 0, 1).is_empty());
    }

    #[test]
    fn test_find_artifact_blocks_stops_at_next_marker() {
        let doc = ReportDocument::new(vec![
            paragraph("{rpfy}:a.png"),
            drawing_paragraph(),
            paragraph("{rpfy}:b.png"),
            drawing_paragraph(),
        ]);
        // the second marker's drawing is not consumed by the first group
        assert_eq!(find_artifact_blocks(&doc, 0, 2), vec![1]);
    }

    #[test]
    fn test_find_artifact_blocks_sees_tables() {
        let doc = ReportDocument::new(vec![paragraph("{rpfy}:t.csv"), table()]);
        assert_eq!(find_artifact_blocks(&doc, 0, 1), vec![1]);
    }

    #[test]
    fn test_find_following_table_stops_at_paragraph() {
        let doc = ReportDocument::new(vec![
            paragraph("{rpfy}:t.csv"),
            table(),
            paragraph("{rpfy}:u.csv"),
            paragraph("intervening"),
            table(),
        ]);
        assert_eq!(find_following_table(&doc, 0), Some(1));
        assert_eq!(find_following_table(&doc, 2), None);
    }
}
