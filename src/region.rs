//! Bookmark-scoped footnote regions.
//!
//! An injected footnote is a paragraph whose children are bracketed by
//! a bookmark start/end pair sharing one numeric id; the start carries
//! the stable name `fp_<artifact-group>`. Ids come from a run-scoped
//! monotonic allocator, so composing passes can never collide on the
//! positional ordinals the ids were once derived from. Removal deletes
//! exactly the content between a matching pair plus the pair itself,
//! and is a no-op when nothing matches.

use crate::config::ReportConfig;
use crate::document::{
    Block, Paragraph, ParagraphChild, ReportDocument, Run, VerticalAlign,
};
use crate::footnote::{render_lines, CombinedFootnote};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// Name prefix for footnote region bookmarks.
pub const FOOTNOTE_BOOKMARK_PREFIX: &str = "fp_";

static INLINE_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_\{[^}]*\}|\^\{[^}]*\}").expect("inline markup regex"));

pub fn footnote_bookmark_name(artifact_group: &str) -> String {
    format!("{}{}", FOOTNOTE_BOOKMARK_PREFIX, artifact_group)
}

/// Hands out region ids unique within one pipeline run.
#[derive(Debug, Default)]
pub struct RegionIdAllocator {
    next: u32,
}

impl RegionIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Splits rendered footnote text into styled runs: `_{...}` becomes a
/// subscript run, `^{...}` a superscript run, everything else a plain
/// run in the configured footnote font.
pub fn styled_runs(text: &str, config: &ReportConfig) -> Vec<Run> {
    if !text.contains("_{") && !text.contains("^{") {
        return vec![footnote_run(text, None, config)];
    }

    let mut runs = Vec::new();
    let mut last = 0;

    for found in INLINE_MARKUP.find_iter(text) {
        if found.start() > last {
            runs.push(footnote_run(&text[last..found.start()], None, config));
        }
        let token = found.as_str();
        let inner = &token[2..token.len() - 1];
        let align = if token.starts_with("_{") {
            VerticalAlign::Subscript
        } else {
            VerticalAlign::Superscript
        };
        runs.push(footnote_run(inner, Some(align), config));
        last = found.end();
    }

    if last < text.len() {
        runs.push(footnote_run(&text[last..], None, config));
    }

    runs
}

fn footnote_run(text: &str, vertical_align: Option<VerticalAlign>, config: &ReportConfig) -> Run {
    Run {
        text: text.to_string(),
        font: Some(config.footnotes_font.clone()),
        size: Some(config.footnotes_font_size),
        vertical_align,
    }
}

/// Builds the footnote paragraph for one marker group: bookmark start,
/// one styled line per emitted field separated by hard breaks, bookmark
/// end.
pub fn build_footnote_paragraph(
    combined: &CombinedFootnote,
    artifact_group: &str,
    region_id: u32,
    config: &ReportConfig,
) -> Paragraph {
    let lines = render_lines(combined, config);
    let mut children = Vec::with_capacity(lines.len() * 2 + 2);

    children.push(ParagraphChild::BookmarkStart {
        id: region_id,
        name: footnote_bookmark_name(artifact_group),
    });

    let line_count = lines.len();
    for (index, line) in lines.into_iter().enumerate() {
        children.extend(styled_runs(&line, config).into_iter().map(ParagraphChild::Run));
        if index + 1 != line_count {
            children.push(ParagraphChild::Break);
        }
    }

    children.push(ParagraphChild::BookmarkEnd { id: region_id });

    Paragraph {
        children,
        ..Default::default()
    }
}

/// Injects the combined footnote immediately after `anchor_index`,
/// returning the new block's index.
pub fn inject_footnote(
    doc: &mut ReportDocument,
    anchor_index: usize,
    combined: &CombinedFootnote,
    artifact_group: &str,
    ids: &mut RegionIdAllocator,
    config: &ReportConfig,
) -> usize {
    let region_id = ids.allocate();
    let paragraph = build_footnote_paragraph(combined, artifact_group, region_id, config);
    doc.insert_after(anchor_index, Block::Paragraph(paragraph));
    anchor_index + 1
}

/// Removes every bookmark region whose name satisfies `matches`,
/// deleting the content strictly between the paired markers and the
/// markers themselves. A paragraph left without runs or drawings is
/// deleted too. Running this again after everything matched is a no-op.
pub fn remove_regions<F>(doc: &mut ReportDocument, matches: F) -> usize
where
    F: Fn(&str) -> bool,
{
    let mut removed = 0;

    while let Some((block_index, child_index, id)) = find_region_start(doc, &matches) {
        remove_one_region(doc, block_index, child_index, id);
        removed += 1;
    }

    if removed > 0 {
        debug!("Removed {} bookmark region(s)", removed);
    }
    removed
}

fn find_region_start<F>(doc: &ReportDocument, matches: &F) -> Option<(usize, usize, u32)>
where
    F: Fn(&str) -> bool,
{
    for (block_index, block) in doc.blocks.iter().enumerate() {
        let Some(paragraph) = block.as_paragraph() else {
            continue;
        };
        for (child_index, child) in paragraph.children.iter().enumerate() {
            if let ParagraphChild::BookmarkStart { id, name } = child {
                if matches(name) {
                    return Some((block_index, child_index, *id));
                }
            }
        }
    }
    None
}

fn remove_one_region(doc: &mut ReportDocument, start_block: usize, start_child: usize, id: u32) {
    // paired end in the same paragraph: splice the children
    if let Some(paragraph) = doc.blocks[start_block].as_paragraph_mut() {
        let end_child = paragraph.children[start_child + 1..]
            .iter()
            .position(|child| matches!(child, ParagraphChild::BookmarkEnd { id: end } if *end == id))
            .map(|offset| start_child + 1 + offset);
        if let Some(end_child) = end_child {
            paragraph.children.drain(start_child..=end_child);
            if paragraph.is_empty_of_content() {
                doc.remove(start_block);
            }
            return;
        }
    }

    // the end marker lives in a later block: clear the tail of the
    // start paragraph, drop the blocks in between, and clear the head
    // of the end paragraph
    let end_position = doc.blocks[start_block + 1..].iter().position(|block| {
        block.as_paragraph().is_some_and(|paragraph| {
            paragraph
                .children
                .iter()
                .any(|child| matches!(child, ParagraphChild::BookmarkEnd { id: end } if *end == id))
        })
    });
    let Some(offset) = end_position else {
        // unpaired start: drop the dangling marker alone
        if let Some(paragraph) = doc.blocks[start_block].as_paragraph_mut() {
            paragraph.children.remove(start_child);
        }
        return;
    };
    let end_block = start_block + 1 + offset;

    if let Some(paragraph) = doc.blocks[end_block].as_paragraph_mut() {
        let end_child = paragraph
            .children
            .iter()
            .position(|child| matches!(child, ParagraphChild::BookmarkEnd { id: end } if *end == id))
            .unwrap_or(0);
        paragraph.children.drain(..=end_child);
    }
    let drop_end_paragraph = doc.blocks[end_block]
        .as_paragraph()
        .is_some_and(Paragraph::is_empty_of_content);
    if drop_end_paragraph {
        doc.remove(end_block);
    }

    for index in (start_block + 1..end_block).rev() {
        doc.remove(index);
    }

    if let Some(paragraph) = doc.blocks[start_block].as_paragraph_mut() {
        paragraph.children.truncate(start_child);
        if paragraph.is_empty_of_content() {
            doc.remove(start_block);
        }
    }
}

/// Deletes every bookmark start/end marker in the document, keeping all
/// content. Returns the number of markers removed.
pub fn strip_bookmarks(doc: &mut ReportDocument) -> usize {
    let mut removed = 0;

    for block in &mut doc.blocks {
        let Some(paragraph) = block.as_paragraph_mut() else {
            continue;
        };
        let before = paragraph.children.len();
        paragraph.children.retain(|child| {
            !matches!(
                child,
                ParagraphChild::BookmarkStart { .. } | ParagraphChild::BookmarkEnd { .. }
            )
        });
        removed += before - paragraph.children.len();
    }

    removed
}
