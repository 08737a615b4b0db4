// SPDX-License-Identifier: AGPL-3.0-or-later
//! Block Model <-> editor-native conversion
//!
//! Conversion is total in both directions: unknown editor block types and
//! unmapped content degrade to a visible placeholder paragraph instead of
//! failing. Complex props travel as string wire forms (JSON blobs,
//! `"start-end"` ranges) and are structured again on entry.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::model::{
    block_types, EditorBlock, EditorContent, EditorInline, EditorTable, EditorTableRow, TextStyles,
};
use super::quotes::{self, QuoteMerger};
use crate::ast::{
    Block, BlockKind, ContainerType, Document, Inline, LineRange, MathDisplay, Table, TableCell,
    TableRow,
};
use crate::error::Result;
use crate::frontmatter::Frontmatter;
use crate::markdown::{MarkdownParser, MarkdownSerializer};

static LINE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)?-(\d+)?$").expect("regex"));

/// Convert a block sequence into the editor's flat form.
pub fn to_editor_blocks(blocks: &[Block]) -> Vec<EditorBlock> {
    let mut out = Vec::new();
    for block in blocks {
        match &block.kind {
            BlockKind::Quote { .. } => quotes::expand_quote(block, &mut out),
            _ => out.push(to_editor_block(block)),
        }
    }
    out
}

/// Convert an editor block sequence back into the Block Model, merging
/// grouped quote runs as it scans.
pub fn from_editor_blocks(nodes: &[EditorBlock]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut iter = nodes.iter().peekable();
    while let Some(node) = iter.next() {
        if node.block_type == block_types::QUOTE {
            let mut merger = QuoteMerger::start(node);
            while iter.peek().is_some_and(|next| merger.accepts(next)) {
                if let Some(next) = iter.next() {
                    merger.push(next);
                }
            }
            blocks.push(merger.finish());
        } else {
            blocks.push(from_editor_block(node));
        }
    }
    blocks
}

pub(crate) fn to_editor_block(block: &Block) -> EditorBlock {
    let mut node = match &block.kind {
        BlockKind::Paragraph { content } => {
            let mut node = EditorBlock::new(block_types::PARAGRAPH);
            node.content = EditorContent::Inline(inlines_to_editor(content));
            node
        }

        BlockKind::Heading { level, content } => {
            let mut node = EditorBlock::new(block_types::HEADING);
            node.set_prop("level", *level);
            node.content = EditorContent::Inline(inlines_to_editor(content));
            node
        }

        BlockKind::BulletListItem { content, children } => {
            list_item_node(block_types::BULLET_LIST_ITEM, content, children)
        }

        BlockKind::NumberedListItem { content, children } => {
            list_item_node(block_types::NUMBERED_LIST_ITEM, content, children)
        }

        BlockKind::CheckListItem {
            checked,
            content,
            children,
        } => {
            let mut node = list_item_node(block_types::CHECK_LIST_ITEM, content, children);
            node.set_prop("checked", *checked);
            node
        }

        BlockKind::CodeBlock { language, code } => {
            let mut node = EditorBlock::new(block_types::CODE_BLOCK);
            if let Some(language) = language {
                node.set_prop("language", language.clone());
            }
            node.content = EditorContent::Inline(vec![EditorInline::plain(code.clone())]);
            node
        }

        BlockKind::Table(table) => {
            let mut node = EditorBlock::new(block_types::TABLE);
            node.content = EditorContent::Table(table_to_editor(table));
            node
        }

        BlockKind::Image { url, alt } => {
            let mut node = EditorBlock::new(block_types::IMAGE);
            node.set_prop("url", url.clone());
            node.set_prop("alt", alt.clone());
            node
        }

        BlockKind::Quote { .. } => {
            unreachable!("quote blocks are expanded by to_editor_blocks")
        }

        BlockKind::ThematicBreak => EditorBlock::new(block_types::DIVIDER),

        BlockKind::Container {
            container_type,
            title,
            children,
        } => {
            let mut node = EditorBlock::new(block_types::CONTAINER);
            node.set_prop("containerType", container_type.keyword());
            if let Some(title) = title {
                node.set_prop("title", title.clone());
            }
            node.children = to_editor_blocks(children);
            node
        }

        BlockKind::Math { formula, display } => {
            let mut node = EditorBlock::new(block_types::MATH);
            node.set_prop("formula", formula.clone());
            node.set_prop(
                "display",
                match display {
                    MathDisplay::Inline => "inline",
                    MathDisplay::Block => "block",
                },
            );
            node
        }

        BlockKind::Diagram { source } => {
            let mut node = EditorBlock::new(block_types::DIAGRAM);
            node.set_prop("source", source.clone());
            node
        }

        BlockKind::ComponentTag {
            name,
            attributes,
            self_closing,
        } => {
            let mut node = EditorBlock::new(block_types::COMPONENT_TAG);
            node.set_prop("name", name.clone());
            node.set_prop(
                "attributes",
                serde_json::to_string(attributes).unwrap_or_default(),
            );
            node.set_prop("selfClosing", *self_closing);
            node
        }

        BlockKind::Include {
            path,
            line_range,
            region,
        } => {
            let mut node = EditorBlock::new(block_types::INCLUDE);
            node.set_prop("path", path.clone());
            if let Some(range) = line_range {
                node.set_prop("lineRange", line_range_to_string(range));
            }
            if let Some(region) = region {
                node.set_prop("region", region.clone());
            }
            node
        }

        BlockKind::RichCode {
            language,
            code,
            filename,
            highlight,
            show_line_numbers,
            start_line,
            tabs,
            active_tab,
        } => {
            let mut node = EditorBlock::new(block_types::RICH_CODE);
            node.set_prop("language", language.clone());
            if let Some(filename) = filename {
                node.set_prop("filename", filename.clone());
            }
            if let Some(highlight) = highlight {
                node.set_prop("highlight", highlight.clone());
            }
            node.set_prop("showLineNumbers", *show_line_numbers);
            node.set_prop("startLine", *start_line);
            if let Some(tabs) = tabs {
                node.set_prop("tabs", serde_json::to_string(tabs).unwrap_or_default());
            }
            node.set_prop("activeTabIndex", *active_tab as u64);
            node.content = EditorContent::Inline(vec![EditorInline::plain(code.clone())]);
            node
        }
    };

    node.id = block.id.clone();
    node
}

fn from_editor_block(node: &EditorBlock) -> Block {
    let kind = match node.block_type.as_str() {
        block_types::PARAGRAPH => BlockKind::Paragraph {
            content: inlines_from_editor(node.inline_content()),
        },

        block_types::HEADING => BlockKind::Heading {
            level: node.prop_u64("level").map_or(1, |l| l.clamp(1, 6) as u8),
            content: inlines_from_editor(node.inline_content()),
        },

        block_types::BULLET_LIST_ITEM => BlockKind::BulletListItem {
            content: inlines_from_editor(node.inline_content()),
            children: from_editor_blocks(&node.children),
        },

        block_types::NUMBERED_LIST_ITEM => BlockKind::NumberedListItem {
            content: inlines_from_editor(node.inline_content()),
            children: from_editor_blocks(&node.children),
        },

        block_types::CHECK_LIST_ITEM => BlockKind::CheckListItem {
            checked: node.prop_bool("checked"),
            content: inlines_from_editor(node.inline_content()),
            children: from_editor_blocks(&node.children),
        },

        block_types::CODE_BLOCK => BlockKind::CodeBlock {
            language: node
                .prop_str("language")
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            code: editor_plain_text(node.inline_content()),
        },

        block_types::TABLE => match &node.content {
            EditorContent::Table(table) => BlockKind::Table(table_from_editor(table)),
            _ => BlockKind::Table(Table {
                header: TableRow::default(),
                rows: Vec::new(),
            }),
        },

        block_types::IMAGE => BlockKind::Image {
            url: node.prop_str("url").unwrap_or_default().to_string(),
            alt: node.prop_str("alt").unwrap_or_default().to_string(),
        },

        block_types::DIVIDER => BlockKind::ThematicBreak,

        block_types::CONTAINER => BlockKind::Container {
            container_type: ContainerType::from_keyword_lossy(
                node.prop_str("containerType").unwrap_or_default(),
            ),
            title: node.prop_str("title").map(str::to_string),
            children: from_editor_blocks(&node.children),
        },

        block_types::MATH => BlockKind::Math {
            formula: node.prop_str("formula").unwrap_or_default().to_string(),
            display: match node.prop_str("display") {
                Some("inline") => MathDisplay::Inline,
                _ => MathDisplay::Block,
            },
        },

        block_types::DIAGRAM => BlockKind::Diagram {
            source: node.prop_str("source").unwrap_or_default().to_string(),
        },

        block_types::COMPONENT_TAG => BlockKind::ComponentTag {
            name: node.prop_str("name").unwrap_or_default().to_string(),
            attributes: node
                .prop_str("attributes")
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default(),
            self_closing: node.prop_bool("selfClosing"),
        },

        block_types::INCLUDE => BlockKind::Include {
            path: node.prop_str("path").unwrap_or_default().to_string(),
            line_range: node.prop_str("lineRange").and_then(parse_line_range),
            region: node.prop_str("region").map(str::to_string),
        },

        block_types::RICH_CODE => BlockKind::RichCode {
            language: node.prop_str("language").unwrap_or_default().to_string(),
            code: editor_plain_text(node.inline_content()),
            filename: node.prop_str("filename").map(str::to_string),
            highlight: node.prop_str("highlight").map(str::to_string),
            show_line_numbers: node.prop_bool("showLineNumbers"),
            start_line: node.prop_u64("startLine").unwrap_or(1) as u32,
            tabs: node
                .prop_str("tabs")
                .and_then(|raw| serde_json::from_str(raw).ok()),
            active_tab: node.prop_u64("activeTabIndex").unwrap_or(0) as usize,
        },

        unknown => {
            warn!(block_type = unknown, "unsupported editor block type");
            BlockKind::Paragraph {
                content: vec![Inline::text(format!("[unsupported block: {}]", unknown))],
            }
        }
    };

    Block::with_id(node.id.clone(), kind)
}

fn list_item_node(block_type: &str, content: &[Inline], children: &[Block]) -> EditorBlock {
    let mut node = EditorBlock::new(block_type);
    node.content = EditorContent::Inline(inlines_to_editor(content));
    node.children = to_editor_blocks(children);
    node
}

fn line_range_to_string(range: &LineRange) -> String {
    format!(
        "{}-{}",
        range.start.map(|v| v.to_string()).unwrap_or_default(),
        range.end.map(|v| v.to_string()).unwrap_or_default(),
    )
}

fn parse_line_range(raw: &str) -> Option<LineRange> {
    let caps = LINE_RANGE.captures(raw)?;
    Some(LineRange {
        start: caps.get(1).and_then(|m| m.as_str().parse().ok()),
        end: caps.get(2).and_then(|m| m.as_str().parse().ok()),
    })
}

/// Flatten the inline tree into styled runs, pushing the accumulated style
/// flags down to the leaves.
pub(crate) fn inlines_to_editor(content: &[Inline]) -> Vec<EditorInline> {
    let mut out = Vec::new();
    flatten_inlines(content, TextStyles::default(), &mut out);
    out
}

fn flatten_inlines(content: &[Inline], styles: TextStyles, out: &mut Vec<EditorInline>) {
    for inline in content {
        match inline {
            Inline::Text { text } => out.push(EditorInline::Text {
                text: text.clone(),
                styles,
            }),
            Inline::Strong { children } => {
                flatten_inlines(children, TextStyles { bold: true, ..styles }, out)
            }
            Inline::Emphasis { children } => flatten_inlines(
                children,
                TextStyles {
                    italic: true,
                    ..styles
                },
                out,
            ),
            Inline::Code { code } => out.push(EditorInline::Text {
                text: code.clone(),
                styles: TextStyles {
                    code: true,
                    ..styles
                },
            }),
            Inline::Link { href, children } => {
                let mut inner = Vec::new();
                flatten_inlines(children, styles, &mut inner);
                out.push(EditorInline::Link {
                    href: href.clone(),
                    content: inner,
                });
            }
            Inline::Math { formula } => out.push(EditorInline::InlineMath {
                formula: formula.clone(),
            }),
        }
    }
}

/// Rebuild the inline tree from styled runs; nesting order is fixed as
/// strong > emphasis > leaf so the mapping is its own inverse.
pub(crate) fn inlines_from_editor(runs: &[EditorInline]) -> Vec<Inline> {
    runs.iter()
        .map(|run| match run {
            EditorInline::Text { text, styles } => {
                let mut inline = if styles.code {
                    Inline::Code { code: text.clone() }
                } else {
                    Inline::Text { text: text.clone() }
                };
                if styles.italic {
                    inline = Inline::Emphasis {
                        children: vec![inline],
                    };
                }
                if styles.bold {
                    inline = Inline::Strong {
                        children: vec![inline],
                    };
                }
                inline
            }
            EditorInline::Link { href, content } => Inline::Link {
                href: href.clone(),
                children: inlines_from_editor(content),
            },
            EditorInline::InlineMath { formula } => Inline::Math {
                formula: formula.clone(),
            },
        })
        .collect()
}

fn editor_plain_text(runs: &[EditorInline]) -> String {
    runs.iter()
        .map(|run| match run {
            EditorInline::Text { text, .. } => text.clone(),
            EditorInline::Link { content, .. } => editor_plain_text(content),
            EditorInline::InlineMath { formula } => formula.clone(),
        })
        .collect()
}

fn table_to_editor(table: &Table) -> EditorTable {
    let mut rows = Vec::with_capacity(table.rows.len() + 1);
    rows.push(row_to_editor(&table.header));
    rows.extend(table.rows.iter().map(row_to_editor));
    EditorTable { rows }
}

fn row_to_editor(row: &TableRow) -> EditorTableRow {
    EditorTableRow {
        cells: row
            .cells
            .iter()
            .map(|cell| inlines_to_editor(&cell.content))
            .collect(),
    }
}

fn table_from_editor(table: &EditorTable) -> Table {
    let mut rows = table.rows.iter();
    let header = rows.next().map(row_from_editor).unwrap_or_default();
    Table {
        header,
        rows: rows.map(row_from_editor).collect(),
    }
}

fn row_from_editor(row: &EditorTableRow) -> TableRow {
    TableRow {
        cells: row
            .cells
            .iter()
            .map(|cell| TableCell {
                content: inlines_from_editor(cell),
            })
            .collect(),
    }
}

/// Orchestration facade composing parser, adapter and serializer.
pub struct EditorBridge {
    parser: MarkdownParser,
    serializer: MarkdownSerializer,
}

impl EditorBridge {
    pub fn new() -> Self {
        Self {
            parser: MarkdownParser::new(),
            serializer: MarkdownSerializer::new(),
        }
    }

    pub fn with_components(parser: MarkdownParser, serializer: MarkdownSerializer) -> Self {
        Self { parser, serializer }
    }

    /// Parse markup straight into editor-native blocks.
    pub fn load(&self, markup: &str) -> Vec<EditorBlock> {
        to_editor_blocks(&self.parser.parse(markup))
    }

    /// Parse a whole file: detached frontmatter plus editor-native blocks.
    pub fn load_document(&self, markup: &str, path: &str) -> (Option<Frontmatter>, Vec<EditorBlock>) {
        let doc = self.parser.parse_document(markup, path);
        (doc.frontmatter, to_editor_blocks(&doc.blocks))
    }

    /// Collect the editor's blocks back into markup, prefixing frontmatter
    /// when given.
    pub fn save(&self, nodes: &[EditorBlock], frontmatter: Option<&Frontmatter>) -> Result<String> {
        let mut doc = Document::new(from_editor_blocks(nodes));
        doc.frontmatter = frontmatter.cloned();
        self.serializer.serialize_document(&doc)
    }
}

impl Default for EditorBridge {
    fn default() -> Self {
        Self::new()
    }
}
