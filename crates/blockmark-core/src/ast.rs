// SPDX-License-Identifier: AGPL-3.0-or-later
//! The Block Model: typed document tree for the transcoding engine
//!
//! Every markup construct and every editor-native node maps onto exactly one
//! variant here. The tree is pure data; parsing, serializing and editor
//! conversion live in their own modules.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::frontmatter::Frontmatter;

/// One structural unit of a document.
///
/// The `id` exists only to correlate a block with its editor-side
/// counterpart. It never participates in content identity: two blocks with
/// equal `kind` and different `id` compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(flatten)]
    pub kind: BlockKind,
}

impl Block {
    /// Create a block with a freshly generated identifier.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
        }
    }

    /// Create a block with a caller-supplied identifier.
    pub fn with_id(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// A paragraph block holding the given inline content.
    pub fn paragraph(content: Vec<Inline>) -> Self {
        Self::new(BlockKind::Paragraph { content })
    }

    /// The canonical empty paragraph used to normalize childless quotes.
    pub fn empty_paragraph() -> Self {
        Self::paragraph(Vec::new())
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Block {}

/// Block-level variants (structural).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph {
        content: Vec<Inline>,
    },

    /// Heading with level 1-6
    Heading {
        level: u8,
        content: Vec<Inline>,
    },

    /// One item of a bulleted list; sibling items are separate blocks
    BulletListItem {
        content: Vec<Inline>,
        children: Vec<Block>,
    },

    /// One item of a numbered list
    NumberedListItem {
        content: Vec<Inline>,
        children: Vec<Block>,
    },

    /// One item of a checklist
    CheckListItem {
        checked: bool,
        content: Vec<Inline>,
        children: Vec<Block>,
    },

    /// Plain fenced code block
    CodeBlock {
        language: Option<String>,
        code: String,
    },

    Table(Table),

    /// Standalone image (a paragraph whose only inline was an image)
    Image {
        url: String,
        alt: String,
    },

    /// Block quote owning its children; a childless quote is normalized to
    /// one empty paragraph child on both parse and merge
    Quote {
        children: Vec<Block>,
    },

    ThematicBreak,

    /// Fenced callout directive (`::: tip` .. `:::`)
    Container {
        container_type: ContainerType,
        title: Option<String>,
        children: Vec<Block>,
    },

    /// Display or inline formula promoted to block level
    Math {
        formula: String,
        display: MathDisplay,
    },

    /// Fenced diagram source, body kept verbatim
    Diagram {
        source: String,
    },

    /// HTML-like framework component tag (`<Name attr="v" />`)
    ComponentTag {
        name: String,
        attributes: Vec<TagAttribute>,
        self_closing: bool,
    },

    /// File-include comment directive
    Include {
        path: String,
        line_range: Option<LineRange>,
        region: Option<String>,
    },

    /// Code block with presentation extras and optional multi-file tabs
    RichCode {
        language: String,
        code: String,
        filename: Option<String>,
        highlight: Option<String>,
        show_line_numbers: bool,
        start_line: u32,
        tabs: Option<Vec<CodeTab>>,
        active_tab: usize,
    },
}

/// Inline variants (character-level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    /// Plain text run
    Text { text: String },

    /// Strong emphasis (bold)
    Strong { children: Vec<Inline> },

    /// Emphasis (italic)
    Emphasis { children: Vec<Inline> },

    /// Inline code span
    Code { code: String },

    Link { href: String, children: Vec<Inline> },

    /// Inline formula (`$...$`)
    Math { formula: String },
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text { text: text.into() }
    }

    /// Concatenated plain text of this inline and its descendants.
    pub fn plain_text(&self) -> String {
        match self {
            Inline::Text { text } => text.clone(),
            Inline::Strong { children } | Inline::Emphasis { children } => {
                children.iter().map(Inline::plain_text).collect()
            }
            Inline::Code { code } => code.clone(),
            Inline::Link { children, .. } => children.iter().map(Inline::plain_text).collect(),
            Inline::Math { formula } => formula.clone(),
        }
    }
}

/// The five recognized callout types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerType {
    Tip,
    Info,
    Warning,
    Danger,
    Details,
}

impl ContainerType {
    /// Directive keyword as written in markup.
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Tip => "tip",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Details => "details",
        }
    }

    /// Exact-match lookup; the parser rejects anything else.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "tip" => Some(Self::Tip),
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "danger" => Some(Self::Danger),
            "details" => Some(Self::Details),
            _ => None,
        }
    }

    /// Lenient lookup for editor-produced strings; unrecognized input maps
    /// to `Tip`.
    pub fn from_keyword_lossy(s: &str) -> Self {
        Self::from_keyword(s).unwrap_or(Self::Tip)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathDisplay {
    Inline,
    Block,
}

/// One component-tag attribute; `value: None` renders as a bare attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAttribute {
    pub name: String,
    pub value: Option<String>,
}

impl TagAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// Include-directive line range; either bound may be absent (`{3-}`, `{-10}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

/// One tab of a multi-file code group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTab {
    pub language: String,
    pub filename: Option<String>,
    pub code: String,
}

/// Header row plus data rows; the parser produces equal cell counts, the
/// serializer assumes but does not enforce this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub header: TableRow,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCell {
    pub content: Vec<Inline>,
}

impl TableCell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Inline::text(text)],
        }
    }
}

/// One loaded document: source path, detached frontmatter, block sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub path: Option<String>,
    pub frontmatter: Option<Frontmatter>,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            path: None,
            frontmatter: None,
            blocks,
        }
    }

    /// Count words across the block tree.
    pub fn word_count(&self) -> usize {
        self.blocks.iter().map(block_word_count).sum()
    }

    /// Count characters across the block tree.
    pub fn char_count(&self) -> usize {
        self.blocks.iter().map(block_char_count).sum()
    }
}

fn block_word_count(block: &Block) -> usize {
    let inline_words =
        |content: &[Inline]| -> usize { content.iter().map(inline_word_count).sum() };
    match &block.kind {
        BlockKind::Paragraph { content } | BlockKind::Heading { content, .. } => {
            inline_words(content)
        }
        BlockKind::BulletListItem { content, children }
        | BlockKind::NumberedListItem { content, children }
        | BlockKind::CheckListItem {
            content, children, ..
        } => inline_words(content) + children.iter().map(block_word_count).sum::<usize>(),
        BlockKind::CodeBlock { code, .. } => code.unicode_words().count(),
        BlockKind::Table(table) => {
            let row_words = |row: &TableRow| -> usize {
                row.cells.iter().map(|c| inline_words(&c.content)).sum()
            };
            row_words(&table.header) + table.rows.iter().map(row_words).sum::<usize>()
        }
        BlockKind::Quote { children } | BlockKind::Container { children, .. } => {
            children.iter().map(block_word_count).sum()
        }
        BlockKind::RichCode { code, .. } => code.unicode_words().count(),
        _ => 0,
    }
}

fn block_char_count(block: &Block) -> usize {
    let inline_chars = |content: &[Inline]| -> usize {
        content.iter().map(|i| i.plain_text().chars().count()).sum()
    };
    match &block.kind {
        BlockKind::Paragraph { content } | BlockKind::Heading { content, .. } => {
            inline_chars(content)
        }
        BlockKind::BulletListItem { content, children }
        | BlockKind::NumberedListItem { content, children }
        | BlockKind::CheckListItem {
            content, children, ..
        } => inline_chars(content) + children.iter().map(block_char_count).sum::<usize>(),
        BlockKind::CodeBlock { code, .. } | BlockKind::RichCode { code, .. } => {
            code.chars().count()
        }
        BlockKind::Quote { children } | BlockKind::Container { children, .. } => {
            children.iter().map(block_char_count).sum()
        }
        _ => 0,
    }
}

fn inline_word_count(inline: &Inline) -> usize {
    match inline {
        Inline::Text { text } => text.unicode_words().count(),
        Inline::Strong { children } | Inline::Emphasis { children } => {
            children.iter().map(inline_word_count).sum()
        }
        Inline::Code { code } => code.unicode_words().count(),
        Inline::Link { children, .. } => children.iter().map(inline_word_count).sum(),
        Inline::Math { .. } => 0,
    }
}
