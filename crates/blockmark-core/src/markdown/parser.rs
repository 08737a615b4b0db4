// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markup text -> Block Model
//!
//! The baseline grammar (paragraphs, headings, emphasis, lists, tables,
//! links) is delegated to comrak; a line-level segmenter first carves the
//! custom directive regions (containers, code groups, block math, component
//! tags, include comments, fenced code) out of the source so they never
//! reach comrak at all. Malformed directive syntax always degrades to the
//! nearest generic construct; this parser does not fail on user content.

use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, Options};
use tracing::debug;

use crate::ast::{
    Block, BlockKind, CodeTab, ContainerType, Document, Inline, MathDisplay, Table, TableCell,
    TableRow,
};
use crate::frontmatter::{split_frontmatter, Frontmatter};
use crate::markdown::directives;

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Fence language tags treated as diagram sources (body kept verbatim).
    pub diagram_keywords: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            diagram_keywords: vec!["mermaid".to_string()],
        }
    }
}

/// Markdown dialect parser.
pub struct MarkdownParser {
    options: ParseOptions,
}

impl MarkdownParser {
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self { options }
    }

    fn comrak_options() -> Options<'static> {
        let mut options = Options::default();
        options.extension.table = true;
        options.extension.tasklist = true;
        options
    }

    /// Parse markup into a block sequence.
    pub fn parse(&self, markup: &str) -> Vec<Block> {
        let lines: Vec<&str> = markup.lines().collect();
        let mut blocks: Vec<Block> = Vec::new();
        let mut plain: Vec<&str> = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            // Container or code group.
            if let Some((keyword, title)) = directives::container_open(line) {
                if keyword == "code-group" {
                    if let Some(close) = find_container_close(&lines, i) {
                        if let Some(tabs) = parse_code_group(&lines[i + 1..close]) {
                            self.flush_plain(&mut plain, &mut blocks);
                            blocks.push(Block::new(rich_code_from_tabs(tabs)));
                            i = close + 1;
                            continue;
                        }
                    }
                    debug!(line = i + 1, "degrading malformed code-group");
                } else if let Some(container_type) = ContainerType::from_keyword(&keyword) {
                    if let Some(close) = find_container_close(&lines, i) {
                        self.flush_plain(&mut plain, &mut blocks);
                        let children = self.parse(&lines[i + 1..close].join("\n"));
                        blocks.push(Block::new(BlockKind::Container {
                            container_type,
                            title,
                            children,
                        }));
                        i = close + 1;
                        continue;
                    }
                    debug!(line = i + 1, "degrading unterminated container");
                } else {
                    debug!(%keyword, "degrading unrecognized container type");
                }
                plain.push(line);
                i += 1;
                continue;
            }

            // Fenced code: generic, diagram, or rich.
            if let Some((marker, info)) = directives::fence_open(line) {
                self.flush_plain(&mut plain, &mut blocks);
                let mut j = i + 1;
                let mut body = Vec::new();
                while j < lines.len() && !directives::fence_close(lines[j], &marker) {
                    body.push(lines[j]);
                    j += 1;
                }
                blocks.push(Block::new(self.fence_block(&info, body.join("\n"))));
                i = if j < lines.len() { j + 1 } else { j };
                continue;
            }

            // Block math.
            if let Some(formula) = directives::math_single_line(line) {
                self.flush_plain(&mut plain, &mut blocks);
                blocks.push(Block::new(BlockKind::Math {
                    formula,
                    display: MathDisplay::Block,
                }));
                i += 1;
                continue;
            }
            if directives::is_math_fence(line) {
                if let Some(close) =
                    (i + 1..lines.len()).find(|&j| directives::is_math_fence(lines[j]))
                {
                    self.flush_plain(&mut plain, &mut blocks);
                    blocks.push(Block::new(BlockKind::Math {
                        formula: lines[i + 1..close].join("\n").trim().to_string(),
                        display: MathDisplay::Block,
                    }));
                    i = close + 1;
                    continue;
                }
                debug!(line = i + 1, "degrading unterminated math fence");
                plain.push(line);
                i += 1;
                continue;
            }

            // Component tags.
            if let Some((name, attributes)) = directives::component_self_closing(line) {
                self.flush_plain(&mut plain, &mut blocks);
                blocks.push(Block::new(BlockKind::ComponentTag {
                    name,
                    attributes,
                    self_closing: true,
                }));
                i += 1;
                continue;
            }
            if let Some((name, attributes)) = directives::component_open(line) {
                if let Some(close) =
                    (i + 1..lines.len()).find(|&j| directives::component_close(lines[j], &name))
                {
                    self.flush_plain(&mut plain, &mut blocks);
                    // Paired-tag body is not modeled; it is dropped here.
                    blocks.push(Block::new(BlockKind::ComponentTag {
                        name,
                        attributes,
                        self_closing: false,
                    }));
                    i = close + 1;
                    continue;
                }
                debug!(%name, "degrading unterminated component tag");
                plain.push(line);
                i += 1;
                continue;
            }

            // Include directives.
            if let Some(target) = directives::include_comment(line) {
                if let Some((path, line_range, region)) = directives::parse_include_target(&target)
                {
                    self.flush_plain(&mut plain, &mut blocks);
                    blocks.push(Block::new(BlockKind::Include {
                        path,
                        line_range,
                        region,
                    }));
                    i += 1;
                    continue;
                }
                debug!(%target, "degrading include with unparsable range");
                plain.push(line);
                i += 1;
                continue;
            }

            plain.push(line);
            i += 1;
        }

        self.flush_plain(&mut plain, &mut blocks);
        blocks
    }

    /// Parse a whole document, detaching leading frontmatter.
    ///
    /// Total like `parse`: malformed frontmatter degrades to "none" and the
    /// delimiter lines stay part of the body.
    pub fn parse_document(&self, markup: &str, path: &str) -> Document {
        let (frontmatter, body) = match split_frontmatter(markup) {
            Some((yaml, body)) => match Frontmatter::parse(&yaml) {
                Ok(fm) => (Some(fm), body),
                Err(err) => {
                    debug!(%err, "degrading malformed frontmatter");
                    (None, markup.to_string())
                }
            },
            None => (None, markup.to_string()),
        };
        Document {
            path: Some(path.to_string()),
            frontmatter,
            blocks: self.parse(&body),
        }
    }

    fn flush_plain(&self, plain: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        if plain.iter().any(|l| !l.trim().is_empty()) {
            blocks.extend(self.parse_gfm(&plain.join("\n")));
        }
        plain.clear();
    }

    fn parse_gfm(&self, text: &str) -> Vec<Block> {
        let arena = Arena::new();
        let root = comrak::parse_document(&arena, text, &Self::comrak_options());
        translate_children(root, &self.options)
    }

    fn fence_block(&self, info: &str, code: String) -> BlockKind {
        let fi = directives::parse_fence_info(info);
        if let Some(language) = &fi.language {
            if self.options.diagram_keywords.iter().any(|k| k == language) {
                return BlockKind::Diagram { source: code };
            }
        }
        if fi.filename.is_some() || fi.highlight.is_some() {
            return BlockKind::RichCode {
                language: fi.language.unwrap_or_default(),
                code,
                filename: fi.filename,
                highlight: fi.highlight,
                show_line_numbers: false,
                start_line: 1,
                tabs: None,
                active_tab: 0,
            };
        }
        BlockKind::CodeBlock {
            language: fi.language,
            code,
        }
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the `:::` line closing the container opened at `open_idx`, skipping
/// nested containers and fenced code.
fn find_container_close(lines: &[&str], open_idx: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut fence: Option<String> = None;
    for (offset, line) in lines[open_idx + 1..].iter().enumerate() {
        if let Some(marker) = &fence {
            if directives::fence_close(line, marker) {
                fence = None;
            }
        } else if let Some((marker, _)) = directives::fence_open(line) {
            fence = Some(marker);
        } else if directives::is_container_close(line) {
            depth -= 1;
            if depth == 0 {
                return Some(open_idx + 1 + offset);
            }
        } else if directives::container_open(line).is_some() {
            depth += 1;
        }
    }
    None
}

/// Collect the fenced blocks of a `::: code-group` body into tabs.
fn parse_code_group(lines: &[&str]) -> Option<Vec<CodeTab>> {
    let mut tabs = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if let Some((marker, info)) = directives::fence_open(lines[i]) {
            let fi = directives::parse_fence_info(&info);
            let mut j = i + 1;
            let mut body = Vec::new();
            while j < lines.len() && !directives::fence_close(lines[j], &marker) {
                body.push(lines[j]);
                j += 1;
            }
            tabs.push(CodeTab {
                language: fi.language.unwrap_or_default(),
                filename: fi.filename,
                code: body.join("\n"),
            });
            i = if j < lines.len() { j + 1 } else { j };
        } else {
            // Stray prose between fences is ignored.
            i += 1;
        }
    }
    if tabs.is_empty() {
        None
    } else {
        Some(tabs)
    }
}

fn rich_code_from_tabs(tabs: Vec<CodeTab>) -> BlockKind {
    let first = &tabs[0];
    BlockKind::RichCode {
        language: first.language.clone(),
        code: first.code.clone(),
        filename: first.filename.clone(),
        highlight: None,
        show_line_numbers: false,
        start_line: 1,
        tabs: Some(tabs),
        active_tab: 0,
    }
}

fn translate_children<'a>(node: &'a AstNode<'a>, opts: &ParseOptions) -> Vec<Block> {
    node.children()
        .flat_map(|child| translate_node(child, opts))
        .collect()
}

fn translate_node<'a>(node: &'a AstNode<'a>, opts: &ParseOptions) -> Vec<Block> {
    let data = node.data.borrow();

    match &data.value {
        NodeValue::Document => Vec::new(),

        NodeValue::Paragraph => translate_paragraph(node),

        NodeValue::Heading(heading) => vec![Block::new(BlockKind::Heading {
            level: heading.level,
            content: translate_inlines(node),
        })],

        // Only fences nested in quotes or list items reach comrak; top-level
        // fences are consumed by the segmenter.
        NodeValue::CodeBlock(code) => {
            let body = code.literal.strip_suffix('\n').unwrap_or(&code.literal);
            let fi = directives::parse_fence_info(&code.info);
            if let Some(language) = &fi.language {
                if opts.diagram_keywords.iter().any(|k| k == language) {
                    return vec![Block::new(BlockKind::Diagram {
                        source: body.to_string(),
                    })];
                }
            }
            if fi.filename.is_some() || fi.highlight.is_some() {
                return vec![Block::new(BlockKind::RichCode {
                    language: fi.language.unwrap_or_default(),
                    code: body.to_string(),
                    filename: fi.filename,
                    highlight: fi.highlight,
                    show_line_numbers: false,
                    start_line: 1,
                    tabs: None,
                    active_tab: 0,
                })];
            }
            vec![Block::new(BlockKind::CodeBlock {
                language: fi.language,
                code: body.to_string(),
            })]
        }

        NodeValue::BlockQuote => {
            let mut children = translate_children(node, opts);
            if children.is_empty() {
                children.push(Block::empty_paragraph());
            }
            vec![Block::new(BlockKind::Quote { children })]
        }

        NodeValue::List(list) => translate_list(node, list, opts),

        NodeValue::Item(_) | NodeValue::TaskItem(_) => Vec::new(), // handled by List

        NodeValue::ThematicBreak => vec![Block::new(BlockKind::ThematicBreak)],

        NodeValue::Table(_) => {
            let mut header: Option<TableRow> = None;
            let mut rows = Vec::new();
            for child in node.children() {
                if let NodeValue::TableRow(is_header) = &child.data.borrow().value {
                    let cells = child
                        .children()
                        .map(|cell| TableCell {
                            content: translate_inlines(cell),
                        })
                        .collect();
                    let row = TableRow { cells };
                    if *is_header && header.is_none() {
                        header = Some(row);
                    } else {
                        rows.push(row);
                    }
                }
            }
            vec![Block::new(BlockKind::Table(Table {
                header: header.unwrap_or_default(),
                rows,
            }))]
        }

        NodeValue::HtmlBlock(html) => vec![html_to_block(&html.literal)],

        _ => Vec::new(),
    }
}

fn translate_paragraph<'a>(node: &'a AstNode<'a>) -> Vec<Block> {
    let children: Vec<_> = node.children().collect();

    // A paragraph whose only inline is an image becomes an image block.
    if children.len() == 1 {
        if let NodeValue::Image(link) = &children[0].data.borrow().value {
            return vec![Block::new(BlockKind::Image {
                url: link.url.clone(),
                alt: collect_text(children[0]),
            })];
        }
    }

    // `$$...$$` as the entire paragraph (e.g. inside a quote) is block math.
    if let Some(raw) = text_only_content(&children) {
        if let Some(formula) = directives::math_paragraph(&raw) {
            return vec![Block::new(BlockKind::Math {
                formula,
                display: MathDisplay::Block,
            })];
        }
    }

    vec![Block::paragraph(translate_inlines(node))]
}

/// Joined text of a paragraph made only of text runs and soft breaks.
fn text_only_content<'a>(children: &[&'a AstNode<'a>]) -> Option<String> {
    let mut raw = String::new();
    for child in children {
        match &child.data.borrow().value {
            NodeValue::Text(text) => raw.push_str(text),
            NodeValue::SoftBreak => raw.push('\n'),
            _ => return None,
        }
    }
    Some(raw)
}

fn translate_list<'a>(
    node: &'a AstNode<'a>,
    list: &comrak::nodes::NodeList,
    opts: &ParseOptions,
) -> Vec<Block> {
    let ordered = list.list_type == comrak::nodes::ListType::Ordered;

    node.children()
        .map(|item| {
            let checked = match &item.data.borrow().value {
                NodeValue::TaskItem(symbol) => Some(symbol.is_some()),
                _ => None,
            };

            let mut content = Vec::new();
            let mut children = Vec::new();
            let mut leading = true;
            for child in item.children() {
                let is_paragraph = matches!(&child.data.borrow().value, NodeValue::Paragraph);
                if leading && is_paragraph {
                    content = translate_inlines(child);
                    leading = false;
                } else {
                    children.extend(translate_node(child, opts));
                }
            }

            let kind = match checked {
                Some(checked) => BlockKind::CheckListItem {
                    checked,
                    content,
                    children,
                },
                None if ordered => BlockKind::NumberedListItem { content, children },
                None => BlockKind::BulletListItem { content, children },
            };
            Block::new(kind)
        })
        .collect()
}

fn translate_inlines<'a>(node: &'a AstNode<'a>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::new();
    for child in node.children() {
        for inline in translate_inline(child) {
            match (out.last_mut(), &inline) {
                (Some(Inline::Text { text }), Inline::Text { text: next }) => {
                    text.push_str(next);
                }
                _ => out.push(inline),
            }
        }
    }
    out
}

fn translate_inline<'a>(node: &'a AstNode<'a>) -> Vec<Inline> {
    let data = node.data.borrow();

    match &data.value {
        NodeValue::Text(text) => directives::split_inline_math(text),

        NodeValue::SoftBreak | NodeValue::LineBreak => vec![Inline::text("\n")],

        NodeValue::Code(code) => vec![Inline::Code {
            code: code.literal.clone(),
        }],

        NodeValue::Emph => vec![Inline::Emphasis {
            children: translate_inlines(node),
        }],

        NodeValue::Strong => vec![Inline::Strong {
            children: translate_inlines(node),
        }],

        NodeValue::Link(link) => vec![Inline::Link {
            href: link.url.clone(),
            children: translate_inlines(node),
        }],

        // Inline images mixed with text keep their literal markup.
        NodeValue::Image(link) => vec![Inline::text(format!(
            "![{}]({})",
            collect_text(node),
            link.url
        ))],

        NodeValue::HtmlInline(html) => vec![Inline::text(html.clone())],

        _ => Vec::new(),
    }
}

fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    node.children()
        .filter_map(|child| {
            if let NodeValue::Text(text) = &child.data.borrow().value {
                Some(text.clone())
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Re-run the directive recognizers on an HTML block that comrak produced
/// inside a nested context (quote, list item); anything unrecognized
/// degrades to a paragraph holding the raw text.
fn html_to_block(literal: &str) -> Block {
    let trimmed = literal.trim();

    if let Some(target) = directives::include_comment(trimmed) {
        if let Some((path, line_range, region)) = directives::parse_include_target(&target) {
            return Block::new(BlockKind::Include {
                path,
                line_range,
                region,
            });
        }
    }
    if let Some((name, attributes)) = directives::component_self_closing(trimmed) {
        return Block::new(BlockKind::ComponentTag {
            name,
            attributes,
            self_closing: true,
        });
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() >= 2 {
        if let Some((name, attributes)) = directives::component_open(lines[0]) {
            if directives::component_close(lines[lines.len() - 1], &name) {
                return Block::new(BlockKind::ComponentTag {
                    name,
                    attributes,
                    self_closing: false,
                });
            }
        }
    }

    debug!("degrading unrecognized html block to paragraph");
    Block::paragraph(vec![Inline::text(trimmed)])
}
