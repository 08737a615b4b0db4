// SPDX-License-Identifier: AGPL-3.0-or-later
//! Block Model -> markup text
//!
//! Exact inverse of the parser's mappings. Output is always terminated with
//! a single trailing newline; sibling list items of the same kind render
//! tight (no blank line), everything else is blank-line separated.

use crate::ast::{Block, BlockKind, Document, Inline, TagAttribute};
use crate::error::Result;

/// Serializer configuration.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Fence language tag used when rendering diagram blocks.
    pub diagram_keyword: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            diagram_keyword: "mermaid".to_string(),
        }
    }
}

/// Markdown dialect serializer.
pub struct MarkdownSerializer {
    options: SerializeOptions,
}

impl MarkdownSerializer {
    pub fn new() -> Self {
        Self::with_options(SerializeOptions::default())
    }

    pub fn with_options(options: SerializeOptions) -> Self {
        Self { options }
    }

    /// Render a block sequence to markup.
    pub fn serialize(&self, blocks: &[Block]) -> String {
        let body = self.render_blocks(blocks);
        if body.is_empty() {
            return String::new();
        }
        body + "\n"
    }

    /// Render a whole document, prefixing non-empty frontmatter.
    pub fn serialize_document(&self, doc: &Document) -> Result<String> {
        let body = self.serialize(&doc.blocks);
        match &doc.frontmatter {
            Some(fm) if !fm.is_empty() => {
                let mut out = fm.to_yaml_block()?;
                out.push('\n');
                out.push_str(&body);
                Ok(out)
            }
            _ => Ok(body),
        }
    }

    /// Render one block in isolation (live preview of a single edit).
    pub fn serialize_block(&self, block: &Block) -> String {
        self.serialize(std::slice::from_ref(block))
    }

    fn render_blocks(&self, blocks: &[Block]) -> String {
        let mut out = String::new();
        let mut number = 0u32;
        let mut prev: Option<&BlockKind> = None;

        for block in blocks {
            let tight = prev.is_some_and(|p| same_list_run(p, &block.kind));
            number = match &block.kind {
                BlockKind::NumberedListItem { .. } if tight => number + 1,
                BlockKind::NumberedListItem { .. } => 1,
                _ => 0,
            };

            let rendered = self.render_block(&block.kind, number);
            if rendered.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push_str(if tight { "\n" } else { "\n\n" });
            }
            out.push_str(&rendered);
            prev = Some(&block.kind);
        }
        out
    }

    fn render_block(&self, kind: &BlockKind, number: u32) -> String {
        match kind {
            BlockKind::Paragraph { content } => render_inlines(content),

            BlockKind::Heading { level, content } => {
                format!("{} {}", "#".repeat(*level as usize), render_inlines(content))
            }

            BlockKind::BulletListItem { content, children } => {
                let marker = "- ";
                format!(
                    "{}{}{}",
                    marker,
                    render_inlines(content),
                    self.render_list_children(children, marker.len())
                )
            }

            BlockKind::NumberedListItem { content, children } => {
                let marker = format!("{}. ", number.max(1));
                format!(
                    "{}{}{}",
                    marker,
                    render_inlines(content),
                    self.render_list_children(children, marker.len())
                )
            }

            BlockKind::CheckListItem {
                checked,
                content,
                children,
            } => {
                let marker = if *checked { "- [x] " } else { "- [ ] " };
                format!(
                    "{}{}{}",
                    marker,
                    render_inlines(content),
                    // Task markers are paragraph content; continuation stays
                    // at the list indent, not the marker width.
                    self.render_list_children(children, 2)
                )
            }

            BlockKind::CodeBlock { language, code } => {
                render_fence(language.as_deref().unwrap_or(""), None, None, code)
            }

            BlockKind::Table(table) => {
                let mut out = String::new();
                out.push_str(&render_table_row(&table.header.cells));
                out.push('\n');
                out.push('|');
                for _ in &table.header.cells {
                    out.push_str(" --- |");
                }
                for row in &table.rows {
                    out.push('\n');
                    out.push_str(&render_table_row(&row.cells));
                }
                out
            }

            BlockKind::Image { url, alt } => format!("![{}]({})", alt, url),

            BlockKind::Quote { children } => {
                let inner = self.render_blocks(children);
                if inner.is_empty() {
                    return ">".to_string();
                }
                inner
                    .lines()
                    .map(|line| {
                        if line.is_empty() {
                            ">".to_string()
                        } else {
                            format!("> {}", line)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }

            BlockKind::ThematicBreak => "---".to_string(),

            BlockKind::Container {
                container_type,
                title,
                children,
            } => {
                let mut out = format!(":::{}", container_type.keyword());
                if let Some(title) = title {
                    out.push(' ');
                    out.push_str(title);
                }
                out.push('\n');
                out.push_str(&self.render_blocks(children));
                out.push_str("\n:::");
                out
            }

            BlockKind::Math { formula, .. } => format!("$$\n{}\n$$", formula),

            BlockKind::Diagram { source } => {
                render_fence(&self.options.diagram_keyword, None, None, source)
            }

            BlockKind::ComponentTag {
                name,
                attributes,
                self_closing,
            } => {
                let attrs = render_attributes(attributes);
                if *self_closing {
                    format!("<{}{} />", name, attrs)
                } else {
                    format!("<{}{}>\n</{}>", name, attrs, name)
                }
            }

            BlockKind::Include {
                path,
                line_range,
                region,
            } => {
                let mut target = path.clone();
                if let Some(range) = line_range {
                    target.push_str(&format!(
                        "{{{}-{}}}",
                        range.start.map(|v| v.to_string()).unwrap_or_default(),
                        range.end.map(|v| v.to_string()).unwrap_or_default(),
                    ));
                } else if let Some(region) = region {
                    target.push('#');
                    target.push_str(region);
                }
                format!("<!--@include: {}-->", target)
            }

            BlockKind::RichCode {
                language,
                code,
                filename,
                highlight,
                tabs,
                ..
            } => match tabs {
                Some(tabs) if !tabs.is_empty() => {
                    let mut out = String::from("::: code-group\n");
                    let rendered: Vec<String> = tabs
                        .iter()
                        .map(|tab| {
                            render_fence(&tab.language, tab.filename.as_deref(), None, &tab.code)
                        })
                        .collect();
                    out.push_str(&rendered.join("\n"));
                    out.push_str("\n:::");
                    out
                }
                _ => render_fence(language, filename.as_deref(), highlight.as_deref(), code),
            },
        }
    }

    fn render_list_children(&self, children: &[Block], indent: usize) -> String {
        if children.is_empty() {
            return String::new();
        }
        let inner = self.render_blocks(children);
        if inner.is_empty() {
            return String::new();
        }
        let pad = " ".repeat(indent);
        let indented = inner
            .lines()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", pad, line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        // Nested list items continue directly; any other child block needs a
        // blank line so it does not merge into the item's paragraph.
        if is_list_item(&children[0].kind) {
            format!("\n{}", indented)
        } else {
            format!("\n\n{}", indented)
        }
    }
}

impl Default for MarkdownSerializer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_list_item(kind: &BlockKind) -> bool {
    matches!(
        kind,
        BlockKind::BulletListItem { .. }
            | BlockKind::NumberedListItem { .. }
            | BlockKind::CheckListItem { .. }
    )
}

fn same_list_run(a: &BlockKind, b: &BlockKind) -> bool {
    matches!(
        (a, b),
        (
            BlockKind::BulletListItem { .. },
            BlockKind::BulletListItem { .. }
        ) | (
            BlockKind::NumberedListItem { .. },
            BlockKind::NumberedListItem { .. }
        ) | (
            BlockKind::CheckListItem { .. },
            BlockKind::CheckListItem { .. }
        )
    )
}

/// Info string order is fixed: language, `[filename]`, `{highlight}`.
fn render_fence(language: &str, filename: Option<&str>, highlight: Option<&str>, code: &str) -> String {
    let mut info = language.to_string();
    if let Some(filename) = filename {
        if !info.is_empty() {
            info.push(' ');
        }
        info.push_str(&format!("[{}]", filename));
    }
    if let Some(highlight) = highlight {
        if !info.is_empty() {
            info.push(' ');
        }
        info.push_str(&format!("{{{}}}", highlight));
    }
    if code.is_empty() {
        format!("```{}\n```", info)
    } else {
        format!("```{}\n{}\n```", info, code)
    }
}

fn render_attributes(attributes: &[TagAttribute]) -> String {
    let mut out = String::new();
    for attr in attributes {
        out.push(' ');
        out.push_str(&attr.name);
        if let Some(value) = &attr.value {
            out.push_str(&format!("=\"{}\"", value));
        }
    }
    out
}

fn render_table_row(cells: &[crate::ast::TableCell]) -> String {
    let mut out = String::from("|");
    for cell in cells {
        out.push(' ');
        out.push_str(&render_inlines(&cell.content));
        out.push_str(" |");
    }
    out
}

fn render_inlines(content: &[Inline]) -> String {
    let mut out = String::new();
    for inline in content {
        render_inline(&mut out, inline);
    }
    out
}

fn render_inline(out: &mut String, inline: &Inline) {
    match inline {
        Inline::Text { text } => out.push_str(text),

        Inline::Strong { children } => {
            out.push_str("**");
            out.push_str(&render_inlines(children));
            out.push_str("**");
        }

        Inline::Emphasis { children } => {
            out.push('*');
            out.push_str(&render_inlines(children));
            out.push('*');
        }

        Inline::Code { code } => {
            out.push('`');
            out.push_str(code);
            out.push('`');
        }

        Inline::Link { href, children } => {
            out.push('[');
            out.push_str(&render_inlines(children));
            out.push_str("](");
            out.push_str(href);
            out.push(')');
        }

        Inline::Math { formula } => {
            out.push('$');
            out.push_str(formula);
            out.push('$');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CodeTab, ContainerType, LineRange, MathDisplay, Table, TableCell, TableRow};
    use crate::markdown::parser::MarkdownParser;
    use pretty_assertions::assert_eq;

    fn roundtrip(markup: &str) {
        let parser = MarkdownParser::new();
        let serializer = MarkdownSerializer::new();
        let rendered = serializer.serialize(&parser.parse(markup));
        assert_eq!(rendered, format!("{}\n", markup));
    }

    #[test]
    fn container_serializes_in_canonical_form() {
        let serializer = MarkdownSerializer::new();
        let block = Block::new(BlockKind::Container {
            container_type: ContainerType::Tip,
            title: None,
            children: vec![Block::paragraph(vec![Inline::text("Hello")])],
        });
        assert_eq!(serializer.serialize_block(&block), ":::tip\nHello\n:::\n");
    }

    #[test]
    fn table_has_separator_row() {
        let serializer = MarkdownSerializer::new();
        let block = Block::new(BlockKind::Table(Table {
            header: TableRow {
                cells: vec![TableCell::text("Header 1"), TableCell::text("Header 2")],
            },
            rows: vec![TableRow {
                cells: vec![TableCell::text("Cell 1"), TableCell::text("Cell 2")],
            }],
        }));
        let rendered = serializer.serialize_block(&block);
        assert_eq!(
            rendered,
            "| Header 1 | Header 2 |\n| --- | --- |\n| Cell 1 | Cell 2 |\n"
        );
    }

    #[test]
    fn math_block_renders_fenced() {
        let serializer = MarkdownSerializer::new();
        let block = Block::new(BlockKind::Math {
            formula: "E=mc^2".into(),
            display: MathDisplay::Block,
        });
        assert_eq!(serializer.serialize_block(&block), "$$\nE=mc^2\n$$\n");
    }

    #[test]
    fn include_variants() {
        let serializer = MarkdownSerializer::new();
        let plain = Block::new(BlockKind::Include {
            path: "./f.md".into(),
            line_range: None,
            region: None,
        });
        assert_eq!(
            serializer.serialize_block(&plain),
            "<!--@include: ./f.md-->\n"
        );
        let ranged = Block::new(BlockKind::Include {
            path: "./f.md".into(),
            line_range: Some(LineRange {
                start: Some(1),
                end: Some(5),
            }),
            region: None,
        });
        assert_eq!(
            serializer.serialize_block(&ranged),
            "<!--@include: ./f.md{1-5}-->\n"
        );
        let region = Block::new(BlockKind::Include {
            path: "./f.md".into(),
            line_range: None,
            region: Some("setup".into()),
        });
        assert_eq!(
            serializer.serialize_block(&region),
            "<!--@include: ./f.md#setup-->\n"
        );
    }

    #[test]
    fn code_group_wraps_tabs() {
        let serializer = MarkdownSerializer::new();
        let block = Block::new(BlockKind::RichCode {
            language: "js".into(),
            code: "const a = 1".into(),
            filename: Some("index.js".into()),
            highlight: None,
            show_line_numbers: false,
            start_line: 1,
            tabs: Some(vec![
                CodeTab {
                    language: "js".into(),
                    filename: Some("index.js".into()),
                    code: "const a = 1".into(),
                },
                CodeTab {
                    language: "ts".into(),
                    filename: Some("index.ts".into()),
                    code: "const a: number = 1".into(),
                },
            ]),
            active_tab: 0,
        });
        assert_eq!(
            serializer.serialize_block(&block),
            "::: code-group\n```js [index.js]\nconst a = 1\n```\n```ts [index.ts]\nconst a: number = 1\n```\n:::\n"
        );
    }

    #[test]
    fn roundtrips_common_constructs() {
        roundtrip("# Title\n\nplain **bold** *italic* `code` [link](https://a.example)");
        roundtrip("- a\n- b\n  - c");
        roundtrip("1. x\n2. y");
        roundtrip("- [ ] todo\n- [x] done");
        roundtrip("> one\n>\n> two");
        roundtrip("> outer\n>\n> > inner");
        roundtrip("| A | B |\n| --- | --- |\n| 1 | 2 |");
        roundtrip(":::tip\nHello\n:::");
        roundtrip(":::warning Careful\ntext\n:::");
        roundtrip("$$\nE=mc^2\n$$");
        roundtrip("```rust\nfn main() {}\n```");
        roundtrip("```ts [app.ts] {1,3}\nlet x = 1\n```");
        roundtrip("```mermaid\ngraph TD;\n```");
        roundtrip("<!--@include: ./f.md{1-5}-->");
        roundtrip("<Badge type=\"tip\" />");
        roundtrip("![logo](./logo.png)");
        roundtrip("---");
        roundtrip("the value $x+1$ grows");
        roundtrip("::: code-group\n```js [a.js]\nlet a\n```\n:::");
    }

    #[test]
    fn quote_nested_structures_roundtrip() {
        roundtrip("> - a\n> - b");
        roundtrip("> ```rust\n> let x = 1;\n> ```");
    }

    #[test]
    fn serialize_document_prefixes_frontmatter() {
        let parser = MarkdownParser::new();
        let serializer = MarkdownSerializer::new();
        let input = "---\ntitle: Test\n---\n\n# Hi\n";
        let doc = parser.parse_document(input, "a.md");
        assert_eq!(serializer.serialize_document(&doc).unwrap(), input);
    }

    #[test]
    fn empty_quote_renders_marker_only() {
        let serializer = MarkdownSerializer::new();
        let block = Block::new(BlockKind::Quote {
            children: vec![Block::empty_paragraph()],
        });
        assert_eq!(serializer.serialize_block(&block), ">\n");
    }
}
