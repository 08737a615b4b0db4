// SPDX-License-Identifier: AGPL-3.0-or-later
//! Round-trip properties of the transcoding engine
//!
//! The primary correctness property of the parser/serializer pair is
//! idempotence: serializing a parsed document must reproduce the serialized
//! form exactly. The editor adapter pair is checked the same way through
//! expand/merge and the inline style mapping.

use blockmark_core::ast::{
    Block, BlockKind, ContainerType, Inline, LineRange, MathDisplay, Table, TableCell, TableRow,
};
use blockmark_core::{from_editor_blocks, to_editor_blocks, MarkdownParser, MarkdownSerializer};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn reserialize(markup: &str) -> String {
    let parser = MarkdownParser::new();
    let serializer = MarkdownSerializer::new();
    serializer.serialize(&parser.parse(markup))
}

// Strategy for plain words: non-empty, no markup metacharacters, no
// leading or trailing whitespace.
fn word_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,8}"
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(word_strategy(), 1..4).prop_map(|words| words.join(" "))
}

fn formula_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9+^=]{0,8}"
}

// Inline sequences are generated with plain text between styled spans so
// adjacent delimiters never touch.
fn inline_content_strategy() -> impl Strategy<Value = Vec<Inline>> {
    let styled = prop_oneof![
        text_strategy().prop_map(|t| Inline::Strong {
            children: vec![Inline::text(t)]
        }),
        text_strategy().prop_map(|t| Inline::Emphasis {
            children: vec![Inline::text(t)]
        }),
        word_strategy().prop_map(|t| Inline::Code { code: t }),
        (word_strategy(), text_strategy()).prop_map(|(host, label)| Inline::Link {
            href: format!("https://{}.example", host),
            children: vec![Inline::text(label)],
        }),
        formula_strategy().prop_map(|formula| Inline::Math { formula }),
    ];
    prop_oneof![
        text_strategy().prop_map(|t| vec![Inline::text(t)]),
        (text_strategy(), styled, text_strategy()).prop_map(|(before, mid, after)| {
            vec![
                Inline::text(format!("{} ", before)),
                mid,
                Inline::text(format!(" {}", after)),
            ]
        }),
    ]
}

fn paragraph_strategy() -> impl Strategy<Value = Block> {
    inline_content_strategy().prop_map(|content| Block::new(BlockKind::Paragraph { content }))
}

fn heading_strategy() -> impl Strategy<Value = Block> {
    (1u8..=6, inline_content_strategy())
        .prop_map(|(level, content)| Block::new(BlockKind::Heading { level, content }))
}

fn container_type_strategy() -> impl Strategy<Value = ContainerType> {
    prop_oneof![
        Just(ContainerType::Tip),
        Just(ContainerType::Info),
        Just(ContainerType::Warning),
        Just(ContainerType::Danger),
        Just(ContainerType::Details),
    ]
}

fn container_strategy() -> impl Strategy<Value = Block> {
    (
        container_type_strategy(),
        proptest::option::of(text_strategy()),
        prop::collection::vec(paragraph_strategy(), 1..3),
    )
        .prop_map(|(container_type, title, children)| {
            Block::new(BlockKind::Container {
                container_type,
                title,
                children,
            })
        })
}

fn math_strategy() -> impl Strategy<Value = Block> {
    formula_strategy().prop_map(|formula| {
        Block::new(BlockKind::Math {
            formula,
            display: MathDisplay::Block,
        })
    })
}

fn quote_strategy() -> impl Strategy<Value = Block> {
    prop::collection::vec(paragraph_strategy(), 1..4).prop_map(|children| {
        Block::new(BlockKind::Quote { children })
    })
}

fn list_run_strategy() -> impl Strategy<Value = Vec<Block>> {
    let bullet_item = (text_strategy(), proptest::option::of(text_strategy()));
    prop_oneof![
        prop::collection::vec(bullet_item, 1..4).prop_map(|items| {
            items
                .into_iter()
                .map(|(text, nested)| {
                    let children = nested
                        .map(|t| {
                            vec![Block::new(BlockKind::BulletListItem {
                                content: vec![Inline::text(t)],
                                children: vec![],
                            })]
                        })
                        .unwrap_or_default();
                    Block::new(BlockKind::BulletListItem {
                        content: vec![Inline::text(text)],
                        children,
                    })
                })
                .collect()
        }),
        prop::collection::vec(text_strategy(), 1..4).prop_map(|texts| {
            texts
                .into_iter()
                .map(|text| {
                    Block::new(BlockKind::NumberedListItem {
                        content: vec![Inline::text(text)],
                        children: vec![],
                    })
                })
                .collect()
        }),
        prop::collection::vec((proptest::bool::ANY, text_strategy()), 1..4).prop_map(|items| {
            items
                .into_iter()
                .map(|(checked, text)| {
                    Block::new(BlockKind::CheckListItem {
                        checked,
                        content: vec![Inline::text(text)],
                        children: vec![],
                    })
                })
                .collect()
        }),
    ]
}

fn table_strategy() -> impl Strategy<Value = Block> {
    (2usize..4, 1usize..4)
        .prop_flat_map(|(cols, rows)| {
            prop::collection::vec(
                prop::collection::vec(word_strategy(), cols..=cols),
                rows + 1..=rows + 1,
            )
        })
        .prop_map(|mut grid| {
            let header_cells = grid.remove(0);
            let to_row = |cells: Vec<String>| TableRow {
                cells: cells.into_iter().map(TableCell::text).collect(),
            };
            Block::new(BlockKind::Table(Table {
                header: to_row(header_cells),
                rows: grid.into_iter().map(to_row).collect(),
            }))
        })
}

fn code_block_strategy() -> impl Strategy<Value = Block> {
    (
        proptest::option::of("[a-z]{1,6}"),
        prop::collection::vec("[a-z0-9 ]{1,20}", 1..4),
    )
        .prop_map(|(language, lines)| {
            Block::new(BlockKind::CodeBlock {
                language,
                code: lines.join("\n"),
            })
        })
}

fn document_strategy() -> impl Strategy<Value = Vec<Block>> {
    let group = prop_oneof![
        paragraph_strategy().prop_map(|b| vec![b]),
        heading_strategy().prop_map(|b| vec![b]),
        container_strategy().prop_map(|b| vec![b]),
        math_strategy().prop_map(|b| vec![b]),
        quote_strategy().prop_map(|b| vec![b]),
        table_strategy().prop_map(|b| vec![b]),
        code_block_strategy().prop_map(|b| vec![b]),
        list_run_strategy(),
        Just(vec![Block::new(BlockKind::ThematicBreak)]),
    ];
    prop::collection::vec(group, 1..6).prop_map(|groups| groups.into_iter().flatten().collect())
}

proptest! {
    // serialize . parse is the identity on serialized output.
    #[test]
    fn prop_roundtrip_idempotent(blocks in document_strategy()) {
        let serializer = MarkdownSerializer::new();
        let first = serializer.serialize(&blocks);
        let second = reserialize(&first);
        prop_assert_eq!(first, second);
    }

    // Expanding a quote to editor form and merging back is the identity on
    // content (ids and group ids are generated fresh and ignored).
    #[test]
    fn prop_quote_expand_merge_inverse(quote in quote_strategy()) {
        let nodes = to_editor_blocks(std::slice::from_ref(&quote));
        let back = from_editor_blocks(&nodes);
        prop_assert_eq!(back, vec![quote]);
    }

    // Two independently expanded quotes never share a group id and stay two
    // blocks after merging.
    #[test]
    fn prop_group_isolation(a in quote_strategy(), b in quote_strategy()) {
        let nodes = to_editor_blocks(&[a.clone(), b.clone()]);
        let group = |node: &blockmark_core::EditorBlock| {
            node.prop_str("groupId").map(str::to_string)
        };
        let first_group = group(&nodes[0]);
        let last_group = group(&nodes[nodes.len() - 1]);
        prop_assert!(first_group.is_some());
        prop_assert_ne!(first_group, last_group);

        let back = from_editor_blocks(&nodes);
        prop_assert_eq!(back, vec![a, b]);
    }

    // Style mapping to editor form and back reproduces the inline tree.
    #[test]
    fn prop_inline_style_bijection(content in inline_content_strategy()) {
        let block = Block::new(BlockKind::Paragraph { content });
        let nodes = to_editor_blocks(std::slice::from_ref(&block));
        let back = from_editor_blocks(&nodes);
        prop_assert_eq!(back, vec![block]);
    }

    // A table keeps its shape through both conversion pairs.
    #[test]
    fn prop_table_shape_preserved(table in table_strategy()) {
        let serializer = MarkdownSerializer::new();
        let parser = MarkdownParser::new();

        let markup = serializer.serialize(std::slice::from_ref(&table));
        let reparsed = parser.parse(&markup);
        prop_assert_eq!(&reparsed[..], std::slice::from_ref(&table));

        let nodes = to_editor_blocks(std::slice::from_ref(&table));
        let back = from_editor_blocks(&nodes);
        prop_assert_eq!(back, vec![table]);
    }
}

#[test]
fn scenario_tip_container() {
    let parser = MarkdownParser::new();
    let serializer = MarkdownSerializer::new();
    let blocks = parser.parse("::: tip\nHello\n:::");
    assert_eq!(blocks.len(), 1);
    let BlockKind::Container { container_type, .. } = &blocks[0].kind else {
        panic!("expected container");
    };
    assert_eq!(*container_type, ContainerType::Tip);
    assert_eq!(serializer.serialize(&blocks), ":::tip\nHello\n:::\n");
}

#[test]
fn scenario_block_math() {
    let blocks = MarkdownParser::new().parse("$$E=mc^2$$");
    assert_eq!(blocks.len(), 1);
    assert_eq!(
        blocks[0].kind,
        BlockKind::Math {
            formula: "E=mc^2".into(),
            display: MathDisplay::Block,
        }
    );
}

#[test]
fn scenario_include_range() {
    let blocks = MarkdownParser::new().parse("<!--@include: ./f.md{1-5}-->");
    assert_eq!(blocks.len(), 1);
    let BlockKind::Include {
        path, line_range, ..
    } = &blocks[0].kind
    else {
        panic!("expected include");
    };
    assert!(path.contains("f.md"));
    assert_eq!(
        *line_range,
        Some(LineRange {
            start: Some(1),
            end: Some(5)
        })
    );
}

#[test]
fn scenario_grouped_quote_nodes_merge() {
    use blockmark_core::editor::model::block_types;
    use blockmark_core::editor::{EditorContent, EditorInline};

    let mut first = blockmark_core::EditorBlock::new(block_types::QUOTE);
    first.set_prop("groupId", "g1");
    first.set_prop("isFirstInGroup", true);
    first.content = EditorContent::Inline(vec![EditorInline::plain("Line 1")]);
    let mut second = blockmark_core::EditorBlock::new(block_types::QUOTE);
    second.set_prop("groupId", "g1");
    second.set_prop("isFirstInGroup", false);
    second.content = EditorContent::Inline(vec![EditorInline::plain("Line 2")]);

    let blocks = from_editor_blocks(&[first, second]);
    assert_eq!(blocks.len(), 1);
    let BlockKind::Quote { children } = &blocks[0].kind else {
        panic!("expected quote");
    };
    assert_eq!(
        children,
        &vec![
            Block::paragraph(vec![Inline::text("Line 1")]),
            Block::paragraph(vec![Inline::text("Line 2")]),
        ]
    );
}

#[test]
fn scenario_table_serialization() {
    let table = Block::new(BlockKind::Table(Table {
        header: TableRow {
            cells: vec![TableCell::text("Header 1"), TableCell::text("Header 2")],
        },
        rows: vec![TableRow {
            cells: vec![TableCell::text("Cell 1"), TableCell::text("Cell 2")],
        }],
    }));
    let markup = MarkdownSerializer::new().serialize(std::slice::from_ref(&table));
    let lines: Vec<&str> = markup.lines().collect();
    assert!(lines[0].contains("Header 1") && lines[0].contains("Header 2"));
    assert!(lines[1].contains("---"));
}
