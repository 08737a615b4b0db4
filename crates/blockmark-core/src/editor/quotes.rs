// SPDX-License-Identifier: AGPL-3.0-or-later
//! Quote-group expansion and merge
//!
//! The Block Model nests quote children; the editor keeps a flat sibling
//! list. Expansion turns one quote block into n flat quote nodes sharing a
//! per-call group identifier; the merger is the inverse single-pass state
//! machine folding a run of same-group nodes back into one quote block.

use uuid::Uuid;

use super::convert;
use super::model::{block_types, EditorBlock, EditorContent};
use crate::ast::{Block, BlockKind};

pub(crate) const GROUP_ID: &str = "groupId";
pub(crate) const IS_FIRST_IN_GROUP: &str = "isFirstInGroup";

/// Unique within one expansion call; collisions only risk re-merging inside
/// the same document, so no global registry is kept.
fn new_group_id() -> String {
    format!("qg-{}", Uuid::new_v4())
}

fn quote_node(group_id: &str, first: bool) -> EditorBlock {
    let mut node = EditorBlock::new(block_types::QUOTE);
    node.set_prop(GROUP_ID, group_id);
    node.set_prop(IS_FIRST_IN_GROUP, first);
    node
}

/// Expand one quote block into flat editor siblings.
///
/// Each paragraph child becomes one quote node tagged with the shared group
/// id; the first carries `isFirstInGroup`. A nested quote attaches as a
/// child of the most recently emitted group sibling (one is synthesized
/// when the nested quote comes first). Any other child is converted
/// independently and appended as a sibling outside the group.
pub(crate) fn expand_quote(quote: &Block, out: &mut Vec<EditorBlock>) {
    let BlockKind::Quote { children } = &quote.kind else {
        panic!("expand_quote called on a non-quote block");
    };

    let group_id = new_group_id();
    let mut host: Option<usize> = None;

    for child in children {
        match &child.kind {
            BlockKind::Paragraph { content } => {
                let first = host.is_none();
                let mut node = quote_node(&group_id, first);
                if first {
                    node.id = quote.id.clone();
                }
                node.content = EditorContent::Inline(convert::inlines_to_editor(content));
                out.push(node);
                host = Some(out.len() - 1);
            }
            BlockKind::Quote { .. } => {
                let idx = match host {
                    Some(idx) => idx,
                    None => {
                        let mut node = quote_node(&group_id, true);
                        node.id = quote.id.clone();
                        node.content = EditorContent::Inline(Vec::new());
                        out.push(node);
                        host = Some(out.len() - 1);
                        out.len() - 1
                    }
                };
                let mut nested = Vec::new();
                expand_quote(child, &mut nested);
                out[idx].children.extend(nested);
            }
            _ => out.push(convert::to_editor_block(child)),
        }
    }

    if host.is_none() {
        let mut node = quote_node(&group_id, true);
        node.id = quote.id.clone();
        node.content = EditorContent::Inline(Vec::new());
        out.push(node);
    }
}

/// Single-pass merge state: the running group id and the children recovered
/// so far, in input order.
pub(crate) struct QuoteMerger {
    id: String,
    group_id: Option<String>,
    children: Vec<Block>,
}

impl QuoteMerger {
    /// Open a merge run at `node`.
    ///
    /// # Panics
    ///
    /// Panics when `node` is not a quote node; that is a caller contract
    /// violation, not malformed content.
    pub(crate) fn start(node: &EditorBlock) -> Self {
        assert_eq!(
            node.block_type,
            block_types::QUOTE,
            "quote merge started on a non-quote node"
        );
        let mut merger = Self {
            id: node.id.clone(),
            group_id: node
                .prop_str(GROUP_ID)
                .filter(|g| !g.is_empty())
                .map(str::to_string),
            children: Vec::new(),
        };
        merger.absorb(node);
        merger
    }

    /// True when `node` continues the running group.
    pub(crate) fn accepts(&self, node: &EditorBlock) -> bool {
        node.block_type == block_types::QUOTE
            && matches!(
                (&self.group_id, node.prop_str(GROUP_ID)),
                (Some(current), Some(incoming)) if current == incoming
            )
    }

    /// Record one more contributing node.
    pub(crate) fn push(&mut self, node: &EditorBlock) {
        assert!(
            self.accepts(node),
            "quote merge pushed a node outside the running group"
        );
        self.absorb(node);
    }

    fn absorb(&mut self, node: &EditorBlock) {
        self.children.push(Block::with_id(
            node.id.clone(),
            BlockKind::Paragraph {
                content: convert::inlines_from_editor(node.inline_content()),
            },
        ));
        self.children
            .extend(convert::from_editor_blocks(&node.children));
    }

    /// Close the run; a quote with zero recovered children gets exactly one
    /// empty paragraph child.
    pub(crate) fn finish(mut self) -> Block {
        if self.children.is_empty() {
            self.children.push(Block::empty_paragraph());
        }
        Block::with_id(
            self.id,
            BlockKind::Quote {
                children: self.children,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Inline;
    use pretty_assertions::assert_eq;

    fn quote_of(texts: &[&str]) -> Block {
        Block::new(BlockKind::Quote {
            children: texts
                .iter()
                .map(|t| Block::paragraph(vec![Inline::text(*t)]))
                .collect(),
        })
    }

    #[test]
    fn expansion_shares_one_group_id() {
        let mut out = Vec::new();
        expand_quote(&quote_of(&["one", "two", "three"]), &mut out);
        assert_eq!(out.len(), 3);
        let group = out[0].prop_str(GROUP_ID).unwrap().to_string();
        assert!(!group.is_empty());
        assert!(out.iter().all(|n| n.prop_str(GROUP_ID) == Some(&group[..])));
        assert!(out[0].prop_bool(IS_FIRST_IN_GROUP));
        assert!(!out[1].prop_bool(IS_FIRST_IN_GROUP));
        assert!(!out[2].prop_bool(IS_FIRST_IN_GROUP));
    }

    #[test]
    fn independent_quotes_never_share_groups() {
        let mut out = Vec::new();
        expand_quote(&quote_of(&["a"]), &mut out);
        expand_quote(&quote_of(&["b"]), &mut out);
        assert_ne!(out[0].prop_str(GROUP_ID), out[1].prop_str(GROUP_ID));
    }

    #[test]
    fn nested_quote_attaches_to_last_sibling() {
        let nested = quote_of(&["inner"]);
        let block = Block::new(BlockKind::Quote {
            children: vec![
                Block::paragraph(vec![Inline::text("outer")]),
                nested,
            ],
        });
        let mut out = Vec::new();
        expand_quote(&block, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].children.len(), 1);
        assert_eq!(out[0].children[0].block_type, block_types::QUOTE);
        assert_ne!(
            out[0].children[0].prop_str(GROUP_ID),
            out[0].prop_str(GROUP_ID)
        );
    }

    #[test]
    fn non_paragraph_children_escape_the_group() {
        let block = Block::new(BlockKind::Quote {
            children: vec![
                Block::paragraph(vec![Inline::text("quoted")]),
                Block::new(BlockKind::ThematicBreak),
            ],
        });
        let mut out = Vec::new();
        expand_quote(&block, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].block_type, block_types::DIVIDER);
        assert!(out[1].prop_str(GROUP_ID).is_none());
    }

    #[test]
    fn childless_quote_emits_one_group_member() {
        let block = Block::new(BlockKind::Quote { children: vec![] });
        let mut out = Vec::new();
        expand_quote(&block, &mut out);
        assert_eq!(out.len(), 1);
        assert!(out[0].prop_bool(IS_FIRST_IN_GROUP));
    }

    #[test]
    #[should_panic(expected = "non-quote")]
    fn merge_on_non_quote_is_a_contract_violation() {
        let node = EditorBlock::new(block_types::PARAGRAPH);
        let _ = QuoteMerger::start(&node);
    }
}
