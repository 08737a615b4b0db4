// SPDX-License-Identifier: AGPL-3.0-or-later
//! The editor-native node shape
//!
//! This is the contract the embedded rich block editor expects; no other
//! module constructs these nodes directly. Complex prop values cross the
//! boundary in their string wire forms (JSON blobs, `"start-end"` ranges)
//! and are converted to structured fields immediately on entry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Editor block type names.
pub mod block_types {
    pub const PARAGRAPH: &str = "paragraph";
    pub const HEADING: &str = "heading";
    pub const BULLET_LIST_ITEM: &str = "bulletListItem";
    pub const NUMBERED_LIST_ITEM: &str = "numberedListItem";
    pub const CHECK_LIST_ITEM: &str = "checkListItem";
    pub const CODE_BLOCK: &str = "codeBlock";
    pub const TABLE: &str = "table";
    pub const IMAGE: &str = "image";
    pub const QUOTE: &str = "quote";
    pub const DIVIDER: &str = "divider";
    pub const CONTAINER: &str = "container";
    pub const MATH: &str = "math";
    pub const DIAGRAM: &str = "diagram";
    pub const COMPONENT_TAG: &str = "componentTag";
    pub const INCLUDE: &str = "include";
    pub const RICH_CODE: &str = "richCode";
}

/// One node of the editor's flat block list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    #[serde(default, skip_serializing_if = "EditorContent::is_none")]
    pub content: EditorContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EditorBlock>,
}

impl EditorBlock {
    pub fn new(block_type: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            block_type: block_type.to_string(),
            props: Map::new(),
            content: EditorContent::None,
            children: Vec::new(),
        }
    }

    pub fn set_prop(&mut self, key: &str, value: impl Into<Value>) {
        self.props.insert(key.to_string(), value.into());
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    pub fn prop_bool(&self, key: &str) -> bool {
        self.props
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn prop_u64(&self, key: &str) -> Option<u64> {
        self.props.get(key).and_then(Value::as_u64)
    }

    /// Inline runs of this node's content, empty when the content is not an
    /// inline sequence.
    pub fn inline_content(&self) -> &[EditorInline] {
        match &self.content {
            EditorContent::Inline(runs) => runs,
            _ => &[],
        }
    }
}

/// Content slot of an editor block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EditorContent {
    Inline(Vec<EditorInline>),
    Table(EditorTable),
    #[default]
    None,
}

impl EditorContent {
    pub fn is_none(&self) -> bool {
        matches!(self, EditorContent::None)
    }
}

/// One styled run, link, or inline formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorInline {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "TextStyles::is_plain")]
        styles: TextStyles,
    },
    Link {
        href: String,
        content: Vec<EditorInline>,
    },
    InlineMath {
        formula: String,
    },
}

impl EditorInline {
    pub fn plain(text: impl Into<String>) -> Self {
        EditorInline::Text {
            text: text.into(),
            styles: TextStyles::default(),
        }
    }
}

/// Flag set carried by text runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyles {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
}

impl TextStyles {
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.code
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Table content: `rows[0]` is the header row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorTable {
    pub rows: Vec<EditorTableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorTableRow {
    pub cells: Vec<Vec<EditorInline>>,
}
