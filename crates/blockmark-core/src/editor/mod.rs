// SPDX-License-Identifier: AGPL-3.0-or-later
//! Editor adapter: Block Model <-> editor-native flat blocks
//!
//! The embedded rich block editor works on a flat sibling list, while the
//! Block Model nests quote children as a tree. This module owns the mapping
//! in both directions, including the quote-group expansion/merge that
//! reconciles the two shapes.

mod convert;
pub mod model;
mod quotes;

pub use convert::{from_editor_blocks, to_editor_blocks, EditorBridge};
pub use model::{
    EditorBlock, EditorContent, EditorInline, EditorTable, EditorTableRow, TextStyles,
};
