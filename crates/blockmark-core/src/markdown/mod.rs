// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown dialect support: GFM plus the custom block extensions

pub(crate) mod directives;
pub mod parser;
pub mod serializer;

pub use parser::{MarkdownParser, ParseOptions};
pub use serializer::MarkdownSerializer;
