// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transcoding engine fuzz target
//!
//! The parser, serializer and editor adapter must complete on arbitrary
//! input without panicking; malformed content degrades, it never fails.

#![no_main]

use blockmark_core::{from_editor_blocks, to_editor_blocks, MarkdownParser, MarkdownSerializer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(markup) = std::str::from_utf8(data) else {
        return;
    };

    let parser = MarkdownParser::new();
    let serializer = MarkdownSerializer::new();

    let blocks = parser.parse(markup);
    let rendered = serializer.serialize(&blocks);
    let _ = parser.parse(&rendered);

    let nodes = to_editor_blocks(&blocks);
    let _ = from_editor_blocks(&nodes);
});
