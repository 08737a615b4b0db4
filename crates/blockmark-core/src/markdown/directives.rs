// SPDX-License-Identifier: AGPL-3.0-or-later
//! Line-level recognizers for the custom markup extensions
//!
//! Each function classifies a single line (or an info string). Precedence
//! between recognizers is decided by the caller: container > code-group >
//! diagram fence > component tag > include directive > generic fence.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Inline, LineRange, TagAttribute};

static CONTAINER_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:::\s*([A-Za-z][A-Za-z0-9-]*)(?:[ \t]+(\S.*?))?\s*$").expect("regex"));
static CONTAINER_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:::\s*$").expect("regex"));
static MATH_SINGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$\$([^$]+)\$\$\s*$").expect("regex"));
static MATH_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$\$\s*$").expect("regex"));
static INCLUDE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*@include:\s*(.+?)\s*-->\s*$").expect("regex"));
static INCLUDE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\{(\d+)?-(\d+)?\}$").expect("regex"));
static INCLUDE_REGION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)#([A-Za-z0-9_-]+)$").expect("regex"));
static COMPONENT_SELF_CLOSING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([A-Z][A-Za-z0-9]*)((?:\s[^>]*?)?)\s*/>\s*$").expect("regex"));
static COMPONENT_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([A-Z][A-Za-z0-9]*)((?:\s[^>]*?)?)\s*>\s*$").expect("regex"));
static COMPONENT_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</([A-Z][A-Za-z0-9]*)\s*>\s*$").expect("regex"));
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_-]*)(?:\s*=\s*"([^"]*)")?"#).expect("regex")
});
static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(```+|~~~+)(.*)$").expect("regex"));
static FENCE_INFO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\s\[{]+)?\s*(?:\[([^\]]*)\])?\s*(?:\{([^}]*)\})?\s*$").expect("regex")
});
static INLINE_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([^$\n]+)\$").expect("regex"));
static MATH_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\$\$(.+)\$\$$").expect("regex"));

/// `::: keyword [title]` — any keyword; the caller decides whether it names
/// a known container type or a code group.
pub(crate) fn container_open(line: &str) -> Option<(String, Option<String>)> {
    let caps = CONTAINER_OPEN.captures(line)?;
    let keyword = caps[1].to_string();
    let title = caps.get(2).map(|m| m.as_str().to_string());
    Some((keyword, title))
}

pub(crate) fn is_container_close(line: &str) -> bool {
    CONTAINER_CLOSE.is_match(line)
}

/// `$$formula$$` on one line.
pub(crate) fn math_single_line(line: &str) -> Option<String> {
    MATH_SINGLE
        .captures(line)
        .map(|caps| caps[1].trim().to_string())
}

/// A bare `$$` fence line.
pub(crate) fn is_math_fence(line: &str) -> bool {
    MATH_FENCE.is_match(line)
}

/// `$$...$$` spanning the entire (possibly multi-line) text of a paragraph.
pub(crate) fn math_paragraph(text: &str) -> Option<String> {
    MATH_PARAGRAPH
        .captures(text.trim())
        .map(|caps| caps[1].trim().to_string())
}

/// `<!--@include: target-->` — returns the raw target text.
pub(crate) fn include_comment(line: &str) -> Option<String> {
    INCLUDE_COMMENT
        .captures(line)
        .map(|caps| caps[1].to_string())
}

/// Split an include target into path + optional range or region.
///
/// Returns `None` when a brace group is present but is not a parsable
/// `{start-end}` range; the caller degrades the whole comment.
pub(crate) fn parse_include_target(
    target: &str,
) -> Option<(String, Option<LineRange>, Option<String>)> {
    if let Some(caps) = INCLUDE_RANGE.captures(target) {
        let start = caps.get(2).and_then(|m| m.as_str().parse().ok());
        let end = caps.get(3).and_then(|m| m.as_str().parse().ok());
        return Some((caps[1].to_string(), Some(LineRange { start, end }), None));
    }
    if target.contains('{') || target.contains('}') {
        return None;
    }
    if let Some(caps) = INCLUDE_REGION.captures(target) {
        return Some((caps[1].to_string(), None, Some(caps[2].to_string())));
    }
    Some((target.to_string(), None, None))
}

/// `<Name attr="v" ... />` on one line.
pub(crate) fn component_self_closing(line: &str) -> Option<(String, Vec<TagAttribute>)> {
    let caps = COMPONENT_SELF_CLOSING.captures(line)?;
    Some((caps[1].to_string(), parse_attributes(&caps[2])))
}

/// `<Name attr="v" ...>` opening a paired tag.
pub(crate) fn component_open(line: &str) -> Option<(String, Vec<TagAttribute>)> {
    let caps = COMPONENT_OPEN.captures(line)?;
    Some((caps[1].to_string(), parse_attributes(&caps[2])))
}

/// `</Name>` closing the named paired tag.
pub(crate) fn component_close(line: &str, name: &str) -> bool {
    COMPONENT_CLOSE
        .captures(line)
        .is_some_and(|caps| &caps[1] == name)
}

/// Scan `attr="value"` and bare `attr` pairs in source order.
pub(crate) fn parse_attributes(text: &str) -> Vec<TagAttribute> {
    ATTRIBUTE
        .captures_iter(text)
        .map(|caps| TagAttribute {
            name: caps[1].to_string(),
            value: caps.get(2).map(|m| m.as_str().to_string()),
        })
        .collect()
}

/// A fence-opening line: returns (fence marker, info string).
pub(crate) fn fence_open(line: &str) -> Option<(String, String)> {
    let caps = FENCE_OPEN.captures(line)?;
    Some((caps[1].to_string(), caps[2].trim().to_string()))
}

/// True when `line` closes a fence opened with `marker`.
pub(crate) fn fence_close(line: &str, marker: &str) -> bool {
    let trimmed = line.trim_end();
    let ch = marker.chars().next().unwrap_or('`');
    trimmed.len() >= marker.len() && trimmed.chars().all(|c| c == ch)
}

/// Parsed fence info string: `lang [filename] {highlight}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FenceInfo {
    pub language: Option<String>,
    pub filename: Option<String>,
    pub highlight: Option<String>,
}

pub(crate) fn parse_fence_info(info: &str) -> FenceInfo {
    let Some(caps) = FENCE_INFO.captures(info) else {
        // Free-form info string: keep it verbatim as the language tag.
        return FenceInfo {
            language: Some(info.to_string()),
            ..FenceInfo::default()
        };
    };
    FenceInfo {
        language: caps.get(1).map(|m| m.as_str().to_string()),
        filename: caps.get(2).map(|m| m.as_str().to_string()),
        highlight: caps.get(3).map(|m| m.as_str().to_string()),
    }
}

/// Split `$...$` spans out of a text run, leaving the rest untouched.
pub(crate) fn split_inline_math(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in INLINE_MATH.find_iter(text) {
        if m.start() > last {
            out.push(Inline::text(&text[last..m.start()]));
        }
        out.push(Inline::Math {
            formula: text[m.start() + 1..m.end() - 1].to_string(),
        });
        last = m.end();
    }
    if out.is_empty() {
        return vec![Inline::text(text)];
    }
    if last < text.len() {
        out.push(Inline::text(&text[last..]));
    }
    out
}
