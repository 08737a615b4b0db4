// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error type for the fallible engine boundaries
//!
//! Malformed *user content* never surfaces here: the parser and the editor
//! adapter degrade to generic constructs instead (see the module docs).
//! Errors exist only where an operation can genuinely fail, which in this
//! engine is the YAML frontmatter boundary.

/// Error type for frontmatter parsing and emission.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("frontmatter is not a YAML mapping: {0}")]
    FrontmatterParse(#[source] serde_yaml::Error),

    #[error("frontmatter could not be serialized: {0}")]
    FrontmatterEmit(#[source] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
