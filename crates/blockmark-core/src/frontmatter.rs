// SPDX-License-Identifier: AGPL-3.0-or-later
//! YAML frontmatter container
//!
//! Parsed once at document load, serialized once at save; the transcoding
//! engine never mutates it. Keys keep the order they were encountered in.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{EngineError, Result};

/// String-keyed frontmatter map (scalars and sequences).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frontmatter(Mapping);

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(Value::String(key.to_string()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(Value::String(key.into()), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.0.iter()
    }

    /// Parse the text between the `---` delimiters. Rejects YAML whose root
    /// is not a mapping; the caller decides how to degrade.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::new());
        }
        let map: Mapping = serde_yaml::from_str(yaml).map_err(EngineError::FrontmatterParse)?;
        Ok(Self(map))
    }

    /// Render as a `---`-delimited block, ending with a newline.
    pub fn to_yaml_block(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.0).map_err(EngineError::FrontmatterEmit)?;
        let yaml = yaml.strip_prefix("---\n").unwrap_or(&yaml);
        Ok(format!("---\n{}---\n", yaml))
    }
}

/// Detach a leading `---` frontmatter section from `input`.
///
/// Returns the raw YAML text and the remaining body, or `None` when the
/// input does not open with a delimiter line or the section is unterminated.
pub fn split_frontmatter(input: &str) -> Option<(String, String)> {
    let mut lines = input.lines();
    if lines.next()? != "---" {
        return None;
    }

    let mut yaml = Vec::new();
    let mut body = Vec::new();
    let mut in_yaml = true;
    for line in lines {
        if in_yaml && line == "---" {
            in_yaml = false;
            continue;
        }
        if in_yaml {
            yaml.push(line);
        } else {
            body.push(line);
        }
    }
    if in_yaml {
        // Unterminated section: not frontmatter at all.
        return None;
    }

    Some((yaml.join("\n"), body.join("\n")))
}
