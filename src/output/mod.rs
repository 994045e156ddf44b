//! Rendering decoded trees and templates for people and other tools.

mod json;
mod text;
mod xml;

use std::fmt;
use std::str::FromStr;

use crate::err::SerializationResult;
use crate::model::ElementTree;

pub use self::json::{to_json_string, tree_to_json};
pub use self::text::{describe_template, dump_tree};
pub use self::xml::to_xml_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonLines,
    Xml,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Text,
        OutputFormat::Json,
        OutputFormat::JsonLines,
        OutputFormat::Xml,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::JsonLines => "jsonl",
            OutputFormat::Xml => "xml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown output format `{s}`"))
    }
}

/// Render `tree` in `format`.
pub fn render(tree: &ElementTree, format: OutputFormat) -> SerializationResult<String> {
    match format {
        OutputFormat::Text => Ok(dump_tree(tree)),
        OutputFormat::Json => to_json_string(tree, true),
        OutputFormat::JsonLines => to_json_string(tree, false),
        OutputFormat::Xml => to_xml_string(tree),
    }
}
