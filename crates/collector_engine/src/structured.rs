//! The `structure_content` payload: what the LLM is asked to return, and the
//! deterministic transform back into markdown text. Pure functions, exercised
//! without any network involvement.

use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Heading,
    Paragraph,
    List,
    Code,
    Quote,
    /// Anything the model invents beyond the documented kinds; rendered as
    /// raw content.
    #[serde(other)]
    Other,
}

/// Block content is either a single string or a list of strings (bullet
/// items).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockContent {
    Text(String),
    Items(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: BlockContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructuredDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Vec<Block>,
}

/// Renders a structured document as markdown. Heading levels are clamped to
/// the `#`..`######` range with 2 as the default, lists become `- ` bullets,
/// code becomes a fenced block with an optional language tag and quotes get a
/// `> ` prefix. Unknown kinds pass their content through untouched.
pub fn structured_to_markdown(doc: &StructuredDocument) -> String {
    let mut markdown = String::new();

    if let Some(title) = doc.title.as_deref().filter(|t| !t.is_empty()) {
        markdown.push_str(&format!("# {title}\n\n"));
    }

    for block in &doc.content {
        match block.kind {
            BlockKind::Heading => {
                let level = block.level.unwrap_or(2).clamp(1, 6) as usize;
                markdown.push_str(&format!(
                    "{} {}\n\n",
                    "#".repeat(level),
                    flat_content(&block.content)
                ));
            }
            BlockKind::Paragraph => {
                markdown.push_str(&format!("{}\n\n", flat_content(&block.content)));
            }
            BlockKind::List => {
                if let BlockContent::Items(items) = &block.content {
                    for item in items {
                        markdown.push_str(&format!("- {item}\n"));
                    }
                    markdown.push('\n');
                }
            }
            BlockKind::Code => {
                let fence = match block.language.as_deref() {
                    Some(language) if !language.is_empty() => format!("```{language}"),
                    _ => "```".to_string(),
                };
                markdown.push_str(&format!("{fence}\n{}\n```\n\n", flat_content(&block.content)));
            }
            BlockKind::Quote => {
                markdown.push_str(&format!("> {}\n\n", flat_content(&block.content)));
            }
            BlockKind::Other => {
                markdown.push_str(&format!("{}\n\n", flat_content(&block.content)));
            }
        }
    }

    markdown.trim().to_string()
}

fn flat_content(content: &BlockContent) -> String {
    match content {
        BlockContent::Text(text) => text.clone(),
        BlockContent::Items(items) => items.join(" "),
    }
}

/// JSON schema of the `structure_content` function exposed to the LLM via
/// `tools`/`tool_choice`.
pub fn structure_content_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "content": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": {
                            "type": "string",
                            "enum": ["heading", "paragraph", "list", "code", "quote"]
                        },
                        "content": {
                            "oneOf": [
                                { "type": "string" },
                                { "type": "array", "items": { "type": "string" } }
                            ]
                        },
                        "level": { "type": "integer", "minimum": 1, "maximum": 6 },
                        "language": { "type": "string" }
                    },
                    "required": ["type", "content"]
                }
            }
        },
        "required": ["title", "content"]
    })
}
