use collector_engine::{
    structure_content_schema, structured_to_markdown, Block, BlockContent, BlockKind,
    StructuredDocument,
};
use pretty_assertions::assert_eq;

fn doc(json: &str) -> StructuredDocument {
    serde_json::from_str(json).expect("valid structured document")
}

#[test]
fn title_alone_becomes_a_top_level_heading() {
    assert_eq!(structured_to_markdown(&doc(r#"{"title":"T"}"#)), "# T");
}

#[test]
fn paragraph_is_raw_text() {
    assert_eq!(
        structured_to_markdown(&doc(r#"{"content":[{"type":"paragraph","content":"p"}]}"#)),
        "p"
    );
}

#[test]
fn heading_level_becomes_hash_prefix() {
    assert_eq!(
        structured_to_markdown(&doc(
            r#"{"content":[{"type":"heading","level":2,"content":"H"}]}"#
        )),
        "## H"
    );
}

#[test]
fn list_items_become_bullets() {
    assert_eq!(
        structured_to_markdown(&doc(r#"{"content":[{"type":"list","content":["a","b"]}]}"#)),
        "- a\n- b"
    );
}

#[test]
fn code_gets_a_fenced_block_with_language() {
    assert_eq!(
        structured_to_markdown(&doc(
            r#"{"content":[{"type":"code","language":"js","content":"x"}]}"#
        )),
        "```js\nx\n```"
    );
}

#[test]
fn code_without_language_gets_a_bare_fence() {
    assert_eq!(
        structured_to_markdown(&doc(r#"{"content":[{"type":"code","content":"x"}]}"#)),
        "```\nx\n```"
    );
}

#[test]
fn quote_gets_an_angle_prefix() {
    assert_eq!(
        structured_to_markdown(&doc(r#"{"content":[{"type":"quote","content":"q"}]}"#)),
        "> q"
    );
}

#[test]
fn empty_document_yields_empty_markdown() {
    assert_eq!(structured_to_markdown(&StructuredDocument::default()), "");
    assert_eq!(structured_to_markdown(&doc("{}")), "");
}

#[test]
fn unknown_block_kind_passes_content_through() {
    let parsed = doc(r#"{"content":[{"type":"table","content":"cells"}]}"#);
    assert_eq!(parsed.content[0].kind, BlockKind::Other);
    assert_eq!(structured_to_markdown(&parsed), "cells");
}

#[test]
fn heading_level_defaults_to_two_and_is_clamped() {
    let unlevelled = StructuredDocument {
        title: None,
        content: vec![Block {
            kind: BlockKind::Heading,
            content: BlockContent::Text("H".to_string()),
            level: None,
            language: None,
        }],
    };
    assert_eq!(structured_to_markdown(&unlevelled), "## H");

    let deep = doc(r#"{"content":[{"type":"heading","level":9,"content":"H"}]}"#);
    assert_eq!(structured_to_markdown(&deep), "###### H");
}

#[test]
fn blocks_are_rendered_in_order_with_blank_lines() {
    let parsed = doc(
        r#"{
            "title": "Doc",
            "content": [
                {"type": "heading", "level": 2, "content": "Section"},
                {"type": "paragraph", "content": "Body."},
                {"type": "list", "content": ["one", "two"]}
            ]
        }"#,
    );
    assert_eq!(
        structured_to_markdown(&parsed),
        "# Doc\n\n## Section\n\nBody.\n\n- one\n- two"
    );
}

#[test]
fn schema_documents_the_block_kinds() {
    let schema = structure_content_schema();
    let kinds = schema
        .pointer("/properties/content/items/properties/type/enum")
        .expect("enum of block kinds");
    assert_eq!(
        kinds,
        &serde_json::json!(["heading", "paragraph", "list", "code", "quote"])
    );
    assert_eq!(
        schema.pointer("/required"),
        Some(&serde_json::json!(["title", "content"]))
    );
}
