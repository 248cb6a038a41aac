use std::sync::Arc;

use plate_md_core::{
    BlockType, Document, EditorState, MarkType, Marks, MarkdownValue, Node, PluginRegistry,
    ValueError,
};
use serde_json::json;

#[test]
fn value_json_round_trip_keeps_document() -> anyhow::Result<()> {
    let doc = Document {
        children: vec![
            Node::block(BlockType::HeadingOne, "Title"),
            Node::block_with(
                BlockType::Paragraph,
                vec![
                    Node::marked("bold", Marks::default().with(MarkType::Bold)),
                    Node::link("https://example.com", "link"),
                ],
            ),
        ],
    };

    let json = MarkdownValue::from_document(doc.clone()).to_json_pretty()?;
    let value = MarkdownValue::from_json_str(&json)?;

    assert_eq!(value.schema, "plate-md");
    assert_eq!(value.version, 1);
    assert_eq!(value.into_document(), doc);
    Ok(())
}

#[test]
fn value_defaults_missing_envelope_fields() -> anyhow::Result<()> {
    let raw = json!({
        "document": {
            "children": [
                {
                    "node": "element",
                    "kind": "block-quote",
                    "children": [{ "node": "text", "text": "quoted", "marks": { "italic": true } }]
                }
            ]
        }
    });

    let value = MarkdownValue::from_json_str(&raw.to_string())?;
    let state = EditorState::from_value(value, Arc::new(PluginRegistry::core()));

    let Node::Element(quote) = &state.document().children[0] else {
        panic!("expected block-quote");
    };
    assert_eq!(quote.kind, "block-quote");
    let Node::Text(text) = &quote.children[0] else {
        panic!("expected text");
    };
    assert!(text.marks.italic);
    assert!(!text.marks.bold);
    assert_eq!(state.to_value().document, *state.document());
    Ok(())
}

#[test]
fn value_rejects_foreign_schema() {
    let raw = json!({ "schema": "other", "version": 1, "document": { "children": [] } });

    let err = MarkdownValue::from_json_str(&raw.to_string()).err();
    assert!(matches!(
        err,
        Some(ValueError::Unsupported { ref schema, version: 1 }) if schema == "other"
    ));
}

#[test]
fn value_rejects_malformed_json() {
    let err = MarkdownValue::from_json_str("{ not json").err();
    assert!(matches!(err, Some(ValueError::Json(_))));
}

#[test]
fn schema_names_match_serialized_kinds() -> anyhow::Result<()> {
    assert_eq!(serde_json::to_value(BlockType::HeadingOne)?, json!("heading-one"));
    assert_eq!(serde_json::to_value(MarkType::Strikethrough)?, json!("strikethrough"));
    for block in BlockType::ALL {
        assert_eq!(block.as_str().parse::<BlockType>()?, block);
        assert_eq!(serde_json::to_value(block)?, json!(block.as_str()));
    }
    assert!("heading-five".parse::<BlockType>().is_err());
    assert_eq!("code".parse::<MarkType>()?, MarkType::Code);
    Ok(())
}
