use std::sync::Arc;

use plate_md_core::{
    BlockType, Document, EditorState, InlineType, Node, PluginRegistry, Point, Selection,
    link_attrs,
};

fn state(children: Vec<Node>, selection: Selection) -> EditorState {
    EditorState::new(
        Document { children },
        selection,
        Arc::new(PluginRegistry::core()),
    )
}

fn block_children(state: &EditorState, ix: usize) -> &[Node] {
    let Node::Element(block) = &state.document().children[ix] else {
        panic!("expected block");
    };
    &block.children
}

#[test]
fn wrap_inline_wraps_range_in_link() -> anyhow::Result<()> {
    let state = state(
        vec![Node::paragraph("see the docs")],
        Selection::range(Point::new(vec![0, 0], 8), Point::new(vec![0, 0], 12)),
    );

    let next = state
        .transform()
        .wrap_inline(InlineType::Link, link_attrs("https://docs.rs"))?
        .apply()?;

    let children = block_children(&next, 0);
    assert_eq!(children.len(), 2);
    let Node::Text(head) = &children[0] else {
        panic!("expected text");
    };
    assert_eq!(head.text, "see the ");
    let Node::Element(link) = &children[1] else {
        panic!("expected link");
    };
    assert_eq!(link.kind, "link");
    assert_eq!(link.href(), Some("https://docs.rs"));
    assert_eq!(link.text(), "docs");

    let inlines = next.inlines();
    assert_eq!(inlines.len(), 1);
    assert_eq!(inlines[0].0, vec![0, 1]);
    Ok(())
}

#[test]
fn wrap_inline_on_caret_is_a_no_op() -> anyhow::Result<()> {
    let state = state(
        vec![Node::paragraph("text")],
        Selection::collapsed(Point::new(vec![0, 0], 2)),
    );

    let next = state
        .transform()
        .wrap_inline(InlineType::Link, link_attrs("https://example.com"))?
        .apply()?;

    assert_eq!(next, state);
    Ok(())
}

#[test]
fn unwrap_inline_restores_plain_text() -> anyhow::Result<()> {
    let state = state(
        vec![Node::block_with(
            BlockType::Paragraph,
            vec![
                Node::text("go "),
                Node::link("https://example.com", "here"),
                Node::text(" now"),
            ],
        )],
        Selection::collapsed(Point::new(vec![0, 1, 0], 2)),
    );
    assert_eq!(state.inlines().len(), 1);

    let next = state
        .transform()
        .unwrap_inline(InlineType::Link)?
        .apply()?;

    let children = block_children(&next, 0);
    assert_eq!(children.len(), 1);
    let Node::Text(text) = &children[0] else {
        panic!("expected text");
    };
    assert_eq!(text.text, "go here now");
    assert!(next.inlines().is_empty());
    assert_eq!(next.selection().focus, Point::new(vec![0, 0], 5));
    Ok(())
}

#[test]
fn inlines_query_ignores_links_outside_selection() {
    let state = state(
        vec![Node::block_with(
            BlockType::Paragraph,
            vec![
                Node::text("before "),
                Node::link("https://example.com", "link"),
                Node::text(" after"),
            ],
        )],
        Selection::range(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 6)),
    );

    assert!(state.inlines().is_empty());
}

#[test]
fn link_alone_in_block_gets_leading_text_leaf() -> anyhow::Result<()> {
    let state = state(
        vec![Node::paragraph("")],
        Selection::collapsed(Point::new(vec![0, 0], 0)),
    );

    let next = state
        .transform()
        .insert_text("Rust")?
        .extend_backward(4)?
        .wrap_inline(InlineType::Link, link_attrs("https://rust-lang.org"))?
        .collapse_to_end()?
        .apply()?;

    let children = block_children(&next, 0);
    assert_eq!(children.len(), 2);
    assert!(matches!(&children[0], Node::Text(t) if t.text.is_empty()));
    let Node::Element(link) = &children[1] else {
        panic!("expected link");
    };
    assert_eq!(link.text(), "Rust");
    assert!(next.is_collapsed());
    assert_eq!(next.selection().focus, Point::new(vec![0, 1, 0], 4));
    Ok(())
}
