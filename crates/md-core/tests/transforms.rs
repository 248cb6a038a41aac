use std::sync::Arc;

use plate_md_core::{
    BlockType, Document, EditorState, ElementNode, Node, PluginRegistry, Point, Selection,
};

fn state(children: Vec<Node>, selection: Selection) -> EditorState {
    EditorState::new(
        Document { children },
        selection,
        Arc::new(PluginRegistry::core()),
    )
}

fn caret(path: Vec<usize>, offset: usize) -> Selection {
    Selection::collapsed(Point::new(path, offset))
}

fn list_item(text: &str) -> Node {
    Node::block(BlockType::ListItem, text)
}

fn element(node: &Node) -> &ElementNode {
    let Node::Element(el) = node else {
        panic!("expected element, got {node:?}");
    };
    el
}

#[test]
fn set_block_changes_kind_and_keeps_text() -> anyhow::Result<()> {
    let state = state(vec![Node::paragraph("Title")], caret(vec![0, 0], 2));

    let next = state
        .transform()
        .set_block(BlockType::HeadingTwo)?
        .apply()?;

    let block = element(&next.document().children[0]);
    assert_eq!(block.kind, "heading-two");
    assert_eq!(block.text(), "Title");
    assert_eq!(next.selection(), state.selection());
    Ok(())
}

#[test]
fn set_block_touches_every_selected_block() -> anyhow::Result<()> {
    let state = state(
        vec![
            Node::paragraph("one"),
            Node::paragraph("two"),
            Node::paragraph("three"),
        ],
        Selection::range(Point::new(vec![0, 0], 1), Point::new(vec![1, 0], 1)),
    );

    let next = state
        .transform()
        .set_block(BlockType::BlockQuote)?
        .apply()?;

    let kinds: Vec<&str> = next
        .document()
        .children
        .iter()
        .map(|n| element(n).kind.as_str())
        .collect();
    assert_eq!(kinds, vec!["block-quote", "block-quote", "paragraph"]);
    Ok(())
}

#[test]
fn wrap_block_nests_block_and_keeps_caret() -> anyhow::Result<()> {
    let state = state(vec![Node::paragraph("item")], caret(vec![0, 0], 4));

    let next = state
        .transform()
        .set_block(BlockType::ListItem)?
        .wrap_block(BlockType::BulletedList)?
        .apply()?;

    let list = element(&next.document().children[0]);
    assert_eq!(list.kind, "bulleted-list");
    assert_eq!(list.children.len(), 1);
    let item = element(&list.children[0]);
    assert_eq!(item.kind, "list-item");
    assert_eq!(item.text(), "item");
    assert_eq!(next.selection().focus, Point::new(vec![0, 0, 0], 4));
    Ok(())
}

#[test]
fn wrap_block_wraps_sibling_range() -> anyhow::Result<()> {
    let state = state(
        vec![
            Node::paragraph("a"),
            Node::paragraph("b"),
            Node::paragraph("c"),
        ],
        Selection::range(Point::new(vec![1, 0], 0), Point::new(vec![2, 0], 1)),
    );

    let next = state
        .transform()
        .wrap_block(BlockType::NumberedList)?
        .apply()?;

    let doc = next.document();
    assert_eq!(doc.children.len(), 2);
    let list = element(&doc.children[1]);
    assert_eq!(list.kind, "numbered-list");
    assert_eq!(list.children.len(), 2);
    assert_eq!(next.selection().anchor.path, vec![1, 0, 0]);
    assert_eq!(next.selection().focus.path, vec![1, 1, 0]);
    Ok(())
}

#[test]
fn unwrap_block_splits_container_around_selected_item() -> anyhow::Result<()> {
    let state = state(
        vec![Node::block_with(
            BlockType::BulletedList,
            vec![list_item("a"), list_item("b"), list_item("c")],
        )],
        caret(vec![0, 1, 0], 1),
    );

    let next = state
        .transform()
        .unwrap_block(BlockType::BulletedList)?
        .apply()?;

    let doc = next.document();
    assert_eq!(doc.children.len(), 3);

    let before = element(&doc.children[0]);
    assert_eq!(before.kind, "bulleted-list");
    assert_eq!(before.children.len(), 1);
    assert_eq!(element(&before.children[0]).text(), "a");

    let lifted = element(&doc.children[1]);
    assert_eq!(lifted.kind, "list-item");
    assert_eq!(lifted.text(), "b");

    let after = element(&doc.children[2]);
    assert_eq!(after.kind, "bulleted-list");
    assert_eq!(element(&after.children[0]).text(), "c");

    assert_eq!(next.selection().focus, Point::new(vec![1, 0], 1));
    Ok(())
}

#[test]
fn unwrap_block_without_matching_ancestor_is_a_no_op() -> anyhow::Result<()> {
    let state = state(vec![Node::paragraph("plain")], caret(vec![0, 0], 0));

    let next = state
        .transform()
        .unwrap_block(BlockType::NumberedList)?
        .apply()?;

    assert_eq!(next, state);
    Ok(())
}

#[test]
fn split_block_mid_text_moves_caret_to_new_block() -> anyhow::Result<()> {
    let state = state(
        vec![Node::block(BlockType::HeadingOne, "hello")],
        caret(vec![0, 0], 2),
    );

    let next = state.transform().split_block()?.apply()?;

    let doc = next.document();
    assert_eq!(doc.children.len(), 2);
    assert_eq!(element(&doc.children[0]).text(), "he");
    assert_eq!(element(&doc.children[1]).text(), "llo");
    assert_eq!(element(&doc.children[1]).kind, "heading-one");
    assert_eq!(next.selection().focus, Point::new(vec![1, 0], 0));
    Ok(())
}

#[test]
fn delete_within_block_collapses_to_start() -> anyhow::Result<()> {
    let state = state(
        vec![Node::paragraph("hello world")],
        Selection::range(Point::new(vec![0, 0], 11), Point::new(vec![0, 0], 5)),
    );

    let next = state.transform().delete()?.apply()?;

    assert_eq!(element(&next.document().children[0]).text(), "hello");
    assert!(next.is_collapsed());
    assert_eq!(next.selection().focus, Point::new(vec![0, 0], 5));
    Ok(())
}

#[test]
fn delete_across_blocks_joins_remaining_text() -> anyhow::Result<()> {
    let state = state(
        vec![
            Node::paragraph("hello"),
            Node::paragraph("middle"),
            Node::paragraph("world"),
        ],
        Selection::range(Point::new(vec![0, 0], 2), Point::new(vec![2, 0], 3)),
    );

    let next = state.transform().delete()?.apply()?;

    let doc = next.document();
    assert_eq!(doc.children.len(), 1);
    assert_eq!(element(&doc.children[0]).text(), "held");
    assert_eq!(next.selection().focus, Point::new(vec![0, 0], 2));
    Ok(())
}

#[test]
fn delete_removes_list_container_left_empty() -> anyhow::Result<()> {
    let state = state(
        vec![
            Node::paragraph("keep"),
            Node::block_with(BlockType::NumberedList, vec![list_item("gone")]),
        ],
        Selection::range(Point::new(vec![0, 0], 4), Point::new(vec![1, 0, 0], 4)),
    );

    let next = state.transform().delete()?.apply()?;

    let doc = next.document();
    assert_eq!(doc.children.len(), 1);
    assert_eq!(element(&doc.children[0]).text(), "keep");
    Ok(())
}

#[test]
fn insert_text_replaces_expanded_selection() -> anyhow::Result<()> {
    let state = state(
        vec![Node::paragraph("hello")],
        Selection::range(Point::new(vec![0, 0], 1), Point::new(vec![0, 0], 4)),
    );

    let next = state.transform().insert_text("ipp")?.apply()?;

    assert_eq!(element(&next.document().children[0]).text(), "hippo");
    assert_eq!(next.selection().focus, Point::new(vec![0, 0], 4));
    assert!(next.is_collapsed());
    Ok(())
}

#[test]
fn extend_backward_moves_focus_only() -> anyhow::Result<()> {
    let state = state(vec![Node::paragraph("abcdef")], caret(vec![0, 0], 5));

    let next = state.transform().extend_backward(3)?.apply()?;

    assert_eq!(next.selection().anchor, Point::new(vec![0, 0], 5));
    assert_eq!(next.selection().focus, Point::new(vec![0, 0], 2));
    assert_eq!(next.start_offset(), 2);
    assert_eq!(next.end_offset(), 5);
    Ok(())
}

#[test]
fn extend_to_start_of_block_then_delete_clears_prefix() -> anyhow::Result<()> {
    let state = state(vec![Node::paragraph("## rest")], caret(vec![0, 0], 3));

    let next = state
        .transform()
        .extend_to_start_of_block()?
        .delete()?
        .apply()?;

    assert_eq!(element(&next.document().children[0]).text(), "rest");
    assert_eq!(next.selection().focus, Point::new(vec![0, 0], 0));
    Ok(())
}

#[test]
fn collapse_uses_document_order_for_backward_selections() -> anyhow::Result<()> {
    let state = state(
        vec![Node::paragraph("first"), Node::paragraph("second")],
        Selection::range(Point::new(vec![1, 0], 3), Point::new(vec![0, 0], 1)),
    );

    let start = state.transform().collapse_to_start()?.apply()?;
    assert_eq!(start.selection().focus, Point::new(vec![0, 0], 1));

    let end = state.transform().collapse_to_end()?.apply()?;
    assert_eq!(end.selection().focus, Point::new(vec![1, 0], 3));
    Ok(())
}

#[test]
fn transform_records_source_and_ops() -> anyhow::Result<()> {
    let state = state(vec![Node::paragraph("x")], caret(vec![0, 0], 1));

    let tx = state
        .transform()
        .source("test:insert")
        .insert_text("y")?;

    assert_eq!(tx.transaction().meta.source.as_deref(), Some("test:insert"));
    assert_eq!(tx.transaction().ops.len(), 1);
    assert_eq!(tx.transaction().ops[0].name(), "insert_text");
    assert_eq!(tx.transaction().ops[0].path(), &vec![0, 0]);
    assert!(!tx.transaction().is_empty());
    Ok(())
}

#[test]
fn original_state_is_untouched_by_transform() -> anyhow::Result<()> {
    let state = state(vec![Node::paragraph("same")], caret(vec![0, 0], 4));
    let before = state.clone();

    let next = state.transform().insert_text("!")?.apply()?;

    assert_eq!(state, before);
    assert_ne!(next, state);
    Ok(())
}

#[test]
fn focus_and_blur_flags() -> anyhow::Result<()> {
    let state = state(vec![Node::paragraph("")], caret(vec![0, 0], 0));
    assert!(state.is_blurred());

    let focused = state.focus();
    assert!(focused.is_focused());

    let blurred = focused.transform().blur().apply()?;
    assert!(blurred.is_blurred());
    Ok(())
}

#[test]
fn blocks_query_spans_start_to_end() {
    let state = state(
        vec![
            Node::paragraph("a"),
            Node::block_with(
                BlockType::BulletedList,
                vec![list_item("b"), list_item("c")],
            ),
            Node::paragraph("d"),
        ],
        Selection::range(Point::new(vec![1, 1, 0], 0), Point::new(vec![0, 0], 0)),
    );

    let blocks = state.blocks();
    let texts: Vec<String> = blocks.iter().map(|b| b.text()).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
    assert_eq!(state.start_block().map(|b| b.path), Some(vec![0]));
    assert_eq!(state.end_block().map(|b| b.path), Some(vec![1, 1]));

    let closest = state.closest(&[1, 1, 0], |el| el.is("bulleted-list"));
    assert_eq!(closest.map(|(path, _)| path), Some(vec![1]));
}
