use plate_md_core::{
    BlockType, Document, EditorState, ElementNode, InlineType, MarkType, Node, Point, Selection,
};
use plate_md_editor::{
    LINK_TEXT_PROMPT, LINK_URL_PROMPT, ToolbarAction, ToolbarConfig, ToolbarController,
    default_registry,
};

fn controller(children: Vec<Node>, selection: Selection) -> anyhow::Result<ToolbarController> {
    let state = EditorState::new(Document { children }, selection, default_registry()?);
    Ok(ToolbarController::new(state))
}

fn caret(path: Vec<usize>, offset: usize) -> Selection {
    Selection::collapsed(Point::new(path, offset))
}

fn element(node: &Node) -> &ElementNode {
    let Node::Element(el) = node else {
        panic!("expected element, got {node:?}");
    };
    el
}

fn top_kinds(toolbar: &ToolbarController) -> Vec<String> {
    toolbar
        .state()
        .document()
        .children
        .iter()
        .map(|n| element(n).kind.clone())
        .collect()
}

#[test]
fn non_list_block_toggle_round_trips_to_paragraph() -> anyhow::Result<()> {
    for kind in [
        BlockType::HeadingOne,
        BlockType::HeadingTwo,
        BlockType::HeadingThree,
        BlockType::HeadingFour,
        BlockType::BlockQuote,
        BlockType::CodeBlock,
    ] {
        let mut toolbar = controller(vec![Node::paragraph("text")], caret(vec![0, 0], 2))?;

        assert!(toolbar.click_block(kind)?);
        assert_eq!(top_kinds(&toolbar), vec![kind.as_str()]);
        assert!(toolbar.has_block(kind));

        assert!(toolbar.click_block(kind)?);
        assert_eq!(top_kinds(&toolbar), vec!["paragraph"]);
        assert!(!toolbar.has_block(kind));
        assert_eq!(element(&toolbar.state().document().children[0]).text(), "text");
    }
    Ok(())
}

#[test]
fn heading_toggle_inside_list_exits_the_list() -> anyhow::Result<()> {
    let mut toolbar = controller(
        vec![Node::block_with(
            BlockType::BulletedList,
            vec![Node::block(BlockType::ListItem, "item")],
        )],
        caret(vec![0, 0, 0], 0),
    )?;

    toolbar.click_block(BlockType::HeadingOne)?;

    assert_eq!(top_kinds(&toolbar), vec!["heading-one"]);
    assert!(!toolbar.has_block(BlockType::BulletedList));
    Ok(())
}

#[test]
fn entering_bulleted_list_then_switching_to_numbered() -> anyhow::Result<()> {
    let mut toolbar = controller(vec![Node::paragraph("item")], caret(vec![0, 0], 4))?;

    toolbar.click_block(BlockType::BulletedList)?;
    assert_eq!(top_kinds(&toolbar), vec!["bulleted-list"]);
    assert!(toolbar.has_block(BlockType::BulletedList));
    assert!(toolbar.has_block(BlockType::ListItem));

    toolbar.click_block(BlockType::NumberedList)?;

    let doc = toolbar.state().document();
    assert_eq!(doc.children.len(), 1);
    let list = element(&doc.children[0]);
    assert_eq!(list.kind, "numbered-list");
    assert_eq!(list.children.len(), 1);
    let item = element(&list.children[0]);
    assert_eq!(item.kind, "list-item");
    assert_eq!(item.text(), "item");
    assert!(!toolbar.has_block(BlockType::BulletedList));
    Ok(())
}

#[test]
fn clicking_active_list_type_exits_list() -> anyhow::Result<()> {
    let mut toolbar = controller(
        vec![Node::block_with(
            BlockType::NumberedList,
            vec![
                Node::block(BlockType::ListItem, "one"),
                Node::block(BlockType::ListItem, "two"),
            ],
        )],
        caret(vec![0, 1, 0], 0),
    )?;

    toolbar.click_block(BlockType::NumberedList)?;

    assert_eq!(top_kinds(&toolbar), vec!["numbered-list", "paragraph"]);
    let list = element(&toolbar.state().document().children[0]);
    assert_eq!(list.children.len(), 1);
    assert!(!toolbar.has_block(BlockType::ListItem));
    Ok(())
}

#[test]
fn mark_click_toggles_mark_and_active_flag() -> anyhow::Result<()> {
    let mut toolbar = controller(
        vec![Node::paragraph("hello")],
        Selection::range(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 5)),
    )?;
    assert!(!toolbar.has_mark(MarkType::Bold));

    assert!(toolbar.click_mark(MarkType::Bold)?);
    assert!(toolbar.has_mark(MarkType::Bold));

    assert!(toolbar.click_mark(MarkType::Bold)?);
    assert!(!toolbar.has_mark(MarkType::Bold));
    Ok(())
}

#[test]
fn link_on_range_wraps_and_collapses_to_end() -> anyhow::Result<()> {
    let mut toolbar = controller(
        vec![Node::paragraph("read more")],
        Selection::range(Point::new(vec![0, 0], 5), Point::new(vec![0, 0], 9)),
    )?;
    let mut asked = Vec::new();
    let mut prompt = |message: &str| {
        asked.push(message.to_string());
        Some("https://example.com".to_string())
    };

    assert!(toolbar.click_link(&mut prompt)?);

    assert_eq!(asked, vec![LINK_URL_PROMPT]);
    assert!(toolbar.state().is_collapsed());
    assert!(toolbar.has_inline(InlineType::Link));
    let block = element(&toolbar.state().document().children[0]);
    let link = element(&block.children[1]);
    assert_eq!(link.href(), Some("https://example.com"));
    assert_eq!(link.text(), "more");
    assert_eq!(toolbar.state().selection().focus, Point::new(vec![0, 1, 0], 4));
    Ok(())
}

#[test]
fn link_click_on_existing_link_removes_it() -> anyhow::Result<()> {
    let mut toolbar = controller(
        vec![Node::block_with(
            BlockType::Paragraph,
            vec![Node::text("a "), Node::link("https://example.com", "link")],
        )],
        Selection::range(Point::new(vec![0, 0], 0), Point::new(vec![0, 1, 0], 4)),
    )?;
    assert!(toolbar.has_inline(InlineType::Link));
    let mut prompt = |_: &str| -> Option<String> { panic!("no prompt expected") };

    assert!(toolbar.click_link(&mut prompt)?);

    assert!(!toolbar.has_inline(InlineType::Link));
    assert_eq!(
        toolbar.state().document().children,
        vec![Node::paragraph("a link")]
    );
    Ok(())
}

#[test]
fn link_on_caret_asks_for_url_then_text() -> anyhow::Result<()> {
    let mut toolbar = controller(vec![Node::paragraph("go ")], caret(vec![0, 0], 3))?;
    let mut answers = vec![Some("Rust".to_string()), Some("https://rust-lang.org".to_string())];
    let mut asked = Vec::new();
    let mut prompt = |message: &str| {
        asked.push(message.to_string());
        answers.pop().flatten()
    };

    assert!(toolbar.click_link(&mut prompt)?);

    assert_eq!(asked, vec![LINK_URL_PROMPT, LINK_TEXT_PROMPT]);
    let block = element(&toolbar.state().document().children[0]);
    assert_eq!(block.text(), "go Rust");
    let link = element(&block.children[1]);
    assert_eq!(link.href(), Some("https://rust-lang.org"));
    assert_eq!(link.text(), "Rust");
    assert!(toolbar.state().is_collapsed());
    assert_eq!(toolbar.state().selection().focus, Point::new(vec![0, 1, 0], 4));
    Ok(())
}

#[test]
fn cancelled_link_prompts_leave_state_untouched() -> anyhow::Result<()> {
    let mut toolbar = controller(vec![Node::paragraph("text")], caret(vec![0, 0], 4))?;
    let before = toolbar.state().clone();

    let mut cancel = |_: &str| -> Option<String> { None };
    assert!(!toolbar.click_link(&mut cancel)?);
    assert_eq!(toolbar.state(), &before);

    // An empty URL is a cancel too, and the text prompt is never shown.
    let mut asked = 0;
    let mut empty = |_: &str| {
        asked += 1;
        Some(String::new())
    };
    assert!(!toolbar.click_link(&mut empty)?);
    assert_eq!(asked, 1);
    assert_eq!(toolbar.state(), &before);

    // URL given, text cancelled.
    let mut answers = vec![None, Some("https://example.com".to_string())];
    let mut no_text = |_: &str| answers.pop().flatten();
    assert!(!toolbar.click_link(&mut no_text)?);
    assert_eq!(toolbar.state(), &before);
    Ok(())
}

#[test]
fn buttons_follow_config_order_and_reflect_state() -> anyhow::Result<()> {
    let toolbar = controller(
        vec![Node::block(BlockType::HeadingOne, "Title")],
        caret(vec![0, 0], 0),
    )?;

    let buttons = toolbar.buttons(&ToolbarConfig::default());
    let labels: Vec<&str> = buttons.iter().map(|b| b.label).collect();
    assert_eq!(
        labels,
        vec!["B", "I", "U", "S", "`", "link", "\u{201c}", "H1", "H2", "ul", "ol", "<>"]
    );

    let active: Vec<ToolbarAction> = buttons
        .iter()
        .filter(|b| b.active)
        .map(|b| b.action)
        .collect();
    assert_eq!(active, vec![ToolbarAction::Block(BlockType::HeadingOne)]);

    let config = ToolbarConfig {
        marks: vec![MarkType::Code],
        link: false,
        blocks: vec![BlockType::HeadingThree],
    };
    let labels: Vec<&str> = toolbar.buttons(&config).iter().map(|b| b.label).collect();
    assert_eq!(labels, vec!["`", "H3"]);
    Ok(())
}

#[test]
fn click_dispatches_by_action() -> anyhow::Result<()> {
    let mut toolbar = controller(vec![Node::paragraph("x")], caret(vec![0, 0], 1))?;
    let mut prompt = |_: &str| -> Option<String> { None };

    toolbar.click(ToolbarAction::Block(BlockType::BlockQuote), &mut prompt)?;
    assert!(toolbar.is_active(ToolbarAction::Block(BlockType::BlockQuote)));

    toolbar.click(ToolbarAction::Mark(MarkType::Underline), &mut prompt)?;
    assert!(toolbar.is_active(ToolbarAction::Mark(MarkType::Underline)));

    assert!(!toolbar.click(ToolbarAction::Inline(InlineType::Link), &mut prompt)?);
    Ok(())
}

#[test]
fn list_item_click_is_ignored_inside_and_outside_lists() -> anyhow::Result<()> {
    let mut plain = controller(vec![Node::paragraph("item")], caret(vec![0, 0], 0))?;
    assert!(!plain.click_block(BlockType::ListItem)?);
    assert_eq!(top_kinds(&plain), vec!["paragraph"]);

    let mut listed = controller(
        vec![Node::block_with(
            BlockType::BulletedList,
            vec![Node::block(BlockType::ListItem, "item")],
        )],
        caret(vec![0, 0, 0], 0),
    )?;
    assert!(!listed.click_block(BlockType::ListItem)?);
    assert_eq!(top_kinds(&listed), vec!["bulleted-list"]);
    assert!(listed.has_block(BlockType::ListItem));
    Ok(())
}
