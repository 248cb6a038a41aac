use plate_md_core::{
    BlockType, DEFAULT_BLOCK, EditorState, Key, KeyEvent, KeyHandler, PlatePlugin,
    TransformError, list_container_for, markdown_type,
};

/// Markdown-style block formatting from the keyboard.
///
/// | key       | modifiers | rule                                     |
/// |-----------|-----------|------------------------------------------|
/// | space     | none      | block trigger (`#`, `-`, `1.`, `>`, ...) |
/// | backspace | none      | reset block at offset 0                  |
/// | enter     | none      | split headings, quotes and code to paragraph |
/// | enter     | shift     | literal newline in code and quotes       |
///
/// Every rule returns `Ok(None)` when the editor's default handling should
/// run instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownShortcuts;

impl KeyHandler for MarkdownShortcuts {
    fn id(&self) -> &'static str {
        "markdown.shortcuts"
    }

    fn on_key_down(
        &self,
        event: &KeyEvent,
        state: &EditorState,
    ) -> Result<Option<EditorState>, TransformError> {
        let modifiers = event.modifiers;
        match event.key {
            Key::Space if modifiers.is_empty() => Self::on_space(state),
            Key::Backspace if modifiers.is_empty() => Self::on_backspace(state),
            Key::Enter if modifiers.is_empty() => Self::on_enter(state),
            Key::Enter if modifiers.is_shift_only() => Self::on_shift_enter(state),
            _ => Ok(None),
        }
    }
}

impl MarkdownShortcuts {
    pub fn on_space(state: &EditorState) -> Result<Option<EditorState>, TransformError> {
        if state.is_expanded() {
            return Ok(None);
        }
        let Some(block) = state.start_block() else {
            return Ok(None);
        };
        let text = block.text();
        let Some(chars) = text.get(..state.start_offset()) else {
            return Ok(None);
        };
        let Some(kind) = markdown_type(chars) else {
            return Ok(None);
        };
        // Already a list item; typing a list trigger again must not nest it.
        if kind == BlockType::ListItem && block.element.is(BlockType::ListItem.as_str()) {
            return Ok(None);
        }

        let mut tx = state
            .transform()
            .source("shortcut:space")
            .set_block(kind)?;
        if kind == BlockType::ListItem {
            tx = tx.wrap_block(list_container_for(chars))?;
        }
        let next = tx.extend_to_start_of_block()?.delete()?.apply()?;

        tracing::debug!(trigger = chars, block = %kind, "markdown shortcut");
        Ok(Some(next))
    }

    pub fn on_backspace(state: &EditorState) -> Result<Option<EditorState>, TransformError> {
        if state.is_expanded() || state.start_offset() != 0 {
            return Ok(None);
        }
        let Some(block) = state.start_block() else {
            return Ok(None);
        };
        if block.element.is(DEFAULT_BLOCK.as_str()) {
            return Ok(None);
        }
        let was_list_item = block.element.is(BlockType::ListItem.as_str());

        let mut tx = state
            .transform()
            .source("shortcut:backspace")
            .set_block(DEFAULT_BLOCK)?;
        if was_list_item {
            tx = tx
                .unwrap_block(BlockType::BulletedList)?
                .unwrap_block(BlockType::NumberedList)?;
        }

        tracing::debug!(block = block.kind(), "reset block on backspace");
        Ok(Some(tx.apply()?))
    }

    pub fn on_enter(state: &EditorState) -> Result<Option<EditorState>, TransformError> {
        if state.is_expanded() {
            return Ok(None);
        }
        let Some(block) = state.start_block() else {
            return Ok(None);
        };
        if block.is_empty() {
            return Self::on_backspace(state);
        }
        if state.start_offset() != block.len() {
            return Ok(None);
        }

        match block.block_type() {
            Some(kind) if kind.is_heading() => {}
            Some(BlockType::BlockQuote | BlockType::CodeBlock) => {}
            _ => return Ok(None),
        }

        let next = state
            .transform()
            .source("shortcut:enter")
            .split_block()?
            .set_block(DEFAULT_BLOCK)?
            .apply()?;

        tracing::debug!(block = block.kind(), "split block on enter");
        Ok(Some(next))
    }

    pub fn on_shift_enter(state: &EditorState) -> Result<Option<EditorState>, TransformError> {
        let Some(block) = state.start_block() else {
            return Ok(None);
        };
        if !matches!(
            block.block_type(),
            Some(BlockType::CodeBlock | BlockType::BlockQuote)
        ) {
            return Ok(None);
        }

        let mut tx = state.transform().source("shortcut:shift_enter");
        if state.is_expanded() {
            tx = tx.delete()?;
        }
        Ok(Some(tx.insert_text("\n")?.apply()?))
    }
}

pub struct MarkdownShortcutsPlugin;

impl PlatePlugin for MarkdownShortcutsPlugin {
    fn id(&self) -> &'static str {
        "markdown_shortcuts"
    }

    fn key_handlers(&self) -> Vec<Box<dyn KeyHandler>> {
        vec![Box::new(MarkdownShortcuts)]
    }
}
