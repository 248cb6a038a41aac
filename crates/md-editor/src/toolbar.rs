use plate_md_core::{
    BlockType, DEFAULT_BLOCK, EditorState, InlineType, MarkType, TransformError, link_attrs,
};
use serde::{Deserialize, Serialize};

use crate::config::ToolbarConfig;
use crate::prompt::{LINK_TEXT_PROMPT, LINK_URL_PROMPT, Prompt, ask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "kind", rename_all = "snake_case")]
pub enum ToolbarAction {
    Mark(MarkType),
    Inline(InlineType),
    Block(BlockType),
}

impl ToolbarAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Mark(MarkType::Bold) => "B",
            Self::Mark(MarkType::Italic) => "I",
            Self::Mark(MarkType::Underline) => "U",
            Self::Mark(MarkType::Strikethrough) => "S",
            Self::Mark(MarkType::Code) => "`",
            Self::Inline(InlineType::Link) => "link",
            Self::Block(BlockType::Paragraph) => "\u{b6}",
            Self::Block(BlockType::HeadingOne) => "H1",
            Self::Block(BlockType::HeadingTwo) => "H2",
            Self::Block(BlockType::HeadingThree) => "H3",
            Self::Block(BlockType::HeadingFour) => "H4",
            Self::Block(BlockType::BlockQuote) => "\u{201c}",
            Self::Block(BlockType::CodeBlock) => "<>",
            Self::Block(BlockType::BulletedList) => "ul",
            Self::Block(BlockType::NumberedList) => "ol",
            Self::Block(BlockType::ListItem) => "li",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolbarButton {
    pub action: ToolbarAction,
    pub label: &'static str,
    pub active: bool,
}

/// Owns the current state and turns toolbar clicks into transforms.
#[derive(Debug, Clone)]
pub struct ToolbarController {
    state: EditorState,
}

impl ToolbarController {
    pub fn new(state: EditorState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn set_state(&mut self, state: EditorState) {
        self.state = state;
    }

    pub fn into_state(self) -> EditorState {
        self.state
    }

    pub fn has_mark(&self, mark: MarkType) -> bool {
        self.state.marks().contains(&mark)
    }

    /// True when a selected block is `kind` or sits inside a `kind` element.
    pub fn has_block(&self, kind: BlockType) -> bool {
        self.state.blocks().iter().any(|block| {
            block.element.is(kind.as_str())
                || self
                    .state
                    .closest(&block.path, |el| el.is(kind.as_str()))
                    .is_some()
        })
    }

    pub fn has_inline(&self, kind: InlineType) -> bool {
        self.state
            .inlines()
            .iter()
            .any(|(_, el)| el.is(kind.as_str()))
    }

    pub fn is_active(&self, action: ToolbarAction) -> bool {
        match action {
            ToolbarAction::Mark(mark) => self.has_mark(mark),
            ToolbarAction::Inline(kind) => self.has_inline(kind),
            ToolbarAction::Block(kind) => self.has_block(kind),
        }
    }

    pub fn buttons(&self, config: &ToolbarConfig) -> Vec<ToolbarButton> {
        let marks = config.marks.iter().map(|m| ToolbarAction::Mark(*m));
        let link = config
            .link
            .then_some(ToolbarAction::Inline(InlineType::Link));
        let blocks = config.blocks.iter().map(|b| ToolbarAction::Block(*b));

        marks
            .chain(link)
            .chain(blocks)
            .map(|action| ToolbarButton {
                action,
                label: action.label(),
                active: self.is_active(action),
            })
            .collect()
    }

    pub fn click(
        &mut self,
        action: ToolbarAction,
        prompt: &mut dyn Prompt,
    ) -> Result<bool, TransformError> {
        match action {
            ToolbarAction::Mark(mark) => self.click_mark(mark),
            ToolbarAction::Inline(InlineType::Link) => self.click_link(prompt),
            ToolbarAction::Block(kind) => self.click_block(kind),
        }
    }

    pub fn click_mark(&mut self, mark: MarkType) -> Result<bool, TransformError> {
        let next = self
            .state
            .transform()
            .source("toolbar:mark")
            .toggle_mark(mark)?
            .apply()?;
        Ok(self.commit(next))
    }

    pub fn click_block(&mut self, kind: BlockType) -> Result<bool, TransformError> {
        // An item only exists inside a list; the list buttons create one.
        if kind == BlockType::ListItem {
            tracing::debug!("ignored list-item click");
            return Ok(false);
        }

        let tx = self.state.transform().source("toolbar:block");
        let is_list = self.has_block(BlockType::ListItem);

        let tx = if kind.is_list_container() {
            let is_type = self
                .state
                .blocks()
                .iter()
                .any(|block| self.state.closest(&block.path, |el| el.is(kind.as_str())).is_some());

            if is_list && is_type {
                tx.set_block(DEFAULT_BLOCK)?
                    .unwrap_block(BlockType::BulletedList)?
                    .unwrap_block(BlockType::NumberedList)?
            } else if is_list {
                match kind.other_list() {
                    Some(other) => tx.unwrap_block(other)?.wrap_block(kind)?,
                    None => tx,
                }
            } else {
                tx.set_block(BlockType::ListItem)?.wrap_block(kind)?
            }
        } else {
            let target = if self.has_block(kind) { DEFAULT_BLOCK } else { kind };
            let tx = tx.set_block(target)?;
            if is_list {
                tx.unwrap_block(BlockType::BulletedList)?
                    .unwrap_block(BlockType::NumberedList)?
            } else {
                tx
            }
        };

        let next = tx.apply()?;
        Ok(self.commit(next))
    }

    /// Removes a selected link, or asks for a URL (and, on a caret, the link
    /// text) and inserts one. A cancelled prompt leaves the state untouched.
    pub fn click_link(&mut self, prompt: &mut dyn Prompt) -> Result<bool, TransformError> {
        let tx = self.state.transform().source("toolbar:link");

        let tx = if self.has_inline(InlineType::Link) {
            tx.unwrap_inline(InlineType::Link)?
        } else if self.state.is_expanded() {
            let Some(href) = ask(prompt, LINK_URL_PROMPT) else {
                return Ok(false);
            };
            tx.wrap_inline(InlineType::Link, link_attrs(href))?
                .collapse_to_end()?
        } else {
            let Some(href) = ask(prompt, LINK_URL_PROMPT) else {
                return Ok(false);
            };
            let Some(text) = ask(prompt, LINK_TEXT_PROMPT) else {
                return Ok(false);
            };
            tx.insert_text(&text)?
                .extend_backward(text.len())?
                .wrap_inline(InlineType::Link, link_attrs(href))?
                .collapse_to_end()?
        };

        let next = tx.apply()?;
        Ok(self.commit(next))
    }

    fn commit(&mut self, next: EditorState) -> bool {
        if next == self.state {
            return false;
        }
        self.state = next;
        true
    }
}
