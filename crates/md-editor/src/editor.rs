use std::cell::RefCell;
use std::rc::Rc;

use plate_md_core::{BlockType, EditorState, KeyEvent, MarkType, TransformError};

use crate::config::{ConfigError, ToolbarConfig};
use crate::menu::{MenuPositioner, MenuSurface, MenuUpdate, SelectionGeometry};
use crate::prompt::Prompt;
use crate::toolbar::{ToolbarAction, ToolbarButton, ToolbarController};

/// Host-facing editor: the toolbar controller, the keyboard shortcuts from
/// the state's registry and the floating menu, reporting every new state
/// through `on_change`.
pub struct MarkdownEditor {
    toolbar: ToolbarController,
    config: ToolbarConfig,
    on_change: Box<dyn FnMut(&EditorState)>,
    positioner: MenuPositioner,
}

impl MarkdownEditor {
    pub fn new(initial: EditorState, on_change: impl FnMut(&EditorState) + 'static) -> Self {
        Self {
            toolbar: ToolbarController::new(initial),
            config: ToolbarConfig::default(),
            on_change: Box::new(on_change),
            positioner: MenuPositioner::new(),
        }
    }

    pub fn with_config(mut self, config: ToolbarConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &ToolbarConfig {
        &self.config
    }

    pub fn state(&self) -> &EditorState {
        self.toolbar.state()
    }

    pub fn toolbar(&self) -> &ToolbarController {
        &self.toolbar
    }

    /// A change made by the editing surface itself (typing, selection, focus).
    pub fn on_change(&mut self, state: EditorState) {
        self.toolbar.set_state(state);
        self.notify();
    }

    /// Called once the floating menu has been rendered.
    pub fn on_open<M: MenuSurface + 'static>(&mut self, menu: &Rc<RefCell<M>>) {
        self.positioner.attach(menu);
    }

    pub fn is_menu_open(&self) -> bool {
        self.state().is_expanded() && self.state().is_focused()
    }

    pub fn buttons(&self) -> Vec<ToolbarButton> {
        self.toolbar.buttons(&self.config)
    }

    pub fn on_click(
        &mut self,
        action: ToolbarAction,
        prompt: &mut dyn Prompt,
    ) -> Result<(), TransformError> {
        if self.toolbar.click(action, prompt)? {
            self.notify();
        }
        Ok(())
    }

    pub fn on_click_mark(&mut self, mark: MarkType) -> Result<(), TransformError> {
        if self.toolbar.click_mark(mark)? {
            self.notify();
        }
        Ok(())
    }

    pub fn on_click_block(&mut self, kind: BlockType) -> Result<(), TransformError> {
        if self.toolbar.click_block(kind)? {
            self.notify();
        }
        Ok(())
    }

    pub fn on_click_link(&mut self, prompt: &mut dyn Prompt) -> Result<(), TransformError> {
        if self.toolbar.click_link(prompt)? {
            self.notify();
        }
        Ok(())
    }

    /// Offers `event` to the registry's key handlers in order. Returns `true`
    /// when one of them handled it and the default behaviour must not run.
    pub fn on_key_down(&mut self, event: &KeyEvent) -> Result<bool, TransformError> {
        let registry = self.state().registry().clone();
        for handler in registry.key_handlers() {
            let Some(next) = handler.on_key_down(event, self.state())? else {
                continue;
            };
            tracing::debug!(handler = handler.id(), key = ?event.key, "key handled");
            self.toolbar.set_state(next);
            self.notify();
            return Ok(true);
        }
        Ok(false)
    }

    /// Mount/update hook: repositions the floating menu.
    pub fn update_menu(&self, geometry: &dyn SelectionGeometry) -> MenuUpdate {
        self.positioner.update(self.state(), geometry)
    }

    fn notify(&mut self) {
        (self.on_change)(self.toolbar.state());
    }
}

impl std::fmt::Debug for MarkdownEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownEditor")
            .field("state", self.state())
            .field("config", &self.config)
            .field("positioner", &self.positioner)
            .finish_non_exhaustive()
    }
}
