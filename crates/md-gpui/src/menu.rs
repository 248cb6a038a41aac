use std::rc::Rc;

use gpui::InteractiveElement as _;
use gpui::{App, ElementId, IntoElement, ParentElement, RenderOnce, Styled, Window, div, px};
use gpui_component::ActiveTheme as _;
use gpui_component::Selectable as _;
use plate_md_editor::{MarkdownEditor, MenuStyle, ToolbarAction, ToolbarButton};

use crate::button::{MenuButton, button_id, tooltip};

/// Where a closed menu sits: off-page and transparent.
pub const HIDDEN_MENU_STYLE: MenuStyle = MenuStyle {
    top: -10000.0,
    left: -10000.0,
    opacity: 0.0,
};

/// The floating formatting menu. Renders one [`MenuButton`] per toolbar
/// button, in toolbar order, at the placement the positioner computed.
#[derive(IntoElement)]
pub struct FloatingMenu {
    id: ElementId,
    buttons: Vec<ToolbarButton>,
    placement: MenuStyle,
    on_action: Option<Rc<dyn Fn(ToolbarAction, &mut Window, &mut App)>>,
}

impl FloatingMenu {
    pub fn new(id: impl Into<ElementId>, buttons: Vec<ToolbarButton>) -> Self {
        Self {
            id: id.into(),
            buttons,
            placement: HIDDEN_MENU_STYLE,
            on_action: None,
        }
    }

    /// Buttons for the editor's current state and configuration; hidden
    /// unless the menu is open.
    pub fn for_editor(id: impl Into<ElementId>, editor: &MarkdownEditor) -> Self {
        Self::new(id, editor.buttons())
    }

    /// `None` hides the menu.
    pub fn placement(mut self, placement: Option<MenuStyle>) -> Self {
        self.placement = placement.unwrap_or(HIDDEN_MENU_STYLE);
        self
    }

    /// Called with the clicked button's action; the host routes it to
    /// [`MarkdownEditor::on_click`].
    pub fn on_action(
        mut self,
        on_action: impl Fn(ToolbarAction, &mut Window, &mut App) + 'static,
    ) -> Self {
        self.on_action = Some(Rc::new(on_action));
        self
    }
}

impl RenderOnce for FloatingMenu {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        let theme = cx.theme();
        let Self {
            id,
            buttons,
            placement,
            on_action,
        } = self;

        let buttons = buttons.into_iter().map(move |button| {
            let action = button.action;
            let mut rendered = MenuButton::new(button_id(action), button.label)
                .tooltip(tooltip(action))
                .selected(button.active);
            if let Some(on_action) = on_action.clone() {
                rendered = rendered.on_click(move |_, window, cx| on_action(action, window, cx));
            }
            rendered
        });

        div()
            .id(id)
            .absolute()
            .top(px(placement.top as f32))
            .left(px(placement.left as f32))
            .opacity(placement.opacity as f32)
            .flex()
            .items_center()
            .gap(px(2.))
            .p(px(4.))
            .rounded(px(8.))
            .border_1()
            .border_color(theme.border)
            .bg(theme.background)
            .shadow_md()
            .children(buttons)
    }
}
