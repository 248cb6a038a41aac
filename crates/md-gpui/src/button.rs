use std::rc::Rc;

use gpui::InteractiveElement as _;
use gpui::StatefulInteractiveElement as _;
use gpui::prelude::FluentBuilder as _;
use gpui::{
    App, ClickEvent, ElementId, IntoElement, MouseButton, ParentElement, RenderOnce,
    SharedString, StyleRefinement, Styled, Window, div, px,
};
use gpui_component::ActiveTheme as _;
use gpui_component::Selectable;
use gpui_component::StyledExt as _;
use gpui_component::tooltip::Tooltip;
use plate_md_core::{BlockType, InlineType, MarkType};
use plate_md_editor::ToolbarAction;

/// Hover text for a toolbar action.
pub fn tooltip(action: ToolbarAction) -> &'static str {
    match action {
        ToolbarAction::Mark(MarkType::Bold) => "Bold",
        ToolbarAction::Mark(MarkType::Italic) => "Italic",
        ToolbarAction::Mark(MarkType::Underline) => "Underline",
        ToolbarAction::Mark(MarkType::Strikethrough) => "Strikethrough",
        ToolbarAction::Mark(MarkType::Code) => "Inline code",
        ToolbarAction::Inline(InlineType::Link) => "Link",
        ToolbarAction::Block(BlockType::Paragraph) => "Paragraph",
        ToolbarAction::Block(BlockType::HeadingOne) => "Heading 1",
        ToolbarAction::Block(BlockType::HeadingTwo) => "Heading 2",
        ToolbarAction::Block(BlockType::HeadingThree) => "Heading 3",
        ToolbarAction::Block(BlockType::HeadingFour) => "Heading 4",
        ToolbarAction::Block(BlockType::BlockQuote) => "Quote",
        ToolbarAction::Block(BlockType::CodeBlock) => "Code block",
        ToolbarAction::Block(BlockType::BulletedList) => "Bulleted list",
        ToolbarAction::Block(BlockType::NumberedList) => "Numbered list",
        ToolbarAction::Block(BlockType::ListItem) => "List item",
    }
}

/// Stable element id, unique per action within one menu.
pub fn button_id(action: ToolbarAction) -> SharedString {
    let kind = match action {
        ToolbarAction::Mark(mark) => mark.as_str(),
        ToolbarAction::Inline(inline) => inline.as_str(),
        ToolbarAction::Block(block) => block.as_str(),
    };
    format!("md-toolbar-{kind}").into()
}

/// One toolbar button. Pressing it never takes focus from the editor.
#[derive(IntoElement)]
pub struct MenuButton {
    id: ElementId,
    style: StyleRefinement,
    label: SharedString,
    tooltip: Option<SharedString>,
    selected: bool,
    on_click: Option<Rc<dyn Fn(&ClickEvent, &mut Window, &mut App)>>,
}

impl MenuButton {
    pub fn new(id: impl Into<ElementId>, label: impl Into<SharedString>) -> Self {
        Self {
            id: id.into(),
            style: StyleRefinement::default(),
            label: label.into(),
            tooltip: None,
            selected: false,
            on_click: None,
        }
    }

    pub fn tooltip(mut self, tooltip: impl Into<SharedString>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn on_click(
        mut self,
        on_click: impl Fn(&ClickEvent, &mut Window, &mut App) + 'static,
    ) -> Self {
        self.on_click = Some(Rc::new(on_click));
        self
    }
}

impl Styled for MenuButton {
    fn style(&mut self) -> &mut StyleRefinement {
        &mut self.style
    }
}

impl Selectable for MenuButton {
    fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    fn is_selected(&self) -> bool {
        self.selected
    }
}

impl RenderOnce for MenuButton {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        let theme = cx.theme();

        div()
            .id(self.id)
            .flex()
            .items_center()
            .justify_center()
            .h(px(28.))
            .min_w(px(28.))
            .px(px(6.))
            .rounded(px(6.))
            .text_size(px(12.))
            .font_weight(gpui::FontWeight::SEMIBOLD)
            .bg(theme.transparent)
            .text_color(theme.foreground)
            .cursor_pointer()
            .hover(|this| this.bg(theme.muted).text_color(theme.muted_foreground))
            .active(|this| this.bg(theme.accent).text_color(theme.accent_foreground))
            .when(self.selected, |this| {
                this.bg(theme.accent).text_color(theme.accent_foreground)
            })
            .refine_style(&self.style)
            .on_mouse_down(MouseButton::Left, |_, window, _| {
                window.prevent_default();
            })
            .when_some(self.on_click, |this, on_click| {
                this.on_click(move |event, window, cx| (on_click)(event, window, cx))
            })
            .child(self.label)
            .when_some(self.tooltip, |this, tooltip| {
                this.tooltip(move |window, cx| Tooltip::new(tooltip.clone()).build(window, cx))
            })
    }
}
