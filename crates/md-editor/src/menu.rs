use std::cell::RefCell;
use std::rc::{Rc, Weak};

use plate_md_core::EditorState;
use serde::{Deserialize, Serialize};

/// Viewport-relative bounding box, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scroll {
    pub x: f64,
    pub y: f64,
}

/// Absolute page position of the floating menu.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MenuStyle {
    pub top: f64,
    pub left: f64,
    pub opacity: f64,
}

impl MenuStyle {
    pub fn to_css(&self) -> String {
        format!(
            "top: {}px; left: {}px; opacity: {};",
            self.top, self.left, self.opacity
        )
    }
}

/// The rendered floating menu.
pub trait MenuSurface {
    fn size(&self) -> Size;
    fn set_style(&mut self, style: MenuStyle);
    fn clear_style(&mut self);
}

/// Host lookup of where the selection is drawn.
pub trait SelectionGeometry {
    fn selection_rect(&self) -> Option<Rect>;
    fn scroll(&self) -> Scroll;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MenuUpdate {
    /// No menu has been opened yet, or it has been dropped.
    Unmounted,
    Hidden,
    Positioned(MenuStyle),
}

/// Centers the menu horizontally over `rect`, directly above it.
pub fn place_menu(rect: Rect, scroll: Scroll, menu: Size) -> MenuStyle {
    MenuStyle {
        top: rect.top + scroll.y - menu.height,
        left: rect.left + scroll.x - menu.width / 2.0 + rect.width / 2.0,
        opacity: 1.0,
    }
}

/// Keeps the menu next to the selection. Holds the surface weakly; the host
/// owns it.
#[derive(Default)]
pub struct MenuPositioner {
    menu: Option<Weak<RefCell<dyn MenuSurface>>>,
}

impl MenuPositioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach<M: MenuSurface + 'static>(&mut self, menu: &Rc<RefCell<M>>) {
        let menu: Rc<RefCell<dyn MenuSurface>> = menu.clone();
        self.menu = Some(Rc::downgrade(&menu));
    }

    pub fn detach(&mut self) {
        self.menu = None;
    }

    pub fn is_attached(&self) -> bool {
        self.menu
            .as_ref()
            .is_some_and(|menu| menu.strong_count() > 0)
    }

    pub fn update(&self, state: &EditorState, geometry: &dyn SelectionGeometry) -> MenuUpdate {
        let Some(menu) = self.menu.as_ref().and_then(Weak::upgrade) else {
            return MenuUpdate::Unmounted;
        };

        if state.is_blurred() || state.is_collapsed() {
            menu.borrow_mut().clear_style();
            return MenuUpdate::Hidden;
        }

        let Some(rect) = geometry.selection_rect() else {
            menu.borrow_mut().clear_style();
            return MenuUpdate::Hidden;
        };

        let size = menu.borrow().size();
        let style = place_menu(rect, geometry.scroll(), size);
        menu.borrow_mut().set_style(style);
        MenuUpdate::Positioned(style)
    }
}

impl std::fmt::Debug for MenuPositioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuPositioner")
            .field("attached", &self.is_attached())
            .finish()
    }
}
