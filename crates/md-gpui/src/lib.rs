mod button;
mod menu;

pub use button::*;
pub use menu::*;
