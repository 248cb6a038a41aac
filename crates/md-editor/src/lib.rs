mod config;
mod editor;
mod menu;
mod prompt;
mod shortcuts;
mod toolbar;

pub use config::*;
pub use editor::*;
pub use menu::*;
pub use prompt::*;
pub use shortcuts::*;
pub use toolbar::*;

use std::sync::Arc;

use plate_md_core::{PluginRegistry, RegistryError, core_plugins};

/// Schema, normalization and markdown shortcuts.
pub fn default_registry() -> Result<Arc<PluginRegistry>, RegistryError> {
    let mut registry = PluginRegistry::new(core_plugins())?;
    registry.register_plugin(Box::new(MarkdownShortcutsPlugin))?;
    Ok(Arc::new(registry))
}
