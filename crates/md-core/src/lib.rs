mod core;
mod inline;
mod key;
mod ops;
mod plugin;
mod schema;
mod serde_value;
mod state;
mod transform;

pub use crate::core::*;
pub use crate::key::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::schema::*;
pub use crate::serde_value::*;
pub use crate::state::*;
pub use crate::transform::*;
