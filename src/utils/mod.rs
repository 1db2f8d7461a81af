//! Generic utility primitives with zero domain knowledge.
//!
//! - `shell` - Shell escaping and quoting
//! - `template` - `{{var}}` placeholder rendering

pub mod shell;
pub(crate) mod template;
