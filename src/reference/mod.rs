// ABOUTME: Reference expansion module for the trellis workflow engine
// ABOUTME: Resolves $[dotted.path] placeholders against live instance state

pub mod path;
pub mod resolver;

pub use path::ReferencePath;
pub use resolver::{resolve_task, resolve_value, value_to_string};
