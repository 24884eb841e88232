//! Narrative persistence backends for DreamDX.
//!
//! Both backends implement [`NarrativeStore`] with overwrite-on-put semantics
//! keyed by (user, session).
//!
//! [`NarrativeStore`]: dreamdx_interface::NarrativeStore

mod json_file;
mod memory;

pub use json_file::JsonFileNarrativeStore;
pub use memory::InMemoryNarrativeStore;
