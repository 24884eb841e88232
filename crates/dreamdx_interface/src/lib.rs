//! Trait definitions for the DreamDX narrative service.
//!
//! - [`NarrativeDriver`] - the remote text generator
//! - [`NarrativeStore`] - key-value persistence of narrative records

mod driver;
mod store;

pub use driver::NarrativeDriver;
pub use store::NarrativeStore;
