//! The prefetch cache: one-shot background load tasks and the slots that
//! hold or produce one image's resident and scaled forms.

pub mod loader;
pub mod slot;

pub use loader::{LoadTask, LoadedPair};
pub use slot::PrefetchSlot;
