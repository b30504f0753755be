//! Sliding-window asynchronous image cache with transactional undo/redo.
//!
//! The core behind an image-navigation frontend: it keeps at most three
//! images (previous, current, next) materialized at any time, overlaps
//! disk/decode latency with user interaction by prefetching neighbors on
//! background threads, recomputes scaled/rotated variants lazily when they
//! are actually observed, and records reversible user operations (delete,
//! rotate, jump) whose inverses are re-derivable even when an operation has
//! side effects on the navigation position.
//!
//! Rendering, input handling, and file dialogs are external collaborators;
//! they drive a [`Session`] and read images back out of it. All calls into
//! the core must come from one logical control thread; only the load workers
//! run in the background, and their results cross back exactly once through
//! a blocking join.

pub mod cache;
pub mod codec;
pub mod error;
pub mod history;
pub mod record;
pub mod scan;
pub mod session;
pub mod transform;
pub mod window;

pub use cache::{LoadTask, LoadedPair, PrefetchSlot};
pub use error::{Error, Result};
pub use history::{Action, HistoryEngine};
pub use record::{ImageRecord, ViewportSize};
pub use scan::ScanConfig;
pub use session::{Config, Session};
pub use transform::{Transform, TransformRegistry};
pub use window::NavigationWindow;
