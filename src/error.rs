//! Error taxonomy for the navigation core.
//!
//! Three families of failures exist:
//! - Precondition violations (`NoImageAvailable`, `PositionMismatch`): logic
//!   errors, fatal to the operation in progress, never retried.
//! - Load failures (`Decode`, `WorkerPanicked`): fatal for one slot, surface
//!   when the slot is joined.
//! - Filesystem moves (`FileMove`): raised by deletion undo/redo.
//!
//! Navigating past either end of the image list is a defined no-op, not an
//! error, and never appears here.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// All failures the core can report to its callers.
///
/// The enum is `Clone` so that a failed load can be cached on its task and
/// handed out again on repeated joins.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A position-dependent accessor or operation ran against an empty list.
    #[error("no image available")]
    NoImageAvailable,

    /// History replay found the window at a different position than the one
    /// recorded when the action was created. Indicates corrupted history
    /// ordering, not a user-facing condition.
    #[error("history position mismatch: recorded {recorded}, current {current:?}")]
    PositionMismatch {
        recorded: usize,
        current: Option<usize>,
    },

    /// Decoding the image file failed. No partial-image recovery exists.
    #[error("failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// The background load thread panicked before producing a result.
    #[error("load worker for {path:?} panicked")]
    WorkerPanicked { path: PathBuf },

    /// Moving a file into or out of the discard folder failed.
    #[error("failed to move {from:?} to {to:?}: {reason}")]
    FileMove {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
}
