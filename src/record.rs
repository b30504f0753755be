//! Value types shared across the core: image identity and viewport size.

use std::path::PathBuf;

/// One entry in the traversal sequence.
///
/// Identity is the (directory, filename) pair value; records are immutable
/// once created. The ordered list of these is the traversal order, and
/// insertion order (directory scan order) is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub directory: PathBuf,
    pub filename: String,
}

impl ImageRecord {
    pub fn new(directory: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            filename: filename.into(),
        }
    }

    /// Full path of the image file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Size of the display viewport that scaled variants must fit into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
