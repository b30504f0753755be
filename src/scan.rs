//! Directory scanning that builds the traversal order.
//!
//! Walks each requested directory with walkdir, skipping any subfolder named
//! after the discard directory, and collects files whose extension matches
//! the image allow-list. Entries are sorted by path so the traversal order is
//! deterministic across runs.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::record::ImageRecord;

/// Extensions accepted into the traversal order, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "bmp", "gif", "png", "ppm", "pmb", "pgm", "xbm", "xpm",
];

/// Configuration for building the traversal order.
///
/// Passed in at construction; there is no global mutable configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to scan directories recursively.
    pub recursive: bool,
    /// Maximum directory depth (0 = unlimited).
    pub max_depth: usize,
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
    /// Name of the subfolder discarded images are moved into; excluded from
    /// scans.
    pub discard_dir_name: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 0, // unlimited
            follow_symlinks: false,
            discard_dir_name: "discarded".to_string(),
        }
    }
}

/// Whether a filename carries an allowed image extension, case-insensitive.
pub fn is_image_file(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_lowercase(),
        None => return false,
    };
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Walks each directory and collects the image records forming the traversal
/// order. Non-directory arguments are skipped with a warning.
pub fn scan_directories(dirs: &[PathBuf], config: &ScanConfig) -> Vec<ImageRecord> {
    let mut records = Vec::new();

    for dir in dirs {
        if !dir.is_dir() {
            warn!(?dir, "Skipping non-directory scan root");
            continue;
        }
        let found = scan_one(dir, config);
        debug!(?dir, count = found.len(), "Scanned directory");
        records.extend(found);
    }

    // Sort by path for consistent ordering
    records.sort_by_key(|r| r.path());

    info!(total = records.len(), "Built traversal order");
    records
}

fn scan_one(dir: &Path, config: &ScanConfig) -> Vec<ImageRecord> {
    let mut walker = WalkDir::new(dir).follow_links(config.follow_symlinks);

    if !config.recursive {
        walker = walker.max_depth(1);
    } else if config.max_depth > 0 {
        walker = walker.max_depth(config.max_depth);
    }

    let discard_name = config.discard_dir_name.as_str();

    walker
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == discard_name))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_image_file(e.path()))
        .filter_map(|e| {
            let filename = e.file_name().to_str()?.to_string();
            let directory = e.path().parent()?.to_path_buf();
            Some(ImageRecord::new(directory, filename))
        })
        .collect()
}
