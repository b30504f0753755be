//! Accumulated per-path rotation/mirror state.
//!
//! `Transform` models the right-angle dihedral transforms an image can carry:
//! an optional horizontal mirror followed by 0-3 clockwise quarter turns.
//! That covers the eight EXIF orientation codes and every user rotation, and
//! composes exactly (no floating-point drift across long undo chains).
//!
//! `TransformRegistry` maps image paths to their accumulated transform. It is
//! independent of cache residency: entries survive navigation and are removed
//! on discard, full reset, and after a durable save bakes them into pixels.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::warn;

/// A composable rotation/mirror transform.
///
/// Canonical form: mirror (if any) is applied first, then `quarter_turns`
/// clockwise quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transform {
    mirrored: bool,
    quarter_turns: u8,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        mirrored: false,
        quarter_turns: 0,
    };

    pub const MIRROR: Transform = Transform {
        mirrored: true,
        quarter_turns: 0,
    };

    /// A clockwise rotation by the given number of degrees.
    ///
    /// Only right-angle rotations are representable; anything else is rounded
    /// to the nearest multiple of 90 with a warning.
    pub fn rotation(degrees: i32) -> Self {
        let mut normalized = degrees.rem_euclid(360);
        if normalized % 90 != 0 {
            warn!(degrees, "rotation is not a right-angle multiple, rounding");
            normalized = (normalized + 45) / 90 * 90 % 360;
        }
        Transform {
            mirrored: false,
            quarter_turns: (normalized / 90) as u8,
        }
    }

    /// The corrective transform for a standard EXIF orientation code.
    ///
    /// Codes outside 1..=8 are the caller's problem; the codec treats them as
    /// identity before ever reaching here.
    pub fn from_exif_orientation(orientation: u8) -> Self {
        match orientation {
            2 => Self::MIRROR,
            3 => Self::rotation(180),
            4 => Self::MIRROR.then(Self::rotation(180)),
            5 => Self::rotation(90).then(Self::MIRROR),
            6 => Self::rotation(90),
            7 => Self::rotation(270).then(Self::MIRROR),
            8 => Self::rotation(270),
            _ => Self::IDENTITY,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Composition: apply `self` first, then `next`.
    pub fn then(self, next: Transform) -> Transform {
        // Pull self's rotation through next's mirror: M R_q = R_(4-q) M.
        let turns = if next.mirrored {
            (4 - self.quarter_turns) % 4
        } else {
            self.quarter_turns
        };
        Transform {
            mirrored: self.mirrored ^ next.mirrored,
            quarter_turns: (next.quarter_turns + turns) % 4,
        }
    }

    /// The transform that undoes `self`.
    pub fn inverse(self) -> Transform {
        let quarter_turns = if self.mirrored {
            self.quarter_turns
        } else {
            (4 - self.quarter_turns) % 4
        };
        Transform {
            mirrored: self.mirrored,
            quarter_turns,
        }
    }

    /// Applies the transform to pixel data.
    pub fn apply(&self, img: &DynamicImage) -> DynamicImage {
        let mirrored = if self.mirrored { img.fliph() } else { img.clone() };
        match self.quarter_turns {
            1 => mirrored.rotate90(),
            2 => mirrored.rotate180(),
            3 => mirrored.rotate270(),
            _ => mirrored,
        }
    }
}

/// Mapping from image path to its accumulated transform.
///
/// Mutated only by the control thread; never touched by load workers, so no
/// locking is needed.
#[derive(Debug, Default)]
pub struct TransformRegistry {
    entries: HashMap<PathBuf, Transform>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composes `transform` onto the entry for `path`, creating an identity
    /// entry first if absent. Returns the new accumulated transform.
    pub fn compose(&mut self, path: &Path, transform: Transform) -> Transform {
        let entry = self.entries.entry(path.to_path_buf()).or_default();
        *entry = entry.then(transform);
        *entry
    }

    /// The accumulated transform for `path`, identity when absent.
    pub fn get(&self, path: &Path) -> Transform {
        self.entries.get(path).copied().unwrap_or_default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Drops the entry for `path`, e.g. after a save bakes it to disk.
    pub fn remove(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
