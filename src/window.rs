//! The three-wide navigation window over the traversal order.
//!
//! `NavigationWindow` owns the ordered image list, the current position, the
//! previous/current/next prefetch slots, and the transform registry. All of
//! its operations run on the caller's thread; callers must serialize calls
//! into it (single-writer discipline). The only handle to a window is the one
//! its constructing context owns, which is what makes it unique per process.
//!
//! Navigation shifts slots without joining their loaders; joins happen when a
//! slot is materialized by a query or a rotation. A slot that scrolls out of
//! the window before being observed never pays its rescale cost.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, trace};

use crate::cache::PrefetchSlot;
use crate::codec;
use crate::error::{Error, Result};
use crate::record::{ImageRecord, ViewportSize};
use crate::scan::{self, ScanConfig};
use crate::transform::{Transform, TransformRegistry};

/// Sliding window of prefetch slots around the navigation position.
pub struct NavigationWindow {
    images: Vec<ImageRecord>,
    /// `None` when no image is loaded.
    position: Option<usize>,
    previous: Option<PrefetchSlot>,
    current: Option<PrefetchSlot>,
    next: Option<PrefetchSlot>,
    transforms: TransformRegistry,
    /// Set by `rescale_images`, cleared on the next navigation step.
    recently_rescaled: bool,
    config: ScanConfig,
}

impl NavigationWindow {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            images: Vec::new(),
            position: None,
            previous: None,
            current: None,
            next: None,
            transforms: TransformRegistry::new(),
            recently_rescaled: false,
            config,
        }
    }

    /// Scans the given directories and primes the window at position 0, or
    /// leaves it empty when nothing is found.
    pub fn start(&mut self, dirs: &[PathBuf], viewport: ViewportSize) {
        self.reset();
        self.images = scan::scan_directories(dirs, &self.config);
        if self.images.is_empty() {
            return;
        }
        debug!(total = self.images.len(), "Priming navigation window");
        self.jump_to_image(0, viewport);
    }

    /// Drops all state back to the initial empty configuration.
    pub fn reset(&mut self) {
        self.images.clear();
        self.position = None;
        self.previous = None;
        self.current = None;
        self.next = None;
        self.transforms.clear();
        self.recently_rescaled = false;
    }

    /// Advances by one. At the last position this is a defined no-op, not an
    /// error: it signals "cannot advance further".
    pub fn next_image(&mut self, viewport: ViewportSize) {
        let Some(pos) = self.position else { return };
        if pos + 1 >= self.images.len() {
            trace!(pos, "Already at last position");
            return;
        }
        let pos = pos + 1;
        self.position = Some(pos);

        self.previous = self.current.take();
        let incoming = match self.next.take() {
            Some(slot) => slot,
            None => self.spawn_slot(pos, viewport),
        };
        self.set_current(incoming, pos, viewport);

        self.next = if pos + 1 < self.images.len() {
            Some(self.spawn_slot(pos + 1, viewport))
        } else {
            None
        };
    }

    /// Steps back by one; mirror image of `next_image`.
    pub fn previous_image(&mut self, viewport: ViewportSize) {
        let Some(pos) = self.position else { return };
        if pos == 0 {
            trace!("Already at first position");
            return;
        }
        let pos = pos - 1;
        self.position = Some(pos);

        self.next = self.current.take();
        let incoming = match self.previous.take() {
            Some(slot) => slot,
            None => self.spawn_slot(pos, viewport),
        };
        self.set_current(incoming, pos, viewport);

        self.previous = if pos > 0 {
            Some(self.spawn_slot(pos - 1, viewport))
        } else {
            None
        };
    }

    /// Discards all three slots and re-spawns fresh ones around the target.
    /// No incremental reuse: the jump distance is arbitrary. Out-of-range
    /// targets are a no-op.
    pub fn jump_to_image(&mut self, target: usize, viewport: ViewportSize) {
        if target >= self.images.len() {
            trace!(target, "Jump target out of range");
            return;
        }
        self.position = Some(target);
        self.recently_rescaled = false;

        self.previous = if target > 0 {
            Some(self.spawn_slot(target - 1, viewport))
        } else {
            None
        };
        self.current = Some(self.spawn_slot(target, viewport));
        self.next = if target + 1 < self.images.len() {
            Some(self.spawn_slot(target + 1, viewport))
        } else {
            None
        };
    }

    /// Inserts a record into the traversal order and realigns the window on
    /// it. Used by undo of a deletion.
    pub fn add_image(
        &mut self,
        directory: PathBuf,
        filename: String,
        position: usize,
        viewport: ViewportSize,
    ) {
        let position = position.min(self.images.len());
        self.images
            .insert(position, ImageRecord::new(directory, filename));
        self.jump_to_image(position, viewport);
    }

    /// Removes the current record from the traversal order and returns it.
    ///
    /// The caller is responsible for any filesystem move; this only manages
    /// in-memory state. The former next slot is reused as the new current so
    /// in-flight work is not thrown away.
    pub fn discard_current_image(&mut self, viewport: ViewportSize) -> Result<ImageRecord> {
        let pos = self.position.ok_or(Error::NoImageAvailable)?;
        let removed = self.images.remove(pos);
        self.transforms.remove(&removed.path());
        debug!(path = ?removed.path(), "Discarded current image");

        if self.images.is_empty() {
            self.reset();
            return Ok(removed);
        }

        if pos == self.images.len() {
            // Removed the last record: degrade to previous_image.
            let pos = pos - 1;
            self.position = Some(pos);
            let incoming = match self.previous.take() {
                Some(slot) => slot,
                None => self.spawn_slot(pos, viewport),
            };
            self.set_current(incoming, pos, viewport);
            self.next = None;
            self.previous = if pos > 0 {
                Some(self.spawn_slot(pos - 1, viewport))
            } else {
                None
            };
        } else {
            // Position unchanged; the record there is the former successor.
            let incoming = match self.next.take() {
                Some(slot) => slot,
                None => self.spawn_slot(pos, viewport),
            };
            self.set_current(incoming, pos, viewport);
            self.next = if pos + 1 < self.images.len() {
                Some(self.spawn_slot(pos + 1, viewport))
            } else {
                None
            };
        }

        Ok(removed)
    }

    /// Composes a rotation into the registry entry for the current path and
    /// refreshes the current slot's scaled image in place. Position is
    /// unchanged.
    pub fn rotate_current_image(&mut self, degrees: i32, viewport: ViewportSize) -> Result<()> {
        let pos = self.position.ok_or(Error::NoImageAvailable)?;
        let path = self.images[pos].path();
        let accumulated = self.transforms.compose(&path, Transform::rotation(degrees));
        trace!(?path, degrees, "Rotated current image");

        let current = self.current.as_mut().ok_or(Error::NoImageAvailable)?;
        let (raw, _) = current.materialize()?;
        let scaled = codec::scale_and_orient(&raw, &path, viewport, accumulated);
        current.override_scaled(Arc::new(scaled));
        Ok(())
    }

    /// Requests a rescale of every resident slot for a new viewport size.
    /// Actual recomputation is deferred to each slot's next materialization.
    pub fn rescale_images(&mut self, viewport: ViewportSize) {
        let Some(pos) = self.position else { return };
        self.recently_rescaled = true;

        if let Some(slot) = self.previous.as_mut() {
            let path = self.images[pos - 1].path();
            let transform = self.transforms.get(&path);
            slot.request_rescale(path, viewport, transform);
        }
        if let Some(slot) = self.current.as_mut() {
            let path = self.images[pos].path();
            let transform = self.transforms.get(&path);
            slot.request_rescale(path, viewport, transform);
        }
        if let Some(slot) = self.next.as_mut() {
            let path = self.images[pos + 1].path();
            let transform = self.transforms.get(&path);
            slot.request_rescale(path, viewport, transform);
        }
    }

    /// Called after a collaborator durably saved the rotated image: resets
    /// the path's transform entry and refreshes the cached raw pixels so the
    /// slot matches the file on disk.
    pub fn confirm_saved(&mut self, viewport: ViewportSize) -> Result<()> {
        let pos = self.position.ok_or(Error::NoImageAvailable)?;
        let path = self.images[pos].path();
        let transform = self.transforms.get(&path);

        let current = self.current.as_mut().ok_or(Error::NoImageAvailable)?;
        let (raw, _) = current.materialize()?;
        let baked = Arc::new(codec::rotate_full(&raw, &path, transform));
        current.override_raw(baked.clone());
        current.override_scaled(Arc::new(codec::fit_viewport(&baked, viewport)));

        self.transforms.remove(&path);
        debug!(?path, "Reset transform after durable save");
        Ok(())
    }

    // ---- query surface ----

    pub fn image_available(&self) -> bool {
        !self.images.is_empty()
    }

    /// The current image's raw (unscaled) pixels.
    pub fn current_image(&mut self) -> Result<Arc<DynamicImage>> {
        let (raw, _) = self.materialize_current()?;
        Ok(raw)
    }

    /// The current image scaled to the viewport with all rotation applied.
    pub fn current_image_scaled_and_rotated(&mut self) -> Result<Arc<DynamicImage>> {
        let (_, scaled) = self.materialize_current()?;
        Ok(scaled)
    }

    /// The current image with orientation and accumulated rotation fully
    /// baked at original size, for saving.
    pub fn current_image_rotated(&mut self) -> Result<DynamicImage> {
        let pos = self.position.ok_or(Error::NoImageAvailable)?;
        let path = self.images[pos].path();
        let transform = self.transforms.get(&path);

        let current = self.current.as_mut().ok_or(Error::NoImageAvailable)?;
        let (raw, _) = current.materialize()?;
        Ok(codec::rotate_full(&raw, &path, transform))
    }

    pub fn current_image_complete_path(&self) -> Result<PathBuf> {
        let pos = self.position.ok_or(Error::NoImageAvailable)?;
        Ok(self.images[pos].path())
    }

    pub fn current_image_name(&self) -> Result<&str> {
        let pos = self.position.ok_or(Error::NoImageAvailable)?;
        Ok(&self.images[pos].filename)
    }

    pub fn current_directory(&self) -> Result<&Path> {
        let pos = self.position.ok_or(Error::NoImageAvailable)?;
        Ok(&self.images[pos].directory)
    }

    /// 1-based position for display, 0 when no image is loaded.
    pub fn current_image_number(&self) -> usize {
        self.position.map_or(0, |p| p + 1)
    }

    pub fn total_images(&self) -> usize {
        self.images.len()
    }

    pub fn is_at_first_position(&self) -> bool {
        self.position == Some(0)
    }

    pub fn is_at_last_position(&self) -> bool {
        !self.images.is_empty() && self.position == Some(self.images.len() - 1)
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    pub fn discard_dir_name(&self) -> &str {
        &self.config.discard_dir_name
    }

    // ---- internals ----

    fn spawn_slot(&self, pos: usize, viewport: ViewportSize) -> PrefetchSlot {
        let path = self.images[pos].path();
        let transform = self.transforms.get(&path);
        PrefetchSlot::from_path(path, viewport, transform)
    }

    /// Installs the incoming slot as current, forwarding a global rescale
    /// that was requested since the slot's load started.
    fn set_current(&mut self, mut slot: PrefetchSlot, pos: usize, viewport: ViewportSize) {
        if self.recently_rescaled {
            self.recently_rescaled = false;
            let path = self.images[pos].path();
            let transform = self.transforms.get(&path);
            slot.request_rescale(path, viewport, transform);
        }
        self.current = Some(slot);
    }

    fn materialize_current(&mut self) -> Result<(Arc<DynamicImage>, Arc<DynamicImage>)> {
        if self.images.is_empty() {
            return Err(Error::NoImageAvailable);
        }
        let current = self.current.as_mut().ok_or(Error::NoImageAvailable)?;
        current.materialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    const VIEWPORT: ViewportSize = ViewportSize {
        width: 4,
        height: 4,
    };

    fn write_png(path: &Path, width: u32, height: u32, color: [u8; 3]) {
        RgbImage::from_pixel(width, height, Rgb(color))
            .save(path)
            .unwrap();
    }

    /// Three distinguishable images a < b < c in scan order.
    fn fixture() -> (TempDir, NavigationWindow) {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 8, 4, [255, 0, 0]);
        write_png(&dir.path().join("b.png"), 4, 8, [0, 255, 0]);
        write_png(&dir.path().join("c.png"), 6, 6, [0, 0, 255]);

        let mut window = NavigationWindow::new(ScanConfig::default());
        window.start(&[dir.path().to_path_buf()], VIEWPORT);
        (dir, window)
    }

    fn current_color(window: &mut NavigationWindow) -> [u8; 3] {
        let raw = window.current_image().unwrap();
        raw.to_rgb8().get_pixel(0, 0).0
    }

    #[test]
    fn start_primes_at_position_zero() {
        let (_dir, mut window) = fixture();
        assert!(window.image_available());
        assert_eq!(window.position(), Some(0));
        assert_eq!(window.total_images(), 3);
        assert_eq!(window.current_image_name().unwrap(), "a.png");
        assert_eq!(current_color(&mut window), [255, 0, 0]);
    }

    #[test]
    fn start_with_no_images_leaves_state_empty() {
        let dir = tempdir().unwrap();
        let mut window = NavigationWindow::new(ScanConfig::default());
        window.start(&[dir.path().to_path_buf()], VIEWPORT);

        assert!(!window.image_available());
        assert_eq!(window.position(), None);
        assert_eq!(window.current_image_number(), 0);
        assert!(matches!(
            window.current_image(),
            Err(Error::NoImageAvailable)
        ));
    }

    #[test]
    fn current_slot_tracks_position_through_navigation() {
        let (_dir, mut window) = fixture();

        window.next_image(VIEWPORT);
        assert_eq!(window.position(), Some(1));
        assert_eq!(window.current_image_name().unwrap(), "b.png");
        assert_eq!(current_color(&mut window), [0, 255, 0]);

        window.next_image(VIEWPORT);
        assert_eq!(window.position(), Some(2));
        assert_eq!(current_color(&mut window), [0, 0, 255]);

        window.previous_image(VIEWPORT);
        assert_eq!(window.position(), Some(1));
        assert_eq!(current_color(&mut window), [0, 255, 0]);
    }

    #[test]
    fn boundary_navigation_is_a_no_op() {
        let (_dir, mut window) = fixture();

        window.previous_image(VIEWPORT);
        assert_eq!(window.position(), Some(0));
        assert!(window.is_at_first_position());

        window.jump_to_image(2, VIEWPORT);
        window.next_image(VIEWPORT);
        assert_eq!(window.position(), Some(2));
        assert!(window.is_at_last_position());
        assert_eq!(current_color(&mut window), [0, 0, 255]);
    }

    #[test]
    fn jump_is_idempotent_by_position() {
        let (_dir, mut window) = fixture();

        window.jump_to_image(2, VIEWPORT);
        let direct = current_color(&mut window);

        window.jump_to_image(0, VIEWPORT);
        window.jump_to_image(2, VIEWPORT);
        assert_eq!(current_color(&mut window), direct);
        assert_eq!(window.position(), Some(2));
    }

    #[test]
    fn out_of_range_jump_is_a_no_op() {
        let (_dir, mut window) = fixture();
        window.jump_to_image(99, VIEWPORT);
        assert_eq!(window.position(), Some(0));
    }

    #[test]
    fn discard_in_middle_reuses_successor() {
        let (_dir, mut window) = fixture();

        let removed = window.discard_current_image(VIEWPORT).unwrap();
        assert_eq!(removed.filename, "a.png");
        assert_eq!(window.total_images(), 2);
        assert_eq!(window.position(), Some(0));
        assert_eq!(window.current_image_name().unwrap(), "b.png");
        assert_eq!(current_color(&mut window), [0, 255, 0]);
    }

    #[test]
    fn discard_at_last_position_degrades_to_previous() {
        let (_dir, mut window) = fixture();
        window.jump_to_image(2, VIEWPORT);

        let removed = window.discard_current_image(VIEWPORT).unwrap();
        assert_eq!(removed.filename, "c.png");
        assert_eq!(window.position(), Some(1));
        assert_eq!(current_color(&mut window), [0, 255, 0]);
    }

    #[test]
    fn discarding_everything_resets_state() {
        let (_dir, mut window) = fixture();
        window.rotate_current_image(90, VIEWPORT).unwrap();

        for _ in 0..3 {
            window.discard_current_image(VIEWPORT).unwrap();
        }
        assert!(!window.image_available());
        assert_eq!(window.position(), None);
        assert!(window.transforms().is_empty());
        assert!(matches!(
            window.discard_current_image(VIEWPORT),
            Err(Error::NoImageAvailable)
        ));
    }

    #[test]
    fn rotation_composes_in_registry() {
        let (_dir, mut window) = fixture();

        window.rotate_current_image(90, VIEWPORT).unwrap();
        window.rotate_current_image(90, VIEWPORT).unwrap();

        let path = window.current_image_complete_path().unwrap();
        assert_eq!(window.transforms().get(&path), Transform::rotation(180));

        // a.png is 8x4; a half turn keeps dimensions, the baked image
        // reflects the composed transform.
        let baked = window.current_image_rotated().unwrap();
        assert_eq!((baked.width(), baked.height()), (8, 4));

        window.rotate_current_image(-90, VIEWPORT).unwrap();
        let baked = window.current_image_rotated().unwrap();
        assert_eq!((baked.width(), baked.height()), (4, 8));
    }

    #[test]
    fn rotation_round_trip_restores_identity() {
        let (_dir, mut window) = fixture();
        window.rotate_current_image(90, VIEWPORT).unwrap();
        window.rotate_current_image(-90, VIEWPORT).unwrap();

        let path = window.current_image_complete_path().unwrap();
        assert!(window.transforms().get(&path).is_identity());
    }

    #[test]
    fn rotation_updates_scaled_image_in_place() {
        let (_dir, mut window) = fixture();
        // a.png is 8x4 -> scaled 4x2; a quarter turn makes it 2x4.
        window.rotate_current_image(90, VIEWPORT).unwrap();
        let scaled = window.current_image_scaled_and_rotated().unwrap();
        assert_eq!((scaled.width(), scaled.height()), (2, 4));
    }

    #[test]
    fn rescale_stays_pending_until_slot_is_observed() {
        let (_dir, mut window) = fixture();
        // Materialize current so the slot is resident before rescaling.
        window.current_image().unwrap();

        window.rescale_images(ViewportSize::new(8, 8));
        assert!(window.current.as_ref().unwrap().rescale_pending());
        if let Some(next) = window.next.as_ref() {
            assert!(next.rescale_pending());
        }

        // Observing the slot applies the deferred rescale.
        let scaled = window.current_image_scaled_and_rotated().unwrap();
        assert!(!window.current.as_ref().unwrap().rescale_pending());
        assert_eq!((scaled.width(), scaled.height()), (8, 4));
    }

    #[test]
    fn navigation_after_rescale_refreshes_incoming_slot() {
        let (_dir, mut window) = fixture();
        window.rescale_images(ViewportSize::new(8, 8));

        // The slot shifted in from next picks up the new viewport.
        window.next_image(ViewportSize::new(8, 8));
        let scaled = window.current_image_scaled_and_rotated().unwrap();
        // b.png is 4x8, upscaled to fit 8x8 as 4x8.
        assert_eq!((scaled.width(), scaled.height()), (4, 8));
    }

    #[test]
    fn confirm_saved_bakes_transform_and_resets_registry() {
        let (_dir, mut window) = fixture();
        window.rotate_current_image(90, VIEWPORT).unwrap();

        let path = window.current_image_complete_path().unwrap();
        assert!(window.transforms().contains(&path));

        window.confirm_saved(VIEWPORT).unwrap();
        assert!(!window.transforms().contains(&path));

        // Raw cache now holds the baked 4x8 pixels.
        let raw = window.current_image().unwrap();
        assert_eq!((raw.width(), raw.height()), (4, 8));
        let rotated = window.current_image_rotated().unwrap();
        assert_eq!((rotated.width(), rotated.height()), (4, 8));
    }

    #[test]
    fn decode_failure_propagates_from_materialize() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"garbage").unwrap();

        let mut window = NavigationWindow::new(ScanConfig::default());
        window.start(&[dir.path().to_path_buf()], VIEWPORT);
        assert!(matches!(
            window.current_image(),
            Err(Error::Decode { .. })
        ));
    }
}
