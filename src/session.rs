//! The user-intent surface: navigation window plus history in one handle.
//!
//! `Session` is what the display/interaction layer talks to. It forwards
//! navigation to the window, records an action after each reversible
//! operation succeeds, and delegates undo/redo to the engine. The session is
//! single-threaded by contract; callers serialize all calls into it.
//!
//! Collaborator contracts:
//! - Discard: the collaborator moves the file into the discard subfolder
//!   *before* calling [`Session::discard_current_image`]; only the recorded
//!   action performs filesystem moves (when undone/redone).
//! - Save: the collaborator fetches [`Session::current_image_rotated`] and
//!   the current path, persists the image itself, and on success calls
//!   [`Session::confirm_saved`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::error::Result;
use crate::history::{Action, HistoryEngine};
use crate::record::ViewportSize;
use crate::scan::ScanConfig;
use crate::window::NavigationWindow;

/// Configuration handed to the core at construction; there are no global
/// flags.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub scan: ScanConfig,
}

/// Facade over [`NavigationWindow`] and [`HistoryEngine`].
pub struct Session {
    window: NavigationWindow,
    history: HistoryEngine,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            window: NavigationWindow::new(config.scan),
            history: HistoryEngine::new(),
        }
    }

    /// Builds a fresh traversal order from the given directories and primes
    /// the window. Clears any history from a previous batch.
    pub fn start(&mut self, dirs: &[PathBuf], viewport: ViewportSize) {
        self.history.clear();
        self.window.start(dirs, viewport);
    }

    pub fn next_image(&mut self, viewport: ViewportSize) {
        self.window.next_image(viewport);
    }

    pub fn previous_image(&mut self, viewport: ViewportSize) {
        self.window.previous_image(viewport);
    }

    /// Jumps to an arbitrary position and records the jump for undo.
    /// Out-of-range targets are a no-op and record nothing.
    pub fn jump_to_image(&mut self, target: usize, viewport: ViewportSize) {
        let Some(origin) = self.window.position() else {
            return;
        };
        if target >= self.window.total_images() {
            return;
        }
        self.window.jump_to_image(target, viewport);
        self.history.record(Action::Jump {
            position: origin,
            old_position: None,
        });
    }

    /// Removes the current image from the session and records the deletion.
    ///
    /// The collaborator has already moved the file into the discard
    /// subfolder; this only updates in-memory state.
    pub fn discard_current_image(&mut self, viewport: ViewportSize) -> Result<()> {
        let position = self.window.position().ok_or(crate::Error::NoImageAvailable)?;
        let removed = self.window.discard_current_image(viewport)?;
        self.history.record(Action::Deletion {
            directory: removed.directory,
            filename: removed.filename,
            position,
        });
        Ok(())
    }

    /// Rotates the current image and records the rotation.
    pub fn rotate_current_image(&mut self, degrees: i32, viewport: ViewportSize) -> Result<()> {
        let position = self.window.position().ok_or(crate::Error::NoImageAvailable)?;
        self.window.rotate_current_image(degrees, viewport)?;
        self.history.record(Action::Rotation {
            degrees,
            position,
            old_position: None,
        });
        Ok(())
    }

    pub fn rescale_images(&mut self, viewport: ViewportSize) {
        self.window.rescale_images(viewport);
    }

    pub fn undo(&mut self, viewport: ViewportSize) -> Result<()> {
        self.history.undo(&mut self.window, viewport)
    }

    pub fn redo(&mut self, viewport: ViewportSize) -> Result<()> {
        self.history.redo(&mut self.window, viewport)
    }

    /// Called by the save collaborator after the rotated image was durably
    /// written to disk.
    pub fn confirm_saved(&mut self, viewport: ViewportSize) -> Result<()> {
        self.window.confirm_saved(viewport)
    }

    // ---- query surface ----

    pub fn image_available(&self) -> bool {
        self.window.image_available()
    }

    pub fn current_image(&mut self) -> Result<Arc<DynamicImage>> {
        self.window.current_image()
    }

    pub fn current_image_scaled_and_rotated(&mut self) -> Result<Arc<DynamicImage>> {
        self.window.current_image_scaled_and_rotated()
    }

    pub fn current_image_rotated(&mut self) -> Result<DynamicImage> {
        self.window.current_image_rotated()
    }

    pub fn current_image_complete_path(&self) -> Result<PathBuf> {
        self.window.current_image_complete_path()
    }

    pub fn current_image_name(&self) -> Result<&str> {
        self.window.current_image_name()
    }

    pub fn current_directory(&self) -> Result<&Path> {
        self.window.current_directory()
    }

    pub fn current_image_number(&self) -> usize {
        self.window.current_image_number()
    }

    pub fn total_images(&self) -> usize {
        self.window.total_images()
    }

    pub fn is_at_first_position(&self) -> bool {
        self.window.is_at_first_position()
    }

    pub fn is_at_last_position(&self) -> bool {
        self.window.is_at_last_position()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn window(&self) -> &NavigationWindow {
        &self.window
    }
}
