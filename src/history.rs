//! Transactional undo/redo over navigation operations.
//!
//! Two ordered stacks of actions, most recent last. Each action carries the
//! immutable parameters fixed at creation plus one `old_position` recorded
//! lazily at first undo, because that value is unknown until undo actually
//! runs. `redo` re-validates that the window still sits at the action's
//! recorded creation position before reapplying the exact recorded forward
//! parameters; a mismatch means the history ordering is corrupt and is fatal
//! to the operation.
//!
//! Instead of actions reaching into each other's state, `redo` returns a list
//! of compensating actions which the engine pushes onto the redo stack
//! atomically. Rotation is the one action that produces a compensation: its
//! undo jumps the window, so its redo must leave behind a jump that restores
//! the navigation context on the following redo.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::record::ViewportSize;
use crate::window::NavigationWindow;

/// A reversible record of one user operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A discard of the record at `position`; the file sits in the discard
    /// subfolder while the action is undone-able.
    Deletion {
        directory: PathBuf,
        filename: String,
        position: usize,
    },
    /// A rotation applied to the image at `position`.
    Rotation {
        degrees: i32,
        position: usize,
        old_position: Option<usize>,
    },
    /// A jump away from `position`. Also synthesized as the compensation for
    /// a redone rotation.
    Jump {
        position: usize,
        old_position: Option<usize>,
    },
}

impl Action {
    /// The position recorded when the action was created.
    fn recorded_position(&self) -> usize {
        match self {
            Action::Deletion { position, .. }
            | Action::Rotation { position, .. }
            | Action::Jump { position, .. } => *position,
        }
    }

    /// Reverts the operation, recording the position that was current at the
    /// time of undo for later replay.
    pub fn undo(&mut self, window: &mut NavigationWindow, viewport: ViewportSize) -> Result<()> {
        match self {
            Action::Deletion {
                directory,
                filename,
                position,
            } => {
                let from = directory.join(window.discard_dir_name()).join(&*filename);
                let to = directory.join(&*filename);
                fs::rename(&from, &to).map_err(|e| Error::FileMove {
                    from,
                    to: to.clone(),
                    reason: e.to_string(),
                })?;
                debug!(path = ?to, "Restored discarded image");
                window.add_image(directory.clone(), filename.clone(), *position, viewport);
                Ok(())
            }
            Action::Rotation {
                degrees,
                position,
                old_position,
            } => {
                *old_position = window.position();
                window.jump_to_image(*position, viewport);
                window.rotate_current_image(-*degrees, viewport)
            }
            Action::Jump {
                position,
                old_position,
            } => {
                *old_position = window.position();
                window.jump_to_image(*position, viewport);
                Ok(())
            }
        }
    }

    /// Reapplies the operation. Returns compensating actions the engine must
    /// push onto the redo stack.
    pub fn redo(
        &self,
        window: &mut NavigationWindow,
        viewport: ViewportSize,
    ) -> Result<Vec<Action>> {
        let recorded = self.recorded_position();
        let current = window.position();
        if current != Some(recorded) {
            return Err(Error::PositionMismatch { recorded, current });
        }

        match self {
            Action::Deletion {
                directory, filename, ..
            } => {
                let discard_dir = directory.join(window.discard_dir_name());
                let from = directory.join(filename);
                let to = discard_dir.join(filename);
                fs::create_dir_all(&discard_dir).map_err(|e| Error::FileMove {
                    from: from.clone(),
                    to: to.clone(),
                    reason: e.to_string(),
                })?;
                fs::rename(&from, &to).map_err(|e| Error::FileMove {
                    from,
                    to,
                    reason: e.to_string(),
                })?;
                window.discard_current_image(viewport)?;
                Ok(Vec::new())
            }
            Action::Rotation {
                degrees,
                position,
                old_position,
            } => {
                window.rotate_current_image(*degrees, viewport)?;
                match old_position {
                    Some(old) if *old != *position => Ok(vec![Action::Jump {
                        position: *position,
                        old_position: Some(*old),
                    }]),
                    _ => Ok(Vec::new()),
                }
            }
            Action::Jump { old_position, .. } => {
                if let Some(old) = old_position {
                    window.jump_to_image(*old, viewport);
                }
                Ok(Vec::new())
            }
        }
    }
}

/// Undo and redo stacks inverting/replaying window operations.
#[derive(Debug, Default)]
pub struct HistoryEngine {
    undo_stack: Vec<Action>,
    redo_stack: Vec<Action>,
}

impl HistoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly applied user action. Invalidates the redo stack.
    pub fn record(&mut self, action: Action) {
        trace!(?action, "Recording action");
        self.undo_stack.push(action);
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Reverts the most recent action; no-op on an empty stack. On failure
    /// the action is pushed back so the stacks stay consistent.
    pub fn undo(&mut self, window: &mut NavigationWindow, viewport: ViewportSize) -> Result<()> {
        let Some(mut action) = self.undo_stack.pop() else {
            trace!("Undo on empty stack");
            return Ok(());
        };
        match action.undo(window, viewport) {
            Ok(()) => {
                self.redo_stack.push(action);
                Ok(())
            }
            Err(err) => {
                self.undo_stack.push(action);
                Err(err)
            }
        }
    }

    /// Replays the most recently undone action; no-op on an empty stack.
    /// Compensating actions returned by the replay are pushed onto the redo
    /// stack atomically with it.
    pub fn redo(&mut self, window: &mut NavigationWindow, viewport: ViewportSize) -> Result<()> {
        let Some(action) = self.redo_stack.pop() else {
            trace!("Redo on empty stack");
            return Ok(());
        };
        match action.redo(window, viewport) {
            Ok(compensations) => {
                self.undo_stack.push(action);
                self.redo_stack.extend(compensations);
                Ok(())
            }
            Err(err) => {
                self.redo_stack.push(action);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanConfig;
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

    fn fixture() -> (TempDir, NavigationWindow) {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 8, 4, [255, 0, 0]);
        write_png(&dir.path().join("b.png"), 4, 8, [0, 255, 0]);
        write_png(&dir.path().join("c.png"), 6, 6, [0, 0, 255]);

        let mut window = NavigationWindow::new(ScanConfig::default());
        window.start(&[dir.path().to_path_buf()], VIEWPORT);
        (dir, window)
    }

    fn filenames(window: &NavigationWindow) -> Vec<String> {
        window.records().iter().map(|r| r.filename.clone()).collect()
    }

    /// Simulates the collaborator's move into the discard folder, then the
    /// in-memory discard, returning the recorded action.
    fn discard(window: &mut NavigationWindow) -> Action {
        let position = window.position().unwrap();
        let directory = window.current_directory().unwrap().to_path_buf();
        let filename = window.current_image_name().unwrap().to_string();

        let discard_dir = directory.join(window.discard_dir_name());
        fs::create_dir_all(&discard_dir).unwrap();
        fs::rename(directory.join(&filename), discard_dir.join(&filename)).unwrap();

        window.discard_current_image(VIEWPORT).unwrap();
        Action::Deletion {
            directory,
            filename,
            position,
        }
    }

    #[test]
    fn record_clears_redo_stack() {
        let (_dir, mut window) = fixture();
        let mut history = HistoryEngine::new();

        window.jump_to_image(1, VIEWPORT);
        history.record(Action::Jump {
            position: 0,
            old_position: None,
        });
        history.undo(&mut window, VIEWPORT).unwrap();
        assert!(history.can_redo());

        history.record(Action::Jump {
            position: 0,
            old_position: None,
        });
        assert!(!history.can_redo());
    }

    #[test]
    fn empty_stacks_are_no_ops() {
        let (_dir, mut window) = fixture();
        let mut history = HistoryEngine::new();
        history.undo(&mut window, VIEWPORT).unwrap();
        history.redo(&mut window, VIEWPORT).unwrap();
        assert_eq!(window.position(), Some(0));
    }

    #[test]
    fn jump_undo_redo_round_trip() {
        let (_dir, mut window) = fixture();
        let mut history = HistoryEngine::new();

        window.jump_to_image(2, VIEWPORT);
        history.record(Action::Jump {
            position: 0,
            old_position: None,
        });

        history.undo(&mut window, VIEWPORT).unwrap();
        assert_eq!(window.position(), Some(0));

        history.redo(&mut window, VIEWPORT).unwrap();
        assert_eq!(window.position(), Some(2));
    }

    #[test]
    fn deletion_undo_restores_list_and_position() {
        let (_dir, mut window) = fixture();
        let mut history = HistoryEngine::new();
        let before = filenames(&window);

        window.next_image(VIEWPORT); // position 1, b.png
        let action = discard(&mut window);
        history.record(action);
        assert_eq!(filenames(&window), vec!["a.png", "c.png"]);

        history.undo(&mut window, VIEWPORT).unwrap();
        assert_eq!(filenames(&window), before);
        assert_eq!(window.position(), Some(1));
        assert_eq!(window.current_image_name().unwrap(), "b.png");

        history.redo(&mut window, VIEWPORT).unwrap();
        assert_eq!(filenames(&window), vec!["a.png", "c.png"]);
        assert_eq!(window.position(), Some(1));
    }

    #[test]
    fn deletion_undo_moves_file_back() {
        let (dir, mut window) = fixture();
        let mut history = HistoryEngine::new();

        let action = discard(&mut window);
        history.record(action);
        assert!(!dir.path().join("a.png").exists());
        assert!(dir.path().join("discarded/a.png").exists());

        history.undo(&mut window, VIEWPORT).unwrap();
        assert!(dir.path().join("a.png").exists());
        assert!(!dir.path().join("discarded/a.png").exists());

        history.redo(&mut window, VIEWPORT).unwrap();
        assert!(dir.path().join("discarded/a.png").exists());
    }

    #[test]
    fn rotation_undo_redo_restores_transform() {
        let (_dir, mut window) = fixture();
        let mut history = HistoryEngine::new();

        window.rotate_current_image(90, VIEWPORT).unwrap();
        history.record(Action::Rotation {
            degrees: 90,
            position: 0,
            old_position: None,
        });
        let path = window.current_image_complete_path().unwrap();

        history.undo(&mut window, VIEWPORT).unwrap();
        assert!(window.transforms().get(&path).is_identity());

        history.redo(&mut window, VIEWPORT).unwrap();
        assert_eq!(
            window.transforms().get(&path),
            crate::transform::Transform::rotation(90)
        );
        // No navigation happened around the rotation, so no compensating
        // jump is left behind.
        assert!(!history.can_redo());
    }

    #[test]
    fn rotation_redo_synthesizes_compensating_jump() {
        let (_dir, mut window) = fixture();
        let mut history = HistoryEngine::new();

        window.rotate_current_image(90, VIEWPORT).unwrap();
        history.record(Action::Rotation {
            degrees: 90,
            position: 0,
            old_position: None,
        });

        // Navigate away before undoing; undo must jump back to the subject.
        window.jump_to_image(2, VIEWPORT);
        history.undo(&mut window, VIEWPORT).unwrap();
        assert_eq!(window.position(), Some(0));

        // Redo reapplies the rotation and leaves a jump restoring the
        // navigation context for the following redo.
        history.redo(&mut window, VIEWPORT).unwrap();
        assert_eq!(window.position(), Some(0));
        assert!(history.can_redo());

        history.redo(&mut window, VIEWPORT).unwrap();
        assert_eq!(window.position(), Some(2));
    }

    #[test]
    fn redo_at_wrong_position_is_fatal() {
        let (_dir, mut window) = fixture();
        let mut history = HistoryEngine::new();

        window.jump_to_image(1, VIEWPORT);
        history.record(Action::Jump {
            position: 0,
            old_position: None,
        });
        history.undo(&mut window, VIEWPORT).unwrap();

        // Corrupt the ordering: move the window without the engine knowing.
        window.jump_to_image(2, VIEWPORT);

        match history.redo(&mut window, VIEWPORT) {
            Err(Error::PositionMismatch { recorded, current }) => {
                assert_eq!(recorded, 0);
                assert_eq!(current, Some(2));
            }
            other => panic!("expected position mismatch, got {:?}", other),
        }
        // The failed action stays on the redo stack.
        assert!(history.can_redo());
    }
}
