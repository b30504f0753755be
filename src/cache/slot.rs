//! Cache slots for the three-wide navigation window.
//!
//! A slot wraps either an in-flight `LoadTask` or an already-resident image
//! pair, behind a single `materialize` entry point. Rescales are deferred: a
//! slot that scrolls out of the window before being observed again never pays
//! the rescale cost.

use std::path::PathBuf;
use std::sync::Arc;

use image::DynamicImage;
use tracing::trace;

use crate::cache::loader::LoadTask;
use crate::codec;
use crate::error::Result;
use crate::record::ViewportSize;
use crate::transform::Transform;

/// A deferred rescale recorded against a slot.
#[derive(Debug, Clone)]
struct RescaleRequest {
    path: PathBuf,
    viewport: ViewportSize,
    transform: Transform,
}

#[derive(Debug)]
enum SlotState {
    Loading(LoadTask),
    Ready {
        raw: Arc<DynamicImage>,
        scaled: Arc<DynamicImage>,
    },
}

/// One cache entry holding or producing one image's resident and scaled forms.
///
/// Slots are never shared between two logical positions; replacing a slot
/// drops it, and any in-flight load runs to completion unobserved.
#[derive(Debug)]
pub struct PrefetchSlot {
    state: SlotState,
    pending_rescale: Option<RescaleRequest>,
}

impl PrefetchSlot {
    /// Spawns a background load for `path`.
    pub fn from_path(path: PathBuf, viewport: ViewportSize, transform: Transform) -> Self {
        Self {
            state: SlotState::Loading(LoadTask::spawn(path, viewport, transform)),
            pending_rescale: None,
        }
    }

    /// Wraps an already-resident image pair.
    pub fn from_images(raw: Arc<DynamicImage>, scaled: Arc<DynamicImage>) -> Self {
        Self {
            state: SlotState::Ready { raw, scaled },
            pending_rescale: None,
        }
    }

    /// Resolves the slot to concrete image data.
    ///
    /// On first call against an in-flight load this joins it (consuming the
    /// loader); if a rescale is pending, the scaled image is recomputed with
    /// the stored parameters before returning.
    pub fn materialize(&mut self) -> Result<(Arc<DynamicImage>, Arc<DynamicImage>)> {
        if let SlotState::Loading(task) = &mut self.state {
            let pair = task.join()?;
            self.state = SlotState::Ready {
                raw: pair.raw,
                scaled: pair.scaled,
            };
        }

        let SlotState::Ready { raw, scaled } = &mut self.state else {
            unreachable!("slot is Ready after a successful join");
        };

        if let Some(request) = self.pending_rescale.take() {
            trace!(path = ?request.path, "Applying deferred rescale");
            *scaled = Arc::new(codec::scale_and_orient(
                raw,
                &request.path,
                request.viewport,
                request.transform,
            ));
        }

        Ok((raw.clone(), scaled.clone()))
    }

    /// Records a rescale to be applied on the next materialization. Never
    /// recomputes eagerly.
    pub fn request_rescale(&mut self, path: PathBuf, viewport: ViewportSize, transform: Transform) {
        self.pending_rescale = Some(RescaleRequest {
            path,
            viewport,
            transform,
        });
    }

    /// Whether a deferred rescale is still waiting to be applied.
    pub fn rescale_pending(&self) -> bool {
        self.pending_rescale.is_some()
    }

    /// Injects an already-computed scaled image after an in-place rotation.
    ///
    /// Only legal on resident slots: on an in-flight load there is no image
    /// to override yet, so the call is ignored; callers must materialize
    /// first. Any pending rescale is superseded by the injected image.
    pub fn override_scaled(&mut self, img: Arc<DynamicImage>) {
        match &mut self.state {
            SlotState::Ready { scaled, .. } => {
                *scaled = img;
                self.pending_rescale = None;
            }
            SlotState::Loading(task) => {
                trace!(path = ?task.path(), "Ignoring scaled override on in-flight slot");
            }
        }
    }

    /// Refreshes the canonical pixel content after a durable save reset the
    /// path's transform.
    pub fn override_raw(&mut self, img: Arc<DynamicImage>) {
        match &mut self.state {
            SlotState::Ready { raw, .. } => *raw = img,
            SlotState::Loading(task) => {
                trace!(path = ?task.path(), "Ignoring raw override on in-flight slot");
            }
        }
    }

    /// Whether the slot already holds resident images.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, SlotState::Ready { .. })
    }
}
