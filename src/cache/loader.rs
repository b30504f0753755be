//! One-shot background image loads.
//!
//! A `LoadTask` spawns exactly one short-lived worker thread that decodes an
//! image and produces its scaled/oriented variant. The task result is written
//! once by the worker and consumed by the control thread through `join()`,
//! which is the only cross-thread boundary in the core. There is no
//! cancellation: a task abandoned before completion runs to the end and its
//! result is dropped with the task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use image::DynamicImage;
use tracing::{debug, trace};

use crate::codec;
use crate::error::{Error, Result};
use crate::record::ViewportSize;
use crate::transform::Transform;

/// The raw image and its scaled/oriented variant produced by one load.
#[derive(Debug, Clone)]
pub struct LoadedPair {
    pub raw: Arc<DynamicImage>,
    pub scaled: Arc<DynamicImage>,
}

/// A background unit of work wrapping one decode + scale.
///
/// Joinable more than once: the first `join` blocks on the worker, later
/// calls return the cached outcome immediately.
#[derive(Debug)]
pub struct LoadTask {
    path: PathBuf,
    handle: Option<JoinHandle<Result<LoadedPair>>>,
    outcome: Option<Result<LoadedPair>>,
}

impl LoadTask {
    /// Starts the background decode for `path`.
    pub fn spawn(path: PathBuf, viewport: ViewportSize, transform: Transform) -> Self {
        trace!(?path, "Spawning image load");
        let worker_path = path.clone();

        let handle = thread::Builder::new()
            .name("img-loader".to_string())
            .spawn(move || run_load(&worker_path, viewport, transform))
            .expect("Failed to spawn image load worker");

        Self {
            path,
            handle: Some(handle),
            outcome: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocks until the worker completes and returns its result.
    ///
    /// A decode failure surfaces here, and only here; there is no background
    /// error channel.
    pub fn join(&mut self) -> Result<LoadedPair> {
        if let Some(handle) = self.handle.take() {
            let outcome = handle.join().unwrap_or_else(|_| {
                Err(Error::WorkerPanicked {
                    path: self.path.clone(),
                })
            });
            if let Err(err) = &outcome {
                debug!(path = ?self.path, %err, "Image load failed");
            }
            self.outcome = Some(outcome);
        }

        match &self.outcome {
            Some(Ok(pair)) => Ok(pair.clone()),
            Some(Err(err)) => Err(err.clone()),
            // spawn always sets the handle, so one of the two is present.
            None => Err(Error::WorkerPanicked {
                path: self.path.clone(),
            }),
        }
    }
}

fn run_load(path: &Path, viewport: ViewportSize, transform: Transform) -> Result<LoadedPair> {
    let raw = codec::decode(path).map_err(|err| Error::Decode {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    })?;
    let scaled = codec::scale_and_orient(&raw, path, viewport, transform);
    Ok(LoadedPair {
        raw: Arc::new(raw),
        scaled: Arc::new(scaled),
    })
}
