//! Stateless image decode, EXIF orientation, and viewport scaling.
//!
//! Decoding slurps the file and guesses the format from the bytes, with a
//! first-frame special case for animated GIFs. Orientation metadata is read
//! with kamadak-exif; anything missing, unreadable, or out of the 1..=8 range
//! degrades to the identity transform with a warning and is never fatal. Raw
//! decode failures are fatal for the slot being materialized.

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, ImageFormat};
use tracing::warn;

use crate::record::ViewportSize;
use crate::transform::Transform;

/// Decodes an image file into pixel data.
pub fn decode(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
    let format = image::guess_format(&bytes).ok();

    if format == Some(ImageFormat::Gif) {
        let decoder = GifDecoder::new(Cursor::new(bytes))
            .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
        let mut frames = decoder.into_frames();
        if let Some(frame) = frames.next() {
            let frame = frame.context("Failed to decode GIF frame")?;
            return Ok(DynamicImage::ImageRgba8(frame.into_buffer()));
        }
        return Err(anyhow!("GIF has no frames: {:?}", path));
    }

    match format {
        Some(fmt) => image::load_from_memory_with_format(&bytes, fmt)
            .with_context(|| format!("Failed to decode image: {:?}", path)),
        None => image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode image: {:?}", path)),
    }
}

/// Reads the EXIF orientation code for an image, 1 (identity) when absent.
///
/// Values outside the standard 1..=8 range should never occur; they are
/// logged and treated as identity.
fn exif_orientation(path: &Path) -> u8 {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return 1,
    };
    let mut reader = BufReader::new(file);

    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif_data) => {
            if let Some(field) = exif_data.get_field(exif::Tag::Orientation, exif::In::PRIMARY) {
                match field.value.get_uint(0) {
                    Some(v @ 1..=8) => return v as u8,
                    Some(v) => {
                        warn!(?path, orientation = v, "EXIF orientation out of range");
                    }
                    None => {}
                }
            }
            1
        }
        Err(_) => 1,
    }
}

/// The corrective transform derived from embedded orientation metadata.
pub fn corrective_transform(path: &Path) -> Transform {
    Transform::from_exif_orientation(exif_orientation(path))
}

/// Applies the corrective orientation transform to a decoded image.
pub fn orient(img: &DynamicImage, path: &Path) -> DynamicImage {
    let corrective = corrective_transform(path);
    if corrective.is_identity() {
        img.clone()
    } else {
        corrective.apply(img)
    }
}

/// Scales an image to fit the viewport, preserving aspect ratio.
pub fn fit_viewport(img: &DynamicImage, viewport: ViewportSize) -> DynamicImage {
    img.resize(
        viewport.width.max(1),
        viewport.height.max(1),
        FilterType::CatmullRom,
    )
}

/// Composes the corrective orientation with a caller-supplied extra transform,
/// then scales the result to fit the viewport.
pub fn scale_and_orient(
    img: &DynamicImage,
    path: &Path,
    viewport: ViewportSize,
    extra: Transform,
) -> DynamicImage {
    let combined = corrective_transform(path).then(extra);
    if combined.is_identity() {
        fit_viewport(img, viewport)
    } else {
        fit_viewport(&combined.apply(img), viewport)
    }
}

/// Fully bakes orientation plus the extra transform at original size, for
/// saving to disk.
pub fn rotate_full(img: &DynamicImage, path: &Path, extra: Transform) -> DynamicImage {
    let combined = corrective_transform(path).then(extra);
    if combined.is_identity() {
        img.clone()
    } else {
        combined.apply(img)
    }
}
