//! One recompression pass over every image on every page.

mod decode;
mod encode;

pub use encode::fit_dimensions;

use std::collections::HashMap;

use lopdf::{Document, Object, ObjectId};
use log::{debug, info, warn};

use crate::attempt::CompressionAttempt;
use crate::error::ImageError;
use crate::pdf;

/// Per-attempt image counters. `images_processed` always equals
/// `images_recompressed + failures`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionStats {
    images_processed: usize,
    images_recompressed: usize,
    failures: usize,
}

impl CompressionStats {
    pub fn images_processed(&self) -> usize {
        self.images_processed
    }

    pub fn images_recompressed(&self) -> usize {
        self.images_recompressed
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn record(&mut self, outcome: &ImageOutcome) {
        self.images_processed += 1;
        if outcome.is_success() {
            self.images_recompressed += 1;
        } else {
            self.failures += 1;
        }
    }
}

/// What happened to one image reference.
#[derive(Debug)]
pub enum ImageOutcome {
    Recompressed {
        width: u32,
        height: u32,
        bytes: usize,
    },
    /// Same object already replaced earlier in this pass.
    Shared,
    Failed(ImageError),
    /// Same object already failed earlier in this pass.
    SharedFailure,
}

impl ImageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ImageOutcome::Recompressed { .. } | ImageOutcome::Shared)
    }
}

fn recompress_image(
    doc: &mut Document,
    id: ObjectId,
    attempt: CompressionAttempt,
) -> Result<ImageOutcome, ImageError> {
    let decoded = match doc.get_object(id) {
        Ok(Object::Stream(stream)) => decode::decode_image(doc, stream)?,
        _ => return Err(ImageError::NotAnImage),
    };

    let rgb = encode::fit_within(decoded.to_rgb8(), attempt.max_dimension);
    drop(decoded);

    let jpeg = encode::encode_jpeg(&rgb, attempt.quality)?;
    let (width, height) = rgb.dimensions();
    let bytes = jpeg.len();

    // Same object id: every resource entry pointing here keeps its name.
    doc.objects
        .insert(id, Object::Stream(encode::image_stream(jpeg, width, height)));

    Ok(ImageOutcome::Recompressed {
        width,
        height,
        bytes,
    })
}

/// Recompress every embedded image under `attempt`, mutating `doc` in memory.
///
/// A failing image is counted and skipped; it never aborts the pass.
pub fn recompress(doc: &mut Document, attempt: CompressionAttempt) -> CompressionStats {
    let mut stats = CompressionStats::default();
    let mut done: HashMap<ObjectId, bool> = HashMap::new();

    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    for (page_number, page_id) in pages {
        // Snapshot before any replacement happens.
        let images = pdf::page_images(doc, page_id);

        for image in images {
            let outcome = match done.get(&image.id) {
                Some(true) => ImageOutcome::Shared,
                Some(false) => ImageOutcome::SharedFailure,
                None => {
                    let outcome = recompress_image(doc, image.id, attempt)
                        .unwrap_or_else(ImageOutcome::Failed);
                    done.insert(image.id, outcome.is_success());
                    outcome
                }
            };

            match &outcome {
                ImageOutcome::Recompressed {
                    width,
                    height,
                    bytes,
                } => debug!(
                    "Page {} image {}: {}x{} JPEG(q={}), {} bytes",
                    page_number,
                    image.display_name(),
                    width,
                    height,
                    attempt.quality,
                    bytes
                ),
                ImageOutcome::Failed(e) => warn!(
                    "Page {} image {} ({} {}): {}",
                    page_number,
                    image.display_name(),
                    image.id.0,
                    image.id.1,
                    e
                ),
                _ => debug!(
                    "Page {} image {}: shared with an earlier page",
                    page_number,
                    image.display_name()
                ),
            }
            stats.record(&outcome);
        }
    }

    info!(
        "Processed {} images ({} recompressed, {} failed)",
        stats.images_processed, stats.images_recompressed, stats.failures
    );
    stats
}
