use std::path::PathBuf;

use thiserror::Error;

/// Pre-flight failures. Raised before any attempt runs.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Input file is too large ({size}). Maximum supported size is {max_mb} MB.")]
    InputTooLarge { size: String, max_mb: u64 },

    #[error("Target size must be greater than 0 MB (got {0}).")]
    InvalidTarget(f64),
}

/// A custom attempt sequence that cannot be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("attempt sequence is empty")]
    Empty,

    #[error("quality {0} is outside 1..=100")]
    QualityOutOfRange(u8),

    #[error("max dimension must be positive")]
    ZeroDimension,

    /// The attempt at this index is less aggressive than the one before it.
    #[error("attempt {} raises quality or max dimension", .0 + 1)]
    NotMonotonic(usize),
}

/// Why a single embedded image could not be recompressed.
///
/// These never escape the recompression pass; they are counted as failures.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("object is not an image stream")]
    NotAnImage,

    #[error("failed to decompress stream: {0}")]
    Stream(String),

    #[error("unsupported image: {0}")]
    Unsupported(String),

    #[error("pixel data does not match {width}x{height} with {components} components")]
    SizeMismatch {
        width: u32,
        height: u32,
        components: usize,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to encode JPEG: {0}")]
    Encode(#[from] jpeg_encoder::EncodingError),

    #[error("image dimensions {0}x{1} exceed the JPEG limit")]
    TooLarge(u32, u32),
}

/// Fatal errors surfaced by [`crate::compress_pdf`].
#[derive(Error, Debug)]
pub enum CompressError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to load PDF {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("Failed to save PDF to {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error("Linearization failed: {0}")]
    Linearize(String),

    #[error("Failed to read size of {}: {source}", path.display())]
    Measure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompressError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CompressError::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = CompressError> = std::result::Result<T, E>;
