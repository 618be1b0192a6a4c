//! Shrink a PDF below a target size by re-encoding its embedded images with
//! progressively more aggressive JPEG settings.

pub mod attempt;
pub mod controller;
pub mod error;
pub mod pdf;
pub mod recompress;
pub mod server;
pub mod size;
pub mod validate;

pub use attempt::{AttemptSequence, CompressionAttempt};
pub use controller::{
    compress_pdf, compress_pdf_with, AttemptRecord, CompressOptions, CompressionOutcome,
    DEFAULT_MAX_INPUT_MB, DEFAULT_TARGET_MB,
};
pub use error::{CompressError, ImageError, SequenceError, ValidationError};
pub use pdf::SaveSettings;
pub use recompress::{recompress, CompressionStats, ImageOutcome};
pub use size::{human_size, BYTES_IN_MB};
