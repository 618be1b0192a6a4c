use std::path::Path;

use crate::error::ValidationError;
use crate::size::{human_size, BYTES_IN_MB};

/// Pre-flight checks run once before any attempt.
///
/// The target is checked first so that a bad target never touches the
/// filesystem. The input is only stat'ed, never parsed.
pub fn validate(input: &Path, target_mb: f64, max_input_mb: u64) -> Result<(), ValidationError> {
    if target_mb.is_nan() || target_mb <= 0.0 {
        return Err(ValidationError::InvalidTarget(target_mb));
    }

    let metadata = match std::fs::metadata(input) {
        Ok(m) if m.is_file() => m,
        _ => return Err(ValidationError::InputNotFound(input.to_path_buf())),
    };

    let size = metadata.len();
    if size > max_input_mb.saturating_mul(BYTES_IN_MB) {
        return Err(ValidationError::InputTooLarge {
            size: human_size(size),
            max_mb: max_input_mb,
        });
    }

    Ok(())
}
