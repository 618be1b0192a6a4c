use std::path::Path;

use crate::error::{CompressError, Result};

pub const BYTES_IN_MB: u64 = 1024 * 1024;

/// Format a byte count as megabytes with two decimals, e.g. `"1.50 MB"`.
pub fn human_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_IN_MB as f64)
}

/// Convert a megabyte ceiling to bytes, flooring any fractional byte.
pub fn mb_to_bytes(mb: f64) -> u64 {
    (mb * BYTES_IN_MB as f64).floor() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEvaluation {
    pub actual_bytes: u64,
    pub meets_target: bool,
}

/// Measure a saved file and compare it against `target_mb`.
pub fn evaluate(path: &Path, target_mb: f64) -> Result<SizeEvaluation> {
    let actual_bytes = std::fs::metadata(path)
        .map_err(|source| CompressError::Measure {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    Ok(SizeEvaluation {
        actual_bytes,
        meets_target: actual_bytes <= mb_to_bytes(target_mb),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn formats_megabytes() {
        assert_eq!(human_size(0), "0.00 MB");
        assert_eq!(human_size(BYTES_IN_MB * 3 / 2), "1.50 MB");
    }

    #[test]
    fn target_is_inclusive() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; 1024]).unwrap();

        let exact = evaluate(file.path(), 1024.0 / BYTES_IN_MB as f64).unwrap();
        assert_eq!(exact.actual_bytes, 1024);
        assert!(exact.meets_target);

        let below = evaluate(file.path(), 1023.0 / BYTES_IN_MB as f64).unwrap();
        assert!(!below.meets_target);
    }

    #[test]
    fn missing_file_is_a_measure_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = evaluate(&dir.path().join("nope.pdf"), 1.0).unwrap_err();
        assert!(matches!(err, CompressError::Measure { .. }));
    }
}
