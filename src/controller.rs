use std::path::Path;
use std::time::Instant;

use log::info;

use crate::attempt::{AttemptSequence, CompressionAttempt};
use crate::error::Result;
use crate::pdf::{self, SaveSettings};
use crate::recompress::{self, CompressionStats};
use crate::size::{self, human_size};
use crate::validate::validate;

pub const DEFAULT_TARGET_MB: f64 = 100.0;
pub const DEFAULT_MAX_INPUT_MB: u64 = 2000;

#[derive(Debug, Clone)]
pub struct CompressOptions {
    pub target_mb: f64,
    pub max_input_mb: u64,
    pub attempts: AttemptSequence,
    pub save: SaveSettings,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            target_mb: DEFAULT_TARGET_MB,
            max_input_mb: DEFAULT_MAX_INPUT_MB,
            attempts: AttemptSequence::default(),
            save: SaveSettings::default(),
        }
    }
}

/// One executed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt: CompressionAttempt,
    pub stats: CompressionStats,
    pub output_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionOutcome {
    /// Whether some attempt reached the target.
    pub success: bool,
    /// Executed attempts, in order. The last one is what sits at the output path.
    pub attempts: Vec<AttemptRecord>,
}

impl CompressionOutcome {
    pub fn stats(&self) -> Vec<CompressionStats> {
        self.attempts.iter().map(|r| r.stats).collect()
    }

    pub fn final_size(&self) -> Option<u64> {
        self.attempts.last().map(|r| r.output_bytes)
    }
}

/// Compress `input` into `output` with the default attempt sequence.
pub fn compress_pdf(
    input: &Path,
    output: &Path,
    target_mb: f64,
    max_input_mb: u64,
) -> Result<CompressionOutcome> {
    let options = CompressOptions {
        target_mb,
        max_input_mb,
        ..CompressOptions::default()
    };
    compress_pdf_with(input, output, &options)
}

/// Run attempts in order until the saved output fits `options.target_mb`.
///
/// Every attempt reloads `input` from disk, so quality loss never compounds
/// across attempts. Validation, load and save failures abort the run.
pub fn compress_pdf_with(
    input: &Path,
    output: &Path,
    options: &CompressOptions,
) -> Result<CompressionOutcome> {
    validate(input, options.target_mb, options.max_input_mb)?;

    let total = options.attempts.len();
    let mut records = Vec::with_capacity(total);

    for (index, attempt) in options.attempts.iter().enumerate() {
        info!("Attempt {}/{}: {}", index + 1, total, attempt);
        let start = Instant::now();

        let stats = {
            let mut doc = pdf::open(input)?;
            let stats = recompress::recompress(&mut doc, *attempt);
            pdf::save(&mut doc, output, &options.save)?;
            stats
        };

        let evaluation = size::evaluate(output, options.target_mb)?;
        info!(
            "Attempt {} wrote {} in {:.2?}",
            index + 1,
            human_size(evaluation.actual_bytes),
            start.elapsed()
        );

        records.push(AttemptRecord {
            attempt: *attempt,
            stats,
            output_bytes: evaluation.actual_bytes,
        });

        if evaluation.meets_target {
            return Ok(CompressionOutcome {
                success: true,
                attempts: records,
            });
        }
    }

    info!(
        "Target of {} MB not reached after {} attempts",
        options.target_mb, total
    );
    Ok(CompressionOutcome {
        success: false,
        attempts: records,
    })
}
