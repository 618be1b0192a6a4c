use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use pdf_target_compressor::{
    compress_pdf_with, human_size, CompressOptions, SaveSettings, DEFAULT_MAX_INPUT_MB,
};

/// Compress a PDF by recompressing images while keeping the document content intact
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input PDF file (max 2 GB)
    input: PathBuf,

    /// Output PDF file
    output: PathBuf,

    /// Desired maximum output size in MB
    #[arg(long, default_value_t = 100.0)]
    target_mb: f64,

    /// Maximum allowed input size in MB
    #[arg(long, default_value_t = DEFAULT_MAX_INPUT_MB)]
    max_input_mb: u64,

    /// Linearize the output with qpdf (must be on PATH).
    /// Output is not linearized by default.
    #[arg(long)]
    linearize: bool,

    /// Write a classic cross-reference table instead of object streams
    #[arg(long)]
    no_object_streams: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let options = CompressOptions {
        target_mb: args.target_mb,
        max_input_mb: args.max_input_mb,
        save: SaveSettings {
            linearize: args.linearize,
            object_streams: !args.no_object_streams,
            ..SaveSettings::default()
        },
        ..CompressOptions::default()
    };

    println!("Compressing PDF: {:?}", args.input);
    let start = Instant::now();
    let outcome = compress_pdf_with(&args.input, &args.output, &options)
        .context("Compression failed")?;
    println!("Finished in {:.2?}", start.elapsed());

    let output_size = std::fs::metadata(&args.output)
        .with_context(|| format!("Failed to read {:?}", args.output))?
        .len();
    println!("Output file size: {}", human_size(output_size));

    if outcome.success {
        println!("Compression succeeded within target size.");
    } else {
        println!(
            "Compression completed but did not reach the target size. \
             Consider lowering --target-mb or adjusting the input."
        );
    }

    for (index, record) in outcome.attempts.iter().enumerate() {
        println!(
            "Attempt {} ({}): processed {} images, recompressed {}, failed {}.",
            index + 1,
            record.attempt,
            record.stats.images_processed(),
            record.stats.images_recompressed(),
            record.stats.failures()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn linearization_is_opt_in() {
        Args::command().debug_assert();
        let command = Args::command();
        let help = command
            .get_arguments()
            .find(|arg| arg.get_id() == "linearize")
            .and_then(|arg| arg.get_long_help().or(arg.get_help()))
            .unwrap()
            .to_string();
        assert!(help.contains("not linearized by default"));

        let args = Args::parse_from(["pdf-target-compressor", "in.pdf", "out.pdf"]);
        assert!(!args.linearize);
        assert!(!SaveSettings::default().linearize);
    }
}
